//! # Plan Core
//!
//! 線性規劃模型的核心資料結構與類型定義

pub mod config;
pub mod constraint;
pub mod expression;
pub mod lp_format;
pub mod model;
pub mod solution;
pub mod variable;

// Re-export 主要類型
pub use config::{ConfigError, SolverConfig};
pub use constraint::{Constraint, ConstraintId, ConstraintOp};
pub use expression::LinearExpression;
pub use model::{CoefficientMatrix, MatrixRow, Model, ObjectiveSense, Violation};
pub use solution::{Solution, SolveStatus};
pub use variable::{Variable, VariableId, VariableKind};

/// 模型建構錯誤
///
/// 建構階段同步回報；失敗的呼叫不會改變模型內容。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelBuildError {
    #[error("變數名稱重複: {0}")]
    DuplicateName(String),

    #[error("約束標籤重複: {0}")]
    DuplicateLabel(String),

    #[error("約束 {label} 引用了未註冊的變數 #{index}")]
    UnknownVariable { label: String, index: usize },

    #[error("變數 {name} 的上下界無效: [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    #[error("{context} 含有非有限係數: {value}")]
    InvalidCoefficient { context: String, value: f64 },
}

pub type Result<T> = std::result::Result<T, ModelBuildError>;
