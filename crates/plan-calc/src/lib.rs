//! # Plan Calc
//!
//! 多期生產與庫存計劃：把物料、期間參數轉成混合整數模型，求解後再轉回生產計劃

pub mod builder;
pub mod config;
pub mod parameters;
pub mod plan;
pub mod planner;
pub mod scenarios;

// Re-export 主要類型
pub use builder::{PlanBuilder, PlanCell, PlanModel};
pub use config::{BigMRule, PlanConfig};
pub use parameters::{ItemId, ParameterTable, PeriodId, PlanningParameters};
pub use plan::{BalanceViolation, CostBreakdown, PlanEntry, ProductionPlan, WarehouseUsage};
pub use planner::ProductionPlanner;

use plan_core::SolveStatus;
use plan_optimizer::SolveReport;
use rust_decimal::Decimal;

/// 生產計劃錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("缺少參數 {table}: {key}")]
    MissingParameter { table: &'static str, key: String },

    #[error("參數 {table} 的值無效 ({key}): {value}")]
    InvalidParameter {
        table: &'static str,
        key: String,
        value: Decimal,
    },

    #[error("物料或計劃期間為空")]
    EmptyHorizon,

    #[error("期間必須嚴格遞增: {0}")]
    UnorderedPeriods(String),

    #[error("模型建構錯誤: {0}")]
    Model(#[from] plan_core::ModelBuildError),

    #[error("配置錯誤: {0}")]
    Config(#[from] plan_core::ConfigError),

    #[error("求解狀態 {0} 沒有可解讀的解")]
    NoSolution(SolveStatus),

    #[error("求解結果缺少變數值: {0}")]
    UnknownVariable(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;

/// 生產計劃求解結果
#[derive(Debug, Clone)]
pub struct PlanningResult {
    /// 求解狀態
    pub status: SolveStatus,

    /// 生產計劃（有解時）
    pub plan: Option<ProductionPlan>,

    /// 分支定界報告（統計與警告）
    pub report: SolveReport,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl PlanningResult {
    /// 是否已證明最優
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// 總成本（有解時）
    pub fn total_cost(&self) -> Option<Decimal> {
        self.plan.as_ref().map(|plan| plan.costs.total)
    }
}
