//! # ProdPlan
//!
//! 多期生產與庫存計劃求解：線性規劃模型、兩階段單純形法、深度優先分支定界，
//! 以及把物料與期間參數轉成模型的計劃建構器。
//!
//! ```no_run
//! use prodplan::calc::{scenarios, ProductionPlanner};
//!
//! let result = ProductionPlanner::default()
//!     .plan(&scenarios::reference_instance())
//!     .expect("參數完整");
//! println!("{} {:?}", result.status, result.total_cost());
//! ```

pub use plan_calc as calc;
pub use plan_core as model;
pub use plan_optimizer as optimizer;

pub use plan_calc::{
    BigMRule, ItemId, PeriodId, PlanBuilder, PlanConfig, PlanError, PlanningParameters,
    PlanningResult, ProductionPlan, ProductionPlanner,
};
pub use plan_core::{
    ConstraintOp, LinearExpression, Model, ModelBuildError, ObjectiveSense, Solution, SolveStatus,
    SolverConfig, VariableId, VariableKind,
};
pub use plan_optimizer::{BranchAndBoundEngine, SimplexSolver, SolveReport};

/// 計劃參數與成本使用的十進位數值
pub use rust_decimal::Decimal;
