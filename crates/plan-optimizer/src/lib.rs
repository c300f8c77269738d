//! # Plan Optimizer
//!
//! 線性鬆弛求解（兩階段單純形法）與深度優先分支定界

pub mod bounds;
pub mod branch_and_bound;
pub mod node;
pub mod report;
pub mod simplex;
mod tableau;

// Re-export 主要類型
pub use bounds::{BoundChange, BoundSet};
pub use branch_and_bound::BranchAndBoundEngine;
pub use node::{BranchDecision, BranchDirection, NodeState, SearchNode};
pub use report::{SearchStatistics, SolveReport, SolverWarning, WarningSeverity};
pub use simplex::{RelaxationResult, RelaxationStatus, SimplexSolver};
