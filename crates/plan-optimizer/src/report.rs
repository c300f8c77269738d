//! 分支定界求解報告

use plan_core::{Solution, SolveStatus, VariableId};
use serde::{Deserialize, Serialize};

use crate::bounds::BoundChange;
use crate::node::NodeState;

/// 求解報告：解、搜尋統計與警告
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub solution: Solution,
    pub statistics: SearchStatistics,
    pub warnings: Vec<SolverWarning>,
}

impl SolveReport {
    pub fn status(&self) -> SolveStatus {
        self.solution.status()
    }

    pub fn is_optimal(&self) -> bool {
        self.solution.is_optimal()
    }

    pub fn objective_value(&self) -> Option<f64> {
        self.solution.objective_value()
    }

    pub fn value(&self, variable: VariableId) -> Option<f64> {
        self.solution.value(variable)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: SolverWarning) {
        self.warnings.push(warning);
    }
}

/// 搜尋統計
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    /// 已求解的節點數
    pub nodes_explored: usize,
    pub nodes_branched: usize,
    pub nodes_integer: usize,
    pub nodes_pruned_bound: usize,
    pub nodes_pruned_infeasible: usize,
    /// 鬆弛數值失敗的節點數（也計入 nodes_pruned_infeasible）
    pub numerical_failures: usize,
    pub simplex_iterations: usize,
    pub max_depth: usize,
    pub incumbent_updates: usize,
    /// 求解耗時（毫秒）
    pub elapsed_ms: u128,
}

impl SearchStatistics {
    /// 依節點最終狀態計數
    pub fn record(&mut self, state: NodeState) {
        match state {
            NodeState::Pending => {}
            NodeState::SolvedFeasible => self.nodes_branched += 1,
            NodeState::SolvedInteger => self.nodes_integer += 1,
            NodeState::PrunedBound => self.nodes_pruned_bound += 1,
            NodeState::PrunedInfeasible => self.nodes_pruned_infeasible += 1,
        }
    }
}

/// 求解警告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverWarning {
    pub node_id: usize,
    pub depth: usize,
    pub message: String,
    /// 節點相對於模型被收緊的上下界
    pub bounds: Vec<BoundChange>,
    pub severity: WarningSeverity,
}

impl SolverWarning {
    pub fn new(node_id: usize, depth: usize, message: String, severity: WarningSeverity) -> Self {
        Self {
            node_id,
            depth,
            message,
            bounds: Vec::new(),
            severity,
        }
    }

    pub fn info(node_id: usize, depth: usize, message: String) -> Self {
        Self::new(node_id, depth, message, WarningSeverity::Info)
    }

    pub fn warning(node_id: usize, depth: usize, message: String) -> Self {
        Self::new(node_id, depth, message, WarningSeverity::Warning)
    }

    pub fn error(node_id: usize, depth: usize, message: String) -> Self {
        Self::new(node_id, depth, message, WarningSeverity::Error)
    }

    pub fn with_bounds(mut self, bounds: Vec<BoundChange>) -> Self {
        self.bounds = bounds;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}
