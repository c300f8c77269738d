//! 分支定界搜尋節點

use plan_core::VariableId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bounds::BoundSet;

/// 節點狀態
///
/// 初始為 Pending；求解後轉為其餘四種之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// 等待求解
    Pending,
    /// 鬆弛可行但有分數整數變數，已分支
    SolvedFeasible,
    /// 鬆弛解滿足整數性
    SolvedInteger,
    /// 鬆弛目標不優於現任解
    PrunedBound,
    /// 鬆弛不可行（含數值失敗）
    PrunedInfeasible,
}

/// 分支方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchDirection {
    /// x ≤ ⌊v⌋
    Down,
    /// x ≥ ⌈v⌉
    Up,
}

/// 產生此節點的分支決策
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchDecision {
    pub variable: VariableId,
    pub direction: BranchDirection,
    /// 新的上界（Down）或下界（Up）
    pub bound: f64,
}

impl fmt::Display for BranchDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.direction {
            BranchDirection::Down => "≤",
            BranchDirection::Up => "≥",
        };
        write!(f, "#{} {} {}", self.variable.index(), op, self.bound)
    }
}

/// 搜尋節點
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub depth: usize,
    pub bounds: BoundSet,
    pub state: NodeState,
    pub decision: Option<BranchDecision>,
}

impl SearchNode {
    /// 以模型原始上下界建立根節點
    pub fn root(bounds: BoundSet) -> Self {
        Self {
            id: 0,
            parent: None,
            depth: 0,
            bounds,
            state: NodeState::Pending,
            decision: None,
        }
    }

    /// 在 `variable` 上分支，回傳 (下分支, 上分支)
    pub fn branch(&self, variable: VariableId, value: f64, next_id: usize) -> (SearchNode, SearchNode) {
        let floor = value.floor();
        let ceil = value.ceil();

        let down = SearchNode {
            id: next_id,
            parent: Some(self.id),
            depth: self.depth + 1,
            bounds: self.bounds.with_upper(variable, floor),
            state: NodeState::Pending,
            decision: Some(BranchDecision {
                variable,
                direction: BranchDirection::Down,
                bound: floor,
            }),
        };
        let up = SearchNode {
            id: next_id + 1,
            parent: Some(self.id),
            depth: self.depth + 1,
            bounds: self.bounds.with_lower(variable, ceil),
            state: NodeState::Pending,
            decision: Some(BranchDecision {
                variable,
                direction: BranchDirection::Up,
                bound: ceil,
            }),
        };

        (down, up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{Model, VariableKind};

    #[test]
    fn test_branch_children() {
        let mut model = Model::new("node");
        let n = model
            .add_variable("n", VariableKind::Integer, 0.0, 10.0)
            .unwrap();
        let root = SearchNode::root(BoundSet::from_model(&model));

        let (down, up) = root.branch(n, 3.4, 1);

        assert_eq!(down.bounds.upper(n), 3.0);
        assert_eq!(down.bounds.lower(n), 0.0);
        assert_eq!(up.bounds.lower(n), 4.0);
        assert_eq!(up.bounds.upper(n), 10.0);
        assert_eq!((down.id, up.id), (1, 2));
        assert_eq!(down.parent, Some(0));
        assert_eq!(up.depth, 1);
        assert_eq!(up.decision.map(|d| d.direction), Some(BranchDirection::Up));
        assert_eq!(down.state, NodeState::Pending);
    }

    #[test]
    fn test_decision_display() {
        let mut model = Model::new("node");
        let _ = model.add_binary("a").unwrap();
        let y = model.add_binary("y").unwrap();
        let root = SearchNode::root(BoundSet::from_model(&model));

        let (down, up) = root.branch(y, 0.5, 1);

        assert_eq!(down.decision.unwrap().to_string(), "#1 ≤ 0");
        assert_eq!(up.decision.unwrap().to_string(), "#1 ≥ 1");
        assert_eq!(root.decision, None);
    }
}
