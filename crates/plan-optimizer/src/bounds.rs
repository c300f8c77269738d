//! 搜尋節點的變數上下界集合

use plan_core::{Model, VariableId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 每個欄位的上下界；分支時只會收緊，不會放寬
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSet {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoundSet {
    /// 以模型原始上下界建立
    pub fn from_model(model: &Model) -> Self {
        Self {
            lower: model.lower_bounds(),
            upper: model.upper_bounds(),
        }
    }

    /// 欄位數
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self, variable: VariableId) -> f64 {
        self.lower[variable.index()]
    }

    pub fn upper(&self, variable: VariableId) -> f64 {
        self.upper[variable.index()]
    }

    pub fn lower_bounds(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper
    }

    /// 收緊上界後的新集合（不會高於原上界）
    pub fn with_upper(&self, variable: VariableId, value: f64) -> Self {
        let mut next = self.clone();
        let slot = &mut next.upper[variable.index()];
        *slot = slot.min(value);
        next
    }

    /// 收緊下界後的新集合（不會低於原下界）
    pub fn with_lower(&self, variable: VariableId, value: f64) -> Self {
        let mut next = self.clone();
        let slot = &mut next.lower[variable.index()];
        *slot = slot.max(value);
        next
    }

    /// 是否存在下界大於上界的欄位
    pub fn is_contradictory(&self, tolerance: f64) -> bool {
        self.lower
            .iter()
            .zip(&self.upper)
            .any(|(l, u)| *l > *u + tolerance)
    }

    /// 與模型原始上下界不同的欄位（診斷用）
    pub fn changes_from(&self, model: &Model) -> Vec<BoundChange> {
        model
            .variables()
            .iter()
            .filter_map(|var| {
                let i = var.id.index();
                let (lower, upper) = (self.lower[i], self.upper[i]);
                if lower != var.lower_bound || upper != var.upper_bound {
                    Some(BoundChange {
                        variable: var.name.clone(),
                        lower,
                        upper,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// 被分支收緊過的單一變數上下界
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundChange {
    pub variable: String,
    pub lower: f64,
    pub upper: f64,
}

impl fmt::Display for BoundChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ∈ [{}, {}]", self.variable, self.lower, self.upper)
    }
}
