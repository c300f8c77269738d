//! 求解結果

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Model;
use crate::variable::VariableId;

/// 求解狀態
///
/// 不可行、無界都是合法答案，不是錯誤；呼叫端必須逐一處理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// 已證明最優
    Optimal,
    /// 已證明不可行
    Infeasible,
    /// 目標在改善方向上無界
    Unbounded,
    /// 數值失敗（超過迭代上限等），無法下結論
    NumericalFailure,
    /// 預算（節點數或時間）耗盡，回報目前最佳解
    BestKnownOnBudget,
}

impl SolveStatus {
    /// 是否帶有變數值
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::BestKnownOnBudget)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unbounded => "UNBOUNDED",
            SolveStatus::NumericalFailure => "NUMERICAL_FAILURE",
            SolveStatus::BestKnownOnBudget => "BEST_KNOWN_ON_BUDGET",
        };
        f.write_str(text)
    }
}

/// 一次求解的結果；產生後不可變，由呼叫端持有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    status: SolveStatus,
    objective_value: Option<f64>,
    values: Vec<f64>,
}

impl Solution {
    /// 帶有變數值的結果（values 依欄位順序）
    pub fn with_values(status: SolveStatus, values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status,
            objective_value: Some(objective_value),
            values,
        }
    }

    /// 沒有變數值的結果（不可行、無界、數值失敗）
    pub fn without_values(status: SolveStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: Vec::new(),
        }
    }

    /// 求解狀態
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// 是否已證明最優
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// 目標函數值（有解時）
    pub fn objective_value(&self) -> Option<f64> {
        self.objective_value
    }

    /// 變數值
    pub fn value(&self, variable: VariableId) -> Option<f64> {
        self.values.get(variable.index()).copied()
    }

    /// 依欄位順序的所有變數值（無解時為空）
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 以變數名稱列出所有值
    pub fn named_values<'a>(&'a self, model: &'a Model) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        model
            .variables()
            .iter()
            .zip(self.values.iter())
            .map(|(var, value)| (var.name.as_str(), *value))
    }
}
