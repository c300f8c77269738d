//! 線性約束

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::expression::LinearExpression;

/// 約束句柄（即模型中的列索引）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstraintId(pub(crate) usize);

impl ConstraintId {
    /// 列索引（加入順序）
    pub fn index(self) -> usize {
        self.0
    }
}

/// 關係運算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOp {
    /// ≤
    LessEqual,
    /// =
    Equal,
    /// ≥
    GreaterEqual,
}

impl ConstraintOp {
    /// 兩邊同乘 -1 後的運算子
    pub fn flipped(self) -> Self {
        match self {
            ConstraintOp::LessEqual => ConstraintOp::GreaterEqual,
            ConstraintOp::Equal => ConstraintOp::Equal,
            ConstraintOp::GreaterEqual => ConstraintOp::LessEqual,
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ConstraintOp::LessEqual => "<=",
            ConstraintOp::Equal => "=",
            ConstraintOp::GreaterEqual => ">=",
        };
        f.write_str(symbol)
    }
}

/// 線性約束：`expression (op) rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// 約束句柄
    pub id: ConstraintId,

    /// 診斷用標籤（模型內唯一）
    pub label: String,

    /// 左側表達式
    pub expression: LinearExpression,

    /// 關係運算子
    pub op: ConstraintOp,

    /// 右側常數
    pub rhs: f64,
}

impl Constraint {
    /// 移項後的右側值（`rhs - expression.constant`）
    pub fn normalized_rhs(&self) -> f64 {
        self.rhs - self.expression.constant()
    }

    /// 違反量（滿足時為 0）
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expression.evaluate(values);
        match self.op {
            ConstraintOp::LessEqual => (lhs - self.rhs).max(0.0),
            ConstraintOp::Equal => (lhs - self.rhs).abs(),
            ConstraintOp::GreaterEqual => (self.rhs - lhs).max(0.0),
        }
    }

    /// 在容差內是否滿足
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        self.violation(values) <= tolerance
    }
}
