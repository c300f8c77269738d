//! 線性表達式

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, Mul, Neg, Sub};

use crate::variable::VariableId;

/// 線性表達式：Σ 係數 × 變數 + 常數項
///
/// 建構後不可變；所有組合操作都回傳新的表達式。項依欄位索引排序，
/// 同一變數只出現一次，係數為零的項會被省略。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpression {
    terms: Vec<(VariableId, f64)>,
    constant: f64,
}

impl LinearExpression {
    /// 零表達式
    pub fn new() -> Self {
        Self::default()
    }

    /// 單一項 `coefficient × variable`
    pub fn term(variable: VariableId, coefficient: f64) -> Self {
        Self::from_terms([(variable, coefficient)], 0.0)
    }

    /// 常數表達式
    pub fn constant_only(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// 由多個項與常數建立（重複變數會合併）
    pub fn from_terms<I>(terms: I, constant: f64) -> Self
    where
        I: IntoIterator<Item = (VariableId, f64)>,
    {
        let mut merged: BTreeMap<VariableId, f64> = BTreeMap::new();
        for (variable, coefficient) in terms {
            *merged.entry(variable).or_insert(0.0) += coefficient;
        }

        Self {
            terms: merged.into_iter().filter(|(_, c)| *c != 0.0).collect(),
            constant,
        }
    }

    /// 建構器模式：加入一項
    pub fn with_term(self, variable: VariableId, coefficient: f64) -> Self {
        let constant = self.constant;
        Self::from_terms(
            self.terms.into_iter().chain(std::iter::once((variable, coefficient))),
            constant,
        )
    }

    /// 建構器模式：累加常數項
    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    /// 依欄位順序的所有非零項
    pub fn terms(&self) -> &[(VariableId, f64)] {
        &self.terms
    }

    /// 常數項
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// 取得某變數的係數（未出現則為 0）
    pub fn coefficient(&self, variable: VariableId) -> f64 {
        self.terms
            .binary_search_by_key(&variable, |(v, _)| *v)
            .map(|pos| self.terms[pos].1)
            .unwrap_or(0.0)
    }

    /// 引用的變數
    pub fn variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.terms.iter().map(|(v, _)| *v)
    }

    /// 是否沒有任何變數項
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// 以欄位索引排列的變數值求值
    ///
    /// 超出 `values` 範圍的變數視為 0。
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().fold(self.constant, |acc, (v, c)| {
            acc + c * values.get(v.index()).copied().unwrap_or(0.0)
        })
    }

    fn scaled(self, factor: f64) -> Self {
        Self::from_terms(
            self.terms.into_iter().map(|(v, c)| (v, c * factor)),
            self.constant * factor,
        )
    }
}

impl From<VariableId> for LinearExpression {
    fn from(variable: VariableId) -> Self {
        Self::term(variable, 1.0)
    }
}

impl Add for LinearExpression {
    type Output = LinearExpression;

    fn add(self, rhs: LinearExpression) -> Self::Output {
        Self::from_terms(
            self.terms.into_iter().chain(rhs.terms),
            self.constant + rhs.constant,
        )
    }
}

impl Sub for LinearExpression {
    type Output = LinearExpression;

    fn sub(self, rhs: LinearExpression) -> Self::Output {
        self + (-rhs)
    }
}

impl Neg for LinearExpression {
    type Output = LinearExpression;

    fn neg(self) -> Self::Output {
        self.scaled(-1.0)
    }
}

impl Mul<f64> for LinearExpression {
    type Output = LinearExpression;

    fn mul(self, factor: f64) -> Self::Output {
        self.scaled(factor)
    }
}

impl Mul<LinearExpression> for f64 {
    type Output = LinearExpression;

    fn mul(self, expression: LinearExpression) -> Self::Output {
        expression.scaled(self)
    }
}

impl std::iter::Sum for LinearExpression {
    fn sum<I: Iterator<Item = LinearExpression>>(iter: I) -> Self {
        iter.fold(LinearExpression::new(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(i: usize) -> VariableId {
        VariableId(i)
    }

    #[test]
    fn test_terms_are_merged_and_sorted() {
        let expr = LinearExpression::from_terms(
            [(var(2), 1.5), (var(0), 2.0), (var(2), 0.5)],
            3.0,
        );

        assert_eq!(expr.terms(), &[(var(0), 2.0), (var(2), 2.0)]);
        assert_eq!(expr.constant(), 3.0);
        assert_eq!(expr.coefficient(var(2)), 2.0);
        assert_eq!(expr.coefficient(var(1)), 0.0);
    }

    #[test]
    fn test_zero_coefficients_dropped() {
        let expr = LinearExpression::term(var(0), 1.0).with_term(var(0), -1.0);
        assert!(expr.is_constant());

        let expr = LinearExpression::term(var(4), 0.0);
        assert_eq!(expr.variables().count(), 0);
    }

    #[test]
    fn test_operators() {
        let x = LinearExpression::from(var(0));
        let y = LinearExpression::from(var(1));

        // 2x - (y - 4) = 2x - y + 4
        let expr = x * 2.0 - (y - LinearExpression::constant_only(4.0));
        assert_eq!(expr.terms(), &[(var(0), 2.0), (var(1), -1.0)]);
        assert_eq!(expr.constant(), 4.0);

        let negated = -expr.clone();
        assert_eq!(negated.coefficient(var(0)), -2.0);
        assert_eq!(negated.constant(), -4.0);

        let doubled = 2.0 * expr;
        assert_eq!(doubled.coefficient(var(1)), -2.0);
    }

    #[test]
    fn test_sum_and_evaluate() {
        let total: LinearExpression = (0..3).map(|i| LinearExpression::term(var(i), 1.0)).sum();
        assert_eq!(total.terms().len(), 3);

        let value = total.with_constant(1.0).evaluate(&[1.0, 2.0, 3.0]);
        assert_eq!(value, 7.0);
    }

    #[test]
    fn test_evaluate_missing_values_as_zero() {
        let expr = LinearExpression::term(var(5), 10.0).with_constant(-1.0);
        assert_eq!(expr.evaluate(&[1.0]), -1.0);
    }
}
