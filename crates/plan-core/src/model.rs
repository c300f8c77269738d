//! 最佳化模型
//!
//! 模型擁有變數、約束與目標函數。變數加入順序即欄位順序，約束加入順序即列順序，
//! 兩者都影響求解器的平手判定，因此必須保持穩定。

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::constraint::{Constraint, ConstraintId, ConstraintOp};
use crate::expression::LinearExpression;
use crate::variable::{Variable, VariableId, VariableKind};
use crate::{ModelBuildError, Result};

/// 最佳化方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    /// 最小化
    Minimize,
    /// 最大化
    Maximize,
}

impl ObjectiveSense {
    /// 轉換為最小化問題時目標係數的乘數
    pub fn sign(self) -> f64 {
        match self {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        }
    }
}

/// 稀疏係數矩陣的一列
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    /// (欄位索引, 係數)，依欄位排序
    pub entries: Vec<(usize, f64)>,
    /// 關係運算子
    pub op: ConstraintOp,
    /// 移項後的右側值
    pub rhs: f64,
}

/// 稀疏係數矩陣（列 = 約束，欄 = 變數）
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientMatrix {
    pub rows: Vec<MatrixRow>,
    pub column_count: usize,
}

/// 可行性檢查發現的違反
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// 約束違反
    Constraint { label: String, amount: f64 },
    /// 變數超出上下界
    Bound { name: String, amount: f64 },
    /// 整數變數取到非整數值
    Integrality { name: String, value: f64 },
}

/// 線性（混合整數）規劃模型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ModelSnapshot", into = "ModelSnapshot")]
pub struct Model {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpression,
    sense: ObjectiveSense,
    name_index: HashMap<String, VariableId>,
    labels: HashSet<String>,
}

impl Model {
    /// 創建空模型（目標為 0，方向為最小化）
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpression::new(),
            sense: ObjectiveSense::Minimize,
            name_index: HashMap::new(),
            labels: HashSet::new(),
        }
    }

    /// 模型名稱
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 註冊變數
    ///
    /// 二元變數的上下界會與 [0, 1] 取交集。
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VariableId> {
        let name = name.into();
        if self.name_index.contains_key(&name) {
            return Err(ModelBuildError::DuplicateName(name));
        }

        let (lower, upper) = match kind {
            VariableKind::Binary => (lower_bound.max(0.0), upper_bound.min(1.0)),
            _ => (lower_bound, upper_bound),
        };

        let invalid = lower.is_nan()
            || upper.is_nan()
            || lower > upper
            || lower == f64::INFINITY
            || upper == f64::NEG_INFINITY;
        if invalid {
            return Err(ModelBuildError::InvalidBounds {
                name,
                lower: lower_bound,
                upper: upper_bound,
            });
        }

        let id = VariableId(self.variables.len());
        self.name_index.insert(name.clone(), id);
        self.variables.push(Variable {
            id,
            name,
            kind,
            lower_bound: lower,
            upper_bound: upper,
        });

        Ok(id)
    }

    /// 註冊連續變數
    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VariableId> {
        self.add_variable(name, VariableKind::Continuous, lower_bound, upper_bound)
    }

    /// 註冊二元變數
    pub fn add_binary(&mut self, name: impl Into<String>) -> Result<VariableId> {
        self.add_variable(name, VariableKind::Binary, 0.0, 1.0)
    }

    /// 加入約束 `expression (op) rhs`
    ///
    /// 運算式中的句柄必須由本模型發出；索引超出範圍時回傳 `UnknownVariable`。
    pub fn add_constraint(
        &mut self,
        expression: LinearExpression,
        op: ConstraintOp,
        rhs: f64,
        label: impl Into<String>,
    ) -> Result<ConstraintId> {
        let label = label.into();
        if self.labels.contains(&label) {
            return Err(ModelBuildError::DuplicateLabel(label));
        }
        self.validate_expression(&expression, &label)?;
        if !rhs.is_finite() {
            return Err(ModelBuildError::InvalidCoefficient {
                context: label,
                value: rhs,
            });
        }

        let id = ConstraintId(self.constraints.len());
        self.labels.insert(label.clone());
        self.constraints.push(Constraint {
            id,
            label,
            expression,
            op,
            rhs,
        });

        Ok(id)
    }

    /// 設定目標函數（取代先前的目標）
    pub fn set_objective(
        &mut self,
        expression: LinearExpression,
        sense: ObjectiveSense,
    ) -> Result<()> {
        self.validate_expression(&expression, "objective")?;
        self.objective = expression;
        self.sense = sense;
        Ok(())
    }

    fn validate_expression(&self, expression: &LinearExpression, context: &str) -> Result<()> {
        for &(variable, coefficient) in expression.terms() {
            if variable.index() >= self.variables.len() {
                return Err(ModelBuildError::UnknownVariable {
                    label: context.to_string(),
                    index: variable.index(),
                });
            }
            if !coefficient.is_finite() {
                return Err(ModelBuildError::InvalidCoefficient {
                    context: context.to_string(),
                    value: coefficient,
                });
            }
        }

        if !expression.constant().is_finite() {
            return Err(ModelBuildError::InvalidCoefficient {
                context: context.to_string(),
                value: expression.constant(),
            });
        }

        Ok(())
    }

    /// 變數數量
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// 約束數量
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// 依欄位順序的所有變數
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// 依列順序的所有約束
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// 查詢變數
    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    /// 以名稱查詢變數
    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.name_index.get(name).and_then(|id| self.variable(*id))
    }

    /// 查詢約束
    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id.index())
    }

    /// 目標函數
    pub fn objective(&self) -> &LinearExpression {
        &self.objective
    }

    /// 最佳化方向
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// 需要整數解的變數（依欄位順序）
    pub fn integer_variables(&self) -> Vec<VariableId> {
        self.variables
            .iter()
            .filter(|v| v.is_integral())
            .map(|v| v.id)
            .collect()
    }

    /// 各欄位的下界
    pub fn lower_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.lower_bound).collect()
    }

    /// 各欄位的上界
    pub fn upper_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.upper_bound).collect()
    }

    /// 建立稀疏係數矩陣（常數項已移到右側）
    pub fn coefficient_matrix(&self) -> CoefficientMatrix {
        let rows = self
            .constraints
            .iter()
            .map(|c| MatrixRow {
                entries: c
                    .expression
                    .terms()
                    .iter()
                    .map(|(v, coef)| (v.index(), *coef))
                    .collect(),
                op: c.op,
                rhs: c.normalized_rhs(),
            })
            .collect();

        CoefficientMatrix {
            rows,
            column_count: self.variables.len(),
        }
    }

    /// 目標函數值
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// 檢查一組變數值的可行性，回傳所有違反
    pub fn check_feasibility(&self, values: &[f64], tolerance: f64) -> Vec<Violation> {
        let mut violations = Vec::new();

        for variable in &self.variables {
            let value = values.get(variable.id.index()).copied().unwrap_or(0.0);
            let amount = (variable.lower_bound - value).max(value - variable.upper_bound);
            if amount > tolerance {
                violations.push(Violation::Bound {
                    name: variable.name.clone(),
                    amount,
                });
            }
            if variable.is_integral() && (value - value.round()).abs() > tolerance {
                violations.push(Violation::Integrality {
                    name: variable.name.clone(),
                    value,
                });
            }
        }

        for constraint in &self.constraints {
            let amount = constraint.violation(values);
            if amount > tolerance {
                violations.push(Violation::Constraint {
                    label: constraint.label.clone(),
                    amount,
                });
            }
        }

        violations
    }
}

/// 序列化用的模型內容；反序列化時重新走一次建構流程以確保不變量
#[derive(Serialize, Deserialize)]
struct ModelSnapshot {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpression,
    sense: ObjectiveSense,
}

impl From<Model> for ModelSnapshot {
    fn from(model: Model) -> Self {
        Self {
            name: model.name,
            variables: model.variables,
            constraints: model.constraints,
            objective: model.objective,
            sense: model.sense,
        }
    }
}

impl TryFrom<ModelSnapshot> for Model {
    type Error = ModelBuildError;

    fn try_from(snapshot: ModelSnapshot) -> Result<Self> {
        let mut model = Model::new(snapshot.name);
        for v in snapshot.variables {
            model.add_variable(v.name, v.kind, v.lower_bound, v.upper_bound)?;
        }
        for c in snapshot.constraints {
            model.add_constraint(c.expression, c.op, c.rhs, c.label)?;
        }
        model.set_objective(snapshot.objective, snapshot.sense)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn small_model() -> (Model, VariableId, VariableId) {
        let mut model = Model::new("test");
        let x = model.add_continuous("x", 0.0, f64::INFINITY).unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint(
                LinearExpression::from(x) - 100.0 * LinearExpression::from(y),
                ConstraintOp::LessEqual,
                0.0,
                "link",
            )
            .unwrap();
        model
            .set_objective(
                LinearExpression::term(x, 2.0).with_term(y, 50.0),
                ObjectiveSense::Minimize,
            )
            .unwrap();
        (model, x, y)
    }

    #[test]
    fn test_build_model() {
        let (model, x, y) = small_model();

        assert_eq!(model.variable_count(), 2);
        assert_eq!(model.constraint_count(), 1);
        assert_eq!(x.index(), 0);
        assert_eq!(y.index(), 1);
        assert_eq!(model.integer_variables(), vec![y]);
        assert_eq!(model.variable_by_name("y").map(|v| v.id), Some(y));
        assert_eq!(model.sense(), ObjectiveSense::Minimize);
    }

    #[test]
    fn test_duplicate_name_leaves_model_untouched() {
        let (mut model, _, _) = small_model();

        let err = model.add_continuous("x", 0.0, 1.0).unwrap_err();
        assert_eq!(err, ModelBuildError::DuplicateName("x".to_string()));
        assert_eq!(model.variable_count(), 2);
    }

    #[test]
    fn test_duplicate_label() {
        let (mut model, x, _) = small_model();

        let err = model
            .add_constraint(LinearExpression::from(x), ConstraintOp::GreaterEqual, 1.0, "link")
            .unwrap_err();
        assert!(matches!(err, ModelBuildError::DuplicateLabel(_)));
        assert_eq!(model.constraint_count(), 1);
    }

    #[test]
    fn test_unknown_variable() {
        let (mut model, _, _) = small_model();
        let mut other = Model::new("other");
        for i in 0..5 {
            other.add_continuous(format!("v{i}"), 0.0, 1.0).unwrap();
        }
        let foreign = other.variables()[4].id;

        let err = model
            .add_constraint(LinearExpression::from(foreign), ConstraintOp::Equal, 0.0, "bad")
            .unwrap_err();
        assert!(matches!(err, ModelBuildError::UnknownVariable { index: 4, .. }));

        let err = model
            .set_objective(LinearExpression::from(foreign), ObjectiveSense::Maximize)
            .unwrap_err();
        assert!(matches!(err, ModelBuildError::UnknownVariable { .. }));
        // 失敗的呼叫不改變原有目標
        assert_eq!(model.sense(), ObjectiveSense::Minimize);
    }

    #[test]
    fn test_handles_are_positional() {
        let (model, _, y) = small_model();
        let mut other = Model::new("other");
        let _ = other.add_continuous("a", 0.0, 1.0).unwrap();
        let b = other.add_continuous("b", 0.0, 1.0).unwrap();

        // 句柄只是欄位索引：在另一個模型中對應同一欄位
        assert_eq!(b, y);
        assert_eq!(model.variable(b).map(|v| v.name.as_str()), Some("y"));
        assert_eq!(other.variable(y).map(|v| v.name.as_str()), Some("b"));
    }

    #[rstest]
    #[case(2.0, 1.0)]
    #[case(f64::NAN, 1.0)]
    #[case(f64::INFINITY, f64::INFINITY)]
    #[case(0.0, f64::NEG_INFINITY)]
    fn test_invalid_bounds(#[case] lower: f64, #[case] upper: f64) {
        let mut model = Model::new("bounds");
        let err = model.add_continuous("z", lower, upper).unwrap_err();
        assert!(matches!(err, ModelBuildError::InvalidBounds { .. }));
        assert_eq!(model.variable_count(), 0);
    }

    #[test]
    fn test_binary_bounds_clamped() {
        let mut model = Model::new("binary");
        let y = model
            .add_variable("y", VariableKind::Binary, -5.0, f64::INFINITY)
            .unwrap();
        let var = model.variable(y).unwrap();
        assert_eq!((var.lower_bound, var.upper_bound), (0.0, 1.0));

        let err = model.add_variable("w", VariableKind::Binary, 2.0, 3.0).unwrap_err();
        assert!(matches!(err, ModelBuildError::InvalidBounds { .. }));
    }

    #[test]
    fn test_non_finite_coefficient() {
        let (mut model, x, _) = small_model();
        let err = model
            .add_constraint(LinearExpression::term(x, f64::NAN), ConstraintOp::LessEqual, 1.0, "nan")
            .unwrap_err();
        assert!(matches!(err, ModelBuildError::InvalidCoefficient { .. }));
    }

    #[test]
    fn test_coefficient_matrix() {
        let (mut model, x, _) = small_model();
        model
            .add_constraint(
                LinearExpression::term(x, 1.0).with_constant(10.0),
                ConstraintOp::GreaterEqual,
                30.0,
                "demand",
            )
            .unwrap();

        let matrix = model.coefficient_matrix();
        assert_eq!(matrix.column_count, 2);
        assert_eq!(matrix.rows.len(), 2);
        assert_eq!(matrix.rows[0].entries, vec![(0, 1.0), (1, -100.0)]);
        assert_eq!(matrix.rows[1].rhs, 20.0);
        assert_eq!(matrix.rows[1].op, ConstraintOp::GreaterEqual);
    }

    #[test]
    fn test_check_feasibility() {
        let (model, _, _) = small_model();

        assert!(model.check_feasibility(&[50.0, 1.0], 1e-9).is_empty());

        let violations = model.check_feasibility(&[50.0, 0.5], 1e-9);
        assert_eq!(violations.len(), 1);
        assert!(matches!(violations[0], Violation::Integrality { .. }));

        let violations = model.check_feasibility(&[-1.0, 0.0], 1e-9);
        assert!(matches!(violations[0], Violation::Bound { .. }));

        assert_eq!(model.objective_value(&[10.0, 1.0]), 70.0);
    }

    #[test]
    fn test_json_round_trip_rebuilds_indices() {
        let (model, _, _) = small_model();

        let json = serde_json::to_string(&model).unwrap();
        let mut back: Model = serde_json::from_str(&json).unwrap();

        assert_eq!(back.variable_count(), 2);
        assert_eq!(back.constraints(), model.constraints());
        assert_eq!(back.objective(), model.objective());
        assert!(back.add_binary("y").is_err());
    }
}
