//! 兩階段原始單純形法
//!
//! 整數變數在此一律視為連續變數。流程：
//!
//! 1. 以欄位代換處理上下界（有限下界平移、只有上界則鏡射、自由變數拆成正負兩部分，
//!    平移後的有限上界改寫為 `≤` 列；上下界相等的欄位直接代入常數）
//! 2. 右側為負的列乘以 -1，`≤` 加鬆弛變數，`≥` 加剩餘變數與人工變數，`=` 加人工變數
//! 3. 第一階段最小化人工變數總和，第二階段在封鎖人工欄的情況下最佳化原目標

use plan_core::{ConstraintOp, Model, Solution, SolveStatus, SolverConfig};
use serde::{Deserialize, Serialize};

use crate::bounds::BoundSet;
use crate::tableau::Tableau;

/// 鬆弛問題的求解狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelaxationStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// 超過迭代上限，視為數值失敗
    IterationLimit,
}

/// 一次鬆弛求解的結果
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationResult {
    pub status: RelaxationStatus,

    /// 依欄位順序的變數值（僅 Optimal 時非空）
    pub values: Vec<f64>,

    /// 以原目標函數（含常數項）計算的目標值
    pub objective: Option<f64>,

    /// 最終基底（標準型單純形表的欄索引，依列順序）
    pub basis: Vec<usize>,

    /// 兩個階段合計的樞紐次數
    pub iterations: usize,
}

impl RelaxationResult {
    fn terminal(status: RelaxationStatus, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
            basis: Vec::new(),
            iterations,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == RelaxationStatus::Optimal
    }
}

/// 原始變數與標準型欄位的對應
#[derive(Debug, Clone, Copy)]
enum ColumnMap {
    /// 上下界相等，直接代入
    Fixed(f64),
    /// x = offset + x'
    Shifted { column: usize, offset: f64 },
    /// x = offset - x'
    Mirrored { column: usize, offset: f64 },
    /// x = x⁺ - x⁻
    Split { positive: usize, negative: usize },
}

struct StandardRow {
    entries: Vec<(usize, f64)>,
    op: ConstraintOp,
    rhs: f64,
}

/// 所有欄位皆 ≥ 0 的標準型
struct StandardForm {
    columns: Vec<ColumnMap>,
    rows: Vec<StandardRow>,
    structural: usize,
}

enum PhaseOutcome {
    Optimal,
    Unbounded,
    IterationLimit,
}

/// 兩階段單純形求解器
#[derive(Debug, Clone, Default)]
pub struct SimplexSolver {
    config: SolverConfig,
}

impl SimplexSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// 以模型原始上下界求解鬆弛問題
    pub fn solve(&self, model: &Model) -> Solution {
        let result = self.solve_relaxation(model, &BoundSet::from_model(model));
        match result.status {
            RelaxationStatus::Optimal => Solution::with_values(
                SolveStatus::Optimal,
                result.values,
                result.objective.unwrap_or_default(),
            ),
            RelaxationStatus::Infeasible => Solution::without_values(SolveStatus::Infeasible),
            RelaxationStatus::Unbounded => Solution::without_values(SolveStatus::Unbounded),
            RelaxationStatus::IterationLimit => {
                Solution::without_values(SolveStatus::NumericalFailure)
            }
        }
    }

    /// 在指定上下界下求解鬆弛問題
    pub fn solve_relaxation(&self, model: &Model, bounds: &BoundSet) -> RelaxationResult {
        let eps = self.config.tolerance;

        let Some(form) = self.standardize(model, bounds) else {
            tracing::debug!("上下界或常數列矛盾，鬆弛問題不可行");
            return RelaxationResult::terminal(RelaxationStatus::Infeasible, 0);
        };

        let mut rows = form.rows;
        for row in &mut rows {
            if row.rhs < 0.0 {
                row.rhs = -row.rhs;
                row.op = row.op.flipped();
                for (_, a) in &mut row.entries {
                    *a = -*a;
                }
            }
        }

        let slack_count = rows.iter().filter(|r| r.op != ConstraintOp::Equal).count();
        let artificial_count = rows.iter().filter(|r| r.op != ConstraintOp::LessEqual).count();
        let total = form.structural + slack_count + artificial_count;

        let mut tableau = Tableau::new(rows.len(), total);
        let mut artificial = vec![false; total];
        let mut next_slack = form.structural;
        let mut next_artificial = form.structural + slack_count;
        let mut rhs_scale: f64 = 1.0;

        for (i, row) in rows.iter().enumerate() {
            for &(column, a) in &row.entries {
                tableau.set(i, column, a);
            }
            tableau.set_rhs(i, row.rhs);
            rhs_scale = rhs_scale.max(row.rhs.abs());

            match row.op {
                ConstraintOp::LessEqual => {
                    tableau.set(i, next_slack, 1.0);
                    tableau.set_basic(i, next_slack);
                    next_slack += 1;
                }
                ConstraintOp::GreaterEqual => {
                    tableau.set(i, next_slack, -1.0);
                    next_slack += 1;
                    tableau.set(i, next_artificial, 1.0);
                    tableau.set_basic(i, next_artificial);
                    artificial[next_artificial] = true;
                    next_artificial += 1;
                }
                ConstraintOp::Equal => {
                    tableau.set(i, next_artificial, 1.0);
                    tableau.set_basic(i, next_artificial);
                    artificial[next_artificial] = true;
                    next_artificial += 1;
                }
            }
        }

        let mut iterations = 0;

        if artificial_count > 0 {
            let phase_one: Vec<f64> = artificial
                .iter()
                .map(|&a| if a { 1.0 } else { 0.0 })
                .collect();
            tableau.load_costs(&phase_one);

            let unblocked = vec![false; total];
            match self.run_phase(&mut tableau, &unblocked, &mut iterations) {
                PhaseOutcome::Optimal => {}
                // 第一階段目標有下界 0，無界只可能來自數值問題
                PhaseOutcome::Unbounded | PhaseOutcome::IterationLimit => {
                    return RelaxationResult::terminal(RelaxationStatus::IterationLimit, iterations);
                }
            }

            let infeasibility = tableau.objective();
            tracing::debug!(
                "單純形第一階段完成：迭代 {} 次，人工變數總和 {:.3e}",
                iterations,
                infeasibility
            );
            if infeasibility > eps * rhs_scale {
                return RelaxationResult::terminal(RelaxationStatus::Infeasible, iterations);
            }

            // 把留在基底中的人工變數換出；換不出的列為冗餘列
            for row in 0..tableau.rows() {
                if artificial[tableau.basis()[row]] {
                    if let Some(column) = tableau.first_usable_column(row, &artificial, eps) {
                        tableau.pivot(row, column);
                        iterations += 1;
                    }
                }
            }
        }

        let sign = model.sense().sign();
        let mut cost = vec![0.0; total];
        for &(variable, coefficient) in model.objective().terms() {
            match form.columns[variable.index()] {
                ColumnMap::Fixed(_) => {}
                ColumnMap::Shifted { column, .. } => cost[column] += sign * coefficient,
                ColumnMap::Mirrored { column, .. } => cost[column] -= sign * coefficient,
                ColumnMap::Split { positive, negative } => {
                    cost[positive] += sign * coefficient;
                    cost[negative] -= sign * coefficient;
                }
            }
        }
        tableau.load_costs(&cost);

        let outcome = self.run_phase(&mut tableau, &artificial, &mut iterations);
        tracing::debug!("單純形第二階段完成：累計迭代 {} 次", iterations);
        match outcome {
            PhaseOutcome::Optimal => {}
            PhaseOutcome::Unbounded => {
                return RelaxationResult::terminal(RelaxationStatus::Unbounded, iterations);
            }
            PhaseOutcome::IterationLimit => {
                return RelaxationResult::terminal(RelaxationStatus::IterationLimit, iterations);
            }
        }

        let column_values = tableau.column_values();
        let values: Vec<f64> = form
            .columns
            .iter()
            .map(|map| match *map {
                ColumnMap::Fixed(value) => value,
                ColumnMap::Shifted { column, offset } => offset + column_values[column],
                ColumnMap::Mirrored { column, offset } => offset - column_values[column],
                ColumnMap::Split { positive, negative } => {
                    column_values[positive] - column_values[negative]
                }
            })
            .collect();

        let objective = model.objective_value(&values);

        RelaxationResult {
            status: RelaxationStatus::Optimal,
            values,
            objective: Some(objective),
            basis: tableau.basis().to_vec(),
            iterations,
        }
    }

    fn run_phase(
        &self,
        tableau: &mut Tableau,
        blocked: &[bool],
        iterations: &mut usize,
    ) -> PhaseOutcome {
        let eps = self.config.tolerance;
        loop {
            let Some(entering) = tableau.entering_column(blocked, eps) else {
                return PhaseOutcome::Optimal;
            };
            let Some(leaving) = tableau.leaving_row(entering, eps) else {
                return PhaseOutcome::Unbounded;
            };
            if *iterations >= self.config.max_simplex_iterations {
                tracing::warn!("單純形迭代超過上限 {}", self.config.max_simplex_iterations);
                return PhaseOutcome::IterationLimit;
            }
            tableau.pivot(leaving, entering);
            *iterations += 1;
        }
    }

    /// 建立標準型；上下界矛盾或常數列不成立時回傳 None
    fn standardize(&self, model: &Model, bounds: &BoundSet) -> Option<StandardForm> {
        let eps = self.config.tolerance;
        let lower = bounds.lower_bounds();
        let upper = bounds.upper_bounds();

        let mut columns = Vec::with_capacity(lower.len());
        let mut bound_rows = Vec::new();
        let mut structural = 0;

        for (&l, &u) in lower.iter().zip(upper) {
            if l > u + eps {
                return None;
            }
            let map = if l.is_finite() && u.is_finite() && u - l <= eps {
                ColumnMap::Fixed(l)
            } else if l.is_finite() {
                let column = structural;
                structural += 1;
                if u.is_finite() {
                    bound_rows.push(StandardRow {
                        entries: vec![(column, 1.0)],
                        op: ConstraintOp::LessEqual,
                        rhs: u - l,
                    });
                }
                ColumnMap::Shifted { column, offset: l }
            } else if u.is_finite() {
                let column = structural;
                structural += 1;
                ColumnMap::Mirrored { column, offset: u }
            } else {
                let positive = structural;
                structural += 2;
                ColumnMap::Split {
                    positive,
                    negative: positive + 1,
                }
            };
            columns.push(map);
        }

        let matrix = model.coefficient_matrix();
        let mut rows = Vec::with_capacity(matrix.rows.len() + bound_rows.len());

        for matrix_row in matrix.rows {
            let mut rhs = matrix_row.rhs;
            let mut entries = Vec::with_capacity(matrix_row.entries.len() + 1);
            for (index, a) in matrix_row.entries {
                match columns[index] {
                    ColumnMap::Fixed(value) => rhs -= a * value,
                    ColumnMap::Shifted { column, offset } => {
                        rhs -= a * offset;
                        entries.push((column, a));
                    }
                    ColumnMap::Mirrored { column, offset } => {
                        rhs -= a * offset;
                        entries.push((column, -a));
                    }
                    ColumnMap::Split { positive, negative } => {
                        entries.push((positive, a));
                        entries.push((negative, -a));
                    }
                }
            }

            if entries.is_empty() {
                // 0 (op) rhs
                let slack = eps * rhs.abs().max(1.0);
                let holds = match matrix_row.op {
                    ConstraintOp::LessEqual => rhs >= -slack,
                    ConstraintOp::Equal => rhs.abs() <= slack,
                    ConstraintOp::GreaterEqual => rhs <= slack,
                };
                if !holds {
                    return None;
                }
                continue;
            }

            rows.push(StandardRow {
                entries,
                op: matrix_row.op,
                rhs,
            });
        }
        rows.extend(bound_rows);

        Some(StandardForm {
            columns,
            rows,
            structural,
        })
    }
}
