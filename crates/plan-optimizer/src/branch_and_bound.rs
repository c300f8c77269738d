//! 深度優先分支定界
//!
//! 每個節點以單純形法求解鬆弛問題，依下列規則處理：
//! - 不可行（含數值失敗）→ PrunedInfeasible
//! - 鬆弛目標不優於現任解 → PrunedBound
//! - 所有整數變數與最近整數的距離都在 ε 內 → 取整後重新檢查約束；
//!   仍可行才成為現任解（SolvedInteger），否則在殘餘的分數變數上分支
//! - 否則選擇分數部分最接近 0.5 的變數分支，先推入下分支再推入上分支

use plan_core::{Model, ObjectiveSense, Solution, SolveStatus, SolverConfig, VariableId};
use std::time::Instant;

use crate::bounds::BoundSet;
use crate::node::{NodeState, SearchNode};
use crate::report::{SearchStatistics, SolveReport, SolverWarning};
use crate::simplex::{RelaxationStatus, SimplexSolver};

/// 分支定界引擎
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundEngine {
    config: SolverConfig,
    simplex: SimplexSolver,
}

struct Incumbent {
    values: Vec<f64>,
    objective: f64,
}

impl BranchAndBoundEngine {
    /// 創建新的分支定界引擎
    pub fn new(config: SolverConfig) -> Self {
        Self {
            simplex: SimplexSolver::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// 求解混合整數模型
    ///
    /// 不含整數變數的模型在根節點即結束。
    pub fn solve(&self, model: &Model) -> SolveReport {
        let start_time = Instant::now();
        let integer_variables = model.integer_variables();

        tracing::info!(
            "開始分支定界求解：變數 {} 個（整數 {} 個），約束 {} 條",
            model.variable_count(),
            integer_variables.len(),
            model.constraint_count()
        );

        let mut statistics = SearchStatistics::default();
        let mut warnings = Vec::new();
        let mut incumbent: Option<Incumbent> = None;
        let mut stack = vec![SearchNode::root(BoundSet::from_model(model))];
        let mut next_id = 1;
        let mut budget_exhausted = false;

        while !stack.is_empty() {
            if self.budget_exhausted(&statistics, start_time) {
                budget_exhausted = true;
                let message = format!(
                    "搜尋預算耗盡：已求解 {} 個節點，尚有 {} 個節點未處理",
                    statistics.nodes_explored,
                    stack.len()
                );
                tracing::warn!("{}", message);
                if let Some(next) = stack.last() {
                    warnings.push(SolverWarning::info(next.id, next.depth, message));
                }
                break;
            }

            let Some(mut node) = stack.pop() else {
                break;
            };
            statistics.nodes_explored += 1;
            statistics.max_depth = statistics.max_depth.max(node.depth);

            if let (Some(parent), Some(decision)) = (node.parent, node.decision) {
                tracing::debug!(
                    "處理節點 {}（深度 {}，父節點 {}，{}）",
                    node.id,
                    node.depth,
                    parent,
                    decision
                );
            }

            // 上分支的新下界可能超過非整數上界
            if node.bounds.is_contradictory(self.config.tolerance) {
                node.state = NodeState::PrunedInfeasible;
                statistics.record(node.state);
                continue;
            }

            let relaxation = self.simplex.solve_relaxation(model, &node.bounds);
            statistics.simplex_iterations += relaxation.iterations;

            match relaxation.status {
                RelaxationStatus::Infeasible => {
                    node.state = NodeState::PrunedInfeasible;
                }
                RelaxationStatus::IterationLimit => {
                    node.state = NodeState::PrunedInfeasible;
                    statistics.numerical_failures += 1;
                    let bounds = node.bounds.changes_from(model);
                    tracing::warn!(
                        "節點 {}（深度 {}）鬆弛求解數值失敗，收緊的上下界 {} 個",
                        node.id,
                        node.depth,
                        bounds.len()
                    );
                    warnings.push(
                        SolverWarning::error(
                            node.id,
                            node.depth,
                            format!(
                                "單純形迭代超過上限 {}，節點視為不可行",
                                self.config.max_simplex_iterations
                            ),
                        )
                        .with_bounds(bounds),
                    );
                }
                RelaxationStatus::Unbounded if node.depth == 0 => {
                    tracing::info!("根節點鬆弛無界");
                    statistics.record(NodeState::PrunedInfeasible);
                    statistics.elapsed_ms = start_time.elapsed().as_millis();
                    return SolveReport {
                        solution: Solution::without_values(SolveStatus::Unbounded),
                        statistics,
                        warnings,
                    };
                }
                RelaxationStatus::Unbounded => {
                    // 根節點有界時子節點不可能無界
                    node.state = NodeState::PrunedInfeasible;
                    warnings.push(
                        SolverWarning::warning(
                            node.id,
                            node.depth,
                            "子節點鬆弛無界，已捨棄".to_string(),
                        )
                        .with_bounds(node.bounds.changes_from(model)),
                    );
                }
                RelaxationStatus::Optimal => {
                    let objective = relaxation.objective.unwrap_or_default();
                    let dominated = incumbent.as_ref().is_some_and(|best| {
                        !improves(model.sense(), objective, best.objective, self.config.tolerance)
                    });

                    if dominated {
                        node.state = NodeState::PrunedBound;
                    } else {
                        let branching = match self.select_branching_variable(
                            &integer_variables,
                            &relaxation.values,
                            self.config.tolerance,
                        ) {
                            Some(choice) => Some(choice),
                            None => {
                                let values =
                                    snap_integers(&integer_variables, relaxation.values.clone());
                                let violations = model
                                    .check_feasibility(&values, self.config.feasibility_tolerance);

                                if violations.is_empty() {
                                    node.state = NodeState::SolvedInteger;
                                    let objective = model.objective_value(&values);
                                    tracing::debug!(
                                        "節點 {}（深度 {}）找到整數解，目標值 {}",
                                        node.id,
                                        node.depth,
                                        objective
                                    );
                                    incumbent = Some(Incumbent { values, objective });
                                    statistics.incumbent_updates += 1;
                                    None
                                } else {
                                    // 取整破壞了約束（大係數放大了 ε 以內的分數）：改在殘餘分數上分支
                                    tracing::debug!(
                                        "節點 {}（深度 {}）取整後違反 {} 項約束",
                                        node.id,
                                        node.depth,
                                        violations.len()
                                    );
                                    let residual = self.select_branching_variable(
                                        &integer_variables,
                                        &relaxation.values,
                                        0.0,
                                    );
                                    if residual.is_none() {
                                        node.state = NodeState::PrunedInfeasible;
                                        statistics.numerical_failures += 1;
                                        tracing::warn!(
                                            "節點 {}（深度 {}）的鬆弛解本身違反約束",
                                            node.id,
                                            node.depth
                                        );
                                        warnings.push(
                                            SolverWarning::error(
                                                node.id,
                                                node.depth,
                                                format!("鬆弛解超出可行性容差: {:?}", violations),
                                            )
                                            .with_bounds(node.bounds.changes_from(model)),
                                        );
                                    }
                                    residual
                                }
                            }
                        };

                        if let Some((variable, value)) = branching {
                            node.state = NodeState::SolvedFeasible;
                            let (down, up) = node.branch(variable, value, next_id);
                            next_id += 2;
                            tracing::debug!(
                                "節點 {}（深度 {}）在變數 #{} = {:.6} 上分支，鬆弛目標 {}",
                                node.id,
                                node.depth,
                                variable.index(),
                                value,
                                objective
                            );
                            // 上分支最後推入，最先處理
                            stack.push(down);
                            stack.push(up);
                        }
                    }
                }
            }

            statistics.record(node.state);
        }

        statistics.elapsed_ms = start_time.elapsed().as_millis();

        let solution = match (incumbent, budget_exhausted) {
            (Some(best), true) => {
                Solution::with_values(SolveStatus::BestKnownOnBudget, best.values, best.objective)
            }
            (None, true) => Solution::without_values(SolveStatus::BestKnownOnBudget),
            (Some(best), false) => {
                Solution::with_values(SolveStatus::Optimal, best.values, best.objective)
            }
            (None, false) if statistics.numerical_failures > 0 => {
                Solution::without_values(SolveStatus::NumericalFailure)
            }
            (None, false) => Solution::without_values(SolveStatus::Infeasible),
        };

        tracing::info!(
            "分支定界完成：狀態 {}，節點 {} 個，單純形迭代 {} 次，耗時 {} ms",
            solution.status(),
            statistics.nodes_explored,
            statistics.simplex_iterations,
            statistics.elapsed_ms
        );

        SolveReport {
            solution,
            statistics,
            warnings,
        }
    }

    fn budget_exhausted(&self, statistics: &SearchStatistics, start_time: Instant) -> bool {
        if !self.config.has_budget() {
            return false;
        }
        if let Some(limit) = self.config.node_limit {
            if statistics.nodes_explored >= limit {
                return true;
            }
        }
        if let Some(limit) = self.config.time_limit() {
            if start_time.elapsed() >= limit {
                return true;
            }
        }
        false
    }

    /// 分數部分最接近 0.5 的整數變數（平手取最小索引）
    ///
    /// 與最近整數的距離不超過 `threshold` 的變數視為整數；全部為整數時回傳 None。
    fn select_branching_variable(
        &self,
        integer_variables: &[VariableId],
        values: &[f64],
        threshold: f64,
    ) -> Option<(VariableId, f64)> {
        let mut best: Option<(VariableId, f64)> = None;
        let mut best_score = 0.0;

        for &variable in integer_variables {
            let value = values[variable.index()];
            let fraction = value - value.floor();
            let distance = fraction.min(1.0 - fraction);
            if distance <= threshold {
                continue;
            }
            if best.is_none() || distance > best_score + self.config.tolerance {
                best = Some((variable, value));
                best_score = distance;
            }
        }

        best
    }
}

/// `candidate` 是否嚴格優於 `incumbent`（相對容差）
fn improves(sense: ObjectiveSense, candidate: f64, incumbent: f64, tolerance: f64) -> bool {
    let margin = tolerance * incumbent.abs().max(1.0);
    match sense {
        ObjectiveSense::Minimize => candidate < incumbent - margin,
        ObjectiveSense::Maximize => candidate > incumbent + margin,
    }
}

fn snap_integers(integer_variables: &[VariableId], mut values: Vec<f64>) -> Vec<f64> {
    for variable in integer_variables {
        let slot = &mut values[variable.index()];
        *slot = slot.round();
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::WarningSeverity;
    use plan_core::{ConstraintOp, LinearExpression, VariableKind};
    use rstest::rstest;
    use std::time::Duration;

    fn expr(terms: &[(VariableId, f64)]) -> LinearExpression {
        LinearExpression::from_terms(terms.iter().copied(), 0.0)
    }

    /// max 5a + 4b + 3c，三條資源限制，a、b、c 為二元變數；最優為 a = b = 1，目標 9
    fn knapsack() -> Model {
        let mut model = Model::new("knapsack");
        let a = model.add_binary("a").unwrap();
        let b = model.add_binary("b").unwrap();
        let c = model.add_binary("c").unwrap();
        for (label, coefs, rhs) in [
            ("r1", [2.0, 3.0, 1.0], 5.0),
            ("r2", [4.0, 1.0, 2.0], 11.0),
            ("r3", [3.0, 4.0, 2.0], 8.0),
        ] {
            model
                .add_constraint(
                    expr(&[(a, coefs[0]), (b, coefs[1]), (c, coefs[2])]),
                    ConstraintOp::LessEqual,
                    rhs,
                    label,
                )
                .unwrap();
        }
        model
            .set_objective(expr(&[(a, 5.0), (b, 4.0), (c, 3.0)]), ObjectiveSense::Maximize)
            .unwrap();
        model
    }

    /// min 10x + 50y  s.t.  x ≤ 100y,  x ≥ 20
    fn fixed_charge() -> (Model, VariableId, VariableId) {
        let mut model = Model::new("fixed_charge");
        let x = model.add_continuous("x", 0.0, f64::INFINITY).unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint(expr(&[(x, 1.0), (y, -100.0)]), ConstraintOp::LessEqual, 0.0, "cap")
            .unwrap();
        model
            .add_constraint(expr(&[(x, 1.0)]), ConstraintOp::GreaterEqual, 20.0, "demand")
            .unwrap();
        model
            .set_objective(expr(&[(x, 10.0), (y, 50.0)]), ObjectiveSense::Minimize)
            .unwrap();
        (model, x, y)
    }

    #[test]
    fn test_knapsack_optimum() {
        let model = knapsack();
        let report = BranchAndBoundEngine::default().solve(&model);

        assert_eq!(report.status(), SolveStatus::Optimal);
        assert_eq!(report.solution.values(), &[1.0, 1.0, 0.0]);
        assert!((report.objective_value().unwrap() - 9.0).abs() < 1e-9);
        assert!(report.statistics.nodes_explored > 1);
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_fixed_charge_setup_is_integral() {
        let (model, x, y) = fixed_charge();
        let report = BranchAndBoundEngine::default().solve(&model);

        assert!(report.is_optimal());
        assert_eq!(report.value(y), Some(1.0));
        assert!((report.value(x).unwrap() - 20.0).abs() < 1e-6);
        assert!((report.objective_value().unwrap() - 250.0).abs() < 1e-6);
        assert!(model.check_feasibility(report.solution.values(), 1e-6).is_empty());
    }

    #[test]
    fn test_general_integer_variables() {
        // max x + y  s.t.  2x + 2y ≤ 7，鬆弛最優 3.5
        let mut model = Model::new("general");
        let x = model
            .add_variable("x", VariableKind::Integer, 0.0, f64::INFINITY)
            .unwrap();
        let y = model
            .add_variable("y", VariableKind::Integer, 0.0, f64::INFINITY)
            .unwrap();
        model
            .add_constraint(expr(&[(x, 2.0), (y, 2.0)]), ConstraintOp::LessEqual, 7.0, "r")
            .unwrap();
        model
            .set_objective(expr(&[(x, 1.0), (y, 1.0)]), ObjectiveSense::Maximize)
            .unwrap();

        let report = BranchAndBoundEngine::default().solve(&model);

        assert!(report.is_optimal());
        assert!((report.objective_value().unwrap() - 3.0).abs() < 1e-9);
        for value in report.solution.values() {
            assert_eq!(value.fract(), 0.0);
        }
    }

    #[test]
    fn test_integer_infeasible_despite_feasible_relaxation() {
        // 2n = 1 沒有整數解
        let mut model = Model::new("parity");
        let n = model
            .add_variable("n", VariableKind::Integer, 0.0, 5.0)
            .unwrap();
        model
            .add_constraint(expr(&[(n, 2.0)]), ConstraintOp::Equal, 1.0, "odd")
            .unwrap();

        let report = BranchAndBoundEngine::default().solve(&model);

        assert_eq!(report.status(), SolveStatus::Infeasible);
        assert_eq!(report.statistics.nodes_explored, 3);
        assert_eq!(report.statistics.nodes_pruned_infeasible, 2);
    }

    #[test]
    fn test_unbounded_root() {
        let mut model = Model::new("unbounded");
        let n = model
            .add_variable("n", VariableKind::Integer, 0.0, f64::INFINITY)
            .unwrap();
        model
            .set_objective(LinearExpression::from(n), ObjectiveSense::Maximize)
            .unwrap();

        let report = BranchAndBoundEngine::default().solve(&model);

        assert_eq!(report.status(), SolveStatus::Unbounded);
        assert_eq!(report.objective_value(), None);
    }

    #[test]
    fn test_continuous_model_solves_at_root() {
        let mut model = Model::new("lp");
        let x = model.add_continuous("x", 0.0, 5.0).unwrap();
        model
            .set_objective(LinearExpression::from(x), ObjectiveSense::Maximize)
            .unwrap();

        let report = BranchAndBoundEngine::default().solve(&model);

        assert!(report.is_optimal());
        assert_eq!(report.value(x), Some(5.0));
        assert_eq!(report.statistics.nodes_explored, 1);
        assert_eq!(report.statistics.nodes_integer, 1);
    }

    #[test]
    fn test_node_budget_reports_best_known() {
        let model = knapsack();
        let engine = BranchAndBoundEngine::new(SolverConfig::default().with_node_limit(1));

        let report = engine.solve(&model);

        assert_eq!(report.status(), SolveStatus::BestKnownOnBudget);
        assert_eq!(report.statistics.nodes_explored, 1);
        // 根節點為分數解，尚無現任解
        assert_eq!(report.objective_value(), None);
    }

    #[test]
    fn test_numerical_failure_is_surfaced() {
        let model = knapsack();
        let engine =
            BranchAndBoundEngine::new(SolverConfig::default().with_max_simplex_iterations(1));

        let report = engine.solve(&model);

        assert_eq!(report.status(), SolveStatus::NumericalFailure);
        assert_eq!(report.statistics.numerical_failures, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].severity, WarningSeverity::Error);
        assert_eq!(report.warnings[0].node_id, 0);
    }

    #[test]
    fn test_repeated_solves_are_identical() {
        let model = knapsack();
        let engine = BranchAndBoundEngine::default();

        let first = engine.solve(&model);
        let second = engine.solve(&model);

        assert_eq!(first.solution, second.solution);
        assert_eq!(first.statistics.nodes_explored, second.statistics.nodes_explored);
        assert_eq!(
            first.statistics.simplex_iterations,
            second.statistics.simplex_iterations
        );
    }

    #[test]
    fn test_branching_prefers_most_fractional_then_lowest_index() {
        let engine = BranchAndBoundEngine::default();
        let mut model = Model::new("select");
        let ids: Vec<VariableId> = (0..4)
            .map(|i| model.add_binary(format!("y{i}")).unwrap())
            .collect();

        let picked = engine.select_branching_variable(&ids, &[0.0, 0.3, 0.7, 0.45], 1e-9);
        assert_eq!(picked.map(|(v, _)| v), Some(ids[3]));

        // 0.3 與 0.7 同樣距離 0.5，取索引較小者
        let picked = engine.select_branching_variable(&ids, &[1.0, 0.3, 0.7, 0.0], 1e-9);
        assert_eq!(picked.map(|(v, _)| v), Some(ids[1]));

        let nearly_integral = [1.0, 0.0, 1.0 - 1e-11, 0.0];
        assert_eq!(engine.select_branching_variable(&ids, &nearly_integral, 1e-9), None);
        // 門檻為 0 時任何殘餘分數都會被選中
        let picked = engine.select_branching_variable(&ids, &nearly_integral, 0.0);
        assert_eq!(picked.map(|(v, _)| v), Some(ids[2]));

        // ε 以外的微小分數仍須分支
        let picked = engine.select_branching_variable(&ids, &[0.0, 5e-7, 0.0, 0.0], 1e-9);
        assert_eq!(picked.map(|(v, _)| v), Some(ids[1]));
    }

    /// min 100y − x  s.t.  x ≤ 5,  x − M·y ≤ 0；鬆弛解 y = 5/M
    fn large_link(big_m: f64) -> (Model, VariableId, VariableId) {
        let mut model = Model::new("large_link");
        let x = model.add_continuous("x", 0.0, 5.0).unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint(expr(&[(x, 1.0), (y, -big_m)]), ConstraintOp::LessEqual, 0.0, "link")
            .unwrap();
        model
            .set_objective(expr(&[(y, 100.0), (x, -1.0)]), ObjectiveSense::Minimize)
            .unwrap();
        (model, x, y)
    }

    #[rstest]
    // y = 5e-7 超過 ε，照常分支
    #[case(SolverConfig::default())]
    // y = 5e-7 落在 ε 內：取整後違反 link，須在殘餘分數上分支
    #[case(SolverConfig::default().with_tolerance(1e-6))]
    fn test_tiny_setup_fraction_is_not_rounded_away(#[case] config: SolverConfig) {
        let (model, x, y) = large_link(1e7);
        let report = BranchAndBoundEngine::new(config).solve(&model);

        assert_eq!(report.status(), SolveStatus::Optimal);
        assert!(report.objective_value().unwrap().abs() < 1e-9);
        assert_eq!(report.value(y), Some(0.0));
        assert!(report.value(x).unwrap().abs() < 1e-9);
        assert!(model.check_feasibility(report.solution.values(), 1e-9).is_empty());
        assert_eq!(report.statistics.nodes_explored, 3);
        assert_eq!(report.statistics.numerical_failures, 0);
    }

    #[test]
    fn test_time_budget_reports_best_known() {
        let model = knapsack();
        let engine =
            BranchAndBoundEngine::new(SolverConfig::default().with_time_limit(Duration::ZERO));

        let report = engine.solve(&model);

        assert_eq!(report.status(), SolveStatus::BestKnownOnBudget);
        assert_eq!(report.statistics.nodes_explored, 0);
        assert_eq!(report.objective_value(), None);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].severity, WarningSeverity::Info);
    }

    #[test]
    fn test_contradictory_child_is_pruned_without_relaxation() {
        // n ≤ 2.5：上分支 n ≥ 3 與上界矛盾
        let mut model = Model::new("fractional_upper");
        let n = model
            .add_variable("n", VariableKind::Integer, 0.0, 2.5)
            .unwrap();
        model
            .set_objective(LinearExpression::from(n), ObjectiveSense::Maximize)
            .unwrap();

        let report = BranchAndBoundEngine::default().solve(&model);

        assert!(report.is_optimal());
        assert_eq!(report.value(n), Some(2.0));
        assert_eq!(report.statistics.nodes_explored, 3);
        assert_eq!(report.statistics.nodes_pruned_infeasible, 1);
    }

    #[test]
    fn test_improvement_is_direction_aware() {
        assert!(improves(ObjectiveSense::Minimize, 9.0, 10.0, 1e-9));
        assert!(!improves(ObjectiveSense::Minimize, 10.0, 10.0, 1e-9));
        assert!(improves(ObjectiveSense::Maximize, 11.0, 10.0, 1e-9));
        assert!(!improves(ObjectiveSense::Maximize, 9.0, 10.0, 1e-9));
    }
}
