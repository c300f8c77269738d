//! 生產計劃模型建構與結果解讀
//!
//! 每個 (物料 i, 期間 t) 建立三個變數：
//! - `x_i_t` 產量（連續，≥ 0）
//! - `I_i_t` 期末庫存（連續，≥ 0）
//! - `y_i_t` 是否開工（二元）
//!
//! 約束：
//! - `inv_balance_i_t`：I[i,t-1] + x − I[i,t] = d（I[i,0] = 0）
//! - `prod_capacity_i_t`：x − M·y ≤ 0
//! - `warehouse_cap_t`：Σ_i I[i,t] ≤ W_t
//! - `setup_cover_i_t`（可選）：I[i,t-1] + d·y ≥ d

use chrono::Utc;
use plan_core::{ConstraintOp, LinearExpression, Model, ObjectiveSense, Solution, VariableId};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::{BigMRule, PlanConfig};
use crate::parameters::{ItemId, ParameterTable, PeriodId, PlanningParameters};
use crate::plan::{CostBreakdown, PlanEntry, ProductionPlan, WarehouseUsage};
use crate::{PlanError, Result};

/// 單一 (物料, 期間) 的三個變數
#[derive(Debug, Clone, PartialEq)]
pub struct PlanCell {
    pub item: ItemId,
    pub period: PeriodId,
    pub production: VariableId,
    pub inventory: VariableId,
    pub setup: VariableId,
}

/// 建好的模型與變數對照
#[derive(Debug, Clone)]
pub struct PlanModel {
    model: Model,
    cells: Vec<PlanCell>,
    index: HashMap<(ItemId, PeriodId), usize>,
}

impl PlanModel {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// 依物料、期間順序排列的變數對照
    pub fn cells(&self) -> &[PlanCell] {
        &self.cells
    }

    pub fn cell(&self, item: &ItemId, period: PeriodId) -> Option<&PlanCell> {
        self.index
            .get(&(item.clone(), period))
            .map(|&i| &self.cells[i])
    }
}

/// 生產計劃建構器
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    config: PlanConfig,
}

impl PlanBuilder {
    /// 創建新的建構器
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// 由計劃參數建立混合整數模型
    pub fn build(&self, params: &PlanningParameters) -> Result<PlanModel> {
        params.validate()?;
        self.config.validate()?;

        let mut model = Model::new("production_plan");
        let mut cells = Vec::with_capacity(params.items.len() * params.periods.len());
        let mut index = HashMap::new();

        // 變數：依物料、期間順序註冊，欄位順序可重現
        for item in &params.items {
            for &period in &params.periods {
                let production =
                    model.add_continuous(format!("x_{item}_{period}"), 0.0, f64::INFINITY)?;
                let inventory =
                    model.add_continuous(format!("I_{item}_{period}"), 0.0, f64::INFINITY)?;
                let setup = model.add_binary(format!("y_{item}_{period}"))?;

                index.insert((item.clone(), period), cells.len());
                cells.push(PlanCell {
                    item: item.clone(),
                    period,
                    production,
                    inventory,
                    setup,
                });
            }
        }

        let mut objective = LinearExpression::new();
        for cell in &cells {
            let (item, period) = (&cell.item, cell.period);
            let unit = cell_f64("production_cost", &params.production_cost, item, period)?;
            let setup = cell_f64("setup_cost", &params.setup_cost, item, period)?;
            let holding = cell_f64("holding_cost", &params.holding_cost, item, period)?;
            objective = objective
                .with_term(cell.production, unit)
                .with_term(cell.setup, setup)
                .with_term(cell.inventory, holding);
        }

        // 庫存平衡
        for item in &params.items {
            let mut previous: Option<VariableId> = None;
            for &period in &params.periods {
                let cell = &cells[index[&(item.clone(), period)]];
                let demand = cell_f64("demand", &params.demand, item, period)?;

                let mut balance = LinearExpression::from(cell.production)
                    - LinearExpression::from(cell.inventory);
                if let Some(prev) = previous {
                    balance = balance.with_term(prev, 1.0);
                }
                model.add_constraint(
                    balance,
                    ConstraintOp::Equal,
                    demand,
                    format!("inv_balance_{item}_{period}"),
                )?;
                previous = Some(cell.inventory);
            }
        }

        // 產能（開工才可生產）
        for item in &params.items {
            for (position, &period) in params.periods.iter().enumerate() {
                let cell = &cells[index[&(item.clone(), period)]];
                let big_m = self.big_m(params, item, period, position)?;
                model.add_constraint(
                    LinearExpression::from_terms([(cell.production, 1.0), (cell.setup, -big_m)], 0.0),
                    ConstraintOp::LessEqual,
                    0.0,
                    format!("prod_capacity_{item}_{period}"),
                )?;
            }
        }

        // 倉庫容量
        for &period in &params.periods {
            let stored: LinearExpression = params
                .items
                .iter()
                .map(|item| LinearExpression::from(cells[index[&(item.clone(), period)]].inventory))
                .sum();
            let capacity = decimal_to_f64(
                "warehouse_capacity",
                period.to_string(),
                params.warehouse_capacity_for(period)?,
            )?;
            model.add_constraint(
                stored,
                ConstraintOp::LessEqual,
                capacity,
                format!("warehouse_cap_{period}"),
            )?;
        }

        if self.config.setup_cover_cuts {
            self.add_setup_cover_cuts(&mut model, params, &cells, &index)?;
        }

        model.set_objective(objective, self.config.sense)?;

        tracing::info!(
            "建立生產計劃模型：物料 {} 個，期間 {} 個，變數 {} 個，約束 {} 條",
            params.items.len(),
            params.periods.len(),
            model.variable_count(),
            model.constraint_count()
        );

        Ok(PlanModel {
            model,
            cells,
            index,
        })
    }

    /// 不開工的期間，需求只能由上期庫存供應
    fn add_setup_cover_cuts(
        &self,
        model: &mut Model,
        params: &PlanningParameters,
        cells: &[PlanCell],
        index: &HashMap<(ItemId, PeriodId), usize>,
    ) -> Result<()> {
        for item in &params.items {
            let mut previous: Option<VariableId> = None;
            for &period in &params.periods {
                let cell = &cells[index[&(item.clone(), period)]];
                let demand = cell_f64("demand", &params.demand, item, period)?;

                if demand > 0.0 {
                    let mut cover = LinearExpression::term(cell.setup, demand);
                    if let Some(prev) = previous {
                        cover = cover.with_term(prev, 1.0);
                    }
                    model.add_constraint(
                        cover,
                        ConstraintOp::GreaterEqual,
                        demand,
                        format!("setup_cover_{item}_{period}"),
                    )?;
                }
                previous = Some(cell.inventory);
            }
        }
        Ok(())
    }

    /// 開工大 M 值；指定值會被最大產量截斷，確保產能限制仍成立
    ///
    /// 剩餘需求截斷只在最小化時使用：超過剩餘需求的產量只會增加成本，
    /// 最大化時卻可能是最優解的一部分。
    fn big_m(
        &self,
        params: &PlanningParameters,
        item: &ItemId,
        period: PeriodId,
        position: usize,
    ) -> Result<f64> {
        let capacity = PlanningParameters::cell("max_production", &params.max_production, item, period)?;

        let value = match &params.setup_big_m {
            Some(table) => PlanningParameters::cell("setup_big_m", table, item, period)?.min(capacity),
            None => match (self.config.big_m_rule, self.config.sense) {
                (BigMRule::CapacityOrRemainingDemand, ObjectiveSense::Minimize) => {
                    capacity.min(params.remaining_demand(item, position))
                }
                _ => capacity,
            },
        };

        decimal_to_f64("setup_big_m", format!("{item}/{period}"), value)
    }

    /// 將求解結果轉為生產計劃
    pub fn interpret(
        &self,
        plan_model: &PlanModel,
        params: &PlanningParameters,
        solution: &Solution,
    ) -> Result<ProductionPlan> {
        let objective_value = solution
            .objective_value()
            .ok_or(PlanError::NoSolution(solution.status()))?;
        let scale = self.config.quantity_scale;
        let model = plan_model.model();

        let read = |variable: VariableId| -> Result<Decimal> {
            let value = solution.value(variable).ok_or_else(|| {
                let name = model
                    .variable(variable)
                    .map(|v| v.name.clone())
                    .unwrap_or_else(|| format!("#{}", variable.index()));
                PlanError::UnknownVariable(name)
            })?;
            Ok(quantity(value, scale))
        };

        let mut entries = Vec::with_capacity(plan_model.cells().len());
        let mut costs = CostBreakdown::default();

        for cell in plan_model.cells() {
            let (item, period) = (&cell.item, cell.period);
            let production = read(cell.production)?;
            let inventory = read(cell.inventory)?;
            let setup = read(cell.setup)? > Decimal::new(5, 1);

            let unit_cost = PlanningParameters::cell("production_cost", &params.production_cost, item, period)?;
            let setup_cost = PlanningParameters::cell("setup_cost", &params.setup_cost, item, period)?;
            let holding_cost = PlanningParameters::cell("holding_cost", &params.holding_cost, item, period)?;

            costs.production += unit_cost * production;
            if setup {
                costs.setup += setup_cost;
            }
            costs.holding += holding_cost * inventory;

            entries.push(PlanEntry {
                item: item.clone(),
                period,
                production,
                inventory,
                setup,
                demand: PlanningParameters::cell("demand", &params.demand, item, period)?,
            });
        }
        costs.total = costs.production + costs.setup + costs.holding;

        let mut warehouse_usage = Vec::with_capacity(params.periods.len());
        for &period in &params.periods {
            let used = entries
                .iter()
                .filter(|e| e.period == period)
                .map(|e| e.inventory)
                .sum();
            warehouse_usage.push(WarehouseUsage {
                period,
                used,
                capacity: params.warehouse_capacity_for(period)?,
            });
        }

        Ok(ProductionPlan {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            status: solution.status(),
            objective_value,
            entries,
            costs,
            warehouse_usage,
        })
    }
}

fn cell_f64(
    table_name: &'static str,
    table: &ParameterTable<Decimal>,
    item: &ItemId,
    period: PeriodId,
) -> Result<f64> {
    let value = PlanningParameters::cell(table_name, table, item, period)?;
    decimal_to_f64(table_name, format!("{item}/{period}"), value)
}

fn decimal_to_f64(table: &'static str, key: String, value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or(PlanError::InvalidParameter { table, key, value })
}

/// 浮點解轉為指定小數位數的數量；求解殘差造成的微小負值歸零
fn quantity(value: f64, scale: u32) -> Decimal {
    let rounded = Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp(scale);
    if rounded.is_sign_negative() {
        Decimal::ZERO
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{SolveStatus, VariableKind};

    fn two_by_two() -> PlanningParameters {
        let items = vec![ItemId::new("item1"), ItemId::new("item2")];
        let periods = PeriodId::horizon(2);
        let fill = |v: i64| ParameterTable::from_fn(&items, &periods, |_, _, _| Decimal::from(v));

        let mut params = PlanningParameters::new(items.clone(), periods.clone())
            .with_uniform_warehouse_capacity(Decimal::from(50));
        params.production_cost = fill(10);
        params.setup_cost = fill(40);
        params.holding_cost = fill(1);
        params.demand = ParameterTable::from_fn(&items, &periods, |i, _, p| {
            Decimal::from(20 + 10 * i as i64 + p.number() as i64)
        });
        params.max_production = fill(100);
        params
    }

    #[test]
    fn test_variables_and_labels() {
        let params = two_by_two();
        let plan_model = PlanBuilder::default().build(&params).unwrap();
        let model = plan_model.model();

        assert_eq!(model.variable_count(), 12);
        // 平衡 4 + 產能 4 + 倉庫 2 + 覆蓋 4
        assert_eq!(model.constraint_count(), 14);
        assert_eq!(model.sense(), ObjectiveSense::Minimize);

        let cell = plan_model.cell(&ItemId::new("item2"), PeriodId(1)).unwrap();
        assert_eq!(model.variable(cell.production).unwrap().name, "x_item2_1");
        assert_eq!(model.variable(cell.inventory).unwrap().name, "I_item2_1");
        assert_eq!(model.variable(cell.setup).unwrap().kind, VariableKind::Binary);

        let labels: Vec<&str> = model.constraints().iter().map(|c| c.label.as_str()).collect();
        for label in [
            "inv_balance_item1_1",
            "inv_balance_item2_2",
            "prod_capacity_item1_2",
            "warehouse_cap_1",
            "warehouse_cap_2",
            "setup_cover_item2_2",
        ] {
            assert!(labels.contains(&label), "missing {label}");
        }
    }

    #[test]
    fn test_balance_row_links_previous_inventory() {
        let params = two_by_two();
        let plan_model = PlanBuilder::default().build(&params).unwrap();
        let model = plan_model.model();

        let first = plan_model.cell(&ItemId::new("item1"), PeriodId(1)).unwrap();
        let second = plan_model.cell(&ItemId::new("item1"), PeriodId(2)).unwrap();
        let row = model
            .constraints()
            .iter()
            .find(|c| c.label == "inv_balance_item1_2")
            .unwrap();

        assert_eq!(row.op, ConstraintOp::Equal);
        assert_eq!(row.rhs, 22.0);
        assert_eq!(row.expression.coefficient(first.inventory), 1.0);
        assert_eq!(row.expression.coefficient(second.production), 1.0);
        assert_eq!(row.expression.coefficient(second.inventory), -1.0);
    }

    #[test]
    fn test_big_m_rules() {
        let params = two_by_two();
        let capacity_row = |config: PlanConfig, label: &str| {
            let plan_model = PlanBuilder::new(config).build(&params).unwrap();
            let model = plan_model.model().clone();
            let cell = plan_model.cell(&ItemId::new("item1"), PeriodId(1)).unwrap().clone();
            let row = model
                .constraints()
                .iter()
                .find(|c| c.label == label)
                .unwrap()
                .clone();
            row.expression.coefficient(cell.setup)
        };

        // item1 剩餘需求：21 + 22
        assert_eq!(
            capacity_row(PlanConfig::default(), "prod_capacity_item1_1"),
            -43.0
        );
        assert_eq!(
            capacity_row(PlanConfig::plain_formulation(), "prod_capacity_item1_1"),
            -100.0
        );
        assert_eq!(
            capacity_row(
                PlanConfig::default().with_sense(ObjectiveSense::Maximize),
                "prod_capacity_item1_1"
            ),
            -100.0
        );
    }

    #[test]
    fn test_explicit_big_m_is_capped_by_capacity() {
        let params = two_by_two();
        let big_m = ParameterTable::from_fn(&params.items, &params.periods, |i, _, _| {
            Decimal::from(if i == 0 { 500 } else { 30 })
        });
        let params = params.with_setup_big_m(big_m);

        let plan_model = PlanBuilder::default().build(&params).unwrap();
        let model = plan_model.model();
        let coefficient = |item: &str, label: &str| {
            let cell = plan_model.cell(&ItemId::new(item), PeriodId(1)).unwrap();
            model
                .constraints()
                .iter()
                .find(|c| c.label == label)
                .map(|c| c.expression.coefficient(cell.setup))
                .unwrap()
        };

        assert_eq!(coefficient("item1", "prod_capacity_item1_1"), -100.0);
        assert_eq!(coefficient("item2", "prod_capacity_item2_1"), -30.0);
    }

    #[test]
    fn test_zero_demand_skips_cover_row() {
        let mut params = two_by_two();
        params.demand.insert(ItemId::new("item1"), PeriodId(2), Decimal::ZERO);

        let plan_model = PlanBuilder::default().build(&params).unwrap();
        let labels: Vec<&str> = plan_model
            .model()
            .constraints()
            .iter()
            .map(|c| c.label.as_str())
            .collect();

        assert!(!labels.contains(&"setup_cover_item1_2"));
        assert!(labels.contains(&"setup_cover_item1_1"));
    }

    #[test]
    fn test_build_rejects_incomplete_parameters() {
        let mut params = two_by_two();
        params.setup_cost = ParameterTable::new();

        assert!(matches!(
            PlanBuilder::default().build(&params),
            Err(PlanError::MissingParameter { table: "setup_cost", .. })
        ));
    }

    #[test]
    fn test_interpret_lot_for_lot_solution() {
        let params = two_by_two();
        let builder = PlanBuilder::default();
        let plan_model = builder.build(&params).unwrap();

        // 每期生產當期需求
        let mut values = vec![0.0; plan_model.model().variable_count()];
        for cell in plan_model.cells() {
            let demand = params.demand.get(&cell.item, cell.period).unwrap();
            values[cell.production.index()] = demand.to_f64().unwrap();
            values[cell.setup.index()] = 1.0;
        }
        let objective = plan_model.model().objective_value(&values);
        let solution = Solution::with_values(SolveStatus::Optimal, values, objective);

        let plan = builder.interpret(&plan_model, &params, &solution).unwrap();

        // 產量 21 + 22 + 31 + 32 = 106
        assert_eq!(plan.costs.production, Decimal::from(1060));
        assert_eq!(plan.costs.setup, Decimal::from(160));
        assert_eq!(plan.costs.holding, Decimal::ZERO);
        assert_eq!(plan.costs.total, Decimal::from(1220));
        assert_eq!(plan.entries.len(), 4);
        assert!(plan.entries.iter().all(|e| e.setup));
        assert!(plan.inventory_balance_violations(Decimal::new(1, 6)).is_empty());
        assert_eq!(plan.warehouse_usage[0].used, Decimal::ZERO);
        assert_eq!(plan.warehouse_usage[0].capacity, Decimal::from(50));
    }

    #[test]
    fn test_interpret_requires_values() {
        let params = two_by_two();
        let builder = PlanBuilder::default();
        let plan_model = builder.build(&params).unwrap();
        let solution = Solution::without_values(SolveStatus::Infeasible);

        assert!(matches!(
            builder.interpret(&plan_model, &params, &solution),
            Err(PlanError::NoSolution(SolveStatus::Infeasible))
        ));

        // 有目標值但缺少變數值
        let truncated = Solution::with_values(SolveStatus::Optimal, vec![0.0; 2], 0.0);
        assert!(matches!(
            builder.interpret(&plan_model, &params, &truncated),
            Err(PlanError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_quantity_rounding() {
        assert_eq!(quantity(12.000000001, 4), Decimal::from(12));
        assert_eq!(quantity(-1e-12, 4), Decimal::ZERO);
        assert_eq!(quantity(3.14159, 2), Decimal::new(314, 2));
    }
}
