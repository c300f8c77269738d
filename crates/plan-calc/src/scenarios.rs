//! 內建計劃情境
//!
//! 物料索引 i 由 0 起算，期號 t 由 1 起算；物料名稱為 `item{i+1}`。

use rust_decimal::Decimal;

use crate::parameters::{ItemId, ParameterTable, PeriodId, PlanningParameters};

/// 參考情境：6 個物料 × 5 期
///
/// - 生產成本 10 + (i+t) mod 5
/// - 換線成本 100 + 20i
/// - 持有成本 2 + (i+t) mod 3
/// - 需求 20 + 2(i+t)
/// - 最大產量 100，倉庫容量 400
pub fn reference_instance() -> PlanningParameters {
    build(6, 5, Decimal::from(400), |i, t| {
        let k = i + t;
        CellValues {
            production_cost: 10 + k % 5,
            setup_cost: 100 + 20 * i,
            holding_cost: 2 + k % 3,
            demand: 20 + 2 * k,
            max_production: 100,
        }
    })
}

/// 表單預設值情境（任意規模）
///
/// - 生產成本 10 + 5i，換線成本 50 + 10i，持有成本 5 + 2i
/// - 需求 20 + 5(t−1)，最大產量 100，倉庫容量 200
pub fn form_defaults(n_items: u32, n_periods: u32) -> PlanningParameters {
    build(n_items, n_periods, Decimal::from(200), |i, t| CellValues {
        production_cost: 10 + 5 * i,
        setup_cost: 50 + 10 * i,
        holding_cost: 5 + 2 * i,
        demand: 20 + 5 * (t - 1),
        max_production: 100,
    })
}

struct CellValues {
    production_cost: u32,
    setup_cost: u32,
    holding_cost: u32,
    demand: u32,
    max_production: u32,
}

fn build<F>(n_items: u32, n_periods: u32, warehouse: Decimal, cell: F) -> PlanningParameters
where
    F: Fn(u32, u32) -> CellValues,
{
    let items: Vec<ItemId> = (1..=n_items).map(|i| ItemId::new(format!("item{i}"))).collect();
    let periods = PeriodId::horizon(n_periods);

    let table = |pick: fn(&CellValues) -> u32| {
        ParameterTable::from_fn(&items, &periods, |i, _, period| {
            Decimal::from(pick(&cell(i as u32, period.number())))
        })
    };

    let mut params =
        PlanningParameters::new(items.clone(), periods.clone()).with_uniform_warehouse_capacity(warehouse);
    params.production_cost = table(|c| c.production_cost);
    params.setup_cost = table(|c| c.setup_cost);
    params.holding_cost = table(|c| c.holding_cost);
    params.demand = table(|c| c.demand);
    params.max_production = table(|c| c.max_production);
    params
}
