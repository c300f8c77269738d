//! 多物料生產計劃示例：6 個物料 × 5 期，共用倉庫容量

use plan_calc::{scenarios, ProductionPlanner};
use rust_decimal::Decimal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== 多物料生產計劃示例 ===\n");

    let params = scenarios::reference_instance();
    println!(
        "物料 {} 個，計劃期間 {} 期",
        params.items.len(),
        params.periods.len()
    );
    for item in &params.items {
        println!("  - 物料: {}, 總需求: {}", item, params.total_demand(item));
    }

    let result = ProductionPlanner::default().plan(&params)?;

    println!("\n求解狀態: {}", result.status);
    let Some(plan) = &result.plan else {
        println!("沒有可行的生產計劃");
        return Ok(());
    };

    println!("\n生產計劃:");
    println!(
        "  {:<8} {:>4} {:>10} {:>10} {:>10} {:>6}",
        "物料", "期", "需求", "產量", "期末庫存", "開工"
    );
    for entry in &plan.entries {
        println!(
            "  {:<8} {:>4} {:>10} {:>10} {:>10} {:>6}",
            entry.item.as_str(),
            entry.period.number(),
            entry.demand,
            entry.production.normalize(),
            entry.inventory.normalize(),
            if entry.setup { "是" } else { "-" }
        );
    }

    println!("\n倉庫使用量:");
    for usage in &plan.warehouse_usage {
        let utilization = usage
            .utilization()
            .map(|u| (u * Decimal::from(100)).round_dp(1))
            .unwrap_or_default();
        println!(
            "  第 {} 期: {} / {} ({}%)",
            usage.period,
            usage.used.normalize(),
            usage.capacity,
            utilization
        );
    }

    println!("\n成本明細:");
    println!("  生產成本: {}", plan.costs.production.normalize());
    println!("  換線成本: {}", plan.costs.setup.normalize());
    println!("  持有成本: {}", plan.costs.holding.normalize());
    println!("  總成本:   {}", plan.costs.total.normalize());

    let stats = &result.report.statistics;
    println!(
        "\n搜尋節點 {} 個，單純形迭代 {} 次，耗時 {:?} ms",
        stats.nodes_explored, stats.simplex_iterations, result.calculation_time_ms
    );

    Ok(())
}
