//! 生產計劃模型

use chrono::{DateTime, Utc};
use plan_core::SolveStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parameters::{ItemId, PeriodId};

/// 單一 (物料, 期間) 的計劃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub item: ItemId,
    pub period: PeriodId,

    /// 產量
    pub production: Decimal,

    /// 期末庫存
    pub inventory: Decimal,

    /// 是否開工
    pub setup: bool,

    /// 需求量
    pub demand: Decimal,
}

/// 成本明細
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub production: Decimal,
    pub setup: Decimal,
    pub holding: Decimal,
    pub total: Decimal,
}

/// 各期倉庫使用量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseUsage {
    pub period: PeriodId,
    pub used: Decimal,
    pub capacity: Decimal,
}

impl WarehouseUsage {
    /// 使用率（容量為 0 時回傳 None）
    pub fn utilization(&self) -> Option<Decimal> {
        if self.capacity.is_zero() {
            None
        } else {
            Some(self.used / self.capacity)
        }
    }
}

/// 庫存平衡違反：I[t-1] + x − I[t] − d ≠ 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceViolation {
    pub item: ItemId,
    pub period: PeriodId,
    pub amount: Decimal,
}

/// 生產計劃（求解結果）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionPlan {
    /// 計劃ID
    pub id: Uuid,

    /// 產生時間
    pub generated_at: DateTime<Utc>,

    /// 求解狀態（Optimal 或 BestKnownOnBudget）
    pub status: SolveStatus,

    /// 求解器回報的目標值
    pub objective_value: f64,

    /// 依物料、期間排列的計劃
    pub entries: Vec<PlanEntry>,

    /// 成本明細
    pub costs: CostBreakdown,

    /// 各期倉庫使用量
    pub warehouse_usage: Vec<WarehouseUsage>,
}

impl ProductionPlan {
    pub fn entry(&self, item: &ItemId, period: PeriodId) -> Option<&PlanEntry> {
        self.entries
            .iter()
            .find(|e| &e.item == item && e.period == period)
    }

    /// 單一物料依期間排列的計劃
    pub fn entries_for<'a>(&'a self, item: &'a ItemId) -> impl Iterator<Item = &'a PlanEntry> + 'a {
        self.entries.iter().filter(move |e| &e.item == item)
    }

    /// 物料總產量
    pub fn total_production(&self, item: &ItemId) -> Decimal {
        self.entries_for(item).map(|e| e.production).sum()
    }

    /// 物料期末（最後一期）庫存
    pub fn ending_inventory(&self, item: &ItemId) -> Decimal {
        self.entries_for(item)
            .last()
            .map(|e| e.inventory)
            .unwrap_or_default()
    }

    /// 開工次數
    pub fn setup_count(&self) -> usize {
        self.entries.iter().filter(|e| e.setup).count()
    }

    /// 超過容差的庫存平衡違反
    pub fn inventory_balance_violations(&self, tolerance: Decimal) -> Vec<BalanceViolation> {
        let mut violations = Vec::new();
        let mut previous: Option<(&ItemId, Decimal)> = None;

        for entry in &self.entries {
            let opening = match previous {
                Some((item, inventory)) if item == &entry.item => inventory,
                _ => Decimal::ZERO,
            };
            let amount = opening + entry.production - entry.inventory - entry.demand;
            if amount.abs() > tolerance {
                violations.push(BalanceViolation {
                    item: entry.item.clone(),
                    period: entry.period,
                    amount,
                });
            }
            previous = Some((&entry.item, entry.inventory));
        }

        violations
    }

    /// 使用量超過容量的期間
    pub fn warehouse_overflows(&self, tolerance: Decimal) -> Vec<PeriodId> {
        self.warehouse_usage
            .iter()
            .filter(|u| u.used > u.capacity + tolerance)
            .map(|u| u.period)
            .collect()
    }
}
