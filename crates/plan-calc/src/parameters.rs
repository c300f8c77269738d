//! 物料、期間與計劃參數

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{PlanError, Result};

/// 物料ID
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// 計劃期間（期號，由 1 起算）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodId(pub u32);

impl PeriodId {
    pub fn number(self) -> u32 {
        self.0
    }

    /// 1..=count 的連續期間
    pub fn horizon(count: u32) -> Vec<PeriodId> {
        (1..=count).map(PeriodId).collect()
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 以 (物料, 期間) 為鍵的參數表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "V: Serialize",
    deserialize = "V: Deserialize<'de>"
))]
pub struct ParameterTable<V> {
    values: BTreeMap<ItemId, BTreeMap<PeriodId, V>>,
}

impl<V> Default for ParameterTable<V> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<V> ParameterTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以函數填滿所有 (物料, 期間)
    pub fn from_fn<F>(items: &[ItemId], periods: &[PeriodId], mut f: F) -> Self
    where
        F: FnMut(usize, &ItemId, PeriodId) -> V,
    {
        let mut table = Self::new();
        for (index, item) in items.iter().enumerate() {
            for &period in periods {
                let value = f(index, item, period);
                table.insert(item.clone(), period, value);
            }
        }
        table
    }

    /// 設置單格數值，回傳舊值
    pub fn insert(&mut self, item: ItemId, period: PeriodId, value: V) -> Option<V> {
        self.values.entry(item).or_default().insert(period, value)
    }

    /// 建構器模式：設置單格數值
    pub fn with(mut self, item: ItemId, period: PeriodId, value: V) -> Self {
        self.insert(item, period, value);
        self
    }

    pub fn get(&self, item: &ItemId, period: PeriodId) -> Option<&V> {
        self.values.get(item).and_then(|row| row.get(&period))
    }

    /// 格數
    pub fn len(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, PeriodId, &V)> {
        self.values
            .iter()
            .flat_map(|(item, row)| row.iter().map(move |(period, value)| (item, *period, value)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ItemId, PeriodId, &mut V)> {
        self.values.iter_mut().flat_map(|(item, row)| {
            row.iter_mut()
                .map(move |(period, value)| (item, *period, value))
        })
    }
}

/// 計劃參數
///
/// 所有成本與數量皆以 Decimal 表示，建模時才轉為浮點數。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningParameters {
    /// 物料清單（順序即建模順序）
    pub items: Vec<ItemId>,

    /// 計劃期間（必須嚴格遞增）
    pub periods: Vec<PeriodId>,

    /// 單位生產成本
    pub production_cost: ParameterTable<Decimal>,

    /// 固定換線（開工）成本
    pub setup_cost: ParameterTable<Decimal>,

    /// 單位期末庫存持有成本
    pub holding_cost: ParameterTable<Decimal>,

    /// 需求量
    pub demand: ParameterTable<Decimal>,

    /// 最大產量
    pub max_production: ParameterTable<Decimal>,

    /// 各期倉庫容量（所有物料期末庫存合計上限）
    pub warehouse_capacity: BTreeMap<PeriodId, Decimal>,

    /// 指定的開工大 M 值（未指定時依 BigMRule 計算）
    pub setup_big_m: Option<ParameterTable<Decimal>>,
}

impl PlanningParameters {
    /// 創建空參數（各表待填）
    pub fn new(items: Vec<ItemId>, periods: Vec<PeriodId>) -> Self {
        Self {
            items,
            periods,
            production_cost: ParameterTable::new(),
            setup_cost: ParameterTable::new(),
            holding_cost: ParameterTable::new(),
            demand: ParameterTable::new(),
            max_production: ParameterTable::new(),
            warehouse_capacity: BTreeMap::new(),
            setup_big_m: None,
        }
    }

    /// 建構器模式：所有期間使用相同倉庫容量
    pub fn with_uniform_warehouse_capacity(mut self, capacity: Decimal) -> Self {
        self.warehouse_capacity = self.periods.iter().map(|p| (*p, capacity)).collect();
        self
    }

    /// 建構器模式：指定開工大 M 值
    pub fn with_setup_big_m(mut self, table: ParameterTable<Decimal>) -> Self {
        self.setup_big_m = Some(table);
        self
    }

    /// 檢查參數完整性：每格必須存在且不可為負
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() || self.periods.is_empty() {
            return Err(PlanError::EmptyHorizon);
        }

        if self.periods.windows(2).any(|w| w[0] >= w[1]) {
            let listed: Vec<String> = self.periods.iter().map(PeriodId::to_string).collect();
            return Err(PlanError::UnorderedPeriods(listed.join(", ")));
        }

        let mut tables = vec![
            ("production_cost", &self.production_cost),
            ("setup_cost", &self.setup_cost),
            ("holding_cost", &self.holding_cost),
            ("demand", &self.demand),
            ("max_production", &self.max_production),
        ];
        if let Some(big_m) = &self.setup_big_m {
            tables.push(("setup_big_m", big_m));
        }

        for item in &self.items {
            for &period in &self.periods {
                for &(name, table) in &tables {
                    Self::cell(name, table, item, period)?;
                }
            }
        }

        for &period in &self.periods {
            self.warehouse_capacity_for(period)?;
        }

        Ok(())
    }

    /// 讀取單格並檢查非負
    pub(crate) fn cell(
        table_name: &'static str,
        table: &ParameterTable<Decimal>,
        item: &ItemId,
        period: PeriodId,
    ) -> Result<Decimal> {
        let value = *table
            .get(item, period)
            .ok_or_else(|| PlanError::MissingParameter {
                table: table_name,
                key: format!("{item}/{period}"),
            })?;

        if value.is_sign_negative() && !value.is_zero() {
            return Err(PlanError::InvalidParameter {
                table: table_name,
                key: format!("{item}/{period}"),
                value,
            });
        }

        Ok(value)
    }

    pub(crate) fn warehouse_capacity_for(&self, period: PeriodId) -> Result<Decimal> {
        let value = *self
            .warehouse_capacity
            .get(&period)
            .ok_or_else(|| PlanError::MissingParameter {
                table: "warehouse_capacity",
                key: period.to_string(),
            })?;

        if value.is_sign_negative() && !value.is_zero() {
            return Err(PlanError::InvalidParameter {
                table: "warehouse_capacity",
                key: period.to_string(),
                value,
            });
        }

        Ok(value)
    }

    /// 從第 `from` 個期間（含）到期末的累計需求
    pub fn remaining_demand(&self, item: &ItemId, from: usize) -> Decimal {
        self.periods[from.min(self.periods.len())..]
            .iter()
            .filter_map(|&period| self.demand.get(item, period))
            .sum()
    }

    /// 物料在全期間的總需求
    pub fn total_demand(&self, item: &ItemId) -> Decimal {
        self.remaining_demand(item, 0)
    }
}
