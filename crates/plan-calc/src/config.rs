//! 生產計劃配置

use plan_core::{ConfigError, ObjectiveSense, SolverConfig};
use serde::{Deserialize, Serialize};

/// 開工大 M 值的計算規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BigMRule {
    /// M = 最大產量
    Capacity,
    /// M = min(最大產量, 當期到期末的剩餘需求)；僅在最小化時生效，否則同 Capacity
    CapacityOrRemainingDemand,
}

/// 生產計劃配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// 最佳化方向（成本計劃應為最小化）
    pub sense: ObjectiveSense,

    /// 開工大 M 值規則
    pub big_m_rule: BigMRule,

    /// 是否加入開工覆蓋約束 `I[t-1] + d·y ≥ d`
    pub setup_cover_cuts: bool,

    /// 計劃數量的小數位數
    pub quantity_scale: u32,

    /// 求解器參數
    pub solver: SolverConfig,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            sense: ObjectiveSense::Minimize,
            big_m_rule: BigMRule::CapacityOrRemainingDemand,
            setup_cover_cuts: true,
            quantity_scale: 4,
            solver: SolverConfig::default(),
        }
    }
}

impl PlanConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 與題目原始公式相同的模型：M 取最大產量，不加覆蓋約束
    pub fn plain_formulation() -> Self {
        Self::default()
            .with_big_m_rule(BigMRule::Capacity)
            .with_setup_cover_cuts(false)
    }

    /// 建構器模式：設置最佳化方向
    pub fn with_sense(mut self, sense: ObjectiveSense) -> Self {
        self.sense = sense;
        self
    }

    /// 建構器模式：設置大 M 規則
    pub fn with_big_m_rule(mut self, rule: BigMRule) -> Self {
        self.big_m_rule = rule;
        self
    }

    /// 建構器模式：開關覆蓋約束
    pub fn with_setup_cover_cuts(mut self, enabled: bool) -> Self {
        self.setup_cover_cuts = enabled;
        self
    }

    /// 建構器模式：設置數量小數位數
    pub fn with_quantity_scale(mut self, scale: u32) -> Self {
        self.quantity_scale = scale;
        self
    }

    /// 建構器模式：設置求解器參數
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// 檢查配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Decimal 最多 28 位小數
        if self.quantity_scale > 28 {
            return Err(ConfigError::InvalidValue {
                field: "quantity_scale",
                value: self.quantity_scale.to_string(),
            });
        }
        self.solver.validate()
    }
}
