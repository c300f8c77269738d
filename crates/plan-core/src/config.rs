//! 求解器配置模型

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 配置錯誤
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("無法解析求解器配置: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置值無效: {field} = {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// 求解器參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// 數值容差 ε（可行性、最優性、整數性與零值判斷）
    pub tolerance: f64,

    /// 可行性容差：整數變數取整後的解須在此容差內滿足所有約束與上下界
    pub feasibility_tolerance: f64,

    /// 每次鬆弛求解的單純形迭代上限
    pub max_simplex_iterations: usize,

    /// 分支定界節點上限（None 為不限）
    pub node_limit: Option<usize>,

    /// 牆鐘時間上限（毫秒，None 為不限）
    pub time_limit_ms: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            feasibility_tolerance: 1e-6,
            max_simplex_iterations: 10_000,
            node_limit: None,
            time_limit_ms: None,
        }
    }
}

impl SolverConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 文件讀取配置（缺少的欄位使用預設值）
    ///
    /// # 範例
    /// ```
    /// # use plan_core::SolverConfig;
    /// let config = SolverConfig::from_json_str(r#"{ "node_limit": 500 }"#).unwrap();
    /// assert_eq!(config.node_limit, Some(500));
    /// assert_eq!(config.max_simplex_iterations, 10_000);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置數值容差
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// 建構器模式：設置可行性容差
    pub fn with_feasibility_tolerance(mut self, tolerance: f64) -> Self {
        self.feasibility_tolerance = tolerance;
        self
    }

    /// 建構器模式：設置單純形迭代上限
    pub fn with_max_simplex_iterations(mut self, iterations: usize) -> Self {
        self.max_simplex_iterations = iterations;
        self
    }

    /// 建構器模式：設置節點上限
    pub fn with_node_limit(mut self, nodes: usize) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    /// 建構器模式：設置時間上限
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// 時間上限
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// 是否設有任何預算限制
    pub fn has_budget(&self) -> bool {
        self.node_limit.is_some() || self.time_limit_ms.is_some()
    }

    /// 檢查配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "tolerance",
                value: self.tolerance.to_string(),
            });
        }

        let feasibility = self.feasibility_tolerance;
        if !(feasibility.is_finite() && feasibility > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "feasibility_tolerance",
                value: feasibility.to_string(),
            });
        }

        if self.max_simplex_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_simplex_iterations",
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}
