//! 生產計劃主流程：建模 → 分支定界 → 解讀

use plan_optimizer::{BranchAndBoundEngine, SolverWarning};
use std::time::Instant;

use crate::builder::PlanBuilder;
use crate::config::PlanConfig;
use crate::parameters::PlanningParameters;
use crate::{PlanningResult, Result};

/// 生產計劃求解器
#[derive(Debug, Clone, Default)]
pub struct ProductionPlanner {
    builder: PlanBuilder,
    engine: BranchAndBoundEngine,
}

impl ProductionPlanner {
    /// 創建新的計劃求解器
    pub fn new(config: PlanConfig) -> Self {
        Self {
            engine: BranchAndBoundEngine::new(config.solver.clone()),
            builder: PlanBuilder::new(config),
        }
    }

    pub fn config(&self) -> &PlanConfig {
        self.builder.config()
    }

    /// 主計劃入口
    ///
    /// 參數或配置錯誤回傳 Err；不可行、無界等求解結果放在 `PlanningResult::status`。
    pub fn plan(&self, params: &PlanningParameters) -> Result<PlanningResult> {
        tracing::info!(
            "開始生產計劃求解：物料 {} 個，期間 {} 個",
            params.items.len(),
            params.periods.len()
        );

        let start_time = Instant::now();

        // Step 1: 建立模型
        tracing::debug!("Step 1: 建立模型");
        let plan_model = self.builder.build(params)?;

        // Step 2: 分支定界
        tracing::debug!("Step 2: 分支定界");
        let mut report = self.engine.solve(plan_model.model());

        // Step 3: 解讀結果
        tracing::debug!("Step 3: 解讀結果");
        let plan = if report.objective_value().is_some() {
            let tolerance = self.config().solver.feasibility_tolerance;
            let violations = plan_model
                .model()
                .check_feasibility(report.solution.values(), tolerance);
            if !violations.is_empty() {
                tracing::warn!("求解結果有 {} 項可行性違反", violations.len());
                report.add_warning(SolverWarning::warning(
                    0,
                    0,
                    format!("求解結果有 {} 項可行性違反: {:?}", violations.len(), violations),
                ));
            }
            Some(self.builder.interpret(&plan_model, params, &report.solution)?)
        } else {
            None
        };

        let elapsed = start_time.elapsed().as_millis();

        tracing::info!(
            "生產計劃求解完成：狀態 {}，總成本 {:?}，耗時 {} ms",
            report.status(),
            plan.as_ref().map(|p| p.costs.total),
            elapsed
        );

        Ok(PlanningResult {
            status: report.status(),
            plan,
            report,
            calculation_time_ms: Some(elapsed),
        })
    }
}
