/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 训练配置
 */

use super::ErrorMetric;
use crate::nn::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 训练配置：可用 builder 方法逐项设置，也可从 JSON 读取（缺省项取默认值）
///
/// # 示例
/// ```ignore
/// let config = TrainingConfig::default()
///     .batch_size(32)
///     .learning_rate(0.1)
///     .stochastic(true)
///     .seed(42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub learning_rate: f32,
    pub epochs: usize,
    /// 每轮打乱行序和桶序
    pub stochastic: bool,
    /// 打乱用的随机种子；`None`时每次运行都不同
    pub seed: Option<u64>,
    /// 参数更新延迟到小批量结束后统一应用
    pub deferred_updates: bool,
    pub error_metric: ErrorMetric,
    /// 轮次 -> 从该轮开始使用的学习率
    pub learning_rate_schedule: BTreeMap<usize, f32>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            learning_rate: 0.1,
            epochs: 10,
            stochastic: true,
            seed: None,
            deferred_updates: true,
            error_metric: ErrorMetric::Quadratic,
            learning_rate_schedule: BTreeMap::new(),
        }
    }
}

impl TrainingConfig {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GraphError::Serialization(format!("解析训练配置失败: {e}")))?;
        if config.batch_size == 0 {
            return Err(GraphError::InvalidOperation(
                "训练配置中的batch_size必须大于0".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GraphError::Serialization(format!("序列化训练配置失败: {e}")))
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn stochastic(mut self, stochastic: bool) -> Self {
        self.stochastic = stochastic;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn deferred_updates(mut self, deferred: bool) -> Self {
        self.deferred_updates = deferred;
        self
    }

    pub fn error_metric(mut self, metric: ErrorMetric) -> Self {
        self.error_metric = metric;
        self
    }

    /// 从第`epoch`轮开始使用学习率`rate`
    pub fn schedule(mut self, epoch: usize, rate: f32) -> Self {
        self.learning_rate_schedule.insert(epoch, rate);
        self
    }
}
