/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 执行引擎：训练（前向 + 反向 + 参数更新）与推理（只前向）
 */

mod config;
mod inference;
mod metric;
mod runner;
mod training;

pub use config::TrainingConfig;
pub use inference::{ExecutionResult, InferenceEngine};
pub use metric::ErrorMetric;
pub use runner::SequenceRunner;
pub use training::TrainingEngine;
