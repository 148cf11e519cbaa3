/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 训练引擎：逐轮拉取小批量，前向、计算误差、反向、应用参数更新
 */

use super::{ErrorMetric, SequenceRunner, TrainingConfig};
use crate::data::{DataSource, MiniBatch, MiniBatchProvider};
use crate::nn::learning::LearningContext;
use crate::nn::{GraphError, GraphInner};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;

pub struct TrainingEngine {
    graph: GraphInner,
    learning: LearningContext,
    config: TrainingConfig,
    rng: StdRng,
}

impl TrainingEngine {
    pub fn new(graph: GraphInner, config: TrainingConfig) -> Self {
        let learning = LearningContext::from_config(&config);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            graph,
            learning,
            config,
            rng,
        }
    }

    pub const fn graph(&self) -> &GraphInner {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut GraphInner {
        &mut self.graph
    }

    pub const fn learning(&self) -> &LearningContext {
        &self.learning
    }

    pub fn learning_mut(&mut self) -> &mut LearningContext {
        &mut self.learning
    }

    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn into_graph(self) -> GraphInner {
        self.graph
    }

    /// 按配置的轮数训练，返回每轮的平均误差
    pub fn train(&mut self, source: &dyn DataSource) -> Result<Vec<f32>, GraphError> {
        (0..self.config.epochs)
            .map(|_| self.train_epoch(source))
            .collect()
    }

    /// 训练一轮，返回按行加权的平均误差
    pub fn train_epoch(&mut self, source: &dyn DataSource) -> Result<f32, GraphError> {
        self.learning.start_epoch();
        let groups = MiniBatchProvider::new(source, self.config.batch_size)
            .shuffle(self.config.stochastic)
            .row_groups_with(&mut self.rng);
        log::debug!(
            "第{}轮：{}行，{}个小批量",
            self.learning.current_epoch(),
            source.row_count(),
            groups.len()
        );

        let (mut total_error, mut total_rows) = (0.0, 0);
        for rows in groups {
            let batch = source.get(&rows)?;
            let error = self.train_batch(&batch)?;
            total_error += error * batch.row_count() as f32;
            total_rows += batch.row_count();
        }
        let epoch_error = if total_rows == 0 {
            0.0
        } else {
            total_error / total_rows as f32
        };
        self.learning.end_epoch(&mut self.graph, epoch_error)?;
        Ok(epoch_error)
    }

    /// 训练一个小批量，返回其误差（有目标的各序列位置的均值）。
    /// 出错时丢弃本批已排队的更新，参数保持不变
    pub fn train_batch(&mut self, batch: &MiniBatch) -> Result<f32, GraphError> {
        if batch.is_empty() {
            return Ok(0.0);
        }
        let result = self.run_batch(batch).and_then(|error| {
            self.learning.apply_updates(&mut self.graph)?;
            Ok(error)
        });
        match result {
            Ok(error) => {
                self.learning.add_rows(batch.row_count());
                Ok(error)
            }
            Err(e) => {
                let discarded = self.learning.discard_updates();
                log::warn!("小批量训练失败，丢弃了{discarded}条未应用的更新：{e}");
                Err(e)
            }
        }
    }

    fn run_batch(&mut self, batch: &MiniBatch) -> Result<f32, GraphError> {
        let mut runner = SequenceRunner::forward(&mut self.graph, batch, true)?;
        let (errors, error) = initial_errors(
            &runner,
            &self.graph,
            batch,
            self.config.error_metric,
        )?;
        runner.backward(&mut self.graph, &mut self.learning, errors)?;
        Ok(error)
    }
}

/// 各序列位置的初始误差。没有目标的位置送入零误差，使所有位置都参与回放
/// （逆序时间拼接等节点依赖完整的回放顺序）
fn initial_errors(
    runner: &SequenceRunner,
    graph: &GraphInner,
    batch: &MiniBatch,
    metric: ErrorMetric,
) -> Result<(Vec<Option<Tensor>>, f32), GraphError> {
    let mut errors = Vec::with_capacity(runner.len());
    let (mut total, mut counted) = (0.0, 0);
    for step in batch.sequence() {
        let output = runner
            .output_at(graph, step.index)
            .ok_or_else(|| {
                GraphError::InvalidState(format!("序列位置{}没有产生输出", step.index))
            })?
            .as_matrix()?;
        match &step.target {
            Some(target) => {
                let target = target.as_matrix()?;
                total += metric.compute(&output, &target)?;
                counted += 1;
                errors.push(Some(metric.gradient(&output, &target)?));
            }
            None => errors.push(Some(Tensor::zeros(output.shape()))),
        }
    }
    let error = if counted == 0 {
        0.0
    } else {
        total / counted as f32
    };
    Ok((errors, error))
}
