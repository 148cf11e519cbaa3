/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 推理引擎：只前向，不分配反向步骤
 */

use super::{ErrorMetric, SequenceRunner};
use crate::data::{DataSource, MiniBatchProvider};
use crate::nn::{GraphData, GraphError, GraphInner};

/// 一个小批量在某个序列位置上的输出
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub rows: Vec<usize>,
    pub sequence_index: usize,
    pub output: GraphData,
    pub target: Option<GraphData>,
}

pub struct InferenceEngine<'a> {
    graph: &'a mut GraphInner,
    batch_size: usize,
}

impl<'a> InferenceEngine<'a> {
    /// # Panics
    /// 如果 batch_size 为0
    pub fn new(graph: &'a mut GraphInner, batch_size: usize) -> Self {
        assert!(batch_size > 0, "InferenceEngine: batch_size 必须大于 0");
        Self { graph, batch_size }
    }

    /// 按原始顺序执行全部行，返回每个小批量、每个序列位置的输出
    pub fn execute(&mut self, source: &dyn DataSource) -> Result<Vec<ExecutionResult>, GraphError> {
        let provider = MiniBatchProvider::new(source, self.batch_size);
        let mut results = Vec::new();
        for batch in provider.iter() {
            let batch = batch?;
            let runner = SequenceRunner::forward(self.graph, &batch, false)?;
            for step in batch.sequence() {
                let output = runner.output_at(self.graph, step.index).ok_or_else(|| {
                    GraphError::InvalidState(format!("序列位置{}没有产生输出", step.index))
                })?;
                results.push(ExecutionResult {
                    rows: batch.rows().to_vec(),
                    sequence_index: step.index,
                    output: output.clone(),
                    target: step.target.clone(),
                });
            }
        }
        Ok(results)
    }

    /// 有目标的输出上的平均误差
    pub fn evaluate(
        &mut self,
        source: &dyn DataSource,
        metric: ErrorMetric,
    ) -> Result<f32, GraphError> {
        let (mut total, mut rows) = (0.0, 0);
        for result in self.execute(source)? {
            let Some(target) = &result.target else { continue };
            let (output, target) = (result.output.as_matrix()?, target.as_matrix()?);
            let error = metric.compute(&output, &target)?;
            total += error * result.rows.len() as f32;
            rows += result.rows.len();
        }
        Ok(if rows == 0 { 0.0 } else { total / rows as f32 })
    }
}
