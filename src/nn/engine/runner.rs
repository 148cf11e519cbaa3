/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 一个小批量的执行：每个序列位置一个上下文。
 *                 前向按位置升序推进，并把节点为其它位置产出的历史转交过去；
 *                 反向按位置降序回放，跨位置的延迟信号会触发对应位置的再次回放，直到没有信号为止
 */

use crate::data::MiniBatch;
use crate::nn::learning::LearningContext;
use crate::nn::nodes::NodeKind;
use crate::nn::{GraphContext, GraphData, GraphError, GraphInner, NodeId, RoutedEmission, SequenceInfo};
use crate::tensor::Tensor;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct SequenceRunner {
    contexts: Vec<GraphContext>,
    /// 发往尚未创建的序列位置的产物
    deferred_forward: BTreeMap<usize, Vec<RoutedEmission>>,
}

impl SequenceRunner {
    /// 对整个小批量执行前向（执行前清空图中的暂存状态与记忆）
    pub fn forward(
        graph: &mut GraphInner,
        batch: &MiniBatch,
        is_training: bool,
    ) -> Result<Self, GraphError> {
        graph.reset_transient_state();
        let mut runner = Self {
            contexts: Vec::with_capacity(batch.sequence_len()),
            deferred_forward: BTreeMap::new(),
        };
        if batch.is_empty() {
            return Ok(runner);
        }

        let inputs = graph
            .inputs()
            .iter()
            .map(|&id| match graph.node(id)?.kind() {
                NodeKind::Input(input) => Ok((id, input.is_reversed())),
                _ => Err(GraphError::InvalidState(format!("{id}不是输入节点"))),
            })
            .collect::<Result<Vec<_>, GraphError>>()?;
        if inputs.is_empty() {
            return Err(GraphError::InvalidState("图中没有输入节点".to_string()));
        }

        let steps = batch.sequence();
        let count = steps.len();
        for step in steps {
            let sequence = SequenceInfo {
                index: step.index,
                count,
                sequence_type: step.sequence_type,
            };
            let mut context = GraphContext::new(sequence, is_training);
            for routed in runner
                .deferred_forward
                .remove(&step.index)
                .unwrap_or_default()
            {
                context.add_forward(routed.source, routed.emission);
            }
            for &(input, reversed) in &inputs {
                let data = if reversed {
                    steps[sequence.reversed_index()].input.clone()
                } else {
                    step.input.clone()
                };
                context.seed(graph, input, data)?;
            }
            context.execute_all(graph)?;
            runner.contexts.push(context);
            runner.settle(graph)?;
        }
        if let Some(index) = runner.deferred_forward.keys().next() {
            return Err(GraphError::InvalidState(format!(
                "有产物发往了不存在的序列位置{index}"
            )));
        }
        Ok(runner)
    }

    /// 转交各上下文发往其它位置的产物并继续执行，直到没有任何待处理的工作
    fn settle(&mut self, graph: &mut GraphInner) -> Result<(), GraphError> {
        loop {
            let routed: Vec<RoutedEmission> = self
                .contexts
                .iter_mut()
                .flat_map(GraphContext::take_outbox)
                .collect();
            if routed.is_empty() && !self.contexts.iter().any(GraphContext::has_pending) {
                return Ok(());
            }
            for emission in routed {
                match self.contexts.get_mut(emission.sequence_index) {
                    Some(context) => {
                        context.add_forward(emission.source, emission.emission);
                    }
                    None => self
                        .deferred_forward
                        .entry(emission.sequence_index)
                        .or_default()
                        .push(emission),
                }
            }
            for context in &mut self.contexts {
                context.execute_all(graph)?;
            }
        }
    }

    pub fn contexts(&self) -> &[GraphContext] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// 第`index`个序列位置上图输出节点（未设置时为该位置最后激活的节点）的输出
    pub fn output_at(&self, graph: &GraphInner, index: usize) -> Option<&GraphData> {
        let context = self.contexts.get(index)?;
        let node = graph.output().or_else(|| context.last_source())?;
        context.output(node)
    }

    fn output_node(graph: &GraphInner, context: &GraphContext) -> Result<NodeId, GraphError> {
        graph
            .output()
            .or_else(|| context.last_source())
            .ok_or_else(|| GraphError::InvalidState("上下文中没有任何执行历史".to_string()))
    }

    /// 反向：`errors[t]`为第t个位置输出节点的初始误差（`None`表示该位置不反向）。
    /// 返回总共执行的回放次数
    pub fn backward(
        &mut self,
        graph: &mut GraphInner,
        learning: &mut LearningContext,
        errors: Vec<Option<Tensor>>,
    ) -> Result<usize, GraphError> {
        let mut pending: BTreeMap<usize, Vec<(NodeId, Tensor)>> = BTreeMap::new();
        for (index, error) in errors.into_iter().enumerate() {
            let Some(error) = error else { continue };
            let context = self.contexts.get(index).ok_or_else(|| {
                GraphError::InvalidState(format!("序列位置{index}不存在"))
            })?;
            let node = Self::output_node(graph, context)?;
            pending.entry(index).or_default().push((node, error));
        }

        let mut passes = 0;
        while let Some((index, seeds)) = pending.pop_last() {
            let context = self.contexts.get_mut(index).ok_or_else(|| {
                GraphError::InvalidState(format!("延迟信号指向了不存在的序列位置{index}"))
            })?;
            let signals = context.backpropagate_seeds(graph, learning, seeds)?;
            passes += 1;
            for signal in signals {
                pending
                    .entry(signal.sequence_index)
                    .or_default()
                    .push((signal.node, signal.error));
            }
        }
        log::debug!("{}个序列位置共回放{passes}次", self.contexts.len());
        Ok(passes)
    }
}
