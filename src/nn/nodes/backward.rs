/*
 * @Author       : 老董
 * @Date         : 2026-01-30
 * @Description  : 反向步骤：前向时由节点记录进执行历史，反向时被调用，
 *                 把收到的误差转换为发往各父节点的误差（并顺带登记参数更新）
 */

use super::{ActivationKind, NodeKind};
use crate::nn::graph::{GraphError, GraphInner, NodeId, SequenceInfo};
use crate::nn::learning::{LearningContext, ParameterSlot, ParameterUpdate};
use crate::tensor::Tensor;
use std::sync::Arc;

/// 需要送往另一个序列位置的误差（跨时间步的反向传播）
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredSignal {
    pub sequence_index: usize,
    pub node: NodeId,
    pub error: Tensor,
}

/// 反向步骤执行时可以访问的外部状态
pub struct BackwardScope<'a> {
    pub graph: &'a mut GraphInner,
    pub learning: &'a mut LearningContext,
    pub sequence: SequenceInfo,
    pub signals: &'a mut Vec<DeferredSignal>,
}

/// 一条执行历史的反向步骤。前向时捕获的张量以`Arc`共享，不复制
#[derive(Debug, Clone)]
pub enum BackwardStep {
    /// 线性层：向父节点传`error·Wᵀ`，并登记`dW = inputᵀ·error`、`db = 按列求和(error)`
    FeedForward { input: Arc<Tensor> },
    /// 逐元素激活：`error ⊙ f'(output)`
    Activation {
        kind: ActivationKind,
        output: Arc<Tensor>,
    },
    /// 乘法门；`sources`为两个通道各自的来源（直接注入的通道没有来源）
    Multiply {
        primary: Arc<Tensor>,
        secondary: Arc<Tensor>,
        sources: [Option<NodeId>; 2],
    },
    /// n 元拼接门：按列宽拆分误差，按通道发往该通道的来源节点
    Split {
        widths: Vec<usize>,
        sources: Vec<Option<NodeId>>,
    },
    /// 逆序时间拼接
    ReverseJoin {
        forward_width: usize,
        reverse_width: usize,
        reverse_parent: NodeId,
    },
    /// 记忆读取：误差属于上一个序列位置写入记忆的节点
    MemoryFeed { writer: Option<NodeId> },
}

impl BackwardStep {
    /// 执行反向步骤，返回`(误差, 父节点)`列表。未出现在列表中的父节点视为"无误差"
    pub fn backward(
        &self,
        node: NodeId,
        error: &Tensor,
        parents: &[NodeId],
        scope: &mut BackwardScope<'_>,
    ) -> Result<Vec<(Tensor, NodeId)>, GraphError> {
        match self {
            Self::FeedForward { input } => {
                let weights = match scope.graph.node(node)?.kind() {
                    NodeKind::FeedForward(ff) => ff.weights().transpose(),
                    other => {
                        return Err(GraphError::InvalidState(format!(
                            "{node}记录了线性层的反向步骤，但其类型为{}",
                            super::TraitNode::type_tag(other)
                        )));
                    }
                };
                // 先用当前参数算出父节点误差，再登记更新
                let parent_error = error.mat_mul(&weights)?;
                let weight_delta = input.transpose().mat_mul(error)?;
                let bias_delta = error.column_sums()?;
                scope.learning.store_update(
                    ParameterUpdate::new(node, ParameterSlot::Weights, weight_delta),
                    &mut *scope.graph,
                )?;
                scope.learning.store_update(
                    ParameterUpdate::new(node, ParameterSlot::Bias, bias_delta),
                    &mut *scope.graph,
                )?;
                Ok(to_first_parent(parent_error, parents))
            }
            Self::Activation { kind, output } => {
                let derivative = kind.derivative_from_output(output);
                Ok(to_first_parent(error.pointwise_mul(&derivative)?, parents))
            }
            Self::Multiply {
                primary,
                secondary,
                sources,
            } => {
                let mut result = Vec::with_capacity(2);
                if let Some(p) = sources[0] {
                    result.push((error.pointwise_mul(secondary)?, p));
                }
                if let Some(p) = sources[1] {
                    result.push((error.pointwise_mul(primary)?, p));
                }
                Ok(result)
            }
            Self::Split { widths, sources } => {
                let slices = error.split_at_columns(widths)?;
                Ok(slices
                    .into_iter()
                    .zip(sources)
                    .filter_map(|(slice, source)| source.map(|p| (slice, p)))
                    .collect())
            }
            Self::ReverseJoin {
                forward_width,
                reverse_width,
                reverse_parent,
            } => {
                let mut slices = error
                    .split_at_columns(&[*forward_width, *reverse_width])?
                    .into_iter();
                let (Some(left), Some(right)) = (slices.next(), slices.next()) else {
                    return Err(GraphError::InvalidState(format!(
                        "{node}的误差无法拆分为正向/逆向两部分"
                    )));
                };

                let sequence = scope.sequence;
                let join = match scope.graph.node_mut(node)?.kind_mut() {
                    NodeKind::ReverseTemporalJoin(join) => join,
                    _ => {
                        return Err(GraphError::InvalidState(format!(
                            "{node}不是逆序时间拼接节点"
                        )));
                    }
                };
                join.stash_error(sequence.reversed_index(), right);
                if sequence.index == 0 {
                    let flushed = join.flush_errors(node, sequence.count, *reverse_parent)?;
                    log::debug!("{node}在序列位置0下发了{}条逆向误差", flushed.len());
                    scope.signals.extend(flushed);
                }
                Ok(to_first_parent(left, parents))
            }
            Self::MemoryFeed { writer } => {
                let sequence = scope.sequence;
                if sequence.index == 0 {
                    // 初始记忆是可训练参数
                    let delta = error.column_sums()?;
                    scope.learning.store_update(
                        ParameterUpdate::new(node, ParameterSlot::InitialMemory, delta),
                        &mut *scope.graph,
                    )?;
                } else if let Some(writer) = writer {
                    scope.signals.push(DeferredSignal {
                        sequence_index: sequence.index - 1,
                        node: *writer,
                        error: error.clone(),
                    });
                } else {
                    log::warn!("{node}没有对应的记忆写入节点，位置{}的误差被丢弃", sequence.index);
                }
                Ok(Vec::new())
            }
        }
    }
}

fn to_first_parent(error: Tensor, parents: &[NodeId]) -> Vec<(Tensor, NodeId)> {
    parents.first().map(|&p| (error, p)).into_iter().collect()
}
