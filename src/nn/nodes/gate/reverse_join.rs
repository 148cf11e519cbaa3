/*
 * @Author       : 老董
 * @Date         : 2026-01-30
 * @Description  : 逆序时间拼接：双向循环网络中，把正向分支在位置t的输出与逆向分支在镜像位置
 *                 (count - t - 1)处算出的输出按列拼接。两侧数据要到整条序列都走完才能配齐，
 *                 因此前向时先暂存，配齐后一次性为所有序列位置产出；反向时逆向分支的误差也
 *                 先按镜像位置暂存，到达序列位置0时整体下发
 */

use super::Arrival;
use crate::nn::graph::{GraphData, GraphError, NodeId};
use crate::nn::nodes::{
    Advance, BackwardStep, DeferredSignal, Emission, ForwardScope, TraitNode, encode, expect_channel,
};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseTemporalJoin {
    forward_width: usize,
    reverse_width: usize,
    /// 序列位置 -> 正向分支在该位置的输出
    #[serde(skip)]
    forward_table: BTreeMap<usize, Arrival>,
    /// 镜像后的序列位置 -> 逆向分支的输出
    #[serde(skip)]
    reverse_table: BTreeMap<usize, Arrival>,
    /// 逆向分支来源节点
    #[serde(skip)]
    reverse_source: Option<NodeId>,
    /// 反向传播时按镜像位置暂存的、属于逆向分支的误差
    #[serde(skip)]
    pending_errors: BTreeMap<usize, Tensor>,
}

impl ReverseTemporalJoin {
    pub fn new(forward_width: usize, reverse_width: usize) -> Result<Self, GraphError> {
        if forward_width == 0 || reverse_width == 0 {
            return Err(GraphError::InvalidOperation(
                "ReverseTemporalJoin两侧的宽度都必须大于0".to_string(),
            ));
        }
        Ok(Self {
            forward_width,
            reverse_width,
            forward_table: BTreeMap::new(),
            reverse_table: BTreeMap::new(),
            reverse_source: None,
            pending_errors: BTreeMap::new(),
        })
    }

    pub const fn forward_width(&self) -> usize {
        self.forward_width
    }

    pub const fn reverse_width(&self) -> usize {
        self.reverse_width
    }

    pub const fn output_size(&self) -> usize {
        self.forward_width + self.reverse_width
    }

    /// 当前暂存的、尚未配对的正向/逆向位置数
    pub fn stashed(&self) -> (usize, usize) {
        (self.forward_table.len(), self.reverse_table.len())
    }

    fn check_width(
        &self,
        id: NodeId,
        channel: usize,
        data: &GraphData,
    ) -> Result<(), GraphError> {
        let width = if channel == 0 {
            self.forward_width
        } else {
            self.reverse_width
        };
        if data.cols() != width {
            return Err(GraphError::ChannelMismatch {
                node: id,
                channel,
                message: format!("该通道配置的宽度为{width}，但收到了{}列", data.cols()),
            });
        }
        Ok(())
    }

    /// 反向：暂存镜像位置`mirrored`的逆向误差
    pub(crate) fn stash_error(&mut self, mirrored: usize, error: Tensor) {
        self.pending_errors.insert(mirrored, error);
    }

    /// 反向到达位置0时调用：把整张误差表转为发往各序列位置的延迟信号并清空。
    /// 表不完整（某个位置缺失）说明有序列位置被丢弃或重复
    pub(crate) fn flush_errors(
        &mut self,
        id: NodeId,
        count: usize,
        reverse_parent: NodeId,
    ) -> Result<Vec<DeferredSignal>, GraphError> {
        if let Some(missing) = (0..count).find(|i| !self.pending_errors.contains_key(i)) {
            self.pending_errors.clear();
            return Err(GraphError::MissingReverseData {
                node: id,
                sequence_index: missing,
            });
        }
        let table = std::mem::take(&mut self.pending_errors);
        Ok(table
            .into_iter()
            .map(|(sequence_index, error)| DeferredSignal {
                sequence_index,
                node: reverse_parent,
                error,
            })
            .collect())
    }
}

impl TraitNode for ReverseTemporalJoin {
    fn type_tag(&self) -> &'static str {
        "ReverseTemporalJoin"
    }

    fn channel_count(&self) -> usize {
        2
    }

    fn advance(
        &mut self,
        id: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        expect_channel(id, channel, 2)?;
        self.check_width(id, channel, &signal)?;

        let sequence = scope.sequence;
        let (table, position) = if channel == 0 {
            (&mut self.forward_table, sequence.index)
        } else {
            self.reverse_source = source;
            (&mut self.reverse_table, sequence.reversed_index())
        };
        if table
            .insert(position, Arrival { data: signal, source })
            .is_some()
        {
            return Err(GraphError::ChannelMismatch {
                node: id,
                channel,
                message: format!("序列位置{position}收到了两次数据"),
            });
        }

        let count = sequence.count;
        if self.forward_table.len() < count || self.reverse_table.len() < count {
            return Ok(Advance::Pending);
        }

        // 两张表都已配齐：为每个序列位置产出一条历史
        let forward = std::mem::take(&mut self.forward_table);
        let mut reverse = std::mem::take(&mut self.reverse_table);
        let reverse_parent = self.reverse_source.take();
        let mut emissions = Vec::with_capacity(count);
        for (index, fwd) in forward {
            let rev = reverse.remove(&index).ok_or(GraphError::MissingReverseData {
                node: id,
                sequence_index: index,
            })?;
            let left = fwd.data.as_matrix()?;
            let right = rev.data.as_matrix()?;
            let joined = Tensor::concat_columns(&[left.as_ref(), right.as_ref()])?;
            let output = GraphData::matrix(joined)?.with_row_id(fwd.data.row_id());

            let emission = Emission::new(output, fwd.source.into_iter().collect());
            let emission = match reverse_parent {
                Some(reverse_parent) => emission.with_backward(
                    BackwardStep::ReverseJoin {
                        forward_width: self.forward_width,
                        reverse_width: self.reverse_width,
                        reverse_parent,
                    },
                    scope.is_training,
                ),
                None => emission,
            };
            emissions.push((index, emission));
        }
        Ok(Advance::FiredAt(emissions))
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }

    fn reset_state(&mut self) {
        self.forward_table.clear();
        self.reverse_table.clear();
        self.reverse_source = None;
        self.pending_errors.clear();
    }
}
