/*
 * @Author       : 老董
 * @Date         : 2026-01-30
 * @Description  : 循环记忆节点。MemoryFeeder 在每个序列位置读出上一位置写入的记忆（位置0读出可训练的
 *                 初始记忆），MemoryWriter 把本位置的隐藏状态写回，供下一位置读取
 */

use super::{
    Advance, BackwardStep, Emission, ForwardScope, TraitNode, encode, expect_channel, parents_of,
};
use crate::nn::graph::{GraphData, GraphError, NodeId};
use crate::nn::learning::{ParameterSlot, ParameterUpdate};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 记忆读取节点
///
/// 0号通道只作为触发信号（通常连自同一序列位置的输入），其内容只用来确定行数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFeeder {
    /// 形状`[1, memory_size]`
    initial: Tensor,
    writer: Option<NodeId>,
}

impl MemoryFeeder {
    pub fn new(initial: Tensor) -> Result<Self, GraphError> {
        if initial.dimension() != 2 || initial.rows() != 1 {
            return Err(GraphError::InvalidOperation(format!(
                "初始记忆的形状须为[1, memory_size]，但得到{:?}",
                initial.shape()
            )));
        }
        Ok(Self {
            initial,
            writer: None,
        })
    }

    pub fn memory_size(&self) -> usize {
        self.initial.cols()
    }

    pub const fn initial(&self) -> &Tensor {
        &self.initial
    }

    pub const fn writer(&self) -> Option<NodeId> {
        self.writer
    }

    pub(crate) fn set_writer(&mut self, writer: NodeId) {
        self.writer = Some(writer);
    }
}

impl TraitNode for MemoryFeeder {
    fn type_tag(&self) -> &'static str {
        "MemoryFeeder"
    }

    fn advance(
        &mut self,
        id: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        expect_channel(id, channel, 1)?;
        let rows = signal.rows();
        let memory = if scope.sequence.index == 0 {
            self.initial.repeat_rows(rows)?
        } else {
            let stored = scope.memory.get(&id).ok_or_else(|| {
                GraphError::InvalidState(format!(
                    "{id}在序列位置{}找不到上一位置写入的记忆",
                    scope.sequence.index
                ))
            })?;
            if stored.rows() != rows {
                return Err(GraphError::ShapeMismatch {
                    node: id,
                    expected: vec![rows, self.memory_size()],
                    got: stored.shape().to_vec(),
                    message: "记忆的行数须与当前小批量的行数一致".to_string(),
                });
            }
            stored.as_ref().clone()
        };

        let output = GraphData::matrix(memory)?.with_row_id(signal.row_id());
        let step = BackwardStep::MemoryFeed {
            writer: self.writer,
        };
        Ok(Advance::Fired(
            Emission::new(output, parents_of(source)).with_backward(step, scope.is_training),
        ))
    }

    fn check_update(&self, id: NodeId, update: &ParameterUpdate) -> Result<(), GraphError> {
        if update.slot != ParameterSlot::InitialMemory {
            return Err(GraphError::InvalidOperation(format!(
                "{id}是记忆节点，只有初始记忆参数"
            )));
        }
        if !self.initial.is_same_shape(&update.delta) {
            return Err(GraphError::ShapeMismatch {
                node: id,
                expected: self.initial.shape().to_vec(),
                got: update.delta.shape().to_vec(),
                message: "初始记忆更新量的形状须为[1, memory_size]".to_string(),
            });
        }
        Ok(())
    }

    fn apply_update(
        &mut self,
        id: NodeId,
        update: &ParameterUpdate,
        rate: f32,
    ) -> Result<(), GraphError> {
        self.check_update(id, update)?;
        self.initial = self.initial.checked_sub(&(&update.delta * rate))?;
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }
}

/// 记忆写入节点：把输入写进对应 MemoryFeeder 的记忆槽，并原样向下游传递
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryWriter {
    feeder: NodeId,
}

impl MemoryWriter {
    pub const fn new(feeder: NodeId) -> Self {
        Self { feeder }
    }

    pub const fn feeder(&self) -> NodeId {
        self.feeder
    }
}

impl TraitNode for MemoryWriter {
    fn type_tag(&self) -> &'static str {
        "MemoryWriter"
    }

    fn advance(
        &mut self,
        id: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        expect_channel(id, channel, 1)?;
        scope.memory.insert(self.feeder, signal.as_matrix()?);
        Ok(Advance::Fired(Emission::new(signal, parents_of(source))))
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }
}
