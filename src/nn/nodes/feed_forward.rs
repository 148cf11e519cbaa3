/*
 * @Author       : 老董
 * @Date         : 2026-01-28
 * @Description  : 全连接节点：y = x·W + b
 */

use super::{
    Advance, BackwardStep, Emission, ForwardScope, TraitNode, encode, expect_channel,
    expect_columns, parents_of,
};
use crate::nn::graph::{GraphData, GraphError, NodeId};
use crate::nn::learning::{ParameterSlot, ParameterUpdate};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 全连接（线性）节点
///
/// - `weights`: 形状`[input_size, output_size]`
/// - `bias`: 形状`[1, output_size]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForward {
    weights: Tensor,
    bias: Tensor,
}

impl FeedForward {
    pub fn new(weights: Tensor, bias: Tensor) -> Result<Self, GraphError> {
        if weights.dimension() != 2 || bias.shape() != [1, weights.cols()] {
            return Err(GraphError::InvalidOperation(format!(
                "FeedForward的权重须为2阶张量且偏置形状须为[1, 输出维度]，但得到权重{:?}、偏置{:?}",
                weights.shape(),
                bias.shape()
            )));
        }
        Ok(Self { weights, bias })
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.cols()
    }

    pub const fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub const fn bias(&self) -> &Tensor {
        &self.bias
    }
}

impl TraitNode for FeedForward {
    fn type_tag(&self) -> &'static str {
        "FeedForward"
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
        let input = expect_columns(
            id,
            &signal,
            self.input_size(),
            "FeedForward的输入列数须等于权重的行数",
        )?;
        let output = input.mat_mul(&self.weights)?.add_row_broadcast(&self.bias)?;
        let output = GraphData::matrix(output)?.with_row_id(signal.row_id());
        Ok(Advance::Fired(
            Emission::new(output, parents_of(source))
                .with_backward(BackwardStep::FeedForward { input }, scope.is_training),
        ))
    }

    fn check_update(&self, id: NodeId, update: &ParameterUpdate) -> Result<(), GraphError> {
        let target = match update.slot {
            ParameterSlot::Weights => &self.weights,
            ParameterSlot::Bias => &self.bias,
            ParameterSlot::InitialMemory => {
                return Err(GraphError::InvalidOperation(format!(
                    "{id}是全连接节点，没有初始记忆参数"
                )));
            }
        };
        if !target.is_same_shape(&update.delta) {
            return Err(GraphError::ShapeMismatch {
                node: id,
                expected: target.shape().to_vec(),
                got: update.delta.shape().to_vec(),
                message: "参数更新量的形状须与参数一致".to_string(),
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
        let target = match update.slot {
            ParameterSlot::Bias => &mut self.bias,
            _ => &mut self.weights,
        };
        *target = target.checked_sub(&(&update.delta * rate))?;
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }
}
