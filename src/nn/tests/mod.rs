mod context_forward;
mod engine;
mod reverse_join;

use crate::nn::{GraphData, GraphInner, NodeKind, ParameterSlot, SequenceInfo};
use crate::tensor::Tensor;

/// 构造矩阵数据
fn matrix(data: &[f32], rows: usize, cols: usize) -> GraphData {
    GraphData::matrix(Tensor::new(data, &[rows, cols])).unwrap()
}

/// 序列中第`index`个位置（共`count`个）的位置信息
fn position(index: usize, count: usize) -> SequenceInfo {
    SequenceInfo {
        index,
        count,
        sequence_type: crate::data::SequenceType::for_position(index, count, true),
    }
}

/// 读出节点的某组参数
fn parameter(graph: &GraphInner, node: crate::nn::NodeId, slot: ParameterSlot) -> Tensor {
    match (graph.node(node).unwrap().kind(), slot) {
        (NodeKind::FeedForward(ff), ParameterSlot::Weights) => ff.weights().clone(),
        (NodeKind::FeedForward(ff), ParameterSlot::Bias) => ff.bias().clone(),
        (NodeKind::MemoryFeeder(m), ParameterSlot::InitialMemory) => m.initial().clone(),
        (kind, slot) => panic!("{kind:?}没有{slot:?}参数"),
    }
}
