/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : GraphInner 节点构建方法（add_*）。只创建节点，连线另用`connect`
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::{
    Activation, ActivationKind, AddGate, FeedForward, Input, JoinGate, MemoryFeeder, MemoryWriter,
    MultiplyGate, NodeKind, ReverseTemporalJoin, TraitNode,
};
use crate::tensor::Tensor;

impl GraphInner {
    /// 以现成的节点类型创建节点（自动命名时使用其类型标签）
    pub fn add_node_from_kind(
        &mut self,
        kind: NodeKind,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node_type = kind.type_tag().to_lowercase();
        self.add_node_to_list(kind, name, &node_type)
    }

    /// 创建输入节点
    pub fn add_input(&mut self, name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(Input::new(false).into(), name, "input")
    }

    /// 创建逆序输入节点：第`t`个序列位置送入的是第`count - t - 1`个位置的输入
    pub fn add_reversed_input(&mut self, name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(Input::new(true).into(), name, "reversed_input")
    }

    /// 创建全连接节点，权重按 Xavier 均匀分布初始化，偏置为0
    pub fn add_feed_forward(
        &mut self,
        input_size: usize,
        output_size: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        if input_size == 0 || output_size == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "全连接节点的输入/输出维度须大于0，但得到{input_size}/{output_size}"
            )));
        }
        let weights = self.xavier(input_size, output_size);
        let bias = Tensor::zeros(&[1, output_size]);
        self.add_feed_forward_with(weights, bias, name)
    }

    /// 以给定的权重和偏置创建全连接节点
    pub fn add_feed_forward_with(
        &mut self,
        weights: Tensor,
        bias: Tensor,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = FeedForward::new(weights, bias)?;
        self.add_node_to_list(node.into(), name, "feed_forward")
    }

    pub fn add_activation(
        &mut self,
        kind: ActivationKind,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node_type = match kind {
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::Tanh => "tanh",
            ActivationKind::Relu => "relu",
        };
        self.add_node_to_list(Activation::new(kind).into(), name, node_type)
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓门↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// 创建加法门（0号、1号两个通道）
    pub fn add_add_gate(&mut self, name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(AddGate::new().into(), name, "add_gate")
    }

    /// 创建乘法门（0号、1号两个通道）
    pub fn add_multiply_gate(&mut self, name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(MultiplyGate::new().into(), name, "multiply_gate")
    }

    /// 创建 n 元拼接门，第 i 号通道的列宽为`widths[i]`
    pub fn add_join(
        &mut self,
        widths: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = JoinGate::new(widths.to_vec())?;
        self.add_node_to_list(node.into(), name, "join")
    }

    /// 创建逆序时间拼接节点：0号通道接正向分支，1号通道接逆向分支
    pub fn add_reverse_temporal_join(
        &mut self,
        forward_width: usize,
        reverse_width: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = ReverseTemporalJoin::new(forward_width, reverse_width)?;
        self.add_node_to_list(node.into(), name, "reverse_join")
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑门↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /// 创建记忆读取节点，`initial`为形状`[1, memory_size]`的初始记忆
    pub fn add_memory_feeder(
        &mut self,
        initial: Tensor,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = MemoryFeeder::new(initial)?;
        self.add_node_to_list(node.into(), name, "memory")
    }

    /// 创建记忆写入节点，并把它登记为`feeder`的写入者
    pub fn add_memory_writer(
        &mut self,
        feeder: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        if !matches!(self.node(feeder)?.kind(), NodeKind::MemoryFeeder(_)) {
            return Err(GraphError::InvalidOperation(format!(
                "{feeder}不是记忆读取节点，不能为其创建写入节点"
            )));
        }
        let writer = self.add_node_to_list(MemoryWriter::new(feeder).into(), name, "memory_writer")?;
        if let NodeKind::MemoryFeeder(node) = self.node_mut(feeder)?.kind_mut() {
            node.set_writer(writer);
        }
        Ok(writer)
    }

    fn xavier(&mut self, fan_in: usize, fan_out: usize) -> Tensor {
        match self.rng.as_mut() {
            Some(rng) => Tensor::new_xavier(fan_in, fan_out, rng),
            None => Tensor::new_xavier(fan_in, fan_out, &mut rand::thread_rng()),
        }
    }
}
