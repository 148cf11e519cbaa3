/*
 * @Author       : 老董
 * @Date         : 2026-02-02
 * @Description  : 循环层组装
 *
 * 简单循环层（Elman）展开后由五个节点组成：
 *
 *   input ──0──> join ──> linear ──> tanh ──> writer
 *     └──> memory ──1──┘
 *
 * memory 在位置0读出可训练的初始记忆，之后读出上一位置 writer 写入的隐藏状态。
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::{ActivationKind, NodeKind};
use crate::tensor::Tensor;

impl GraphInner {
    /// 在`input`之后接一个简单循环层，返回隐藏状态（tanh）节点
    pub fn add_simple_recurrent(
        &mut self,
        input: NodeId,
        input_size: usize,
        memory_size: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.node(input)?;
        let sub_name = |suffix: &str| name.map(|n| format!("{n}_{suffix}"));

        let memory = self.add_memory_feeder(
            Tensor::zeros(&[1, memory_size]),
            sub_name("memory").as_deref(),
        )?;
        let join = self.add_join(&[input_size, memory_size], sub_name("join").as_deref())?;
        let linear = self.add_feed_forward(
            input_size + memory_size,
            memory_size,
            sub_name("linear").as_deref(),
        )?;
        let hidden = self.add_activation(ActivationKind::Tanh, sub_name("tanh").as_deref())?;
        let writer = self.add_memory_writer(memory, sub_name("writer").as_deref())?;

        self.connect(input, join, 0)?;
        self.connect(input, memory, 0)?;
        self.connect(memory, join, 1)?;
        self.connect(join, linear, 0)?;
        self.connect(linear, hidden, 0)?;
        self.connect(hidden, writer, 0)?;
        Ok(hidden)
    }

    /// 双向循环层：正向分支读`forward_input`，逆向分支读逆序输入`reverse_input`，
    /// 两者的隐藏状态经逆序时间拼接后按原始序列位置对齐。返回拼接节点
    pub fn add_bidirectional(
        &mut self,
        forward_input: NodeId,
        reverse_input: NodeId,
        input_size: usize,
        memory_size: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        match self.node(reverse_input)?.kind() {
            NodeKind::Input(input) if input.is_reversed() => {}
            _ => {
                return Err(GraphError::InvalidOperation(format!(
                    "双向循环层的逆向分支须接逆序输入节点，但{reverse_input}不是"
                )));
            }
        }
        let sub_name = |suffix: &str| name.map(|n| format!("{n}_{suffix}"));

        let forward = self.add_simple_recurrent(
            forward_input,
            input_size,
            memory_size,
            sub_name("forward").as_deref(),
        )?;
        let reverse = self.add_simple_recurrent(
            reverse_input,
            input_size,
            memory_size,
            sub_name("reverse").as_deref(),
        )?;
        let join =
            self.add_reverse_temporal_join(memory_size, memory_size, sub_name("join").as_deref())?;
        self.connect(forward, join, 0)?;
        self.connect(reverse, join, 1)?;
        Ok(join)
    }
}
