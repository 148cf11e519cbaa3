/*
 * @Author       : 老董
 * @Date         : 2026-01-28
 * @Description  : 节点：图中的顶点。节点类型是一个封闭的枚举（每个变体携带自己的状态），
 *                 通过`enum_dispatch`分派“前进一步”（advance）等操作
 */

mod activation;
mod backward;
mod feed_forward;
mod gate;
mod input;
mod memory;
mod registry;

pub use activation::{Activation, ActivationKind};
pub use backward::{BackwardScope, BackwardStep, DeferredSignal};
pub use feed_forward::FeedForward;
pub use gate::{AddGate, JoinGate, MultiplyGate, ReverseTemporalJoin};
pub use input::Input;
pub use memory::{MemoryFeeder, MemoryWriter};
pub use registry::{NodeConstructor, NodeRegistry};
pub(crate) use registry::encode;

use super::graph::{GraphData, GraphError, NodeId, SequenceInfo, Wire};
use crate::nn::format_node_display;
use crate::nn::learning::ParameterUpdate;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 循环记忆：记忆节点 ID -> 上一个序列位置写入的记忆
pub type MemoryStore = HashMap<NodeId, Arc<Tensor>>;

#[enum_dispatch]
#[derive(Debug, Clone)]
pub enum NodeKind {
    Input,
    FeedForward,
    Activation,
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓门↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    AddGate,
    MultiplyGate,
    JoinGate,
    ReverseTemporalJoin,
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑门↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    MemoryFeeder,
    MemoryWriter,
}

#[enum_dispatch(NodeKind)]
pub trait TraitNode {
    /// 稳定的类型标签（持久化时用于在注册表中查找构造函数）
    fn type_tag(&self) -> &'static str;

    /// 输入通道数（连线只能指向`0..channel_count()`中的通道）
    fn channel_count(&self) -> usize {
        1
    }

    /// 前进一步：消费某个通道上的输入，产出输出（以及训练时的反向步骤）。
    /// 门节点在其它通道尚未到齐时返回`Advance::Pending`。
    fn advance(
        &mut self,
        id: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError>;

    /// 检查一条参数更新能否应用（槽位存在且形状一致），不修改参数
    fn check_update(&self, id: NodeId, _update: &ParameterUpdate) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!("{id}没有可训练参数")))
    }

    /// 应用一条参数更新（只有带参数的节点需要实现）
    fn apply_update(
        &mut self,
        id: NodeId,
        update: &ParameterUpdate,
        _rate: f32,
    ) -> Result<(), GraphError> {
        self.check_update(id, update)
    }

    /// 节点类型专有的二进制负载
    fn to_bytes(&self) -> Result<Vec<u8>, GraphError>;

    /// 清除一个激活周期内的暂存状态（门的通道缓冲、逆序拼接表等）
    fn reset_state(&mut self) {}
}

/// 前向时节点可以访问的外部状态
pub struct ForwardScope<'a> {
    pub sequence: SequenceInfo,
    pub is_training: bool,
    pub memory: &'a mut MemoryStore,
}

/// 一次激活的产物：输出数据、参与贡献的父节点、以及（训练时）反向步骤
#[derive(Debug, Clone)]
pub struct Emission {
    pub output: GraphData,
    pub parents: Vec<NodeId>,
    pub backward: Option<BackwardStep>,
}

impl Emission {
    pub fn new(output: GraphData, parents: Vec<NodeId>) -> Self {
        Self {
            output,
            parents,
            backward: None,
        }
    }

    /// 只在训练时附带反向步骤；推理上下文从不分配反向步骤
    pub fn with_backward(mut self, step: BackwardStep, is_training: bool) -> Self {
        if is_training {
            self.backward = Some(step);
        }
        self
    }
}

/// `advance`的结果
#[derive(Debug, Clone)]
pub enum Advance {
    /// 还在等待其它通道（或镜像序列位置）的数据
    Pending,
    /// 在当前上下文中产出一条执行历史
    Fired(Emission),
    /// 一次性为多个序列位置产出历史：`(序列位置, 产物)`
    FiredAt(Vec<(usize, Emission)>),
}

/// 图中的一个顶点：唯一 ID + 显示名 + 有序的输出连线 + 节点类型
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    wires: Vec<Wire>,
    kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: &str, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            wires: Vec::new(),
            kind,
        }
    }

    pub const fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    pub(crate) fn add_wire(&mut self, wire: Wire) {
        self.wires.push(wire);
    }

    /// 移除一条连线；返回是否确实移除了
    pub(crate) fn remove_wire(&mut self, wire: Wire) -> bool {
        match self.wires.iter().position(|w| *w == wire) {
            Some(pos) => {
                self.wires.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            format_node_display(self.id, &self.name, self.type_tag(), &self.wires)
        )
    }
}

/// 从单个（可选的）来源节点构造父节点列表
pub(crate) fn parents_of(source: Option<NodeId>) -> Vec<NodeId> {
    source.into_iter().collect()
}

pub(crate) fn expect_channel(id: NodeId, channel: usize, count: usize) -> Result<(), GraphError> {
    if channel >= count {
        return Err(GraphError::ChannelMismatch {
            node: id,
            channel,
            message: format!("该节点只有{count}个输入通道"),
        });
    }
    Ok(())
}

/// 取出矩阵形式的输入，并检查列数
pub(crate) fn expect_columns(
    id: NodeId,
    signal: &GraphData,
    cols: usize,
    message: &str,
) -> Result<Arc<Tensor>, GraphError> {
    let matrix = signal.as_matrix()?;
    if matrix.cols() != cols {
        return Err(GraphError::ShapeMismatch {
            node: id,
            expected: vec![matrix.rows(), cols],
            got: matrix.shape().to_vec(),
            message: message.to_string(),
        });
    }
    Ok(matrix)
}

