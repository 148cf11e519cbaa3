/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 模块的基础类型定义：节点 ID、连线、执行历史句柄、序列位置信息
 */

use crate::data::SequenceType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 节点在图中的唯一标识（由图按创建顺序分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "节点#{}", self.0)
    }
}

/// 连线：挂在源节点的输出列表上，指向（目标节点，输入通道）
///
/// 通道号用于区分多输入节点（如门节点的0号、1号通道）的逻辑输入槽位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    pub target: NodeId,
    pub channel: usize,
}

impl Wire {
    pub const fn new(target: NodeId, channel: usize) -> Self {
        Self { target, channel }
    }
}

/// 执行历史在上下文内的下标（前向时分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryHandle(pub usize);

/// 当前上下文所处的序列位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceInfo {
    /// 序列位置（时间步），从0开始
    pub index: usize,
    /// 本小批量的序列总长度
    pub count: usize,
    pub sequence_type: SequenceType,
}

impl SequenceInfo {
    /// 非序列数据：只有一个`Standard`位置
    pub const fn single() -> Self {
        Self {
            index: 0,
            count: 1,
            sequence_type: SequenceType::Standard,
        }
    }

    /// 与当前位置镜像对称的位置：`count - index - 1`
    pub const fn reversed_index(&self) -> usize {
        self.count - self.index - 1
    }
}

/// 上下文的前向/反向状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// 前向遍历进行中（仍有待扇出的历史条目）
    Building,
    /// 前向历史已完整
    Ready,
    /// 正在排空反向栈
    Backpropagating,
    /// 反向栈已排空；仍可接收后续（跨序列位置的）反向信号
    Done,
}
