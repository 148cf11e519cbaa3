/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 模块的错误类型
 *
 * 除`InvalidState`外，这里的错误都属于“图装配错误”或“调用顺序错误”，
 * 本地无法恢复，应直接传播到训练/推理循环的调用方并中止本轮（epoch）。
 */

use crate::errors::TensorError;
use crate::nn::NodeId;
use thiserror::Error;

/// Graph 操作错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("{0}不存在")]
    NodeNotFound(NodeId),

    #[error("节点名称重复：{0}")]
    DuplicateNodeName(String),

    /// 连线指向了目标节点不存在的输入通道，或同一通道在一个激活周期内收到了两次数据
    #[error("{node}的第{channel}号输入通道有误：{message}")]
    ChannelMismatch {
        node: NodeId,
        channel: usize,
        message: String,
    },

    #[error("{node}形状不匹配：期望{expected:?}，实际{got:?}。{message}")]
    ShapeMismatch {
        node: NodeId,
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },

    /// 反向步骤把误差发往了不在本条执行历史父节点列表中的节点
    #[error("{from}的反向误差指向了不在其父节点列表中的{to}")]
    MissingWireTarget { from: NodeId, to: NodeId },

    #[error("第{row}行的序列长度为{got}，但同一小批量内的序列长度应为{expected}")]
    SequenceLengthMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// 逆序时间拼接节点在序列位置0清算时，误差表（或前向暂存表）缺少某个位置
    #[error("{node}缺少第{sequence_index}个序列位置的镜像数据（序列位置被丢失或重复）")]
    MissingReverseData { node: NodeId, sequence_index: usize },

    #[error("第{epoch}轮的参数更新已经全部应用，{node}的更新不能再排队")]
    UpdateAfterDrain { node: NodeId, epoch: usize },

    #[error("状态错误：{0}")]
    InvalidState(String),

    #[error("无效操作：{0}")]
    InvalidOperation(String),

    #[error("未注册的节点类型：{0}")]
    UnknownNodeType(String),

    #[error("序列化失败：{0}")]
    Serialization(String),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
