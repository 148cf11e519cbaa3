/*
 * @Author       : 老董
 * @Date         : 2026-01-29
 * @Description  : 门节点：必须在所有已配置的输入通道上都收到数据后才激活。
 *                 部分到达的数据按通道号暂存在`ChannelBuffer`中
 */

mod add;
mod join;
mod multiply;
mod reverse_join;

pub use add::AddGate;
pub use join::JoinGate;
pub use multiply::MultiplyGate;
pub use reverse_join::ReverseTemporalJoin;

use crate::nn::graph::{GraphData, GraphError, NodeId};

/// 某个通道上已到达的数据及其来源
#[derive(Debug, Clone)]
pub(crate) struct Arrival {
    pub data: GraphData,
    pub source: Option<NodeId>,
}

/// 一个激活周期内的通道表：通道号 -> 已到达的数据
#[derive(Debug, Clone, Default)]
pub(crate) struct ChannelBuffer {
    slots: Vec<Option<Arrival>>,
}

impl ChannelBuffer {
    /// 记录一个通道的到达。所有`channels`个通道都到齐时，按通道顺序取出全部数据并清空表，
    /// 否则返回`None`
    pub fn accept(
        &mut self,
        node: NodeId,
        channels: usize,
        channel: usize,
        data: GraphData,
        source: Option<NodeId>,
    ) -> Result<Option<Vec<Arrival>>, GraphError> {
        super::expect_channel(node, channel, channels)?;
        if self.slots.len() != channels {
            self.slots = vec![None; channels];
        }
        if self.slots[channel].is_some() {
            return Err(GraphError::ChannelMismatch {
                node,
                channel,
                message: "同一激活周期内该通道收到了两次数据".to_string(),
            });
        }
        self.slots[channel] = Some(Arrival { data, source });

        if self.slots.iter().all(Option::is_some) {
            let arrivals = self.slots.iter_mut().filter_map(Option::take).collect();
            Ok(Some(arrivals))
        } else {
            Ok(None)
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// 所有到达数据的来源节点（按通道顺序，跳过直接注入的通道）
pub(crate) fn sources_of(arrivals: &[Arrival]) -> Vec<NodeId> {
    arrivals.iter().filter_map(|a| a.source).collect()
}

/// 逐通道的来源：下标即通道号
pub(crate) fn channel_sources(arrivals: &[Arrival]) -> Vec<Option<NodeId>> {
    arrivals.iter().map(|a| a.source).collect()
}

/// 二元门要求两侧形状严格一致
pub(crate) fn expect_same_shape(
    node: NodeId,
    primary: &GraphData,
    secondary: &GraphData,
    message: &str,
) -> Result<(), GraphError> {
    if primary.tensor().shape() != secondary.tensor().shape() {
        return Err(GraphError::ShapeMismatch {
            node,
            expected: primary.tensor().shape().to_vec(),
            got: secondary.tensor().shape().to_vec(),
            message: message.to_string(),
        });
    }
    Ok(())
}
