use super::{ChannelBuffer, expect_same_shape, sources_of};
use crate::nn::graph::{GraphData, GraphError, NodeId};
use crate::nn::nodes::{Advance, Emission, ForwardScope, TraitNode, encode};
use serde::{Deserialize, Serialize};

/// 加法门：两个通道逐元素相加（常用于残差连接）
///
/// 没有反向步骤：收到的误差原样转交给两个父节点。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddGate {
    #[serde(skip)]
    buffer: ChannelBuffer,
}

impl AddGate {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraitNode for AddGate {
    fn type_tag(&self) -> &'static str {
        "AddGate"
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
        _scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        let Some(arrivals) = self.buffer.accept(id, 2, channel, signal, source)? else {
            return Ok(Advance::Pending);
        };
        let (primary, secondary) = (&arrivals[0].data, &arrivals[1].data);
        expect_same_shape(id, primary, secondary, "AddGate两个通道的形状必须相同")?;

        let sum = primary.tensor().checked_add(secondary.tensor())?;
        let output = primary.replace_with(sum)?;
        Ok(Advance::Fired(Emission::new(output, sources_of(&arrivals))))
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }

    fn reset_state(&mut self) {
        self.buffer.clear();
    }
}
