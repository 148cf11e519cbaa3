use super::{ChannelBuffer, expect_same_shape, sources_of};
use crate::nn::graph::{GraphData, GraphError, NodeId};
use crate::nn::nodes::{Advance, BackwardStep, Emission, ForwardScope, TraitNode, encode};
use serde::{Deserialize, Serialize};

/// 乘法门：两个通道逐元素相乘（用于门控）
///
/// 反向：发往0号通道来源的误差为`error ⊙ secondary`，发往1号通道来源的为`error ⊙ primary`；
/// 直接注入（没有来源）的通道不接收误差。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiplyGate {
    #[serde(skip)]
    buffer: ChannelBuffer,
}

impl MultiplyGate {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraitNode for MultiplyGate {
    fn type_tag(&self) -> &'static str {
        "MultiplyGate"
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
        scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        let Some(arrivals) = self.buffer.accept(id, 2, channel, signal, source)? else {
            return Ok(Advance::Pending);
        };
        let (primary, secondary) = (&arrivals[0].data, &arrivals[1].data);
        expect_same_shape(id, primary, secondary, "MultiplyGate两个通道的形状必须相同")?;

        let product = primary.tensor().pointwise_mul(secondary.tensor())?;
        let output = primary.replace_with(product)?;
        let step = BackwardStep::Multiply {
            primary: primary.shared(),
            secondary: secondary.shared(),
            sources: [arrivals[0].source, arrivals[1].source],
        };
        Ok(Advance::Fired(
            Emission::new(output, sources_of(&arrivals)).with_backward(step, scope.is_training),
        ))
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }

    fn reset_state(&mut self) {
        self.buffer.clear();
    }
}
