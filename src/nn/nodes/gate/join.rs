use super::{ChannelBuffer, channel_sources, sources_of};
use crate::nn::graph::{GraphData, GraphError, NodeId};
use crate::nn::nodes::{Advance, BackwardStep, Emission, ForwardScope, TraitNode, encode};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// n 元拼接门：把各通道的矩阵按通道顺序按列拼接
///
/// 反向时按同样的宽度、同样的顺序把误差矩阵的列拆回各通道。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGate {
    widths: Vec<usize>,
    #[serde(skip)]
    buffer: ChannelBuffer,
}

impl JoinGate {
    pub fn new(widths: Vec<usize>) -> Result<Self, GraphError> {
        if widths.is_empty() || widths.contains(&0) {
            return Err(GraphError::InvalidOperation(format!(
                "JoinGate至少需要1个通道且每个通道宽度须大于0，但得到{widths:?}"
            )));
        }
        Ok(Self {
            widths,
            buffer: ChannelBuffer::default(),
        })
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn output_size(&self) -> usize {
        self.widths.iter().sum()
    }
}

impl TraitNode for JoinGate {
    fn type_tag(&self) -> &'static str {
        "JoinGate"
    }

    fn channel_count(&self) -> usize {
        self.widths.len()
    }

    fn advance(
        &mut self,
        id: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        let channels = self.widths.len();
        let Some(arrivals) = self.buffer.accept(id, channels, channel, signal, source)? else {
            return Ok(Advance::Pending);
        };

        let mut matrices = Vec::with_capacity(channels);
        for (ch, (arrival, &width)) in arrivals.iter().zip(&self.widths).enumerate() {
            let matrix = arrival.data.as_matrix()?;
            if matrix.cols() != width {
                return Err(GraphError::ChannelMismatch {
                    node: id,
                    channel: ch,
                    message: format!("该通道配置的宽度为{width}，但收到了{}列", matrix.cols()),
                });
            }
            matrices.push(matrix);
        }
        let parts: Vec<&Tensor> = matrices.iter().map(|m| m.as_ref()).collect();
        let joined = Tensor::concat_columns(&parts)?;
        let output = GraphData::matrix(joined)?.with_row_id(arrivals[0].data.row_id());

        let step = BackwardStep::Split {
            widths: self.widths.clone(),
            sources: channel_sources(&arrivals),
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
