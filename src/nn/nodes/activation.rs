/*
 * @Author       : 老董
 * @Date         : 2026-01-28
 * @Description  : 激活函数节点
 */

use super::{
    Advance, BackwardStep, Emission, ForwardScope, TraitNode, encode, expect_channel, parents_of,
};
use crate::nn::graph::{GraphData, GraphError, NodeId};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationKind {
    Sigmoid,
    Tanh,
    Relu,
}

impl ActivationKind {
    pub fn apply(self, x: &Tensor) -> Tensor {
        match self {
            Self::Sigmoid => x.sigmoid(),
            Self::Tanh => x.tanh(),
            Self::Relu => x.relu(),
        }
    }

    /// 以前向输出值计算导数
    pub fn derivative_from_output(self, y: &Tensor) -> Tensor {
        match self {
            Self::Sigmoid => y.sigmoid_derivative_from_output(),
            Self::Tanh => y.tanh_derivative_from_output(),
            Self::Relu => y.relu_derivative_from_output(),
        }
    }
}

/// 逐元素激活节点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    kind: ActivationKind,
}

impl Activation {
    pub const fn new(kind: ActivationKind) -> Self {
        Self { kind }
    }

    pub const fn kind(&self) -> ActivationKind {
        self.kind
    }
}

impl TraitNode for Activation {
    fn type_tag(&self) -> &'static str {
        "Activation"
    }

    fn advance(
        &mut self,
        id: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        expect_channel(id, channel, 1)?;
        let output = self.kind.apply(signal.tensor());
        let output = signal.replace_with(output)?;
        let step = BackwardStep::Activation {
            kind: self.kind,
            output: output.shared(),
        };
        Ok(Advance::Fired(
            Emission::new(output, parents_of(source)).with_backward(step, scope.is_training),
        ))
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }
}
