/*
 * @Author       : 老董
 * @Date         : 2026-01-28
 * @Description  : 输入节点：把小批量某个序列位置的输入原样送入图中
 */

use super::{Advance, Emission, ForwardScope, TraitNode, encode, expect_channel, parents_of};
use crate::nn::graph::{GraphData, GraphError, NodeId};
use serde::{Deserialize, Serialize};

/// 输入节点
///
/// `reversed`为真时，执行引擎在第`t`个序列位置送入的是第`count - t - 1`个位置的输入，
/// 用于双向循环网络的逆序分支。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Input {
    reversed: bool,
}

impl Input {
    pub const fn new(reversed: bool) -> Self {
        Self { reversed }
    }

    pub const fn is_reversed(&self) -> bool {
        self.reversed
    }
}

impl TraitNode for Input {
    fn type_tag(&self) -> &'static str {
        "Input"
    }

    fn advance(
        &mut self,
        id: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        _scope: &mut ForwardScope<'_>,
    ) -> Result<Advance, GraphError> {
        expect_channel(id, channel, 1)?;
        // 没有反向步骤：误差原样转交给来源（若有）
        Ok(Advance::Fired(Emission::new(signal, parents_of(source))))
    }

    fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        encode(self)
    }
}
