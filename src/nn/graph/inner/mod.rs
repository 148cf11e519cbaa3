/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : GraphInner 计算图的底层实现
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 基础操作、连线、激活
 * - node_builders.rs: add_*（单个节点的创建）
 * - recurrent.rs: 循环层、双向循环层的组装
 * - model_io.rs: 模型的保存/加载
 */

mod core;
mod model_io;
mod node_builders;
mod recurrent;

pub use model_io::{GraphModel, NodeModel};

use crate::nn::NodeId;
use crate::nn::nodes::{MemoryStore, Node};
use rand::rngs::StdRng;
use std::collections::HashMap;

/// 图的完整定义：节点表 + 输入/输出节点 + 循环记忆
///
/// 拓扑在构图阶段确定；此后连线只能被移除，不能被改指向。
#[derive(Debug)]
pub struct GraphInner {
    pub(in crate::nn::graph) name: String,
    pub(in crate::nn::graph) nodes: HashMap<NodeId, Node>,
    pub(in crate::nn::graph) next_id: u64,
    /// 按创建顺序排列的输入节点
    pub(in crate::nn::graph) inputs: Vec<NodeId>,
    pub(in crate::nn::graph) output: Option<NodeId>,
    /// 记忆节点在序列位置之间传递的状态
    pub(in crate::nn::graph) memory: MemoryStore,
    /// 图级别的随机数生成器（用于参数初始化）
    /// None 表示使用默认的 thread_rng（非确定性）
    pub(in crate::nn::graph) rng: Option<StdRng>,
}

impl Default for GraphInner {
    fn default() -> Self {
        Self::new()
    }
}
