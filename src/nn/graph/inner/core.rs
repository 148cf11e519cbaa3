/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : GraphInner 核心操作：创建、访问器、连线、单步激活
 */

use super::super::error::GraphError;
use super::super::types::{SequenceInfo, Wire};
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::graph::GraphData;
use crate::nn::learning::{ParameterUpdate, UpdateTarget};
use crate::nn::nodes::{Advance, ForwardScope, MemoryStore, Node, NodeKind, TraitNode};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

impl GraphInner {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("default_graph")
    }

    /// 创建一个带固定种子的计算图（确保参数初始化可重复）
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_name_and_seed("default_graph", seed)
    }

    /// 创建一个带名称和固定种子的计算图
    pub fn with_name_and_seed(name: &str, seed: u64) -> Self {
        let mut graph = Self::with_name(name);
        graph.rng = Some(StdRng::seed_from_u64(seed));
        graph
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: HashMap::new(),
            next_id: 0,
            inputs: Vec::new(),
            output: None,
            memory: MemoryStore::new(),
            rng: None,
        }
    }

    // ========== 基础访问器 ==========

    /// 设置/重置图的随机种子
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Some(StdRng::seed_from_u64(seed));
    }

    /// 检查图是否有固定种子
    pub const fn has_seed(&self) -> bool {
        self.rng.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 所有节点 ID（按创建顺序）
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.name() == name)
            .map(Node::id)
    }

    pub fn wires(&self, id: NodeId) -> Result<&[Wire], GraphError> {
        Ok(self.node(id)?.wires())
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub const fn output(&self) -> Option<NodeId> {
        self.output
    }

    /// 指定图的输出节点（损失在此处计算，反向传播从此处开始）
    pub fn set_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node(id)?;
        self.output = Some(id);
        Ok(())
    }

    // ========== 连线 ==========

    /// 从`from`向`to`的`channel`号输入通道连线
    pub fn connect(&mut self, from: NodeId, to: NodeId, channel: usize) -> Result<(), GraphError> {
        let channels = self.node(to)?.kind().channel_count();
        if channel >= channels {
            return Err(GraphError::ChannelMismatch {
                node: to,
                channel,
                message: format!("该节点只有{channels}个输入通道"),
            });
        }
        self.node_mut(from)?.add_wire(Wire::new(to, channel));
        Ok(())
    }

    /// 移除一条连线；返回是否确实移除了
    pub fn remove_wire(&mut self, from: NodeId, wire: Wire) -> Result<bool, GraphError> {
        Ok(self.node_mut(from)?.remove_wire(wire))
    }

    // ========== 执行 ==========

    /// 让`target`消费一条输入（前进一步）
    pub(crate) fn activate(
        &mut self,
        target: NodeId,
        signal: GraphData,
        channel: usize,
        source: Option<NodeId>,
        sequence: SequenceInfo,
        is_training: bool,
    ) -> Result<Advance, GraphError> {
        let node = self
            .nodes
            .get_mut(&target)
            .ok_or(GraphError::NodeNotFound(target))?;
        let mut scope = ForwardScope {
            sequence,
            is_training,
            memory: &mut self.memory,
        };
        node.kind_mut()
            .advance(target, signal, channel, source, &mut scope)
    }

    /// 清空各节点的暂存状态和循环记忆（每个小批量开始前调用）
    pub fn reset_transient_state(&mut self) {
        for node in self.nodes.values_mut() {
            node.kind_mut().reset_state();
        }
        self.memory.clear();
    }

    // ========== 节点 ID 与名称 ==========

    pub(in crate::nn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // 先递增再返回，所以第一个节点 ID 是 1
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::nn::graph) fn check_duplicate_node_name(
        &self,
        name: &str,
    ) -> Result<(), GraphError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(GraphError::DuplicateNodeName(format!(
                "节点{}在图{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    pub(in crate::nn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, GraphError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{node_type}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    /// 添加节点到节点表
    pub(in crate::nn::graph) fn add_node_to_list(
        &mut self,
        kind: NodeKind,
        name: Option<&str>,
        node_type: &str,
    ) -> Result<NodeId, GraphError> {
        let node_name = self.generate_valid_new_node_name(name.unwrap_or(""), node_type)?;
        let node_id = self.generate_valid_node_id();
        if matches!(kind, NodeKind::Input(_)) {
            self.inputs.push(node_id);
        }
        self.nodes
            .insert(node_id, Node::new(node_id, &node_name, kind));
        Ok(node_id)
    }
}

impl UpdateTarget for GraphInner {
    fn check_update(&self, update: &ParameterUpdate) -> Result<(), GraphError> {
        self.node(update.node)?.kind().check_update(update.node, update)
    }

    fn apply_update(&mut self, update: &ParameterUpdate, learning_rate: f32) -> Result<(), GraphError> {
        self.node_mut(update.node)?
            .kind_mut()
            .apply_update(update.node, update, learning_rate)
    }
}
