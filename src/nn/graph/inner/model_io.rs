/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : GraphInner 模型 I/O（save_model/load_model）
 *
 * 每个节点以（类型标签，二进制负载）的形式保存，连同连线、输入/输出节点一起
 * 组成`GraphModel`。加载时由`NodeRegistry`按类型标签重建节点。
 * - `{path}.bin`: bincode 编码的完整模型
 * - `to_json()`: 可读的拓扑描述（负载不展开）
 */

use super::super::error::GraphError;
use super::super::types::Wire;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::{Node, NodeRegistry, TraitNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 单个节点的持久化形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: NodeId,
    pub name: String,
    pub type_tag: String,
    pub payload: Vec<u8>,
    pub wires: Vec<Wire>,
}

/// 整张图的持久化形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    pub name: String,
    pub nodes: Vec<NodeModel>,
    pub inputs: Vec<NodeId>,
    pub output: Option<NodeId>,
}

impl GraphModel {
    pub fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        bincode::serialize(self).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        bincode::deserialize(bytes).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    /// 可读的拓扑描述（不含节点负载）
    pub fn to_json(&self) -> Result<String, GraphError> {
        let mut topology = self.clone();
        for node in &mut topology.nodes {
            node.payload.clear();
        }
        serde_json::to_string_pretty(&topology)
            .map_err(|e| GraphError::Serialization(format!("序列化图描述失败: {e}")))
    }
}

impl GraphInner {
    /// 生成图的持久化形式
    pub fn to_model(&self) -> Result<GraphModel, GraphError> {
        let nodes = self
            .nodes()
            .into_iter()
            .map(|id| {
                let node = self.node(id)?;
                Ok(NodeModel {
                    id,
                    name: node.name().to_string(),
                    type_tag: node.type_tag().to_string(),
                    payload: node.kind().to_bytes()?,
                    wires: node.wires().to_vec(),
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;
        Ok(GraphModel {
            name: self.name.clone(),
            nodes,
            inputs: self.inputs.clone(),
            output: self.output,
        })
    }

    /// 由持久化形式重建图。连线目标必须都在模型中
    pub fn from_model(model: &GraphModel, registry: &NodeRegistry) -> Result<Self, GraphError> {
        let mut graph = Self::with_name(&model.name);
        let mut nodes = HashMap::with_capacity(model.nodes.len());
        for node_model in &model.nodes {
            let kind = registry.construct(&node_model.type_tag, &node_model.payload)?;
            let mut node = Node::new(node_model.id, &node_model.name, kind);
            for wire in &node_model.wires {
                node.add_wire(*wire);
            }
            if nodes.insert(node_model.id, node).is_some() {
                return Err(GraphError::Serialization(format!(
                    "模型中{}出现了两次",
                    node_model.id
                )));
            }
        }
        for node in nodes.values() {
            if let Some(wire) = node.wires().iter().find(|w| !nodes.contains_key(&w.target)) {
                return Err(GraphError::MissingWireTarget {
                    from: node.id(),
                    to: wire.target,
                });
            }
        }
        for id in model.inputs.iter().chain(model.output.iter()) {
            if !nodes.contains_key(id) {
                return Err(GraphError::NodeNotFound(*id));
            }
        }

        graph.next_id = nodes.keys().map(|id| id.0).max().unwrap_or(0);
        graph.nodes = nodes;
        graph.inputs = model.inputs.clone();
        graph.output = model.output;
        Ok(graph)
    }

    /// 保存完整模型到`{path}.bin`
    ///
    /// # 示例
    /// ```ignore
    /// graph.save_model("models/rnn")?;
    /// // 生成：models/rnn.bin
    /// ```
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let bin_path = path.as_ref().with_extension("bin");
        let bytes = self.to_model()?.to_bytes()?;
        std::fs::write(&bin_path, bytes)
            .map_err(|e| GraphError::Serialization(format!("写入模型文件失败: {e}")))?;
        log::debug!("模型已保存到{}", bin_path.display());
        Ok(())
    }

    /// 从`{path}.bin`加载完整模型
    pub fn load_model<P: AsRef<Path>>(path: P, registry: &NodeRegistry) -> Result<Self, GraphError> {
        let bin_path = path.as_ref().with_extension("bin");
        let bytes = std::fs::read(&bin_path)
            .map_err(|e| GraphError::Serialization(format!("读取模型文件失败: {e}")))?;
        Self::from_model(&GraphModel::from_bytes(&bytes)?, registry)
    }
}
