/*
 * @Author       : 老董
 * @Date         : 2026-01-31
 * @Description  : 节点序列化边界：每种节点以（类型标签，二进制负载）的形式持久化，
 *                 加载时由注册表按类型标签找到对应的构造函数
 */

use super::{
    Activation, AddGate, FeedForward, Input, JoinGate, MemoryFeeder, MemoryWriter, MultiplyGate,
    NodeKind, ReverseTemporalJoin,
};
use crate::nn::graph::GraphError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// 由二进制负载重建节点
pub type NodeConstructor = fn(&[u8]) -> Result<NodeKind, GraphError>;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, GraphError> {
    bincode::serialize(value).map_err(|e| GraphError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GraphError> {
    bincode::deserialize(bytes).map_err(|e| GraphError::Serialization(e.to_string()))
}

fn construct<T: DeserializeOwned + Into<NodeKind>>(bytes: &[u8]) -> Result<NodeKind, GraphError> {
    decode::<T>(bytes).map(Into::into)
}

/// 类型标签 -> 构造函数
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    constructors: HashMap<String, NodeConstructor>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册了所有内置节点类型的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("Input", construct::<Input>);
        registry.register("FeedForward", construct::<FeedForward>);
        registry.register("Activation", construct::<Activation>);
        registry.register("AddGate", construct::<AddGate>);
        registry.register("MultiplyGate", construct::<MultiplyGate>);
        registry.register("JoinGate", construct::<JoinGate>);
        registry.register("ReverseTemporalJoin", construct::<ReverseTemporalJoin>);
        registry.register("MemoryFeeder", construct::<MemoryFeeder>);
        registry.register("MemoryWriter", construct::<MemoryWriter>);
        registry
    }

    /// 注册（或覆盖）某个类型标签的构造函数
    pub fn register(&mut self, tag: &str, constructor: NodeConstructor) {
        self.constructors.insert(tag.to_string(), constructor);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    pub fn construct(&self, tag: &str, bytes: &[u8]) -> Result<NodeKind, GraphError> {
        let constructor = self
            .constructors
            .get(tag)
            .ok_or_else(|| GraphError::UnknownNodeType(tag.to_string()))?;
        constructor(bytes)
    }
}
