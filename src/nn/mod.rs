/*
 * @Author       : 老董
 * @Date         : 2024-01-31 20:23:53
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-06 10:12:40
 * @Description  : 负责神经网络（neural network）计算图的构建、执行与训练
 */

mod display;
pub mod engine;
mod graph;
pub mod learning;
pub mod nodes;

pub(in crate::nn) use display::format_node_display;
pub use engine::{
    ErrorMetric, ExecutionResult, InferenceEngine, SequenceRunner, TrainingConfig, TrainingEngine,
};
pub use graph::{
    ContextState, DataShape, ExecutionHistory, GraphContext, GraphData, GraphError, GraphInner,
    GraphModel, HistoryHandle, NodeId, NodeModel, RoutedEmission, SequenceInfo, Wire,
};
pub use learning::{LearningContext, ParameterSlot, ParameterUpdate, UpdateTarget};
pub use nodes::{ActivationKind, BackwardStep, DeferredSignal, Node, NodeKind, NodeRegistry};

#[cfg(test)]
mod tests;
