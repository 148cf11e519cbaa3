/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 模块：计算图的核心实现
 *
 * 公开 API：
 * - `GraphInner`: 节点与连线的容器（含构图 API、循环层组装、模型持久化）
 * - `GraphContext`: 单个序列位置上的前向/反向执行上下文
 * - `GraphData`: 沿连线流动的数据
 * - `GraphError`: 错误类型
 */

mod context;
mod data;
mod error;
mod inner;
mod types;

pub use context::{ExecutionHistory, GraphContext, RoutedEmission};
pub use data::{DataShape, GraphData};
pub use error::GraphError;
pub use inner::{GraphInner, GraphModel, NodeModel};
pub use types::{ContextState, HistoryHandle, NodeId, SequenceInfo, Wire};
