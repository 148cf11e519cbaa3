//! 数据加载模块
//!
//! 把表格数据按行切分为小批量，送入计算图。
//!
//! # 主要组件
//!
//! - [`DataSource`]: 数据源接口（行数、输入/输出宽度、分桶、取小批量）
//! - [`TensorDataSource`]: 持有特征和标签的非序列数据源
//! - [`SequenceDataSource`]: 持有变长序列的数据源
//! - [`MiniBatchProvider`]: 按桶切分小批量的加载器
//! - [`MiniBatch`]: 选中的行 + 各序列位置的输入/目标
//!
//! # 使用示例
//!
//! ```ignore
//! use wire_torch::data::{MiniBatchProvider, TensorDataSource};
//!
//! let source = TensorDataSource::new(train_x, train_y);
//! let provider = MiniBatchProvider::new(&source, 32)
//!     .shuffle(true)
//!     .seed(42);
//!
//! for batch in provider.iter() {
//!     engine.train_batch(&batch?)?;
//! }
//! ```

mod mini_batch;
mod provider;
mod source;

#[cfg(test)]
mod tests;

// Re-exports
pub use mini_batch::{MiniBatch, MiniBatchSequence, SequenceType};
pub use provider::MiniBatchProvider;
pub use source::{DataSource, SequenceDataSource, SequenceRow, SequenceTarget, TensorDataSource};
