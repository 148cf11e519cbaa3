//! # Wire Torch
//!
//! `wire_torch`是一个用纯rust实现的计算图执行引擎：由节点和连线组成有向图，
//! 把小批量数据（含变长的循环序列）逐个序列位置推过图，前向时记录可回放的执行历史，
//! 再逆序回放历史完成反向传播（含跨时间步的 BPTT 与双向循环的逆序拼接），
//! 并由学习上下文批量、延迟地应用参数更新。
//!

pub mod data;
pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
