use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    // 需要2阶张量（矩阵）的运算
    #[error("该运算只接受2阶张量（矩阵），但得到的形状为{shape:?}")]
    NotMatrix { shape: Vec<usize> },
    // 按列拆分
    #[error("按列拆分失败：各段宽度之和为{requested}，但张量只有{cols}列")]
    ColumnSplitMismatch { requested: usize, cols: usize },
    // 数据长度与形状
    #[error("数据长度{len}与形状{shape:?}不符")]
    DataShapeMismatch { len: usize, shape: Vec<usize> },

    #[error("张量列表为空")]
    EmptyList,
    #[error("张量形状不一致")]
    InconsitentShape,
}
