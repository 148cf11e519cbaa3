/*
 * @Author       : 老董
 * @Date         : 2026-01-28
 * @Description  : GraphData：沿连线流动的数据。对不透明张量的类型化封装，外加可选的行号标记
 */

use super::error::GraphError;
use crate::errors::TensorError;
use crate::tensor::Tensor;
use std::sync::Arc;

/// 张量的阶描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataShape {
    /// 形状`[rows, cols]`
    Matrix { rows: usize, cols: usize },
    /// 形状`[depth, rows, cols]`
    Tensor3D {
        depth: usize,
        rows: usize,
        cols: usize,
    },
    /// 形状`[count, depth, rows, cols]`，`count`通常为小批量中的样本数
    Tensor4D {
        count: usize,
        depth: usize,
        rows: usize,
        cols: usize,
    },
}

/// 图中流动的不可变数据
///
/// 张量以`Arc`共享：扇出到多条连线、记录进执行历史、捕获进反向步骤时都只增加引用计数，
/// 最后一个持有者释放时张量才被回收。
#[derive(Debug, Clone)]
pub struct GraphData {
    tensor: Arc<Tensor>,
    shape: DataShape,
    row_id: Option<usize>,
}

impl GraphData {
    /// 由张量的阶（2/3/4）推断数据类型
    pub fn new(tensor: Tensor) -> Result<Self, GraphError> {
        Self::from_shared(Arc::new(tensor))
    }

    /// 由已共享的张量创建（不复制数据）
    pub fn from_shared(tensor: Arc<Tensor>) -> Result<Self, GraphError> {
        let shape = match *tensor.shape() {
            [rows, cols] => DataShape::Matrix { rows, cols },
            [depth, rows, cols] => DataShape::Tensor3D { depth, rows, cols },
            [count, depth, rows, cols] => DataShape::Tensor4D {
                count,
                depth,
                rows,
                cols,
            },
            _ => {
                return Err(GraphError::InvalidOperation(format!(
                    "GraphData只支持2~4阶张量，但得到的形状为{:?}",
                    tensor.shape()
                )));
            }
        };
        Ok(Self {
            tensor,
            shape,
            row_id: None,
        })
    }

    /// 创建矩阵数据；非2阶张量返回错误
    pub fn matrix(tensor: Tensor) -> Result<Self, GraphError> {
        if tensor.dimension() != 2 {
            return Err(TensorError::NotMatrix {
                shape: tensor.shape().to_vec(),
            }
            .into());
        }
        Self::new(tensor)
    }

    /// 附加行号（用于把输出关联回小批量中的原始行）
    pub fn with_row_id(mut self, row_id: Option<usize>) -> Self {
        self.row_id = row_id;
        self
    }

    pub const fn shape(&self) -> DataShape {
        self.shape
    }

    pub const fn row_id(&self) -> Option<usize> {
        self.row_id
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// 共享底层张量（只增加引用计数）
    pub fn shared(&self) -> Arc<Tensor> {
        Arc::clone(&self.tensor)
    }

    /// 以矩阵形式取出数据：矩阵直接共享；3阶张量展平为一行；4阶张量按`count`展平为多行
    pub fn as_matrix(&self) -> Result<Arc<Tensor>, GraphError> {
        match self.shape {
            DataShape::Matrix { .. } => Ok(self.shared()),
            DataShape::Tensor3D { .. } => {
                let flat = Tensor::try_new(&self.tensor.to_vec(), &[1, self.tensor.size()])?;
                Ok(Arc::new(flat))
            }
            DataShape::Tensor4D { .. } => Ok(Arc::new(self.tensor.reshape_as_matrix()?)),
        }
    }

    /// 行数（矩阵的行、4阶张量的`count`、3阶张量视为1行）
    pub const fn rows(&self) -> usize {
        match self.shape {
            DataShape::Matrix { rows, .. } => rows,
            DataShape::Tensor3D { .. } => 1,
            DataShape::Tensor4D { count, .. } => count,
        }
    }

    /// 展平成矩阵后的列数
    pub fn cols(&self) -> usize {
        match self.shape {
            DataShape::Matrix { cols, .. } => cols,
            DataShape::Tensor3D { .. } => self.tensor.size(),
            DataShape::Tensor4D { depth, rows, cols, .. } => depth * rows * cols,
        }
    }

    /// 用同形状的新张量替换内容，保留行号
    pub fn replace_with(&self, tensor: Tensor) -> Result<Self, GraphError> {
        if tensor.shape() != self.tensor.shape() {
            return Err(TensorError::InconsitentShape.into());
        }
        Ok(Self {
            tensor: Arc::new(tensor),
            shape: self.shape,
            row_id: self.row_id,
        })
    }
}
