use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::{Axis, IxDyn, concatenate};

impl Tensor {
    /// 对张量中的所有元素求和
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// 所有元素的平方和
    pub fn sum_squares(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// 按列求和，得到形状为`[1, cols]`的行向量（用于偏置梯度）
    pub fn column_sums(&self) -> Result<Tensor, TensorError> {
        let view = self.matrix_view()?;
        let sums = view.sum_axis(Axis(0));
        let cols = sums.len();
        Ok(Tensor::from_array(sums.into_shape(IxDyn(&[1, cols])).map_err(
            |_| TensorError::NotMatrix {
                shape: self.shape().to_vec(),
            },
        )?))
    }

    /// 将`[1, cols]`的行向量复制为`[rows, cols]`的矩阵
    pub fn repeat_rows(&self, rows: usize) -> Result<Tensor, TensorError> {
        let view = self.matrix_view()?;
        if view.nrows() != 1 {
            return Err(TensorError::InconsitentShape);
        }
        let parts = vec![view; rows];
        let joined = concatenate(Axis(0), &parts).map_err(|_| TensorError::InconsitentShape)?;
        Ok(Tensor::from_array(joined.into_dyn()))
    }

    /// 按列拼接若干行数相同的矩阵（顺序即拼接顺序）
    pub fn concat_columns(parts: &[&Tensor]) -> Result<Tensor, TensorError> {
        let first = parts.first().ok_or(TensorError::EmptyList)?;
        let mut views = Vec::with_capacity(parts.len());
        for part in parts {
            if part.rows() != first.rows() {
                return Err(TensorError::OperatorError {
                    operator: Operator::ConcatColumns,
                    tensor1_shape: first.shape().to_vec(),
                    tensor2_shape: part.shape().to_vec(),
                });
            }
            views.push(part.matrix_view()?);
        }
        let joined = concatenate(Axis(1), &views).map_err(|_| TensorError::InconsitentShape)?;
        Ok(Tensor::from_array(joined.into_dyn()))
    }

    /// `concat_columns`的逆运算：按给定宽度依次把矩阵的列拆成若干段
    pub fn split_at_columns(&self, widths: &[usize]) -> Result<Vec<Tensor>, TensorError> {
        let view = self.matrix_view()?;
        let requested: usize = widths.iter().sum();
        if requested != view.ncols() {
            return Err(TensorError::ColumnSplitMismatch {
                requested,
                cols: view.ncols(),
            });
        }
        let mut offset = 0;
        let mut result = Vec::with_capacity(widths.len());
        for &width in widths {
            let slice = view.slice(ndarray::s![.., offset..offset + width]);
            result.push(Tensor::from_array(slice.to_owned().into_dyn()));
            offset += width;
        }
        Ok(result)
    }

    /// 把3阶/4阶张量按第0维展平为矩阵：`[count, 其余维度之积]`
    pub fn reshape_as_matrix(&self) -> Result<Tensor, TensorError> {
        let rows = self.rows();
        let cols = if rows == 0 { 0 } else { self.size() / rows };
        Tensor::try_new(&self.to_vec(), &[rows, cols])
    }

    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Tensor {
        Tensor::from_array(self.data.mapv(f))
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓激活函数↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn sigmoid(&self) -> Tensor {
        self.map(|x| 1.0 / (1.0 + (-x).exp()))
    }

    /// 以sigmoid的输出值`y`求导：y(1-y)
    pub fn sigmoid_derivative_from_output(&self) -> Tensor {
        self.map(|y| y * (1.0 - y))
    }

    pub fn tanh(&self) -> Tensor {
        self.map(f32::tanh)
    }

    /// 以tanh的输出值`y`求导：1-y²
    pub fn tanh_derivative_from_output(&self) -> Tensor {
        self.map(|y| 1.0 - y * y)
    }

    pub fn relu(&self) -> Tensor {
        self.map(|x| x.max(0.0))
    }

    /// 以relu的输出值求导：输出大于0处为1，否则为0
    pub fn relu_derivative_from_output(&self) -> Tensor {
        self.map(|y| if y > 0.0 { 1.0 } else { 0.0 })
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑激活函数↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}
