use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

impl Tensor {
    /// 实现矩阵乘法。只接受2阶张量，
    /// 且需要保证前一个张量的列数（col）等于后一个张量的行数（row）。
    pub fn mat_mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let self_data = self.matrix_view()?;
        let other_data = other.matrix_view()?;
        if self.cols() != other.rows() {
            return Err(TensorError::OperatorError {
                operator: Operator::MatMul,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            });
        }
        let result_data = self_data.dot(&other_data);
        Ok(Tensor::from_array(result_data.into_dyn()))
    }

    /// 矩阵转置；非矩阵则原样返回副本
    pub fn transpose(&self) -> Tensor {
        if self.dimension() != 2 {
            return self.clone();
        }
        Tensor::from_array(self.data.t().as_standard_layout().into_owned())
    }
}
