/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:31
 * @Description  : 张量与纯数的乘法，以及两个同形状张量的逐元素（Hadamard）乘法
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::Mul;

impl Tensor {
    /// 逐元素相乘（⊙），形状必须严格一致
    pub fn pointwise_mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::OperatorError {
                operator: Operator::PointwiseMul,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            });
        }
        Ok(Tensor::from_array(&self.data * &other.data))
    }
}

impl Mul<f32> for Tensor {
    type Output = Tensor;

    fn mul(self, scalar: f32) -> Tensor {
        Tensor {
            data: self.data * scalar,
        }
    }
}
impl Mul<f32> for &Tensor {
    type Output = Tensor;

    fn mul(self, scalar: f32) -> Tensor {
        Tensor {
            data: &self.data * scalar,
        }
    }
}
impl Mul<&Tensor> for f32 {
    type Output = Tensor;

    fn mul(self, tensor: &Tensor) -> Tensor {
        tensor * self
    }
}
