/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:31
 * @Description  : 张量的减法，要求两个张量形状严格一致
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::Sub;

impl Tensor {
    /// 逐元素相减，形状必须严格一致
    pub fn checked_sub(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::OperatorError {
                operator: Operator::Sub,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            });
        }
        Ok(Tensor::from_array(&self.data - &other.data))
    }
}

impl Sub for Tensor {
    type Output = Tensor;

    fn sub(self, other: Tensor) -> Tensor {
        &self - &other
    }
}
impl<'a> Sub<&'a Tensor> for &'a Tensor {
    type Output = Tensor;

    fn sub(self, other: &'a Tensor) -> Tensor {
        self.checked_sub(other).unwrap_or_else(|e| panic!("{}", e))
    }
}
