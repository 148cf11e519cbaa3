/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:31
 * @Description  : 张量的加法，实现了两个形状严格一致的张量“逐元素”相加（或张量与纯数相加）的运算。
 *                 运算符版本在形状不一致时会panic；计算图内部统一使用返回`Result`的`checked_add`。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::{Add, AddAssign};

impl Tensor {
    /// 逐元素相加，形状必须严格一致
    pub fn checked_add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::OperatorError {
                operator: Operator::Add,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            });
        }
        Ok(Tensor::from_array(&self.data + &other.data))
    }

    /// 给矩阵的每一行都加上同一个`[1, cols]`的行向量（用于偏置）
    pub fn add_row_broadcast(&self, row: &Tensor) -> Result<Tensor, TensorError> {
        if row.shape() != [1, self.cols()] || self.dimension() != 2 {
            return Err(TensorError::OperatorError {
                operator: Operator::Add,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: row.shape().to_vec(),
            });
        }
        Ok(Tensor::from_array(&self.data + &row.data))
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 + f32↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Add<f32> for Tensor {
    type Output = Self;

    fn add(self, scalar: f32) -> Self {
        Self {
            data: &self.data + scalar,
        }
    }
}
impl Add<f32> for &Tensor {
    type Output = Tensor;

    fn add(self, scalar: f32) -> Tensor {
        Tensor {
            data: &self.data + scalar,
        }
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 + f32↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 +（不）带引用的张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Add for Tensor {
    type Output = Tensor;

    fn add(self, other: Tensor) -> Tensor {
        &self + &other
    }
}
impl<'a> Add<&'a Tensor> for &'a Tensor {
    type Output = Tensor;

    fn add(self, other: &'a Tensor) -> Tensor {
        self.checked_add(other).unwrap_or_else(|e| panic!("{}", e))
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 +（不）带引用的张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

impl AddAssign<&Tensor> for Tensor {
    fn add_assign(&mut self, other: &Tensor) {
        assert!(
            self.is_same_shape(other),
            "{}",
            TensorError::OperatorError {
                operator: Operator::AddAssign,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );
        self.data += &other.data;
    }
}
