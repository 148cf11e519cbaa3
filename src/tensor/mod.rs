/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:31
 * @Description  : 计算图所用的参考数值后端。计算图本身只把张量当作不透明的值来传递，
 *                 节点实现才会调用这里的矩阵乘法、逐元素运算、按列拼接/拆分以及激活函数。
 */

use ndarray::{Array, ArrayD, IxDyn};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod ops {
    pub mod add;
    pub mod mat_mul;
    pub mod mul;
    pub mod others;
    pub mod sub;
}
mod property;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 计算图中流动的绝大多数张量都是矩阵：行对应小批量中的样本，列对应特征。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// 创建一个张量。`data`的长度必须和`shape`中所有元素的乘积相等，否则会panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        Self::try_new(data, shape).unwrap_or_else(|e| panic!("{}", e))
    }

    /// 与`new`相同，但以`Result`报告数据长度与形状不符的情况
    pub fn try_new(data: &[f32], shape: &[usize]) -> Result<Tensor, TensorError> {
        let data = Array::from_shape_vec(IxDyn(shape), data.to_vec()).map_err(|_| {
            TensorError::DataShapeMismatch {
                len: data.len(),
                shape: shape.to_vec(),
            }
        })?;
        Ok(Tensor { data })
    }

    /// 由若干等长的行构建矩阵
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Tensor, TensorError> {
        let first = rows.first().ok_or(TensorError::EmptyList)?;
        let cols = first.len();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(TensorError::InconsitentShape);
        }
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Self::try_new(&flat, &[rows.len(), cols])
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Tensor {
        Tensor {
            data: ArrayD::ones(IxDyn(shape)),
        }
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间。
    /// 随机数生成器由调用方提供，以便计算图用固定种子复现权重初始化。
    pub fn new_random<R: Rng + ?Sized>(min: f32, max: f32, shape: &[usize], rng: &mut R) -> Tensor {
        let uniform = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| uniform.sample(rng))
            .collect::<Vec<_>>();
        Tensor::new(&data, shape)
    }

    /// 以Xavier（Glorot）均匀分布初始化一个`[fan_in, fan_out]`的权重矩阵
    pub fn new_xavier<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Tensor {
        let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
        Self::new_random(-limit, limit, &[fan_in, fan_out], rng)
    }

    pub(crate) fn from_array(data: ArrayD<f32>) -> Tensor {
        Tensor { data }
    }
}
