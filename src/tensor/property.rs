/*
 * @Author       : 老董
 * @Date         : 2023-10-21 03:22:26
 * @Description  : 本类仅包含一些属性方法，不包含任何运算方法，所以不会需要用到mut
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:31
 */

use super::Tensor;
use crate::errors::TensorError;
use ndarray::{ArrayView2, ArrayViewD, Ix2};

impl Tensor {
    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    /// 以矩阵视图访问；非2阶张量返回错误
    pub fn matrix_view(&self) -> Result<ArrayView2<'_, f32>, TensorError> {
        self.data
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| TensorError::NotMatrix {
                shape: self.shape().to_vec(),
            })
    }

    /// 若为矩阵，`shape`为[行, 列]；若为更高维度的数组，`shape`可以是[c,n,m,...]。
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 张量的维（dim）数、阶（rank）数
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 计算张量中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 行数（即第0维的长度；标量视为1行）
    pub fn rows(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    /// 列数（即第1维的长度；向量和标量视为1列）
    pub fn cols(&self) -> usize {
        self.shape().get(1).copied().unwrap_or(1)
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 判断张量是否为标量
    pub fn is_scalar(&self) -> bool {
        self.shape().is_empty() || self.shape().iter().all(|x| *x == 1)
    }

    /// 转化为纯数（number）。若为标量，则返回Some(number)，否则返回None
    pub fn number(&self) -> Option<f32> {
        if self.is_scalar() {
            self.data.iter().next().copied()
        } else {
            None
        }
    }

    /// 按行优先顺序复制出所有元素
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// 读取矩阵中(row, col)处的元素
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.data.get(ndarray::IxDyn(&[row, col])).copied()
    }

    /// 取出某一行（形状为`[1, cols]`）
    pub fn row(&self, row: usize) -> Result<Tensor, TensorError> {
        let view = self.matrix_view()?;
        let data: Vec<f32> = view.row(row).iter().copied().collect();
        Tensor::try_new(&data, &[1, data.len()])
    }
}
