/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 误差度量：评估输出与目标的差距，并给出反向传播的初始误差
 */

use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorMetric {
    /// 0.5 · 每行平方误差之和的均值
    #[default]
    Quadratic,
    /// 均方根误差
    Rmse,
    /// 以0.5为阈值的二分类错误率（1 - 准确率）
    BinaryClassification,
}

impl ErrorMetric {
    pub fn compute(self, output: &Tensor, target: &Tensor) -> Result<f32, GraphError> {
        let diff = output.checked_sub(target)?;
        let rows = output.rows().max(1) as f32;
        Ok(match self {
            Self::Quadratic => 0.5 * diff.sum_squares() / rows,
            Self::Rmse => (diff.sum_squares() / output.size().max(1) as f32).sqrt(),
            Self::BinaryClassification => {
                let wrong = output
                    .to_vec()
                    .iter()
                    .zip(target.to_vec())
                    .filter(|(o, t)| (**o >= 0.5) != (*t >= 0.5))
                    .count();
                wrong as f32 / output.size().max(1) as f32
            }
        })
    }

    /// 误差对输出的梯度（按二次损失计算，各度量相同）：`output - target`
    pub fn gradient(self, output: &Tensor, target: &Tensor) -> Result<Tensor, GraphError> {
        Ok(output.checked_sub(target)?)
    }
}
