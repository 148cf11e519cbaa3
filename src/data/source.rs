/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 数据源：把表格中的行转换为小批量。
 *                 `TensorDataSource`持有非序列数据，`SequenceDataSource`持有变长序列
 */

use super::MiniBatch;
use crate::nn::{GraphData, GraphError};
use crate::tensor::Tensor;
use std::collections::BTreeMap;

pub trait DataSource {
    fn input_size(&self) -> usize;
    fn output_size(&self) -> usize;
    fn row_count(&self) -> usize;
    fn is_sequential(&self) -> bool;

    /// 某一行的序列长度（非序列数据为1）
    fn sequence_length(&self, _row: usize) -> usize {
        1
    }

    /// 按序列长度把所有行分桶，每个桶内长度一致；非序列数据只有一个桶
    fn get_buckets(&self) -> Vec<Vec<usize>> {
        let rows = 0..self.row_count();
        if !self.is_sequential() {
            return if rows.is_empty() {
                Vec::new()
            } else {
                vec![rows.collect()]
            };
        }
        let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for row in rows {
            buckets
                .entry(self.sequence_length(row))
                .or_default()
                .push(row);
        }
        buckets.into_values().collect()
    }

    /// 取出选中的行组成小批量
    fn get(&self, rows: &[usize]) -> Result<MiniBatch, GraphError>;
}

fn check_row(row: usize, len: usize) -> Result<(), GraphError> {
    if row >= len {
        return Err(GraphError::InvalidOperation(format!(
            "行号{row}越界，数据源只有{len}行"
        )));
    }
    Ok(())
}

/// 按行号从矩阵中取出若干行
fn gather_rows(source: &Tensor, rows: &[usize]) -> Result<Tensor, GraphError> {
    let cols = source.cols();
    let mut data = Vec::with_capacity(rows.len() * cols);
    for &row in rows {
        check_row(row, source.rows())?;
        data.extend(source.row(row)?.to_vec());
    }
    Ok(Tensor::try_new(&data, &[rows.len(), cols])?)
}

/// 只有一行时给数据打上行号
fn tag_row(data: GraphData, rows: &[usize]) -> GraphData {
    match rows {
        [row] => data.with_row_id(Some(*row)),
        _ => data,
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓非序列数据↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 持有特征和标签的非序列数据源
///
/// # 示例
/// ```ignore
/// let source = TensorDataSource::new(features, labels);
/// println!("样本数: {}", source.row_count());
/// ```
#[derive(Debug, Clone)]
pub struct TensorDataSource {
    features: Tensor,
    labels: Tensor,
}

impl TensorDataSource {
    /// - `features`: 形状`[样本数, input_size]`
    /// - `labels`: 形状`[样本数, output_size]`
    ///
    /// # Panics
    /// 如果不是矩阵，或 features 和 labels 的样本数不一致
    pub fn new(features: Tensor, labels: Tensor) -> Self {
        assert!(
            features.dimension() == 2 && labels.dimension() == 2,
            "TensorDataSource: features 和 labels 都必须是矩阵"
        );
        assert_eq!(
            features.rows(),
            labels.rows(),
            "TensorDataSource: features 和 labels 的样本数必须一致，得到 {} vs {}",
            features.rows(),
            labels.rows()
        );
        Self { features, labels }
    }

    pub const fn features(&self) -> &Tensor {
        &self.features
    }

    pub const fn labels(&self) -> &Tensor {
        &self.labels
    }
}

impl DataSource for TensorDataSource {
    fn input_size(&self) -> usize {
        self.features.cols()
    }

    fn output_size(&self) -> usize {
        self.labels.cols()
    }

    fn row_count(&self) -> usize {
        self.features.rows()
    }

    fn is_sequential(&self) -> bool {
        false
    }

    fn get(&self, rows: &[usize]) -> Result<MiniBatch, GraphError> {
        if rows.is_empty() {
            return Ok(MiniBatch::empty(false));
        }
        let input = tag_row(GraphData::matrix(gather_rows(&self.features, rows)?)?, rows);
        let target = tag_row(GraphData::matrix(gather_rows(&self.labels, rows)?)?, rows);
        Ok(MiniBatch::single(rows.to_vec(), input, Some(target)))
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑非序列数据↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓序列数据↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 序列的目标
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceTarget {
    /// 每个时间步都有目标（序列到序列）
    PerStep(Vec<Vec<f32>>),
    /// 只有最后一个时间步有目标（序列到一）
    Final(Vec<f32>),
}

/// 一条变长序列
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRow {
    pub inputs: Vec<Vec<f32>>,
    pub target: SequenceTarget,
}

impl SequenceRow {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SequenceDataSource {
    input_size: usize,
    output_size: usize,
    rows: Vec<SequenceRow>,
}

impl SequenceDataSource {
    pub const fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            rows: Vec::new(),
        }
    }

    /// 追加一条序列，检查各时间步的宽度
    pub fn push(&mut self, row: SequenceRow) -> Result<(), GraphError> {
        let index = self.rows.len();
        if row.is_empty() {
            return Err(GraphError::InvalidOperation(format!(
                "第{index}行是空序列"
            )));
        }
        if let Some(step) = row.inputs.iter().find(|s| s.len() != self.input_size) {
            return Err(GraphError::InvalidOperation(format!(
                "第{index}行的输入宽度为{}，但数据源的输入宽度为{}",
                step.len(),
                self.input_size
            )));
        }
        let targets: Vec<&Vec<f32>> = match &row.target {
            SequenceTarget::PerStep(steps) => {
                if steps.len() != row.len() {
                    return Err(GraphError::SequenceLengthMismatch {
                        row: index,
                        expected: row.len(),
                        got: steps.len(),
                    });
                }
                steps.iter().collect()
            }
            SequenceTarget::Final(target) => vec![target],
        };
        if let Some(target) = targets.iter().find(|t| t.len() != self.output_size) {
            return Err(GraphError::InvalidOperation(format!(
                "第{index}行的目标宽度为{}，但数据源的输出宽度为{}",
                target.len(),
                self.output_size
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_row(mut self, row: SequenceRow) -> Result<Self, GraphError> {
        self.push(row)?;
        Ok(self)
    }

    pub fn rows(&self) -> &[SequenceRow] {
        &self.rows
    }

    fn target_at(
        &self,
        rows: &[usize],
        step: usize,
        count: usize,
    ) -> Result<Option<GraphData>, GraphError> {
        let mut data = Vec::with_capacity(rows.len() * self.output_size);
        for &row in rows {
            match &self.rows[row].target {
                SequenceTarget::PerStep(steps) => data.extend_from_slice(&steps[step]),
                SequenceTarget::Final(target) if step + 1 == count => {
                    data.extend_from_slice(target);
                }
                SequenceTarget::Final(_) => {}
            }
        }
        if data.is_empty() {
            return Ok(None);
        }
        if data.len() != rows.len() * self.output_size {
            return Err(GraphError::InvalidOperation(
                "同一小批量内的序列须全部逐步给出目标，或全部只在末尾给出目标".to_string(),
            ));
        }
        let target = Tensor::try_new(&data, &[rows.len(), self.output_size])?;
        Ok(Some(tag_row(GraphData::matrix(target)?, rows)))
    }
}

impl DataSource for SequenceDataSource {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn is_sequential(&self) -> bool {
        true
    }

    fn sequence_length(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, SequenceRow::len)
    }

    fn get(&self, rows: &[usize]) -> Result<MiniBatch, GraphError> {
        let Some(&first) = rows.first() else {
            return Ok(MiniBatch::empty(true));
        };
        for &row in rows {
            check_row(row, self.rows.len())?;
        }
        let count = self.rows[first].len();
        if let Some(&row) = rows.iter().find(|&&r| self.rows[r].len() != count) {
            return Err(GraphError::SequenceLengthMismatch {
                row,
                expected: count,
                got: self.rows[row].len(),
            });
        }

        let mut steps = Vec::with_capacity(count);
        for step in 0..count {
            let mut data = Vec::with_capacity(rows.len() * self.input_size);
            for &row in rows {
                data.extend_from_slice(&self.rows[row].inputs[step]);
            }
            let input = Tensor::try_new(&data, &[rows.len(), self.input_size])?;
            let input = tag_row(GraphData::matrix(input)?, rows);
            steps.push((input, self.target_at(rows, step, count)?));
        }
        Ok(MiniBatch::new(rows.to_vec(), true, steps))
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑序列数据↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
