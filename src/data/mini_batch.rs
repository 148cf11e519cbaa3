/*
 * @Author       : 老董
 * @Date         : 2026-02-04
 * @Description  : 小批量：选中的行，以及按时间步排列的各序列位置的输入/目标
 */

use crate::nn::GraphData;
use serde::{Deserialize, Serialize};

/// 序列位置的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceType {
    Start,
    Standard,
    End,
}

impl SequenceType {
    /// 非序列数据只有一个`Standard`位置；序列数据首位为`Start`（长度为1时也是）、末位为`End`
    pub const fn for_position(index: usize, count: usize, is_sequential: bool) -> Self {
        if !is_sequential {
            Self::Standard
        } else if index == 0 {
            Self::Start
        } else if index + 1 == count {
            Self::End
        } else {
            Self::Standard
        }
    }
}

/// 小批量中的一个序列位置
#[derive(Debug, Clone)]
pub struct MiniBatchSequence {
    pub index: usize,
    pub sequence_type: SequenceType,
    pub input: GraphData,
    /// 该位置没有目标（如“序列到一”任务的中间位置）时为`None`
    pub target: Option<GraphData>,
}

#[derive(Debug, Clone)]
pub struct MiniBatch {
    rows: Vec<usize>,
    is_sequential: bool,
    sequence: Vec<MiniBatchSequence>,
}

impl MiniBatch {
    /// 由各时间步的（输入，目标）构造，自动标注序列位置类别
    pub fn new(
        rows: Vec<usize>,
        is_sequential: bool,
        steps: Vec<(GraphData, Option<GraphData>)>,
    ) -> Self {
        let count = steps.len();
        let sequence = steps
            .into_iter()
            .enumerate()
            .map(|(index, (input, target))| MiniBatchSequence {
                index,
                sequence_type: SequenceType::for_position(index, count, is_sequential),
                input,
                target,
            })
            .collect();
        Self {
            rows,
            is_sequential,
            sequence,
        }
    }

    /// 非序列数据：恰好一个`Standard`位置
    pub fn single(rows: Vec<usize>, input: GraphData, target: Option<GraphData>) -> Self {
        Self::new(rows, false, vec![(input, target)])
    }

    /// 不含任何行的小批量（不产生任何计算）
    pub const fn empty(is_sequential: bool) -> Self {
        Self {
            rows: Vec::new(),
            is_sequential,
            sequence: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.sequence.is_empty()
    }

    pub const fn is_sequential(&self) -> bool {
        self.is_sequential
    }

    pub fn sequence(&self) -> &[MiniBatchSequence] {
        &self.sequence
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    pub fn get(&self, index: usize) -> Option<&MiniBatchSequence> {
        self.sequence.get(index)
    }
}
