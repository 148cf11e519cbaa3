mod provider;
mod source;

use super::{SequenceDataSource, SequenceRow, SequenceTarget};

/// 按给定长度构造序列数据源（输入宽度1、逐步目标），第 i 行各步的输入都是 i
fn sequences(lengths: &[usize]) -> SequenceDataSource {
    let mut source = SequenceDataSource::new(1, 1);
    for (row, &len) in lengths.iter().enumerate() {
        source
            .push(SequenceRow {
                inputs: vec![vec![row as f32]; len],
                target: SequenceTarget::PerStep(vec![vec![0.0]; len]),
            })
            .unwrap();
    }
    source
}
