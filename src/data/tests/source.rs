use super::sequences;
use crate::assert_err;
use crate::data::{
    DataSource, SequenceDataSource, SequenceRow, SequenceTarget, SequenceType, TensorDataSource,
};
use crate::nn::GraphError;
use crate::tensor::Tensor;

#[test]
fn test_tensor_source_single_position() {
    let source = TensorDataSource::new(
        Tensor::new(&[1., 2., 3., 4., 5., 6.], &[3, 2]),
        Tensor::new(&[0., 1., 0.], &[3, 1]),
    );
    assert_eq!(source.input_size(), 2);
    assert_eq!(source.output_size(), 1);
    assert!(!source.is_sequential());

    let batch = source.get(&[2, 0]).unwrap();
    assert!(!batch.is_sequential());
    assert_eq!(batch.sequence_len(), 1);
    let step = batch.get(0).unwrap();
    assert_eq!(step.sequence_type, SequenceType::Standard);
    assert_eq!(step.input.tensor().to_vec(), vec![5., 6., 1., 2.]);
    assert_eq!(step.input.row_id(), None);
    assert_eq!(step.target.as_ref().unwrap().tensor().to_vec(), vec![0., 0.]);

    let single = source.get(&[1]).unwrap();
    assert_eq!(single.get(0).unwrap().input.row_id(), Some(1));

    assert!(source.get(&[]).unwrap().is_empty());
    assert_err!(source.get(&[3]), GraphError::InvalidOperation(_));
}

#[test]
fn test_sequence_positions_are_tagged() {
    let source = sequences(&[3, 3, 1]);
    let batch = source.get(&[0, 1]).unwrap();
    let types: Vec<SequenceType> = batch.sequence().iter().map(|s| s.sequence_type).collect();
    assert_eq!(
        types,
        vec![SequenceType::Start, SequenceType::Standard, SequenceType::End]
    );
    assert_eq!(batch.get(1).unwrap().input.tensor().to_vec(), vec![0., 1.]);

    // 长度为1的序列只有一个 Start 位置
    let batch = source.get(&[2]).unwrap();
    assert_eq!(batch.sequence_len(), 1);
    assert_eq!(batch.get(0).unwrap().sequence_type, SequenceType::Start);
}

#[test]
fn test_mixed_lengths_in_one_batch_are_rejected() {
    let source = sequences(&[2, 3]);
    assert_err!(
        source.get(&[0, 1]),
        GraphError::SequenceLengthMismatch {
            row: 1,
            expected: 2,
            got: 3
        }
    );
}

#[test]
fn test_final_target_only_on_last_position() {
    let source = SequenceDataSource::new(1, 1)
        .with_row(SequenceRow {
            inputs: vec![vec![1.], vec![2.], vec![3.]],
            target: SequenceTarget::Final(vec![6.]),
        })
        .unwrap();
    let batch = source.get(&[0]).unwrap();
    assert!(batch.get(0).unwrap().target.is_none());
    assert!(batch.get(1).unwrap().target.is_none());
    let last = batch.get(2).unwrap().target.as_ref().unwrap();
    assert_eq!(last.tensor().to_vec(), vec![6.]);
    assert_eq!(last.row_id(), Some(0));
}

#[test]
fn test_push_validates_rows() {
    let mut source = SequenceDataSource::new(2, 1);
    assert_err!(
        source.push(SequenceRow {
            inputs: vec![],
            target: SequenceTarget::Final(vec![0.]),
        }),
        GraphError::InvalidOperation(_)
    );
    assert_err!(
        source.push(SequenceRow {
            inputs: vec![vec![1.]],
            target: SequenceTarget::Final(vec![0.]),
        }),
        GraphError::InvalidOperation(_)
    );
    assert_err!(
        source.push(SequenceRow {
            inputs: vec![vec![1., 2.], vec![3., 4.]],
            target: SequenceTarget::PerStep(vec![vec![0.]]),
        }),
        GraphError::SequenceLengthMismatch {
            row: 0,
            expected: 2,
            got: 1
        }
    );
    assert_eq!(source.row_count(), 0);
}
