use super::sequences;
use crate::assert_panic;
use crate::data::{DataSource, MiniBatchProvider, TensorDataSource};
use crate::tensor::Tensor;
use std::collections::BTreeSet;

fn tabular(rows: usize) -> TensorDataSource {
    let features: Vec<f32> = (0..rows * 2).map(|x| x as f32).collect();
    TensorDataSource::new(
        Tensor::new(&features, &[rows, 2]),
        Tensor::zeros(&[rows, 1]),
    )
}

#[test]
fn test_buckets_partition_rows_by_length() {
    let lengths = [3, 1, 3, 2, 1, 3, 2];
    let source = sequences(&lengths);
    let buckets = source.get_buckets();
    assert_eq!(buckets, vec![vec![1, 4], vec![3, 6], vec![0, 2, 5]]);

    for bucket in &buckets {
        let len = lengths[bucket[0]];
        assert!(bucket.iter().all(|&row| lengths[row] == len));
    }
    let all: BTreeSet<usize> = buckets.iter().flatten().copied().collect();
    assert_eq!(all.len(), lengths.len());
    assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), lengths.len());
}

#[test]
fn test_batch_count_and_last_batch_size() {
    let source = tabular(10);
    let provider = MiniBatchProvider::new(&source, 4);
    assert_eq!(provider.batch_size(), 4);
    assert_eq!(provider.num_batches(), 3);

    let batches = provider.mini_batches().unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.row_count()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(batches[0].rows(), &[0, 1, 2, 3]);
    assert_eq!(
        batches[2].get(0).unwrap().input.tensor(),
        &Tensor::new(&[16., 17., 18., 19.], &[2, 2])
    );
}

#[test]
fn test_each_bucket_is_batched_separately() {
    let source = sequences(&[2, 2, 2, 3, 3]);
    let provider = MiniBatchProvider::new(&source, 2);
    // 长度2的桶：2 + 1，长度3的桶：2
    assert_eq!(provider.num_batches(), 3);
    let groups = provider.row_groups();
    assert_eq!(groups, vec![vec![0, 1], vec![2], vec![3, 4]]);
}

#[test]
fn test_seeded_shuffle_is_reproducible_and_stays_in_bucket() {
    let lengths = [1, 2, 1, 2, 1, 2, 1, 2, 3, 3];
    let source = sequences(&lengths);
    let first = MiniBatchProvider::new(&source, 3)
        .shuffle(true)
        .seed(9)
        .row_groups();
    let second = MiniBatchProvider::new(&source, 3)
        .shuffle(true)
        .seed(9)
        .row_groups();
    assert_eq!(first, second);

    for group in &first {
        let len = lengths[group[0]];
        assert!(group.iter().all(|&row| lengths[row] == len), "小批量跨桶：{group:?}");
    }
    let mut all: Vec<usize> = first.into_iter().flatten().collect();
    all.sort_unstable();
    assert_eq!(all, (0..lengths.len()).collect::<Vec<_>>());
}

#[test]
fn test_empty_source_yields_no_batches() {
    let source = tabular(0);
    let provider = MiniBatchProvider::new(&source, 4);
    assert_eq!(provider.num_batches(), 0);
    assert!(provider.mini_batches().unwrap().is_empty());
}

#[test]
fn test_zero_batch_size_panics() {
    let source = tabular(2);
    assert_panic!(
        MiniBatchProvider::new(&source, 0),
        "MiniBatchProvider: batch_size 必须大于 0"
    );
}
