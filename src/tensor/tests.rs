use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_mat_mul() {
    let a = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let b = Tensor::new(&[1., 0., 0., 1., 1., 1.], &[3, 2]);
    let c = a.mat_mul(&b).unwrap();
    assert_eq!(c, Tensor::new(&[4., 5., 10., 11.], &[2, 2]));

    // 列数与行数不符
    assert_eq!(
        a.mat_mul(&a),
        Err(TensorError::OperatorError {
            operator: Operator::MatMul,
            tensor1_shape: vec![2, 3],
            tensor2_shape: vec![2, 3],
        })
    );
}

#[test]
fn test_transpose() {
    let a = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let t = a.transpose();
    assert_eq!(t.shape(), &[3, 2]);
    assert_eq!(t.to_vec(), vec![1., 4., 2., 5., 3., 6.]);
}

#[test]
fn test_concat_then_split_columns() {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    let b = Tensor::new(&[5., 6.], &[2, 1]);
    let c = Tensor::new(&[7., 8., 9., 10., 11., 12.], &[2, 3]);
    let joined = Tensor::concat_columns(&[&a, &b, &c]).unwrap();
    assert_eq!(joined.shape(), &[2, 6]);
    assert_eq!(
        joined.to_vec(),
        vec![1., 2., 5., 7., 8., 9., 3., 4., 6., 10., 11., 12.]
    );

    let parts = joined.split_at_columns(&[2, 1, 3]).unwrap();
    assert_eq!(parts, vec![a, b, c]);

    assert_eq!(
        joined.split_at_columns(&[2, 2]),
        Err(TensorError::ColumnSplitMismatch {
            requested: 4,
            cols: 6
        })
    );
}

#[test]
fn test_column_sums_and_repeat_rows() {
    let a = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[3, 2]);
    assert_eq!(a.column_sums().unwrap(), Tensor::new(&[9., 12.], &[1, 2]));

    let row = Tensor::new(&[1., 2.], &[1, 2]);
    assert_eq!(
        row.repeat_rows(3).unwrap(),
        Tensor::new(&[1., 2., 1., 2., 1., 2.], &[3, 2])
    );
}

#[test]
fn test_pointwise_and_operators() {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    let b = Tensor::new(&[2., 2., 0.5, -1.], &[2, 2]);
    assert_eq!(
        a.pointwise_mul(&b).unwrap(),
        Tensor::new(&[2., 4., 1.5, -4.], &[2, 2])
    );
    assert_eq!(&a + &b, Tensor::new(&[3., 4., 3.5, 3.], &[2, 2]));
    assert_eq!(&a - &b, Tensor::new(&[-1., 0., 2.5, 5.], &[2, 2]));
    assert_eq!(&a * 2.0, Tensor::new(&[2., 4., 6., 8.], &[2, 2]));
    assert!(a.checked_add(&Tensor::zeros(&[1, 2])).is_err());
}

#[test]
fn test_activations() {
    let a = Tensor::new(&[0., 2., -2.], &[1, 3]);
    let s = a.sigmoid();
    assert_abs_diff_eq!(s.get(0, 0).unwrap(), 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(s.get(0, 1).unwrap(), 0.880_797, epsilon = 1e-5);
    assert_abs_diff_eq!(
        s.sigmoid_derivative_from_output().get(0, 0).unwrap(),
        0.25,
        epsilon = 1e-6
    );
    assert_eq!(a.relu().to_vec(), vec![0., 2., 0.]);
    assert_abs_diff_eq!(a.tanh().get(0, 2).unwrap(), (-2f32).tanh(), epsilon = 1e-6);
}

#[test]
fn test_random_with_seed_is_reproducible() {
    let mut rng1 = StdRng::seed_from_u64(7);
    let mut rng2 = StdRng::seed_from_u64(7);
    let a = Tensor::new_xavier(3, 4, &mut rng1);
    let b = Tensor::new_xavier(3, 4, &mut rng2);
    assert_eq!(a, b);
    assert_eq!(a.shape(), &[3, 4]);
    let limit = (6.0f32 / 7.0).sqrt();
    assert!(a.to_vec().iter().all(|x| x.abs() <= limit));
}

#[test]
fn test_reshape_as_matrix() {
    let a = Tensor::new(&(0..24).map(|x| x as f32).collect::<Vec<_>>(), &[2, 3, 4]);
    let m = a.reshape_as_matrix().unwrap();
    assert_eq!(m.shape(), &[2, 12]);
}
