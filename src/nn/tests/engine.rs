use super::{matrix, parameter};
use crate::assert_err;
use crate::data::{MiniBatch, SequenceDataSource, SequenceRow, SequenceTarget, TensorDataSource};
use crate::nn::engine::{ErrorMetric, InferenceEngine, TrainingConfig, TrainingEngine};
use crate::nn::{GraphError, GraphInner, ParameterSlot};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

#[test]
fn test_config_from_json_fills_defaults() {
    let config = TrainingConfig::from_json(r#"{"batch_size": 4, "seed": 7}"#).unwrap();
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.seed, Some(7));
    assert_eq!(config.learning_rate, 0.1);
    assert_eq!(config.epochs, 10);
    assert!(config.stochastic);
    assert!(config.deferred_updates);
    assert_eq!(config.error_metric, ErrorMetric::Quadratic);

    let json = config.clone().schedule(3, 0.01).to_json().unwrap();
    let restored = TrainingConfig::from_json(&json).unwrap();
    assert_eq!(restored.learning_rate_schedule.get(&3), Some(&0.01));
    assert_eq!(restored.batch_size, 4);

    assert_err!(
        TrainingConfig::from_json(r#"{"batch_size": 0}"#),
        GraphError::InvalidOperation(_)
    );
    assert_err!(TrainingConfig::from_json("不是json"), GraphError::Serialization(_));
}

#[test]
fn test_error_metrics() {
    let output = Tensor::new(&[0.5, 1.0], &[2, 1]);
    let target = Tensor::new(&[0.0, 1.0], &[2, 1]);
    assert_abs_diff_eq!(
        ErrorMetric::Quadratic.compute(&output, &target).unwrap(),
        0.0625,
        epsilon = 1e-6
    );
    assert_abs_diff_eq!(
        ErrorMetric::Rmse.compute(&output, &target).unwrap(),
        0.125f32.sqrt(),
        epsilon = 1e-6
    );
    assert_abs_diff_eq!(
        ErrorMetric::BinaryClassification
            .compute(&output, &target)
            .unwrap(),
        0.5,
        epsilon = 1e-6
    );
    assert_eq!(
        ErrorMetric::Rmse.gradient(&output, &target).unwrap(),
        Tensor::new(&[0.5, 0.0], &[2, 1])
    );
    assert!(ErrorMetric::Quadratic
        .compute(&output, &Tensor::zeros(&[1, 1]))
        .is_err());
}

/// y = x·[1, 2]ᵀ + 0.5
fn linear_graph() -> GraphInner {
    let mut graph = GraphInner::new();
    let input = graph.add_input(None).unwrap();
    let ff = graph
        .add_feed_forward_with(
            Tensor::new(&[1., 2.], &[2, 1]),
            Tensor::new(&[0.5], &[1, 1]),
            Some("ff"),
        )
        .unwrap();
    graph.connect(input, ff, 0).unwrap();
    graph.set_output(ff).unwrap();
    graph
}

#[test]
fn test_inference_engine_outputs_in_row_order() {
    let mut graph = linear_graph();
    let source = TensorDataSource::new(
        Tensor::new(&[1., 0., 0., 1., 1., 1.], &[3, 2]),
        Tensor::new(&[1.5, 2.5, 0.0], &[3, 1]),
    );
    let mut engine = InferenceEngine::new(&mut graph, 2);
    let results = engine.execute(&source).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].rows, vec![0, 1]);
    assert_eq!(results[0].output.tensor().to_vec(), vec![1.5, 2.5]);
    assert_eq!(results[0].output.row_id(), None);
    assert_eq!(results[1].rows, vec![2]);
    assert_eq!(results[1].output.tensor().to_vec(), vec![3.5]);
    // 单行小批量带行号
    assert_eq!(results[1].output.row_id(), Some(2));

    // 只有最后一行有误差：0.5 * 3.5² / 3行
    let error = engine.evaluate(&source, ErrorMetric::Quadratic).unwrap();
    assert_abs_diff_eq!(error, 0.5 * 3.5 * 3.5 / 3.0, epsilon = 1e-5);
}

#[test]
fn test_failed_batch_leaves_parameters_untouched() {
    let graph = linear_graph();
    let ff = graph.node_by_name("ff").unwrap();
    let before = parameter(&graph, ff, ParameterSlot::Weights);
    let mut engine = TrainingEngine::new(graph, TrainingConfig::default().batch_size(1));

    // 目标宽度与输出不符
    let batch = MiniBatch::single(
        vec![0],
        matrix(&[1., 1.], 1, 2),
        Some(matrix(&[1., 2.], 1, 2)),
    );
    assert!(engine.train_batch(&batch).is_err());
    assert_eq!(engine.learning().pending_count(), 0);
    assert_eq!(parameter(engine.graph(), ff, ParameterSlot::Weights), before);

    // 正常的小批量会更新参数
    let batch = MiniBatch::single(vec![0], matrix(&[1., 1.], 1, 2), Some(matrix(&[0.], 1, 1)));
    let error = engine.train_batch(&batch).unwrap();
    assert_abs_diff_eq!(error, 0.5 * 3.5 * 3.5, epsilon = 1e-5);
    assert_ne!(parameter(engine.graph(), ff, ParameterSlot::Weights), before);
    assert_eq!(engine.learning().pending_count(), 0);
}

/// 序列到一：目标为最后一个时间步输入的两倍，序列长度2或3
fn final_target_source() -> SequenceDataSource {
    let mut source = SequenceDataSource::new(1, 1);
    let seqs: [&[f32]; 6] = [
        &[0.1, 0.5],
        &[0.3, -0.2, 0.4],
        &[-0.5, 0.2],
        &[0.7, 0.1, -0.3],
        &[0.2, -0.6],
        &[-0.1, 0.3, 0.6],
    ];
    for seq in seqs {
        let last = *seq.last().unwrap();
        source
            .push(SequenceRow {
                inputs: seq.iter().map(|x| vec![*x]).collect(),
                target: SequenceTarget::Final(vec![2. * last]),
            })
            .unwrap();
    }
    source
}

#[test]
fn test_recurrent_sequence_to_one_training_reduces_error() {
    let mut graph = GraphInner::new_with_seed(17);
    let input = graph.add_input(None).unwrap();
    let hidden = graph.add_simple_recurrent(input, 1, 4, Some("rnn")).unwrap();
    let out = graph.add_feed_forward(4, 1, Some("out")).unwrap();
    graph.connect(hidden, out, 0).unwrap();
    graph.set_output(out).unwrap();

    let config = TrainingConfig::default()
        .batch_size(3)
        .learning_rate(0.3)
        .epochs(40)
        .stochastic(false)
        .seed(1);
    let mut engine = TrainingEngine::new(graph, config);
    let source = final_target_source();
    let errors = engine.train(&source).unwrap();
    assert_eq!(errors.len(), 40);
    assert!(errors[39] < errors[0], "误差没有下降：{errors:?}");
    assert_eq!(engine.learning().current_epoch(), 40);
}

#[test]
fn test_bidirectional_sequence_to_one_training_runs() {
    let mut graph = GraphInner::new_with_seed(19);
    let forward = graph.add_input(None).unwrap();
    let reverse = graph.add_reversed_input(None).unwrap();
    let join = graph.add_bidirectional(forward, reverse, 1, 2, None).unwrap();
    let out = graph.add_feed_forward(4, 1, Some("out")).unwrap();
    graph.connect(join, out, 0).unwrap();
    graph.set_output(out).unwrap();

    let config = TrainingConfig::default()
        .batch_size(2)
        .learning_rate(0.2)
        .epochs(5)
        .stochastic(true)
        .seed(3);
    let mut engine = TrainingEngine::new(graph, config);
    let errors = engine.train(&final_target_source()).unwrap();
    assert_eq!(errors.len(), 5);
    assert!(errors.iter().all(|e| e.is_finite()));
}
