/*
 * @Author       : 老董
 * @Date         : 2026-02-08
 * @Description  : 与门（AND）端到端训练：Input(2) -> FeedForward(2->1) -> Sigmoid。
 *                 全批量、固定种子、延迟更新，每轮误差应单调不增
 */
use wire_torch::data::TensorDataSource;
use wire_torch::nn::{
    ActivationKind, ErrorMetric, GraphError, GraphInner, InferenceEngine, TrainingConfig,
    TrainingEngine,
};
use wire_torch::tensor::Tensor;

/// 输入: (0,0), (0,1), (1,0), (1,1)；输出: 0, 0, 0, 1
fn get_and_data() -> TensorDataSource {
    TensorDataSource::new(
        Tensor::new(&[0., 0., 0., 1., 1., 0., 1., 1.], &[4, 2]),
        Tensor::new(&[0., 0., 0., 1.], &[4, 1]),
    )
}

#[test]
fn test_and_gate() -> Result<(), GraphError> {
    let mut graph = GraphInner::new_with_seed(42);
    let x = graph.add_input(Some("x"))?;
    let linear = graph.add_feed_forward(2, 1, Some("linear"))?;
    let prob = graph.add_activation(ActivationKind::Sigmoid, Some("prob"))?;
    graph.connect(x, linear, 0)?;
    graph.connect(linear, prob, 0)?;
    graph.set_output(prob)?;

    let config = TrainingConfig::default()
        .batch_size(4)
        .learning_rate(0.5)
        .epochs(10)
        .stochastic(false)
        .deferred_updates(true)
        .seed(42);
    let mut engine = TrainingEngine::new(graph, config);
    let source = get_and_data();
    let errors = engine.train(&source)?;
    assert_eq!(errors.len(), 10);
    for (epoch, pair) in errors.windows(2).enumerate() {
        println!("第{}轮误差: {:.6}", epoch + 1, pair[0]);
        assert!(
            pair[1] <= pair[0] + 1e-6,
            "第{}轮误差上升：{} -> {}",
            epoch + 2,
            pair[0],
            pair[1]
        );
    }

    // 推理引擎得到的误差与最后一次更新后的参数一致（不应高于最后一轮训练误差）
    let mut graph = engine.into_graph();
    let mut inference = InferenceEngine::new(&mut graph, 4);
    let error = inference.evaluate(&source, ErrorMetric::Quadratic)?;
    assert!(error <= errors[9] + 1e-6, "推理误差{error}高于训练误差{}", errors[9]);
    Ok(())
}
