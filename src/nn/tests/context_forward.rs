use super::matrix;
use crate::assert_err;
use crate::nn::{
    ActivationKind, ContextState, GraphContext, GraphError, GraphInner, SequenceInfo, Wire,
};
use crate::tensor::Tensor;

#[test]
fn test_forward_fans_out_breadth_first() {
    let mut graph = GraphInner::new();
    // input ──> a ──> c
    //   └────> b
    let input = graph.add_input(Some("input")).unwrap();
    let a = graph.add_activation(ActivationKind::Relu, Some("a")).unwrap();
    let b = graph.add_activation(ActivationKind::Tanh, Some("b")).unwrap();
    let c = graph.add_activation(ActivationKind::Sigmoid, Some("c")).unwrap();
    graph.connect(input, a, 0).unwrap();
    graph.connect(input, b, 0).unwrap();
    graph.connect(a, c, 0).unwrap();

    let mut context = GraphContext::new(SequenceInfo::single(), false);
    context
        .seed(&mut graph, input, matrix(&[1., -2.], 1, 2))
        .unwrap();
    assert_eq!(context.state(), ContextState::Building);
    context.execute_all(&mut graph).unwrap();
    assert_eq!(context.state(), ContextState::Ready);

    // 广度优先：input 的两个子节点先于孙节点激活
    let order: Vec<_> = context.history().iter().map(|h| h.source).collect();
    assert_eq!(order, vec![input, a, b, c]);
    assert_eq!(context.last_source(), Some(c));

    assert_eq!(context.output(a).unwrap().tensor().to_vec(), vec![1., 0.]);
    let c_out = context.output(c).unwrap().tensor().to_vec();
    assert!((c_out[0] - 1.0 / (1.0 + (-1.0f32).exp())).abs() < 1e-6);
    assert!((c_out[1] - 0.5).abs() < 1e-6);

    // 父节点列表记录的是真实的来源
    assert!(context.entries_for(input)[0].parents.is_empty());
    assert_eq!(context.entries_for(c)[0].parents, vec![a]);
}

#[test]
fn test_inference_context_allocates_no_backward_steps() {
    let mut graph = GraphInner::new_with_seed(1);
    let input = graph.add_input(None).unwrap();
    let linear = graph.add_feed_forward(2, 3, None).unwrap();
    let act = graph.add_activation(ActivationKind::Sigmoid, None).unwrap();
    graph.connect(input, linear, 0).unwrap();
    graph.connect(linear, act, 0).unwrap();

    let mut inference = GraphContext::new(SequenceInfo::single(), false);
    inference
        .seed(&mut graph, input, matrix(&[1., 2., 3., 4.], 2, 2))
        .unwrap();
    inference.execute_all(&mut graph).unwrap();
    assert!(inference.history().iter().all(|h| h.backward.is_none()));

    let mut training = GraphContext::new(SequenceInfo::single(), true);
    training
        .seed(&mut graph, input, matrix(&[1., 2., 3., 4.], 2, 2))
        .unwrap();
    training.execute_all(&mut graph).unwrap();
    assert!(training.entries_for(linear)[0].backward.is_some());
    assert!(training.entries_for(act)[0].backward.is_some());
    // 输入节点没有反向步骤（误差原样转交）
    assert!(training.entries_for(input)[0].backward.is_none());

    // 两个上下文的输出一致
    assert_eq!(
        inference.output(act).unwrap().tensor(),
        training.output(act).unwrap().tensor()
    );
    assert_eq!(inference.output(act).unwrap().tensor().shape(), &[2, 3]);
}

#[test]
fn test_gate_waits_for_all_channels() {
    let mut graph = GraphInner::new();
    let x = graph.add_input(Some("x")).unwrap();
    let y = graph.add_input(Some("y")).unwrap();
    let gate = graph.add_add_gate(Some("sum")).unwrap();
    graph.connect(x, gate, 0).unwrap();
    graph.connect(y, gate, 1).unwrap();

    let mut context = GraphContext::new(SequenceInfo::single(), false);
    context.seed(&mut graph, x, matrix(&[1., 2.], 1, 2)).unwrap();
    context.execute_all(&mut graph).unwrap();
    // 只到了0号通道，门尚未激活
    assert!(context.output(gate).is_none());

    context.seed(&mut graph, y, matrix(&[10., 20.], 1, 2)).unwrap();
    context.execute_all(&mut graph).unwrap();
    let out = context.output(gate).unwrap();
    assert_eq!(out.tensor().to_vec(), vec![11., 22.]);
    assert_eq!(context.entries_for(gate)[0].parents, vec![x, y]);
}

#[test]
fn test_gate_rejects_same_channel_twice() {
    let mut graph = GraphInner::new();
    let x = graph.add_input(None).unwrap();
    let gate = graph.add_multiply_gate(None).unwrap();
    graph.connect(x, gate, 0).unwrap();

    let mut context = GraphContext::new(SequenceInfo::single(), false);
    context.seed(&mut graph, x, matrix(&[1.], 1, 1)).unwrap();
    context.execute_all(&mut graph).unwrap();
    context.seed(&mut graph, x, matrix(&[2.], 1, 1)).unwrap();
    assert_err!(context.execute_all(&mut graph), GraphError::ChannelMismatch(gate, 0));
}

#[test]
fn test_gate_rejects_shape_mismatch() {
    let mut graph = GraphInner::new();
    let x = graph.add_input(None).unwrap();
    let y = graph.add_input(None).unwrap();
    let gate = graph.add_add_gate(None).unwrap();
    graph.connect(x, gate, 0).unwrap();
    graph.connect(y, gate, 1).unwrap();

    let mut context = GraphContext::new(SequenceInfo::single(), false);
    context.seed(&mut graph, x, matrix(&[1., 2.], 1, 2)).unwrap();
    context.seed(&mut graph, y, matrix(&[1., 2.], 2, 1)).unwrap();
    assert_err!(
        context.execute_all(&mut graph),
        GraphError::ShapeMismatch([1, 2], [2, 1], "AddGate两个通道的形状必须相同")
    );
}

#[test]
fn test_connect_checks_channel_and_nodes() {
    let mut graph = GraphInner::new();
    let x = graph.add_input(None).unwrap();
    let act = graph.add_activation(ActivationKind::Relu, None).unwrap();
    let join = graph.add_join(&[1, 2, 3], None).unwrap();

    assert_err!(graph.connect(x, act, 1), GraphError::ChannelMismatch(act, 1));
    assert_err!(graph.connect(x, join, 3), GraphError::ChannelMismatch(join, 3));
    graph.connect(x, join, 2).unwrap();

    let ghost = crate::nn::NodeId(999);
    assert_err!(graph.connect(x, ghost, 0), GraphError::NodeNotFound(ghost));
    assert_err!(graph.connect(ghost, act, 0), GraphError::NodeNotFound(ghost));

    // 连线只能被移除
    assert!(graph.remove_wire(x, Wire::new(join, 2)).unwrap());
    assert!(!graph.remove_wire(x, Wire::new(join, 2)).unwrap());
    assert!(graph.wires(x).unwrap().is_empty());
}

#[test]
fn test_node_names_are_unique() {
    let mut graph = GraphInner::new();
    let a = graph.add_input(Some("x")).unwrap();
    assert_err!(
        graph.add_input(Some("x")),
        GraphError::DuplicateNodeName(msg) if msg.contains("x")
    );
    // 自动命名
    let b = graph.add_feed_forward(1, 1, None).unwrap();
    let c = graph.add_feed_forward(1, 1, None).unwrap();
    assert_eq!(graph.node(b).unwrap().name(), "feed_forward_1");
    assert_eq!(graph.node(c).unwrap().name(), "feed_forward_2");
    assert_eq!(graph.node_by_name("x"), Some(a));
    assert_eq!(graph.inputs(), &[a]);
    assert_eq!(
        format!("{}", graph.node(a).unwrap()),
        "节点[id=1, name=x, type=Input]"
    );
}

#[test]
fn test_feed_forward_rejects_wrong_width() {
    let mut graph = GraphInner::new();
    let x = graph.add_input(None).unwrap();
    let weights = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[3, 2]);
    let linear = graph
        .add_feed_forward_with(weights, Tensor::zeros(&[1, 2]), None)
        .unwrap();
    graph.connect(x, linear, 0).unwrap();

    let mut context = GraphContext::new(SequenceInfo::single(), false);
    context.seed(&mut graph, x, matrix(&[1., 1.], 1, 2)).unwrap();
    assert_err!(
        context.execute_all(&mut graph),
        GraphError::ShapeMismatch([1, 3], [1, 2], "FeedForward的输入列数须等于权重的行数")
    );

    assert_err!(
        graph.add_feed_forward_with(Tensor::zeros(&[3, 2]), Tensor::zeros(&[1, 3]), None),
        GraphError::InvalidOperation(_)
    );
}

#[test]
fn test_memory_feeder_requires_previous_position() {
    let mut graph = GraphInner::new();
    let x = graph.add_input(None).unwrap();
    let memory = graph
        .add_memory_feeder(Tensor::new(&[0.5, -0.5], &[1, 2]), Some("memory"))
        .unwrap();
    graph.connect(x, memory, 0).unwrap();

    // 位置0：读出按行复制的初始记忆
    let mut first = GraphContext::new(super::position(0, 2), false);
    first.seed(&mut graph, x, matrix(&[1., 2., 3.], 3, 1)).unwrap();
    first.execute_all(&mut graph).unwrap();
    assert_eq!(
        first.output(memory).unwrap().tensor().to_vec(),
        vec![0.5, -0.5, 0.5, -0.5, 0.5, -0.5]
    );

    // 位置1：没有写入节点写过记忆
    let mut second = GraphContext::new(super::position(1, 2), false);
    second.seed(&mut graph, x, matrix(&[1., 2., 3.], 3, 1)).unwrap();
    assert_err!(second.execute_all(&mut graph), GraphError::InvalidState(_));
}
