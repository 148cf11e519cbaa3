use super::matrix;
use crate::assert_err;
use crate::data::MiniBatch;
use crate::nn::engine::SequenceRunner;
use crate::nn::nodes::NodeKind;
use crate::nn::{GraphError, GraphInner, LearningContext, NodeId};
use crate::tensor::Tensor;

/// 三个位置的单列序列：10, 20, 30
fn three_steps() -> MiniBatch {
    let steps = [10., 20., 30.]
        .iter()
        .map(|x| (matrix(&[*x], 1, 1), None))
        .collect();
    MiniBatch::new(vec![0], true, steps)
}

/// 两个普通输入分别接到逆序拼接的两个通道
fn mirrored_graph() -> (GraphInner, NodeId, NodeId, NodeId) {
    let mut graph = GraphInner::new();
    let a = graph.add_input(Some("a")).unwrap();
    let b = graph.add_input(Some("b")).unwrap();
    let join = graph.add_reverse_temporal_join(1, 1, None).unwrap();
    graph.connect(a, join, 0).unwrap();
    graph.connect(b, join, 1).unwrap();
    graph.set_output(join).unwrap();
    (graph, a, b, join)
}

#[test]
fn test_forward_pairs_each_position_with_its_mirror() {
    let (mut graph, _, _, join) = mirrored_graph();
    let runner = SequenceRunner::forward(&mut graph, &three_steps(), true).unwrap();
    assert_eq!(runner.len(), 3);

    // 位置t的输出 = [正向在t的数据, 逆向分支在镜像位置(2 - t)送入的数据]
    let expected = [[10., 30.], [20., 20.], [30., 10.]];
    for (t, pair) in expected.iter().enumerate() {
        let output = runner.output_at(&graph, t).unwrap();
        assert_eq!(output.tensor(), &Tensor::new(pair, &[1, 2]));
        assert_eq!(runner.contexts()[t].entries_for(join).len(), 1);
    }

    // 配齐后暂存表已清空
    match graph.node(join).unwrap().kind() {
        NodeKind::ReverseTemporalJoin(j) => assert_eq!(j.stashed(), (0, 0)),
        other => panic!("意外的节点类型{other:?}"),
    }
}

#[test]
fn test_partial_sequence_stays_pending() {
    let (mut graph, _, _, join) = mirrored_graph();
    let batch = MiniBatch::new(vec![0], true, vec![(matrix(&[1.], 1, 1), None)]);
    // 长度为1的序列在同一位置即可配齐
    let runner = SequenceRunner::forward(&mut graph, &batch, false).unwrap();
    assert_eq!(
        runner.output_at(&graph, 0).unwrap().tensor(),
        &Tensor::new(&[1., 1.], &[1, 2])
    );
    assert_eq!(runner.contexts()[0].entries_for(join).len(), 1);
}

#[test]
fn test_backward_sends_reverse_slice_to_mirrored_position() {
    let (mut graph, a, b, join) = mirrored_graph();
    let mut runner = SequenceRunner::forward(&mut graph, &three_steps(), true).unwrap();
    let errors: Vec<Option<Tensor>> = (0..3)
        .map(|t| {
            let t = t as f32;
            Some(Tensor::new(&[t + 1., -(t + 1.)], &[1, 2]))
        })
        .collect();
    let mut learning = LearningContext::new(0.1, 1);
    let passes = runner.backward(&mut graph, &mut learning, errors).unwrap();
    // 每个位置先回放一次，位置0清算后每个位置再收到一次逆向误差
    assert_eq!(passes, 6);

    for t in 0..3 {
        let context = &runner.contexts()[t];
        assert_eq!(
            context.error_signal(a),
            Some(&Tensor::new(&[t as f32 + 1.], &[1, 1]))
        );
        // 位置t上的逆向分支数据被拼接到了位置2 - t
        let mirrored = (2 - t) as f32;
        assert_eq!(
            context.error_signal(b),
            Some(&Tensor::new(&[-(mirrored + 1.)], &[1, 1]))
        );
        assert!(context.error_signal(join).is_some());
    }
}

#[test]
fn test_incomplete_error_table_is_reported() {
    let (mut graph, _, _, join) = mirrored_graph();
    let mut runner = SequenceRunner::forward(&mut graph, &three_steps(), true).unwrap();
    // 只有位置0有误差，位置1、2的逆向误差永远不会到达
    let errors = vec![Some(Tensor::new(&[1., 1.], &[1, 2])), None, None];
    let mut learning = LearningContext::new(0.1, 1);
    assert_err!(
        runner.backward(&mut graph, &mut learning, errors),
        GraphError::MissingReverseData(join, 0)
    );
}

#[test]
fn test_wrong_channel_width_is_rejected() {
    let (mut graph, _, _, join) = mirrored_graph();
    let batch = MiniBatch::new(vec![0], true, vec![(matrix(&[1., 2.], 1, 2), None)]);
    assert_err!(
        SequenceRunner::forward(&mut graph, &batch, false),
        GraphError::ChannelMismatch(join, 0)
    );
}
