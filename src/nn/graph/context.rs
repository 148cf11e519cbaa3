/*
 * @Author       : 老董
 * @Date         : 2026-02-01
 * @Description  : GraphContext：单个序列位置的执行上下文。
 *                 前向时按广度优先把数据沿连线扇出，并记录可回放的执行历史；
 *                 反向时按后进先出的顺序回放历史，把误差逐级送回父节点
 */

use super::{ContextState, GraphData, GraphError, GraphInner, HistoryHandle, NodeId, SequenceInfo};
use crate::nn::learning::LearningContext;
use crate::nn::nodes::{Advance, BackwardScope, BackwardStep, DeferredSignal, Emission};
use crate::tensor::Tensor;
use std::collections::{HashMap, HashSet, VecDeque};

/// 一条执行历史：某个节点的一次激活
#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    pub source: NodeId,
    pub data: GraphData,
    pub parents: Vec<NodeId>,
    /// 只有训练上下文才会记录反向步骤；`None`表示误差原样转交给所有父节点
    pub backward: Option<BackwardStep>,
}

/// 节点为其它序列位置产出的历史，由执行引擎转交给对应位置的上下文
#[derive(Debug, Clone)]
pub struct RoutedEmission {
    pub sequence_index: usize,
    pub source: NodeId,
    pub emission: Emission,
}

/// 反向栈中的一项：（误差，目标节点，误差来自哪个节点）。误差为`None`表示该分支没有误差
#[derive(Debug)]
struct BackwardItem {
    error: Option<Tensor>,
    target: NodeId,
    from: Option<NodeId>,
}

#[derive(Debug)]
pub struct GraphContext {
    sequence: SequenceInfo,
    is_training: bool,
    state: ContextState,
    history: Vec<ExecutionHistory>,
    /// 待扇出的历史（先进先出）
    pending: VecDeque<HistoryHandle>,
    node_index: HashMap<NodeId, Vec<HistoryHandle>>,
    backward_stack: Vec<BackwardItem>,
    /// 各节点在反向中收到的（累计）误差，仅供检查
    error_signals: HashMap<NodeId, Tensor>,
    outbox: Vec<RoutedEmission>,
}

impl GraphContext {
    pub fn new(sequence: SequenceInfo, is_training: bool) -> Self {
        Self {
            sequence,
            is_training,
            state: ContextState::Ready,
            history: Vec::new(),
            pending: VecDeque::new(),
            node_index: HashMap::new(),
            backward_stack: Vec::new(),
            error_signals: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub const fn sequence(&self) -> SequenceInfo {
        self.sequence
    }

    pub const fn is_training(&self) -> bool {
        self.is_training
    }

    pub const fn state(&self) -> ContextState {
        self.state
    }

    pub fn history(&self) -> &[ExecutionHistory] {
        &self.history
    }

    /// 某个节点在本上下文中的全部激活（按发生顺序）
    pub fn entries_for(&self, node: NodeId) -> Vec<&ExecutionHistory> {
        self.node_index
            .get(&node)
            .map(|handles| handles.iter().map(|h| &self.history[h.0]).collect())
            .unwrap_or_default()
    }

    /// 节点最近一次激活的输出
    pub fn output(&self, node: NodeId) -> Option<&GraphData> {
        self.node_index
            .get(&node)
            .and_then(|handles| handles.last())
            .map(|h| &self.history[h.0].data)
    }

    /// 最后一次激活的节点
    pub fn last_source(&self) -> Option<NodeId> {
        self.history.last().map(|entry| entry.source)
    }

    pub fn error_signal(&self, node: NodeId) -> Option<&Tensor> {
        self.error_signals.get(&node)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 取走发往其它序列位置的产物
    pub fn take_outbox(&mut self) -> Vec<RoutedEmission> {
        std::mem::take(&mut self.outbox)
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓前向↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// 追加一条执行历史，并排入待扇出队列
    pub fn add_forward(&mut self, source: NodeId, emission: Emission) -> HistoryHandle {
        let handle = HistoryHandle(self.history.len());
        let is_training = self.is_training;
        let Emission {
            output,
            parents,
            backward,
        } = emission;
        self.history.push(ExecutionHistory {
            source,
            data: output,
            parents,
            // 推理上下文从不保留反向步骤
            backward: backward.filter(|_| is_training),
        });
        self.node_index.entry(source).or_default().push(handle);
        self.pending.push_back(handle);
        self.state = ContextState::Building;
        handle
    }

    /// 把数据送入`target`的`channel`号通道
    pub fn send(
        &mut self,
        graph: &mut GraphInner,
        target: NodeId,
        channel: usize,
        data: GraphData,
        source: Option<NodeId>,
    ) -> Result<(), GraphError> {
        let advance = graph.activate(
            target,
            data,
            channel,
            source,
            self.sequence,
            self.is_training,
        )?;
        match advance {
            Advance::Pending => {}
            Advance::Fired(emission) => {
                self.add_forward(target, emission);
            }
            Advance::FiredAt(emissions) => {
                for (sequence_index, emission) in emissions {
                    if sequence_index == self.sequence.index {
                        self.add_forward(target, emission);
                    } else {
                        self.outbox.push(RoutedEmission {
                            sequence_index,
                            source: target,
                            emission,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// 从外部（小批量）向某个节点送入数据
    pub fn seed(
        &mut self,
        graph: &mut GraphInner,
        node: NodeId,
        data: GraphData,
    ) -> Result<(), GraphError> {
        self.send(graph, node, 0, data, None)
    }

    /// 取出最早的一条待扇出历史，把它的输出沿源节点的全部连线送出。
    /// 没有待处理的历史时返回`false`
    pub fn execute_next(&mut self, graph: &mut GraphInner) -> Result<bool, GraphError> {
        let Some(handle) = self.pending.pop_front() else {
            if self.state == ContextState::Building {
                self.state = ContextState::Ready;
            }
            return Ok(false);
        };
        let entry = &self.history[handle.0];
        let (source, data) = (entry.source, entry.data.clone());
        let wires = graph.node(source)?.wires().to_vec();
        for wire in wires {
            self.send(graph, wire.target, wire.channel, data.clone(), Some(source))?;
        }
        if self.pending.is_empty() {
            self.state = ContextState::Ready;
        }
        Ok(true)
    }

    /// 执行到没有待扇出的历史为止
    pub fn execute_all(&mut self, graph: &mut GraphInner) -> Result<(), GraphError> {
        while self.execute_next(graph)? {}
        Ok(())
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑前向↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓反向↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// 以`initial_error`为图输出节点（未设置时为最后激活的节点）的误差进行反向传播
    pub fn backpropagate(
        &mut self,
        graph: &mut GraphInner,
        learning: &mut LearningContext,
        initial_error: Tensor,
    ) -> Result<Vec<DeferredSignal>, GraphError> {
        let target = graph
            .output()
            .or_else(|| self.last_source())
            .ok_or_else(|| GraphError::InvalidState("上下文中没有任何执行历史".to_string()))?;
        self.backpropagate_seeds(graph, learning, vec![(target, initial_error)])
    }

    /// 以若干（节点，误差）为起点进行反向传播，直到反向栈排空。
    ///
    /// 一个节点要等它在本轮中所有下游消费者都回报过（带误差或“无误差”）后才会被处理，
    /// 来自多个消费者的误差求和。返回需要送往其它序列位置的延迟信号。
    /// 同一上下文可以多次调用（接收来自其它序列位置的后续信号）。
    pub fn backpropagate_seeds(
        &mut self,
        graph: &mut GraphInner,
        learning: &mut LearningContext,
        seeds: Vec<(NodeId, Tensor)>,
    ) -> Result<Vec<DeferredSignal>, GraphError> {
        if !self.is_training {
            log::warn!("推理上下文（序列位置{}）不能反向传播", self.sequence.index);
            return Err(GraphError::InvalidState(
                "推理上下文没有记录反向步骤，不能反向传播".to_string(),
            ));
        }
        if self.state == ContextState::Building || self.has_pending() {
            return Err(GraphError::InvalidState(format!(
                "序列位置{}的前向遍历尚未完成",
                self.sequence.index
            )));
        }
        for (node, _) in &seeds {
            if !self.node_index.contains_key(node) {
                return Err(GraphError::InvalidState(format!(
                    "{node}在序列位置{}没有执行历史，无法接收误差",
                    self.sequence.index
                )));
            }
        }

        let mut fan_in = self.fan_in_of(&seeds);
        for (node, error) in seeds {
            fan_in.add(node, error);
        }
        let mut ready: Vec<NodeId> = fan_in
            .expected
            .iter()
            .filter(|(node, count)| **count == 0 && fan_in.sums.contains_key(node))
            .map(|(node, _)| *node)
            .collect();
        ready.sort();
        for node in ready {
            self.backward_stack.push(BackwardItem {
                error: fan_in.sums.remove(&node),
                target: node,
                from: None,
            });
        }

        self.state = ContextState::Backpropagating;
        let mut signals = Vec::new();
        while let Some(item) = self.backward_stack.pop() {
            self.backward_one(graph, learning, item, &mut fan_in, &mut signals)?;
        }

        if let Some((node, expected)) = fan_in
            .expected
            .iter()
            .find(|(node, expected)| fan_in.received.get(*node).copied().unwrap_or(0) < **expected)
        {
            self.state = ContextState::Done;
            return Err(GraphError::InvalidState(format!(
                "{node}只收到了{}/{expected}个下游误差，反向栈未能排空",
                fan_in.received.get(node).copied().unwrap_or(0)
            )));
        }
        log::debug!(
            "序列位置{}反向完成：{}条历史，{}条延迟信号",
            self.sequence.index,
            self.history.len(),
            signals.len()
        );
        self.state = ContextState::Done;
        Ok(signals)
    }

    /// 本轮参与反向的节点（各起点在历史中的全部祖先）及每个节点应收到的下游回报数
    fn fan_in_of(&self, seeds: &[(NodeId, Tensor)]) -> FanIn {
        let mut active: HashSet<NodeId> = seeds.iter().map(|(node, _)| *node).collect();
        let mut stack: Vec<NodeId> = active.iter().copied().collect();
        while let Some(node) = stack.pop() {
            for entry in self.entries_for(node) {
                for parent in &entry.parents {
                    if active.insert(*parent) {
                        stack.push(*parent);
                    }
                }
            }
        }

        let mut expected: HashMap<NodeId, usize> = active.iter().map(|n| (*n, 0)).collect();
        for node in &active {
            for entry in self.entries_for(*node) {
                for parent in &entry.parents {
                    *expected.entry(*parent).or_default() += 1;
                }
            }
        }
        FanIn {
            expected,
            received: HashMap::new(),
            sums: HashMap::new(),
        }
    }

    fn backward_one(
        &mut self,
        graph: &mut GraphInner,
        learning: &mut LearningContext,
        item: BackwardItem,
        fan_in: &mut FanIn,
        signals: &mut Vec<DeferredSignal>,
    ) -> Result<(), GraphError> {
        let BackwardItem {
            error,
            target,
            from,
        } = item;
        if let Some(error) = &error {
            match self.error_signals.get_mut(&target) {
                Some(total) if total.is_same_shape(error) => *total += error,
                _ => {
                    self.error_signals.insert(target, error.clone());
                }
            }
        }

        let handles = self.node_index.get(&target).cloned().unwrap_or_default();
        for handle in handles {
            let entry = &self.history[handle.0];
            let parents = entry.parents.clone();
            let step = entry.backward.clone();

            let mut outgoing: Vec<(NodeId, Option<Tensor>)> = Vec::with_capacity(parents.len());
            match (&error, step) {
                (Some(error), Some(step)) => {
                    let mut scope = BackwardScope {
                        graph: &mut *graph,
                        learning: &mut *learning,
                        sequence: self.sequence,
                        signals: &mut *signals,
                    };
                    let results = step.backward(target, error, &parents, &mut scope)?;
                    let mut unmatched: Vec<Option<NodeId>> =
                        parents.iter().copied().map(Some).collect();
                    for (parent_error, parent) in results {
                        let slot = unmatched
                            .iter()
                            .position(|p| *p == Some(parent))
                            .ok_or(GraphError::MissingWireTarget {
                                from: target,
                                to: parent,
                            })?;
                        unmatched[slot] = None;
                        outgoing.push((parent, Some(parent_error)));
                    }
                    outgoing.extend(unmatched.into_iter().flatten().map(|p| (p, None)));
                }
                // 没有反向步骤：误差原样转交
                (Some(error), None) => {
                    outgoing.extend(parents.iter().map(|p| (*p, Some(error.clone()))));
                }
                (None, _) => outgoing.extend(parents.iter().map(|p| (*p, None))),
            }

            for (parent, parent_error) in outgoing {
                if let Some(parent_error) = parent_error {
                    fan_in.add(parent, parent_error);
                }
                if fan_in.report(parent) {
                    self.backward_stack.push(BackwardItem {
                        error: fan_in.sums.remove(&parent),
                        target: parent,
                        from: Some(target),
                    });
                }
            }
        }
        if error.is_none() {
            log::trace!("{target}（来自{from:?}）没有误差，只向父节点回报");
        }
        Ok(())
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑反向↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}

/// 一轮反向中的扇入计数与误差累加
struct FanIn {
    expected: HashMap<NodeId, usize>,
    received: HashMap<NodeId, usize>,
    sums: HashMap<NodeId, Tensor>,
}

impl FanIn {
    fn add(&mut self, node: NodeId, error: Tensor) {
        match self.sums.get_mut(&node) {
            None => {
                self.sums.insert(node, error);
            }
            Some(total) if total.is_same_shape(&error) => *total += &error,
            Some(total) => log::warn!(
                "{node}收到的误差形状{:?}与已累计的{:?}不一致，该误差被丢弃",
                error.shape(),
                total.shape()
            ),
        }
    }

    /// 记录一次下游回报；所有下游都已回报时返回`true`
    fn report(&mut self, node: NodeId) -> bool {
        let received = self.received.entry(node).or_default();
        *received += 1;
        self.expected.get(&node).is_some_and(|expected| *received == *expected)
    }
}
