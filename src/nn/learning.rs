/*
 * @Author       : 老董
 * @Date         : 2026-02-02
 * @Description  : 学习上下文：持有学习率等超参数，收集反向传播产生的参数更新，
 *                 并按需延迟到整个小批量（或整段 BPTT）结束后再统一应用
 */

use crate::nn::engine::TrainingConfig;
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// 参数更新作用于节点的哪一组参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterSlot {
    Weights,
    Bias,
    /// 循环层的初始记忆
    InitialMemory,
}

/// 一条待应用的参数更新：`参数 -= rate * delta`
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterUpdate {
    pub node: NodeId,
    pub slot: ParameterSlot,
    pub delta: Tensor,
}

impl ParameterUpdate {
    pub const fn new(node: NodeId, slot: ParameterSlot, delta: Tensor) -> Self {
        Self { node, slot, delta }
    }
}

/// 参数更新的落点（通常是计算图本身）
pub trait UpdateTarget {
    /// 只检查、不应用；批量应用前先逐条检查，保证要么全部应用、要么一条都不应用
    fn check_update(&self, _update: &ParameterUpdate) -> Result<(), GraphError> {
        Ok(())
    }

    fn apply_update(&mut self, update: &ParameterUpdate, learning_rate: f32)
    -> Result<(), GraphError>;
}

pub struct LearningContext {
    learning_rate: f32,
    batch_size: usize,
    /// 轮次 -> 从该轮开始使用的学习率
    schedule: BTreeMap<usize, f32>,
    deferred: bool,
    pending: VecDeque<ParameterUpdate>,
    no_update_nodes: HashSet<NodeId>,
    current_epoch: usize,
    row_count: usize,
    epoch_started: Option<Instant>,
    /// 本轮的更新队列已在`end_epoch`中清空，此后不能再排队
    drained: bool,
}

impl LearningContext {
    pub fn new(learning_rate: f32, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size必须大于0");
        Self {
            learning_rate,
            batch_size,
            schedule: BTreeMap::new(),
            deferred: true,
            pending: VecDeque::new(),
            no_update_nodes: HashSet::new(),
            current_epoch: 0,
            row_count: 0,
            epoch_started: None,
            drained: false,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.learning_rate, config.batch_size)
            .deferred_updates(config.deferred_updates)
            .learning_rate_schedule(config.learning_rate_schedule.clone())
    }

    /// 是否延迟更新（默认开启）
    pub fn deferred_updates(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    /// 学习率计划：`epoch -> rate`，在对应轮次的`start_epoch`中生效
    pub fn learning_rate_schedule(mut self, schedule: BTreeMap<usize, f32>) -> Self {
        self.schedule = schedule;
        self
    }

    pub const fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 实际作用于参数的步长：学习率按批大小平均
    pub fn update_rate(&self) -> f32 {
        self.learning_rate / self.batch_size as f32
    }

    pub const fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub const fn current_epoch(&self) -> usize {
        self.current_epoch
    }

    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn add_rows(&mut self, rows: usize) {
        self.row_count += rows;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 排队中的更新（按登记顺序）
    pub fn pending_updates(&self) -> impl Iterator<Item = &ParameterUpdate> {
        self.pending.iter()
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓冻结节点↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn freeze(&mut self, node: NodeId) {
        self.no_update_nodes.insert(node);
    }

    pub fn unfreeze(&mut self, node: NodeId) {
        self.no_update_nodes.remove(&node);
    }

    pub fn is_frozen(&self, node: NodeId) -> bool {
        self.no_update_nodes.contains(&node)
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑冻结节点↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /// 登记一条参数更新：冻结节点的更新被丢弃；延迟模式下排队，否则立即应用
    pub fn store_update(
        &mut self,
        update: ParameterUpdate,
        target: &mut dyn UpdateTarget,
    ) -> Result<(), GraphError> {
        if self.drained {
            return Err(GraphError::UpdateAfterDrain {
                node: update.node,
                epoch: self.current_epoch,
            });
        }
        if self.is_frozen(update.node) {
            log::debug!("{}已冻结，丢弃其{:?}更新", update.node, update.slot);
            return Ok(());
        }
        if self.deferred {
            self.pending.push_back(update);
            Ok(())
        } else {
            target.apply_update(&update, self.update_rate())
        }
    }

    /// 按登记顺序应用并清空所有排队的更新，返回应用的条数。
    /// 任何一条检查不通过时整批丢弃，参数保持不变
    pub fn apply_updates(&mut self, target: &mut dyn UpdateTarget) -> Result<usize, GraphError> {
        if let Err(e) = self.pending.iter().try_for_each(|u| target.check_update(u)) {
            let discarded = self.discard_updates();
            log::warn!("参数更新检查失败，整批丢弃{discarded}条更新：{e}");
            return Err(e);
        }
        let rate = self.update_rate();
        let mut applied = 0;
        while let Some(update) = self.pending.pop_front() {
            target.apply_update(&update, rate)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// 丢弃所有排队的更新（中止当前小批量时使用）
    pub fn discard_updates(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    /// 开始新的一轮：轮次加一、按计划调整学习率、重置行计数
    pub fn start_epoch(&mut self) {
        self.current_epoch += 1;
        if let Some((_, &rate)) = self.schedule.range(..=self.current_epoch).next_back() {
            self.learning_rate = rate;
        }
        self.row_count = 0;
        self.drained = false;
        self.epoch_started = Some(Instant::now());
    }

    /// 结束本轮：先应用全部排队的更新，再封闭更新队列。返回本轮耗时
    pub fn end_epoch(
        &mut self,
        target: &mut dyn UpdateTarget,
        training_error: f32,
    ) -> Result<Duration, GraphError> {
        let applied = self.apply_updates(target)?;
        self.drained = true;
        let elapsed = self
            .epoch_started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        log::info!(
            "第{}轮结束：{}行，误差{:.6}，学习率{}，耗时{:?}（本轮末应用了{}条更新）",
            self.current_epoch,
            self.row_count,
            training_error,
            self.learning_rate,
            elapsed,
            applied
        );
        Ok(elapsed)
    }
}
