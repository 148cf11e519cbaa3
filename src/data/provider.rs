/*
 * @Author       : 老董
 * @Date         : 2025-01-21
 * @Description  : MiniBatchProvider - 按桶切分小批量的加载器
 *
 * 支持：
 * - 按序列长度分桶，一个小批量内的行序列长度一致 (get_buckets)
 * - 自动分批 (batch_size)，最后一批可以不满
 * - 随机打乱 (shuffle)：桶内行序打乱，桶的先后顺序也打乱，但一批永远不跨桶
 */

use super::{DataSource, MiniBatch};
use crate::nn::GraphError;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// # 示例
/// ```ignore
/// let provider = MiniBatchProvider::new(&source, 32)
///     .shuffle(true)
///     .seed(42);
///
/// for batch in provider.iter() {
///     engine.train_batch(&batch?)?;
/// }
/// ```
pub struct MiniBatchProvider<'a, S: DataSource + ?Sized> {
    source: &'a S,
    batch_size: usize,
    shuffle: bool,
    seed: Option<u64>,
}

impl<'a, S: DataSource + ?Sized> MiniBatchProvider<'a, S> {
    /// # Panics
    /// 如果 batch_size 为0
    pub fn new(source: &'a S, batch_size: usize) -> Self {
        assert!(batch_size > 0, "MiniBatchProvider: batch_size 必须大于 0");
        Self {
            source,
            batch_size,
            shuffle: false,
            seed: None,
        }
    }

    /// 设置是否打乱数据
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// 设置随机种子（用于 shuffle）
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn buckets(&self) -> Vec<Vec<usize>> {
        self.source.get_buckets()
    }

    /// 批次数量：各桶`ceil(桶大小 / batch_size)`之和
    pub fn num_batches(&self) -> usize {
        self.buckets()
            .iter()
            .map(|bucket| bucket.len().div_ceil(self.batch_size))
            .sum()
    }

    /// 各小批量的行号（打乱时使用设置的种子，未设置则用 thread_rng）
    pub fn row_groups(&self) -> Vec<Vec<usize>> {
        match self.seed {
            Some(seed) => self.row_groups_with(&mut rand::rngs::StdRng::seed_from_u64(seed)),
            None => self.row_groups_with(&mut rand::thread_rng()),
        }
    }

    /// 用外部注入的随机数生成器切分（便于在多轮训练之间延续同一个随机序列）
    pub fn row_groups_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vec<usize>> {
        let mut buckets = self.buckets();
        if self.shuffle {
            for bucket in &mut buckets {
                bucket.shuffle(rng);
            }
            buckets.shuffle(rng);
        }
        buckets
            .iter()
            .flat_map(|bucket| bucket.chunks(self.batch_size).map(<[usize]>::to_vec))
            .collect()
    }

    /// 一次性取出全部小批量
    pub fn mini_batches(&self) -> Result<Vec<MiniBatch>, GraphError> {
        self.iter().collect()
    }

    /// 逐个取出小批量
    pub fn iter(&self) -> impl Iterator<Item = Result<MiniBatch, GraphError>> + '_ {
        self.row_groups()
            .into_iter()
            .map(move |rows| self.source.get(&rows))
    }
}
