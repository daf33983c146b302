//! 时间窗口索引.
//!
//! 将逻辑样本索引映射为 arena 槽位. 槽位与物理帧的对应关系由 [`IngestMode`] 决定:
//!
//! 1. [`IngestMode::Lookahead`]: arena 按物理帧编号存储 `0..n_load` 全部帧,
//!   样本 `i` 的基准槽位为 `images_to_use[i]`;
//! 2. [`IngestMode::Resolved`]: arena 只存储选中的帧, 样本 `i` 的基准槽位为 `i`.

use rand::Rng;

use crate::consts::defaults::TEMPORAL_SHIFTS;

/// 时间偏移集合. 非空, 保持给定顺序.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<usize>"))]
pub struct ShiftSet(Vec<usize>);

impl TryFrom<Vec<usize>> for ShiftSet {
    type Error = &'static str;

    #[inline]
    fn try_from(shifts: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(shifts).ok_or("时间偏移集合不能为空")
    }
}

impl Default for ShiftSet {
    fn default() -> Self {
        Self(TEMPORAL_SHIFTS.to_vec())
    }
}

impl ShiftSet {
    /// 由偏移量序列构建. 序列为空时返回 `None`.
    pub fn new(shifts: Vec<usize>) -> Option<Self> {
        (!shifts.is_empty()).then_some(Self(shifts))
    }

    /// 偏移个数, 即每个样本的帧数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 恒为 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 最大偏移量.
    #[inline]
    pub fn max(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// 底层偏移量.
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// 最小偏移量.
    #[inline]
    pub fn min(&self) -> usize {
        self.0.iter().copied().min().unwrap_or(0)
    }

    /// 排序后是否恰为 `[min, min + 1, ..., max]`. 不要求给定顺序.
    pub fn is_contiguous(&self) -> bool {
        let mut sorted = self.0.clone();
        sorted.sort_unstable();
        sorted.iter().zip(self.min()..).all(|(&s, i)| s == i)
    }
}

/// 体数据与样本的配对方式.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SamplingPolicy {
    /// 每个样本对应其基准帧的体数据.
    #[default]
    Paired,
    /// 每次访问都随机抽取一个样本的体数据. 用于配准训练.
    Registration,
    /// 体数据与时间窗口一一对应, 每帧一个体数据. 图像可以不加载.
    VolumeOnly,
}

/// arena 的存储方式. 见模块文档.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IngestMode {
    /// 按物理帧存储, 包括窗口需要的后续帧.
    #[default]
    Lookahead,
    /// 只存储选中的帧.
    Resolved,
}

/// 单个样本涉及的 arena 槽位.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleSlots {
    /// 视图槽位, 与时间偏移一一对应.
    pub views: Vec<usize>,
    /// 体数据槽位. [`SamplingPolicy::VolumeOnly`] 下与 `views` 相同, 否则只有一个.
    pub volumes: Vec<usize>,
}

/// 时间窗口索引器.
#[derive(Clone, Debug)]
pub struct TemporalIndexer {
    shifts: ShiftSet,
    policy: SamplingPolicy,
    mode: IngestMode,
    images: Vec<usize>,
    use_random_shifts: bool,
}

impl TemporalIndexer {
    /// 创建索引器.
    ///
    /// `images` 为选中的物理帧 (已截断到 `n_images` 个).
    pub fn new(
        shifts: ShiftSet,
        policy: SamplingPolicy,
        mode: IngestMode,
        images: Vec<usize>,
        use_random_shifts: bool,
    ) -> Self {
        Self {
            shifts,
            policy,
            mode,
            images,
            use_random_shifts,
        }
    }

    /// 选中的帧数.
    #[inline]
    pub fn n_images(&self) -> usize {
        self.images.len()
    }

    /// 时间偏移集合.
    #[inline]
    pub fn shifts(&self) -> &ShiftSet {
        &self.shifts
    }

    /// 配对方式.
    #[inline]
    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    /// 存储方式.
    #[inline]
    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    /// 样本个数.
    ///
    /// # 注意
    ///
    /// [`IngestMode::Resolved`] 且不使用随机偏移时, 末尾 `max(shifts)` 个帧只能作为
    /// 其他样本的后续帧, 因此样本数为 `n_images - max(shifts)` (不小于 0).
    pub fn len(&self) -> usize {
        match self.mode {
            IngestMode::Lookahead => self.n_images(),
            IngestMode::Resolved if self.use_random_shifts => self.n_images(),
            IngestMode::Resolved => self.n_images().saturating_sub(self.shifts.max()),
        }
    }

    /// 是否没有样本.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// arena 需要的槽位个数.
    #[inline]
    pub fn slot_count(&self) -> usize {
        match self.mode {
            IngestMode::Lookahead => self
                .images
                .iter()
                .max()
                .map_or(0, |&last| last + self.shifts.max() + 1),
            IngestMode::Resolved => self.images.len(),
        }
    }

    /// 每个 arena 槽位对应的物理帧编号, 按槽位升序.
    ///
    /// # 注意
    ///
    /// [`IngestMode::Lookahead`] 下 `images` 允许重复, 因此槽位数可能小于 `n_images`.
    pub fn physical_frames(&self) -> Vec<usize> {
        match self.mode {
            IngestMode::Lookahead => (0..self.slot_count()).collect(),
            IngestMode::Resolved => self.images.clone(),
        }
    }

    /// 获取样本 `index` 的基准槽位. 越界时 panic.
    #[inline]
    pub fn base_slot(&self, index: usize) -> usize {
        assert!(
            index < self.len(),
            "样本索引 {index} 越界 (样本数 {})",
            self.len()
        );
        match self.mode {
            IngestMode::Lookahead => self.images[index],
            IngestMode::Resolved => index,
        }
    }

    /// 获取样本 `index` 的视图槽位. 越界时 panic.
    ///
    /// 使用随机偏移时每次调用都会从 `0..max(n_images - 1, 1)` 重新抽取,
    /// 上界不超过槽位数, 且基准槽位视为 0.
    ///
    /// [`SamplingPolicy::Registration`] 与 [`SamplingPolicy::VolumeOnly`] 下,
    /// 偏移集合排序后连续时直接取 `base..base + len`, 不论起点与顺序.
    /// [`SamplingPolicy::Paired`] 始终取 `base + shifts[i]`.
    pub fn window_for<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Vec<usize> {
        let base = self.base_slot(index);
        if self.use_random_shifts {
            let upper = self
                .n_images()
                .saturating_sub(1)
                .min(self.slot_count())
                .max(1);
            (0..self.shifts.len())
                .map(|_| rng.gen_range(0..upper))
                .collect()
        } else if self.policy != SamplingPolicy::Paired && self.shifts.is_contiguous() {
            (base..base + self.shifts.len()).collect()
        } else {
            self.shifts.as_slice().iter().map(|s| base + s).collect()
        }
    }

    /// 获取样本 `index` 的体数据槽位. `window` 为 [`Self::window_for`] 的结果.
    ///
    /// [`SamplingPolicy::Registration`] 下每次调用都重新抽取.
    pub fn volume_for<R: Rng + ?Sized>(
        &self,
        index: usize,
        window: &[usize],
        rng: &mut R,
    ) -> Vec<usize> {
        match self.policy {
            SamplingPolicy::Paired => vec![self.base_slot(index)],
            SamplingPolicy::Registration => {
                let pick = rng.gen_range(0..self.len());
                vec![self.base_slot(pick)]
            }
            SamplingPolicy::VolumeOnly => window.to_vec(),
        }
    }

    /// 一次性获取样本 `index` 的全部槽位.
    pub fn slots_for<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> SampleSlots {
        let views = self.window_for(index, rng);
        let volumes = self.volume_for(index, &views, rng);
        SampleSlots { views, volumes }
    }
}
