//! 数据集组装.
//!
//! [`XlfmDataset`] 在构建时一次性把全部帧与体数据预处理后写入两个 arena:
//!
//! 1. 视图 arena `[slots, h, w, C]`, `C` 为 1 (仅主通道) 或 2 (主通道 + 副通道);
//! 2. 体数据 arena `[slots, n_depths, H, W]`.
//!
//! 此后每次访问只按 [`TemporalIndexer`] 给出的槽位切片, 返回借用视图, 不再分配.

use ndarray::{s, stack, Array4, Array5, ArrayView3, ArrayView4, ArrayViewMut3, Axis};
use rand::Rng;

use crate::consts::{SPARSE_CHANNEL, VIEW_CHANNEL};
use crate::data::frame::prepare_into;
use crate::data::volume::{ensure_finite, fill_depths};
use crate::data::CanonicalWindow;
use crate::extract::PatchExtractor;
use crate::temporal::{IngestMode, SampleSlots, TemporalIndexer};
use crate::{LensletCoords, XlfmError, XlfmResult};

mod config;
mod npz_database;
mod source;
mod stats;

pub use config::DatasetConfig;
pub use npz_database::NpzArchive;
pub use source::{FrameSource, Sources, VolumeSource};
pub use stats::{max_of, ChannelMax, ChannelStats, NormalizationStatistics};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 单个样本中一种模态的数据.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleTensor<'a> {
    /// 单帧视图 `[h, w, C]` 或单个体数据 `[n_depths, H, W]`.
    Single(ArrayView3<'a, f32>),
    /// 按时间偏移顺序排列的多帧.
    Stacked(Vec<ArrayView3<'a, f32>>),
    /// 该模态未加载.
    Placeholder,
}

impl<'a> SampleTensor<'a> {
    fn from_slots(arena: Option<&'a Array4<f32>>, slots: &[usize]) -> Self {
        let Some(arena) = arena else {
            return Self::Placeholder;
        };
        match slots {
            [slot] => Self::Single(arena.index_axis(Axis(0), *slot)),
            _ => Self::Stacked(
                slots
                    .iter()
                    .map(|&slot| arena.index_axis(Axis(0), slot))
                    .collect(),
            ),
        }
    }

    /// 是否为占位符.
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// 帧数. 占位符为 0.
    pub fn frame_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Stacked(v) => v.len(),
            Self::Placeholder => 0,
        }
    }

    /// 沿新的首轴堆叠为 `[T, ...]` 的数组. 占位符返回 `None`.
    pub fn to_array(&self) -> Option<Array4<f32>> {
        match self {
            Self::Single(v) => Some(v.insert_axis(Axis(0)).to_owned()),
            Self::Stacked(v) => stack(Axis(0), v).ok(),
            Self::Placeholder => None,
        }
    }
}

/// 单个样本.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample<'a> {
    /// 时间窗口内的传感器帧.
    pub views: SampleTensor<'a>,
    /// 配对的体数据.
    pub volume: SampleTensor<'a>,
}

/// XLFM 训练数据集.
#[derive(Clone, Debug)]
pub struct XlfmDataset {
    config: DatasetConfig,
    coords: LensletCoords,
    indexer: TemporalIndexer,
    window: Option<CanonicalWindow>,
    views: Option<Array4<f32>>,
    volumes: Option<Array4<f32>>,
    sparse: bool,
}

impl XlfmDataset {
    /// 从已解码的数据源构建数据集.
    ///
    /// 逐槽位地: 读取体数据, 检查有限性, 表面置零, 对齐到规范窗口 (由第一个体数据决定),
    /// 写入体数据 arena; 读取传感器帧, 补到最短边, 中心裁剪到 `img_shape`, 写入视图 arena.
    ///
    /// # 注意
    ///
    /// 1. 要求加载副通道但未提供数据源时, 只记录一条警告并关闭副通道.
    /// 2. 体数据包含非有限值时返回 [`XlfmError::DecodeInfinity`].
    pub fn ingest(
        config: DatasetConfig,
        coords: LensletCoords,
        sources: Sources<'_>,
    ) -> XlfmResult<Self> {
        let frames = match (config.load_images, sources.frame_source()) {
            (true, None) => return Err(XlfmError::MissingSource("传感器帧")),
            (load, src) => src.filter(|_| load),
        };
        let volumes = match (config.load_volumes, sources.volume_source()) {
            (true, None) => return Err(XlfmError::MissingSource("体数据")),
            (load, src) => src.filter(|_| load),
        };
        let sparse = match (frames.is_some() && config.load_sparse, sources.sparse_source()) {
            (true, None) => {
                log::warn!("{}, 副通道已关闭", XlfmError::MissingSecondarySource);
                None
            }
            (load, src) => src.filter(|_| load),
        };

        let total = frames
            .map(|f| f.len())
            .or_else(|| volumes.map(|v| v.len()))
            .unwrap_or(0);
        // 预读模式下, 默认只选用窗口不越过序列末尾的帧.
        let default_count = match config.mode {
            IngestMode::Lookahead => total.saturating_sub(config.temporal_shifts.max()),
            IngestMode::Resolved => total,
        };
        let mut images = config
            .images_to_use
            .clone()
            .unwrap_or_else(|| (0..default_count).collect());
        images.truncate(total);

        let indexer = TemporalIndexer::new(
            config.temporal_shifts.clone(),
            config.policy,
            config.mode,
            images,
            config.use_random_shifts,
        );
        let physical = indexer.physical_frames();
        let slots = physical.len();

        let channels = if sparse.is_some() { 2 } else { 1 };
        let (ih, iw) = config.img_shape;
        let mut view_arena = frames.map(|_| Array4::<f32>::zeros((slots, ih, iw, channels)));
        let mut volume_arena: Option<Array4<f32>> = None;
        let mut window: Option<CanonicalWindow> = None;

        for (slot, &index) in physical.iter().enumerate() {
            if let Some(src) = volumes {
                let mut volume = src.volume(index)?;
                ensure_finite(&volume.view(), index)?;
                let win = *window.get_or_insert_with(|| {
                    let win = CanonicalWindow::from_reference(&volume.view());
                    log::debug!(
                        "规范窗口: {:?}..{:?} (参考帧 {index})",
                        win.start(),
                        win.end()
                    );
                    win
                });
                let aligned = win.ingest(&mut volume, config.border_blanking)?;
                let (wh, ww) = win.shape();
                let arena = volume_arena.get_or_insert_with(|| {
                    Array4::zeros((slots, config.n_depths_to_fill, wh, ww))
                });
                fill_depths(arena.index_axis_mut(Axis(0), slot), aligned)?;
            }

            if let (Some(src), Some(arena)) = (frames, view_arena.as_mut()) {
                let frame = src.frame(index)?;
                prepare_into(frame.view(), arena.slice_mut(s![slot, .., .., VIEW_CHANNEL]))?;
                if let Some(src) = sparse {
                    let frame = src.frame(index)?;
                    prepare_into(
                        frame.view(),
                        arena.slice_mut(s![slot, .., .., SPARSE_CHANNEL]),
                    )?;
                }
            }
        }

        log::info!(
            "XLFM 数据集加载完成: {} 个样本, {} 个槽位, {} 个透镜, 副通道{}",
            indexer.len(),
            slots,
            coords.len(),
            if sparse.is_some() { "开启" } else { "关闭" }
        );

        Ok(Self {
            config,
            coords,
            indexer,
            window,
            views: view_arena,
            volumes: volume_arena,
            sparse: sparse.is_some(),
        })
    }

    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.indexer.len()
    }

    /// 是否没有样本.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indexer.is_empty()
    }

    /// 获取第 `index` 个样本. 随机偏移与配准抽样使用线程本地随机数生成器.
    ///
    /// 越界时 panic.
    #[inline]
    pub fn get(&self, index: usize) -> Sample<'_> {
        self.get_with_rng(index, &mut rand::thread_rng())
    }

    /// 获取第 `index` 个样本, 使用调用方提供的随机数生成器. 越界时 panic.
    pub fn get_with_rng<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Sample<'_> {
        let SampleSlots { views, volumes } = self.indexer.slots_for(index, rng);
        Sample {
            views: SampleTensor::from_slots(self.views.as_ref(), &views),
            volume: SampleTensor::from_slots(self.volumes.as_ref(), &volumes),
        }
    }

    /// 按样本顺序迭代.
    #[inline]
    pub fn iter(&self) -> Samples<'_> {
        Samples {
            dataset: self,
            next: 0,
        }
    }

    /// 加载配置.
    #[inline]
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// 时间窗口索引器.
    #[inline]
    pub fn indexer(&self) -> &TemporalIndexer {
        &self.indexer
    }

    /// 透镜个数.
    #[inline]
    pub fn lenslet_count(&self) -> usize {
        self.coords.len()
    }

    /// 透镜坐标表.
    #[inline]
    pub fn lenslet_coordinates(&self) -> &LensletCoords {
        &self.coords
    }

    /// 体数据深度层数. 未加载体数据时为 0.
    #[inline]
    pub fn depth_count(&self) -> usize {
        self.volumes.as_ref().map_or(0, |v| v.len_of(Axis(1)))
    }

    /// 每个样本的帧数.
    #[inline]
    pub fn temporal_frame_count(&self) -> usize {
        self.indexer.shifts().len()
    }

    /// 规范窗口. 未加载体数据时为 `None`.
    #[inline]
    pub fn canonical_window(&self) -> Option<CanonicalWindow> {
        self.window
    }

    /// 是否加载了副通道.
    #[inline]
    pub fn has_sparse(&self) -> bool {
        self.sparse
    }

    /// 视图 arena 的通道数. 未加载传感器帧时为 0.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.views.as_ref().map_or(0, |v| v.len_of(Axis(3)))
    }

    /// 视图 arena `[slots, h, w, C]`.
    #[inline]
    pub fn view_arena(&self) -> Option<&Array4<f32>> {
        self.views.as_ref()
    }

    /// 体数据 arena `[slots, n_depths, H, W]`.
    #[inline]
    pub fn volume_arena(&self) -> Option<&Array4<f32>> {
        self.volumes.as_ref()
    }

    /// 按本数据集的透镜坐标与子图尺寸, 对帧批次 `[B, C, H, W]` 提取子图.
    #[inline]
    pub fn extract_views(&self, frames: ArrayView4<f32>) -> Array5<f32> {
        PatchExtractor::new(&self.coords, self.config.subimage_shape).extract(frames)
    }

    /// 对样本的视图提取子图, 返回 `[T, C, N, ph, pw]`. 未加载传感器帧时返回 `None`.
    pub fn extract_sample_views(&self, sample: &Sample) -> Option<Array5<f32>> {
        let stacked = sample.views.to_array()?;
        Some(self.extract_views(stacked.view().permuted_axes([0, 3, 1, 2])))
    }

    /// 各通道最大值.
    pub fn max(&self) -> ChannelMax {
        ChannelMax {
            views: self
                .view_channel(VIEW_CHANNEL)
                .and_then(|v| max_of(v.view())),
            sparse: self
                .view_channel(SPARSE_CHANNEL)
                .and_then(|v| max_of(v.view())),
            volumes: self.volumes.as_ref().and_then(|v| max_of(v.view())),
        }
    }

    /// 各通道均值与无偏标准差, 覆盖整个 arena.
    pub fn statistics(&self) -> NormalizationStatistics {
        NormalizationStatistics {
            views: self
                .view_channel(VIEW_CHANNEL)
                .and_then(ChannelStats::of),
            sparse: self
                .view_channel(SPARSE_CHANNEL)
                .and_then(ChannelStats::of),
            volumes: self.volumes.as_ref().and_then(|v| ChannelStats::of(v.view())),
        }
    }

    /// 以 `stats` 原地标准化全部 arena. `stats` 中为 `None` 的通道保持不变.
    ///
    /// 需要 `&mut self`, 因此不可能与任何借用样本并存.
    pub fn standardize(&mut self, stats: &NormalizationStatistics) {
        self.for_each_channel_mut(stats, |s, v| s.standardize(v));
    }

    /// [`Self::standardize`] 的逆变换.
    pub fn unstandardize(&mut self, stats: &NormalizationStatistics) {
        self.for_each_channel_mut(stats, |s, v| s.unstandardize(v));
    }

    fn view_channel(&self, channel: usize) -> Option<ArrayView3<f32>> {
        let views = self.views.as_ref()?;
        (channel < views.len_of(Axis(3))).then(|| views.index_axis(Axis(3), channel))
    }

    fn for_each_channel_mut<F>(&mut self, stats: &NormalizationStatistics, op: F)
    where
        F: Fn(&ChannelStats, ArrayViewMut3<f32>),
    {
        if let Some(views) = self.views.as_mut() {
            let channels = views.len_of(Axis(3));
            for (channel, s) in [(VIEW_CHANNEL, stats.views), (SPARSE_CHANNEL, stats.sparse)] {
                if let (true, Some(s)) = (channel < channels, s) {
                    op(&s, views.index_axis_mut(Axis(3), channel));
                }
            }
        }
        if let (Some(volumes), Some(s)) = (self.volumes.as_mut(), stats.volumes) {
            for slot in volumes.axis_iter_mut(Axis(0)) {
                op(&s, slot);
            }
        }
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl XlfmDataset {
    /// 借助 `rayon`, 并行地计算 [`Self::statistics`].
    pub fn par_statistics(&self) -> NormalizationStatistics {
        NormalizationStatistics {
            views: self
                .view_channel(VIEW_CHANNEL)
                .and_then(ChannelStats::par_of),
            sparse: self
                .view_channel(SPARSE_CHANNEL)
                .and_then(ChannelStats::par_of),
            volumes: self
                .volumes
                .as_ref()
                .and_then(|v| ChannelStats::par_of(v.view())),
        }
    }

    /// 借助 `rayon`, 并行地运行 [`Self::standardize`].
    pub fn par_standardize(&mut self, stats: &NormalizationStatistics) {
        self.for_each_channel_mut(stats, |s, v| s.par_standardize(v));
    }

    /// 借助 `rayon`, 并行地获取多个样本. 每个样本使用独立的线程本地随机数生成器.
    pub fn par_get_many(&self, indices: &[usize]) -> Vec<Sample<'_>> {
        indices.par_iter().map(|&i| self.get(i)).collect()
    }
}

/// 样本迭代器.
#[derive(Clone, Debug)]
pub struct Samples<'a> {
    dataset: &'a XlfmDataset,
    next: usize,
}

impl<'a> Iterator for Samples<'a> {
    type Item = Sample<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.dataset.len() {
            return None;
        }
        let ans = self.dataset.get(self.next);
        self.next += 1;
        Some(ans)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.dataset.len().saturating_sub(self.next);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Samples<'_> {}

impl<'a> IntoIterator for &'a XlfmDataset {
    type Item = Sample<'a>;
    type IntoIter = Samples<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::{SamplingPolicy, ShiftSet};
    use ndarray::{Array2, Array3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const F: usize = 6;

    fn init_logger() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
    }

    /// 帧 `f` 的像素值为 `f * 1000 + h * 10 + w + 1`.
    fn frames() -> Array3<f32> {
        Array3::from_shape_fn((F, 8, 8), |(f, h, w)| (f * 1000 + h * 10 + w + 1) as f32)
    }

    /// 体数据 `f` 的体素值为 `f + 1`.
    fn volumes() -> Vec<Array3<f32>> {
        (0..F)
            .map(|f| Array3::from_elem((2, 6, 6), (f + 1) as f32))
            .collect()
    }

    fn coords() -> LensletCoords {
        LensletCoords::from_vec(vec![(4, 4), (2, 6)]).unwrap()
    }

    fn config() -> DatasetConfig {
        let mut c = DatasetConfig::new((4, 4), (8, 8));
        c.n_depths_to_fill = 3;
        c.border_blanking = 0;
        c
    }

    fn frame_id(view: &ArrayView3<f32>) -> usize {
        (view[(0, 0, VIEW_CHANNEL)] as usize - 1) / 1000
    }

    fn volume_id(volume: &ArrayView3<f32>) -> usize {
        volume[(0, 0, 0)] as usize - 1
    }

    fn stacked_ids(t: &SampleTensor) -> Vec<usize> {
        match t {
            SampleTensor::Stacked(v) => v.iter().map(frame_id).collect(),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_lookahead_paired() {
        init_logger();
        let (fr, vo) = (frames(), volumes());
        let mut c = config();
        c.images_to_use = Some(vec![1, 3]);
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo)).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.view_arena().unwrap().dim(), (6, 8, 8, 1));
        assert_eq!(ds.volume_arena().unwrap().dim(), (6, 3, 6, 6));
        assert_eq!(ds.depth_count(), 3);
        assert_eq!(ds.temporal_frame_count(), 3);
        assert_eq!(ds.lenslet_count(), 2);
        assert_eq!(ds.canonical_window(), Some(CanonicalWindow::from_extent((6, 6))));

        let s = ds.get(1);
        assert_eq!(stacked_ids(&s.views), vec![3, 4, 5]);
        match s.volume {
            SampleTensor::Single(v) => {
                assert_eq!(volume_id(&v), 3);
                // 多余的深度层为 0.
                assert_eq!(v.index_axis(Axis(0), 2).sum(), 0.0);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_resolved_len_and_window() {
        let (fr, vo) = (frames(), volumes());
        let mut c = config();
        c.mode = IngestMode::Resolved;
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo)).unwrap();
        assert_eq!(ds.len(), F - 2);
        assert_eq!(stacked_ids(&ds.get(3).views), vec![3, 4, 5]);
        assert_eq!(ds.iter().len(), F - 2);
        assert_eq!((&ds).into_iter().count(), F - 2);
    }

    #[test]
    fn test_resolved_selection() {
        let (fr, vo) = (frames(), volumes());
        let mut c = config();
        c.mode = IngestMode::Resolved;
        c.images_to_use = Some(vec![5, 0, 2]);
        c.temporal_shifts = ShiftSet::new(vec![0, 1]).unwrap();
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo)).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(stacked_ids(&ds.get(0).views), vec![5, 0]);
        assert_eq!(stacked_ids(&ds.get(1).views), vec![0, 2]);
    }

    #[test]
    fn test_volumes_off_placeholder() {
        let fr = frames();
        let mut c = config();
        c.load_volumes = false;
        c.temporal_shifts = ShiftSet::new(vec![0]).unwrap();
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr)).unwrap();
        let s = ds.get(2);
        assert!(s.volume.is_placeholder());
        assert_eq!(ds.depth_count(), 0);
        assert_eq!(ds.canonical_window(), None);
        match s.views {
            SampleTensor::Single(v) => assert_eq!(frame_id(&v), 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(ds.max().volumes, None);
    }

    #[test]
    fn test_missing_sparse_is_recovered() {
        init_logger();
        let (fr, vo) = (frames(), volumes());
        let mut c = config();
        c.load_sparse = true;
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo)).unwrap();
        assert!(!ds.has_sparse());
        assert_eq!(ds.channel_count(), 1);
        assert_eq!(ds.statistics().sparse, None);
    }

    #[test]
    fn test_sparse_channel() {
        let (fr, vo) = (frames(), volumes());
        let sparse = fr.mapv(|x| -x);
        let mut c = config();
        c.load_sparse = true;
        let sources = Sources::new().frames(&fr).sparse(&sparse).volumes(&vo);
        let ds = XlfmDataset::ingest(c, coords(), sources).unwrap();
        assert!(ds.has_sparse());
        assert_eq!(ds.channel_count(), 2);
        let arena = ds.view_arena().unwrap();
        assert_eq!(
            arena.slice(s![.., .., .., SPARSE_CHANNEL]),
            arena.slice(s![.., .., .., VIEW_CHANNEL]).mapv(|x| -x)
        );
        assert_eq!(ds.max().sparse, Some(-1.0));
    }

    #[test]
    fn test_decode_infinity() {
        let fr = frames();
        let mut vo = volumes();
        vo[2][(1, 3, 3)] = f32::INFINITY;
        let r = XlfmDataset::ingest(config(), coords(), Sources::new().frames(&fr).volumes(&vo));
        assert!(matches!(r, Err(XlfmError::DecodeInfinity { index: 2 })));
    }

    #[test]
    fn test_shape_errors() {
        let fr = frames();
        let mut vo = volumes();
        vo[4] = Array3::ones((2, 5, 6));
        let r = XlfmDataset::ingest(config(), coords(), Sources::new().frames(&fr).volumes(&vo));
        assert!(matches!(r, Err(XlfmError::ShapeMismatch { .. })));

        let vo = volumes();
        let mut c = config();
        c.n_depths_to_fill = 1;
        let r = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo));
        assert!(matches!(r, Err(XlfmError::ShapeMismatch { .. })));

        let mut c = config();
        c.img_shape = (9, 9);
        let r = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo));
        assert!(matches!(r, Err(XlfmError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_missing_source() {
        let vo = volumes();
        let r = XlfmDataset::ingest(config(), coords(), Sources::new().volumes(&vo));
        assert!(matches!(r, Err(XlfmError::MissingSource(_))));
    }

    #[test]
    fn test_border_blanking() {
        let fr = frames();
        let vo = vec![Array3::<f32>::ones((4, 6, 6)); F];
        let mut c = config();
        c.n_depths_to_fill = 4;
        c.border_blanking = 1;
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo)).unwrap();
        let arena = ds.volume_arena().unwrap();
        // 每个体数据只剩 2 x 4 x 4 的内部.
        assert_eq!(arena.index_axis(Axis(0), 0).sum(), 32.0);
        assert_eq!(arena[(0, 1, 0, 2)], 0.0);
        assert_eq!(arena[(0, 1, 1, 2)], 1.0);
    }

    #[test]
    fn test_frame_preprocessing() {
        // 宽帧: 8 x 12 -> 两侧各裁 2 列 -> 8 x 8.
        let fr = Array3::from_shape_fn((3, 8, 12), |(f, h, w)| (f * 1000 + h * 10 + w + 1) as f32);
        let mut c = config();
        c.load_volumes = false;
        c.temporal_shifts = ShiftSet::new(vec![0]).unwrap();
        c.img_shape = (6, 6);
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr)).unwrap();
        let arena = ds.view_arena().unwrap();
        let expect = fr.slice(s![1, 1..7, 3..9]);
        assert_eq!(arena.slice(s![1, .., .., VIEW_CHANNEL]), expect);
    }

    #[test]
    fn test_duplicate_selection_with_random_shifts() {
        let fr = frames();
        let mut c = config();
        c.load_volumes = false;
        c.images_to_use = Some(vec![0; F]);
        c.use_random_shifts = true;
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr)).unwrap();
        assert_eq!(ds.len(), F);
        assert_eq!(ds.view_arena().unwrap().len_of(Axis(0)), 3);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..10 {
            for i in 0..ds.len() {
                let ids = stacked_ids(&ds.get_with_rng(i, &mut rng).views);
                assert!(ids.iter().all(|&id| id < 3));
            }
        }
    }

    #[test]
    fn test_registration_draws() {
        let (fr, vo) = (frames(), volumes());
        let mut c = config();
        c.mode = IngestMode::Resolved;
        c.policy = SamplingPolicy::Registration;
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().frames(&fr).volumes(&vo)).unwrap();

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..16)
                .map(|_| match ds.get_with_rng(0, &mut rng).volume {
                    SampleTensor::Single(v) => volume_id(&v),
                    other => panic!("unexpected: {other:?}"),
                })
                .collect::<Vec<_>>()
        };
        let a = draw(11);
        assert_eq!(a, draw(11));
        assert!(a.iter().all(|&id| id < ds.len()));
        assert!(a.iter().any(|&id| id != a[0]));
        // 视图窗口不受影响.
        assert_eq!(stacked_ids(&ds.get(0).views), vec![0, 1, 2]);
    }

    #[test]
    fn test_volume_only_without_images() {
        let vo = volumes();
        let mut c = config();
        c.load_images = false;
        c.policy = SamplingPolicy::VolumeOnly;
        c.mode = IngestMode::Resolved;
        let ds = XlfmDataset::ingest(c, coords(), Sources::new().volumes(&vo)).unwrap();
        assert_eq!(ds.len(), F - 2);
        assert_eq!(ds.channel_count(), 0);
        let s = ds.get(1);
        assert!(s.views.is_placeholder());
        assert!(ds.extract_sample_views(&s).is_none());
        match &s.volume {
            SampleTensor::Stacked(v) => {
                assert_eq!(v.iter().map(volume_id).collect::<Vec<_>>(), vec![1, 2, 3]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(s.volume.to_array().unwrap().dim(), (3, 3, 6, 6));
    }

    #[test]
    fn test_statistics_round_trip() {
        let (fr, vo) = (frames(), volumes());
        let mut ds =
            XlfmDataset::ingest(config(), coords(), Sources::new().frames(&fr).volumes(&vo))
                .unwrap();
        let before = (ds.view_arena().cloned(), ds.volume_arena().cloned());
        let stats = ds.statistics();
        let max = ds.max();
        assert_eq!(max.views, Some(5078.0));
        assert_eq!(max.volumes, Some(6.0));

        ds.standardize(&stats);
        let after = ds.statistics();
        let (v, w) = (after.views.unwrap(), after.volumes.unwrap());
        assert!(v.mean.abs() < 1e-3 && (v.std - 1.0).abs() < 1e-3);
        assert!(w.mean.abs() < 1e-3 && (w.std - 1.0).abs() < 1e-3);

        ds.unstandardize(&stats);
        let close = |a: &Array4<f32>, b: &Array4<f32>| {
            a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-2)
        };
        assert!(close(ds.view_arena().unwrap(), before.0.as_ref().unwrap()));
        assert!(close(ds.volume_arena().unwrap(), before.1.as_ref().unwrap()));
    }

    #[test]
    fn test_extract_sample_views() {
        let (fr, vo) = (frames(), volumes());
        let ds = XlfmDataset::ingest(config(), coords(), Sources::new().frames(&fr).volumes(&vo))
            .unwrap();
        let s = ds.get(0);
        let out = ds.extract_sample_views(&s).unwrap();
        assert_eq!(out.dim(), (3, 1, 2, 4, 4));
        let frame: Array2<f32> = fr.index_axis(Axis(0), 1).to_owned();
        assert_eq!(out.slice(s![1, 0, 0, .., ..]), frame.slice(s![2..6, 2..6]));
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_range() {
        let (fr, vo) = (frames(), volumes());
        let ds = XlfmDataset::ingest(config(), coords(), Sources::new().frames(&fr).volumes(&vo))
            .unwrap();
        ds.get(ds.len());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_matches_serial() {
        let (fr, vo) = (frames(), volumes());
        let mut a =
            XlfmDataset::ingest(config(), coords(), Sources::new().frames(&fr).volumes(&vo))
                .unwrap();
        let mut b = a.clone();
        let stats = a.statistics();
        let par = a.par_statistics();
        let (s, p) = (stats.views.unwrap(), par.views.unwrap());
        assert!((s.mean - p.mean).abs() < 1e-3 && (s.std - p.std).abs() < 1e-3);

        a.standardize(&stats);
        b.par_standardize(&stats);
        assert_eq!(a.view_arena(), b.view_arena());
        assert_eq!(a.volume_arena(), b.volume_arena());

        let many = a.par_get_many(&[0, 1, 2]);
        assert_eq!(many.len(), 3);
        assert_eq!(many[2], a.get(2));
    }
}
