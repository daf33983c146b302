use std::path::Path;

use crate::consts::defaults;
use crate::temporal::{IngestMode, SamplingPolicy, ShiftSet};
use crate::{Idx2d, LensletCoords, XlfmResult};

/// 数据集加载配置.
///
/// 所有字段公开, 可在 [`DatasetConfig::new`] 之后逐项修改.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DatasetConfig {
    /// 透镜子图尺寸 (高, 宽).
    pub subimage_shape: Idx2d,
    /// 预处理后的传感器帧尺寸 (高, 宽).
    pub img_shape: Idx2d,
    /// 选用的物理帧, 按样本顺序. `None` 表示全部帧.
    pub images_to_use: Option<Vec<usize>>,
    /// 透镜坐标统一偏移量.
    pub lenslet_offset: i32,
    /// 体数据 arena 的深度层数.
    pub n_depths_to_fill: usize,
    /// 体数据表面置零厚度.
    pub border_blanking: usize,
    /// 是否加载传感器帧.
    pub load_images: bool,
    /// 是否加载体数据.
    pub load_volumes: bool,
    /// 是否加载副通道 (sparse).
    pub load_sparse: bool,
    /// 时间偏移集合.
    pub temporal_shifts: ShiftSet,
    /// 是否每次访问随机抽取时间偏移.
    pub use_random_shifts: bool,
    /// 体数据配对方式.
    pub policy: SamplingPolicy,
    /// arena 存储方式.
    pub mode: IngestMode,
}

impl DatasetConfig {
    /// 以默认参数创建配置.
    ///
    /// 子图与帧尺寸的各分量都必须非零, 否则程序 panic.
    pub fn new(subimage_shape: Idx2d, img_shape: Idx2d) -> Self {
        assert!(
            subimage_shape.0 > 0 && subimage_shape.1 > 0,
            "子图尺寸不能为 0"
        );
        assert!(img_shape.0 > 0 && img_shape.1 > 0, "帧尺寸不能为 0");
        Self {
            subimage_shape,
            img_shape,
            images_to_use: None,
            lenslet_offset: defaults::LENSLET_OFFSET,
            n_depths_to_fill: defaults::N_DEPTHS_TO_FILL,
            border_blanking: defaults::BORDER_BLANKING,
            load_images: true,
            load_volumes: true,
            load_sparse: false,
            temporal_shifts: ShiftSet::default(),
            use_random_shifts: false,
            policy: SamplingPolicy::default(),
            mode: IngestMode::default(),
        }
    }

    /// 按 [`Self::lenslet_offset`] 读取透镜坐标文件.
    #[inline]
    pub fn load_coords<P: AsRef<Path>>(&self, path: P) -> XlfmResult<LensletCoords> {
        LensletCoords::open(path, self.lenslet_offset)
    }
}
