//! 已解码数据源.
//!
//! 文件发现与 TIFF 解码不属于本 crate. 调用方把解码结果包装成
//! [`FrameSource`] / [`VolumeSource`] 交给 [`super::XlfmDataset::ingest`].

use ndarray::{Array2, Array3, Array4, Axis};

use crate::{XlfmError, XlfmResult};

/// 按物理帧编号索引的二维传感器帧序列.
pub trait FrameSource {
    /// 帧数.
    fn len(&self) -> usize;

    /// 是否为空.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取第 `index` 帧 `[H, W]`.
    fn frame(&self, index: usize) -> XlfmResult<Array2<f32>>;
}

/// 按物理帧编号索引的三维体数据序列.
pub trait VolumeSource {
    /// 体数据个数.
    fn len(&self) -> usize;

    /// 是否为空.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取第 `index` 个体数据 `[depth, H, W]`. 返回值归调用方所有, 可原地修改.
    fn volume(&self, index: usize) -> XlfmResult<Array3<f32>>;
}

#[inline]
fn check(index: usize, len: usize) -> XlfmResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(XlfmError::FrameOutOfRange { index, len })
    }
}

/// `[F, H, W]` 帧堆栈.
impl FrameSource for Array3<f32> {
    #[inline]
    fn len(&self) -> usize {
        self.len_of(Axis(0))
    }

    fn frame(&self, index: usize) -> XlfmResult<Array2<f32>> {
        check(index, FrameSource::len(self))?;
        Ok(self.index_axis(Axis(0), index).to_owned())
    }
}

impl FrameSource for Vec<Array2<f32>> {
    #[inline]
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn frame(&self, index: usize) -> XlfmResult<Array2<f32>> {
        check(index, FrameSource::len(self))?;
        Ok(self[index].clone())
    }
}

/// `[F, depth, H, W]` 体数据堆栈.
impl VolumeSource for Array4<f32> {
    #[inline]
    fn len(&self) -> usize {
        self.len_of(Axis(0))
    }

    fn volume(&self, index: usize) -> XlfmResult<Array3<f32>> {
        check(index, VolumeSource::len(self))?;
        Ok(self.index_axis(Axis(0), index).to_owned())
    }
}

impl VolumeSource for Vec<Array3<f32>> {
    #[inline]
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn volume(&self, index: usize) -> XlfmResult<Array3<f32>> {
        check(index, VolumeSource::len(self))?;
        Ok(self[index].clone())
    }
}

/// 一次加载所需的全部数据源. 缺省项表示对应模态不可用.
#[derive(Copy, Clone, Default)]
pub struct Sources<'a> {
    frames: Option<&'a dyn FrameSource>,
    sparse: Option<&'a dyn FrameSource>,
    volumes: Option<&'a dyn VolumeSource>,
}

impl<'a> Sources<'a> {
    /// 空数据源集合.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置主通道帧.
    #[inline]
    pub fn frames(mut self, frames: &'a dyn FrameSource) -> Self {
        self.frames = Some(frames);
        self
    }

    /// 设置副通道 (sparse) 帧.
    #[inline]
    pub fn sparse(mut self, sparse: &'a dyn FrameSource) -> Self {
        self.sparse = Some(sparse);
        self
    }

    /// 设置体数据.
    #[inline]
    pub fn volumes(mut self, volumes: &'a dyn VolumeSource) -> Self {
        self.volumes = Some(volumes);
        self
    }

    pub(crate) fn frame_source(&self) -> Option<&'a dyn FrameSource> {
        self.frames
    }

    pub(crate) fn sparse_source(&self) -> Option<&'a dyn FrameSource> {
        self.sparse
    }

    pub(crate) fn volume_source(&self) -> Option<&'a dyn VolumeSource> {
        self.volumes
    }
}
