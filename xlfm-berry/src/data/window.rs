//! 体数据规范裁剪窗口.

use ndarray::{s, Array3, ArrayView3};

use crate::data::volume::blank_border;
use crate::{Idx2d, XlfmError, XlfmResult};

/// 规范裁剪窗口. 所有体数据都被对齐到该窗口的 (高, 宽) 范围,
/// 以保证体数据 arena 中形状一致.
///
/// 该窗口由第一个加载的体数据计算得出, 此后只读.
/// 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalWindow {
    start: Idx2d,
    end: Idx2d,
}

impl CanonicalWindow {
    /// 由参考体数据 `[depth, height, width]` 计算窗口.
    #[inline]
    pub fn from_reference(reference: &ArrayView3<f32>) -> Self {
        let (_, h, w) = reference.dim();
        Self::from_extent((h, w))
    }

    /// 由参考体数据的空间尺寸 `(H, W)` 计算窗口.
    ///
    /// `half = (H / 2, W / 2)`, `start = (H / 2 - half.0, W / 2 - half.1)`,
    /// `end = start + (H, W)`. 按整除运算, 窗口恒为参考体数据的完整范围.
    pub fn from_extent((h, w): Idx2d) -> Self {
        let half = (h / 2, w / 2);
        let start = (h / 2 - half.0, w / 2 - half.1);
        Self {
            start,
            end: (start.0 + h, start.1 + w),
        }
    }

    /// 窗口起点 (高, 宽), 含.
    #[inline]
    pub fn start(&self) -> Idx2d {
        self.start
    }

    /// 窗口终点 (高, 宽), 不含.
    #[inline]
    pub fn end(&self) -> Idx2d {
        self.end
    }

    /// 窗口尺寸 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        (self.end.0 - self.start.0, self.end.1 - self.start.1)
    }

    /// 将体数据 `[depth, height, width]` 的空间轴裁剪到窗口范围.
    ///
    /// 体数据比窗口小时返回 [`XlfmError::ShapeMismatch`].
    /// 对结果再次调用 `align` 得到相同的结果.
    pub fn align<'a>(&self, volume: ArrayView3<'a, f32>) -> XlfmResult<ArrayView3<'a, f32>> {
        let (d, h, w) = volume.dim();
        if h < self.end.0 || w < self.end.1 {
            return Err(XlfmError::shape(
                "体数据",
                &[d, self.end.0, self.end.1],
                &[d, h, w],
            ));
        }
        Ok(volume.slice_move(s![.., self.start.0..self.end.0, self.start.1..self.end.1]))
    }

    /// 加载时的体数据预处理: 先将体数据自身六个表面 `border` 厚度置零,
    /// 再裁剪到窗口范围.
    pub fn ingest<'a>(
        &self,
        volume: &'a mut Array3<f32>,
        border: usize,
    ) -> XlfmResult<ArrayView3<'a, f32>> {
        blank_border(volume, border);
        let volume: &'a Array3<f32> = volume;
        self.align(volume.view())
    }
}
