//! 透镜子图 (view) 提取.
//!
//! 对每个透镜中心 `(cx, cy)`, 理想子图区域为
//! `[cx - ph/2, cx + ph/2) × [cy - pw/2, cy + pw/2)`.
//! 下界截断到 0, 上界只受图像本身尺寸限制; 截得的子图 **靠右下对齐**
//! 写入输出槽位, 其余位置保持 0.
//!
//! 因此靠近传感器左上角的透镜会得到左上方补零的子图, 而不是回绕或报错.

use std::ops::Range;

use ndarray::{s, Array3, Array5, ArrayView2, ArrayView4, ArrayViewMut4, Axis};

use crate::{Idx2d, LensletCoords};

/// 子图提取器. 借用透镜坐标表.
#[derive(Copy, Clone, Debug)]
pub struct PatchExtractor<'a> {
    coords: &'a LensletCoords,
    patch_shape: Idx2d,
}

impl<'a> PatchExtractor<'a> {
    /// 创建提取器. `patch_shape` 的两个分量都必须非零, 否则程序 panic.
    ///
    /// 子图尺寸通常为偶数; 奇数尺寸下实际截取 `2 * (n / 2)` 行/列,
    /// 多出的一行/列 (位于槽位开头) 保持为 0.
    pub fn new(coords: &'a LensletCoords, patch_shape: Idx2d) -> Self {
        assert!(patch_shape.0 > 0 && patch_shape.1 > 0, "子图尺寸不能为 0");
        Self {
            coords,
            patch_shape,
        }
    }

    /// 子图尺寸 (高, 宽).
    #[inline]
    pub fn patch_shape(&self) -> Idx2d {
        self.patch_shape
    }

    /// 对形状为 `[batch, channel, H, W]` 的帧批次提取子图,
    /// 返回 `[batch, channel, N, ph, pw]`. `N` 为透镜个数.
    pub fn extract(&self, frames: ArrayView4<f32>) -> Array5<f32> {
        let mut out = self.alloc(&frames);
        for (slot, center) in out.axis_iter_mut(Axis(2)).zip(self.coords.iter()) {
            self.fill_slot(&frames, slot, *center);
        }
        out
    }

    /// 对单帧 `[H, W]` 提取子图, 返回 `[N, ph, pw]`.
    pub fn extract_frame(&self, frame: ArrayView2<f32>) -> Array3<f32> {
        let batch = frame.insert_axis(Axis(0)).insert_axis(Axis(0));
        self.extract(batch)
            .index_axis_move(Axis(0), 0)
            .index_axis_move(Axis(0), 0)
    }

    #[inline]
    fn alloc(&self, frames: &ArrayView4<f32>) -> Array5<f32> {
        let (b, c, _, _) = frames.dim();
        let (ph, pw) = self.patch_shape;
        Array5::zeros((b, c, self.coords.len(), ph, pw))
    }

    /// 将以 `(cx, cy)` 为中心的子图写入 `slot` (`[batch, channel, ph, pw]`).
    fn fill_slot(
        &self,
        frames: &ArrayView4<f32>,
        mut slot: ArrayViewMut4<f32>,
        (cx, cy): (i32, i32),
    ) {
        let (_, _, h, w) = frames.dim();
        let (ph, pw) = self.patch_shape;
        let rows = span(cx, ph / 2, h);
        let cols = span(cy, pw / 2, w);
        if rows.is_empty() || cols.is_empty() {
            return;
        }
        let (rh, rw) = (rows.len(), cols.len());
        let patch = frames.slice(s![.., .., rows, cols]);
        slot.slice_mut(s![.., .., ph - rh.., pw - rw..]).assign(&patch);
    }
}

/// 单轴上实际截取的区间: 下界截断到 0, 上界受 `extent` 限制.
#[inline]
fn span(center: i32, half: usize, extent: usize) -> Range<usize> {
    let (center, half, extent) = (i64::from(center), half as i64, extent as i64);
    let hi = num::clamp(center + half, 0, extent);
    let lo = num::clamp(center - half, 0, hi);
    lo as usize..hi as usize
}

/// 对帧批次 `[batch, channel, H, W]` 按 `coords` 提取 `patch_shape` 大小的子图.
///
/// 见 [`PatchExtractor::extract`].
#[inline]
pub fn extract_views(
    frames: ArrayView4<f32>,
    coords: &LensletCoords,
    patch_shape: Idx2d,
) -> Array5<f32> {
    PatchExtractor::new(coords, patch_shape).extract(frames)
}

/// 对单帧 `[H, W]` 按 `coords` 提取子图.
///
/// 见 [`PatchExtractor::extract_frame`].
#[inline]
pub fn extract_frame_views(
    frame: ArrayView2<f32>,
    coords: &LensletCoords,
    patch_shape: Idx2d,
) -> Array3<f32> {
    PatchExtractor::new(coords, patch_shape).extract_frame(frame)
}

#[cfg(feature = "rayon")]
pub use par::par_extract_views;

#[cfg(feature = "rayon")]
mod par {
    use super::PatchExtractor;
    use crate::{Idx2d, LensletCoords};
    use ndarray::{Array5, ArrayView4, Axis};
    use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

    /// [`super::extract_views`] 的并行版本.
    #[inline]
    pub fn par_extract_views(
        frames: ArrayView4<f32>,
        coords: &LensletCoords,
        patch_shape: Idx2d,
    ) -> Array5<f32> {
        PatchExtractor::new(coords, patch_shape).par_extract(frames)
    }

    /// 并发操作部分
    impl PatchExtractor<'_> {
        /// 借助 `rayon`, 按透镜并行地运行 [`Self::extract`]. 输出与串行版本完全一致.
        pub fn par_extract(&self, frames: ArrayView4<f32>) -> Array5<f32> {
            let mut out = self.alloc(&frames);
            let coords = self.coords;
            out.axis_iter_mut(Axis(2))
                .into_par_iter()
                .enumerate()
                .for_each(|(i, slot)| self.fill_slot(&frames, slot, coords[i]));
            out
        }
    }
}
