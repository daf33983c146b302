//! 传感器帧 `[H, W]` 的加载期预处理.

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};

use crate::{Idx2d, XlfmError, XlfmResult};

/// 四边带符号的填充量. 正值补零, 负值裁掉对应边的行/列.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignedPad {
    /// 上.
    pub top: i64,
    /// 下.
    pub bottom: i64,
    /// 左.
    pub left: i64,
    /// 右.
    pub right: i64,
}

impl SignedPad {
    /// "补到最短边" 的填充量.
    ///
    /// 记 `m = min(H, W)`, `dw = m - W`, `dh = m - H` (均不为正).
    /// 宽度方向两侧各取 `floor(dw / 2)`; 高度方向两侧 **各取完整的** `dh`.
    /// 两轴并不对称, 结果一般不是正方形.
    pub fn to_min((h, w): Idx2d) -> Self {
        let m = h.min(w) as i64;
        let dw = m - w as i64;
        let dh = m - h as i64;
        let half = dw.div_euclid(2);
        Self {
            top: dh,
            bottom: dh,
            left: half,
            right: half,
        }
    }

    /// 对尺寸 `(h, w)` 施加填充后的结果尺寸, 可能为负.
    #[inline]
    pub fn padded_dim(&self, (h, w): Idx2d) -> (i64, i64) {
        (
            h as i64 + self.top + self.bottom,
            w as i64 + self.left + self.right,
        )
    }
}

/// 单轴上的 (源区间, 目标起点).
#[inline]
fn axis_copy(len: usize, before: i64, after: i64) -> (std::ops::Range<usize>, usize) {
    let src_lo = (-before).max(0) as usize;
    let src_hi = (len as i64 - (-after).max(0)).max(0) as usize;
    let src_hi = src_hi.max(src_lo.min(len));
    (src_lo.min(len)..src_hi, before.max(0) as usize)
}

/// 对 `image` 施加带符号填充.
///
/// 结果任一轴长度不为正时返回 [`XlfmError::ShapeMismatch`].
pub fn pad_signed(image: ArrayView2<f32>, pad: SignedPad) -> XlfmResult<Array2<f32>> {
    let (h, w) = image.dim();
    let (nh, nw) = pad.padded_dim((h, w));
    if nh <= 0 || nw <= 0 {
        return Err(XlfmError::shape(
            "填充后的帧",
            &[1, 1],
            &[nh.max(0) as usize, nw.max(0) as usize],
        ));
    }

    let mut out = Array2::zeros((nh as usize, nw as usize));
    let (rows, dst_h) = axis_copy(h, pad.top, pad.bottom);
    let (cols, dst_w) = axis_copy(w, pad.left, pad.right);
    if rows.is_empty() || cols.is_empty() {
        return Ok(out);
    }
    let (rh, rw) = (rows.len(), cols.len());
    out.slice_mut(s![dst_h..dst_h + rh, dst_w..dst_w + rw])
        .assign(&image.slice(s![rows, cols]));
    Ok(out)
}

/// "补到最短边". 见 [`SignedPad::to_min`].
#[inline]
pub fn pad_to_min(image: ArrayView2<f32>) -> XlfmResult<Array2<f32>> {
    pad_signed(image, SignedPad::to_min(image.dim()))
}

/// 中心裁剪到 `shape`. 起点为 `((H - h) / 2, (W - w) / 2)`.
///
/// 图像比 `shape` 小时返回 [`XlfmError::ShapeMismatch`].
pub fn center_crop<'a>(
    image: ArrayView2<'a, f32>,
    (th, tw): Idx2d,
) -> XlfmResult<ArrayView2<'a, f32>> {
    let (h, w) = image.dim();
    if h < th || w < tw {
        return Err(XlfmError::shape("裁剪前的帧", &[th, tw], &[h, w]));
    }
    let (dh, dw) = ((h - th) / 2, (w - tw) / 2);
    Ok(image.slice_move(s![dh..dh + th, dw..dw + tw]))
}

/// 帧的完整加载期预处理: [`pad_to_min`] 后 [`center_crop`] 到 `slot` 的尺寸, 并写入 `slot`.
pub fn prepare_into(frame: ArrayView2<f32>, mut slot: ArrayViewMut2<f32>) -> XlfmResult<()> {
    let padded = pad_to_min(frame)?;
    let cropped = center_crop(padded.view(), slot.dim())?;
    slot.assign(&cropped);
    Ok(())
}
