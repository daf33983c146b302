//! 体数据 `[depth, height, width]` 的加载期预处理.

use ndarray::{s, ArrayBase, ArrayView3, ArrayViewMut3, Axis, DataMut, Ix3, Slice};

use crate::{XlfmError, XlfmResult};

/// 将体数据六个表面 `border` 厚度内的体素全部置零. 原地修改.
///
/// `border == 0` 时不做任何事; `border` 超过某轴一半长度时该轴整体被置零.
/// 内部体素不受影响.
pub fn blank_border<S>(volume: &mut ArrayBase<S, Ix3>, border: usize)
where
    S: DataMut<Elem = f32>,
{
    if border == 0 {
        return;
    }
    for axis in 0..3 {
        let len = volume.len_of(Axis(axis));
        let b = border.min(len);
        volume.slice_axis_mut(Axis(axis), Slice::from(..b)).fill(0.0);
        volume
            .slice_axis_mut(Axis(axis), Slice::from(len - b..))
            .fill(0.0);
    }
}

/// 检查体数据是否全部为有限值. `index` 为该体数据的物理帧索引, 仅用于报错.
pub fn ensure_finite(volume: &ArrayView3<f32>, index: usize) -> XlfmResult<()> {
    if volume.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(XlfmError::DecodeInfinity { index })
    }
}

/// 将已对齐的体数据写入 arena 槽位 `slot` (`[n_depths, H, W]`).
///
/// 深度不足 `n_depths` 时其余层保持为 0; 深度超出或空间尺寸不一致时返回
/// [`XlfmError::ShapeMismatch`].
pub fn fill_depths(mut slot: ArrayViewMut3<f32>, aligned: ArrayView3<f32>) -> XlfmResult<()> {
    let (n_depths, h, w) = slot.dim();
    let (d, ah, aw) = aligned.dim();
    if d > n_depths || (ah, aw) != (h, w) {
        return Err(XlfmError::shape("对齐后的体数据", &[n_depths, h, w], &[d, ah, aw]));
    }
    slot.slice_mut(s![..d, .., ..]).assign(&aligned);
    Ok(())
}
