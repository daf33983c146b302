//! 归一化统计量.

use ndarray::{ArrayView, ArrayViewMut, Dimension};
use ordered_float::OrderedFloat;

/// 单个通道的均值与标准差 (无偏, `n - 1`).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelStats {
    /// 均值.
    pub mean: f32,
    /// 无偏标准差.
    pub std: f32,
}

impl ChannelStats {
    /// 计算 `data` 的均值与无偏标准差. 内部以 `f64` 累加.
    ///
    /// 只有一个元素时标准差记为 0. `data` 为空时返回 `None`.
    pub fn of<D: Dimension>(data: ArrayView<f32, D>) -> Option<Self> {
        let n = data.len();
        if n == 0 {
            return None;
        }
        let mean = data.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
        let ss = data
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>();
        Some(Self::finish(mean, ss, n))
    }

    #[inline]
    fn finish(mean: f64, ss: f64, n: usize) -> Self {
        let var = if n > 1 { ss / (n - 1) as f64 } else { 0.0 };
        Self {
            mean: mean as f32,
            std: var.sqrt() as f32,
        }
    }

    /// 标准化时实际使用的除数. 标准差为 0 或非有限值时退化为 1.
    #[inline]
    pub fn divisor(&self) -> f32 {
        if self.std.is_finite() && self.std != 0.0 {
            self.std
        } else {
            1.0
        }
    }

    /// 原地计算 `(x - mean) / std`.
    pub fn standardize<D: Dimension>(&self, mut data: ArrayViewMut<f32, D>) {
        let (mean, div) = (self.mean, self.divisor());
        data.mapv_inplace(|x| (x - mean) / div);
    }

    /// [`Self::standardize`] 的逆变换.
    pub fn unstandardize<D: Dimension>(&self, mut data: ArrayViewMut<f32, D>) {
        let (mean, div) = (self.mean, self.divisor());
        data.mapv_inplace(|x| x * div + mean);
    }
}

/// 获取 `data` 的最大值. NaN 视为最大. `data` 为空时返回 `None`.
pub fn max_of<D: Dimension>(data: ArrayView<f32, D>) -> Option<f32> {
    data.iter().copied().map(OrderedFloat).max().map(|m| m.0)
}

/// 各通道最大值. 未加载的通道为 `None`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelMax {
    /// 主通道 (原始传感器图像).
    pub views: Option<f32>,
    /// 副通道 (sparse).
    pub sparse: Option<f32>,
    /// 体数据.
    pub volumes: Option<f32>,
}

/// 各通道归一化统计量. 未加载的通道为 `None`, 标准化时跳过.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizationStatistics {
    /// 主通道 (原始传感器图像).
    pub views: Option<ChannelStats>,
    /// 副通道 (sparse).
    pub sparse: Option<ChannelStats>,
    /// 体数据.
    pub volumes: Option<ChannelStats>,
}

#[cfg(feature = "serde")]
impl NormalizationStatistics {
    /// 以 `bincode` 编码, 便于在验证集上复用训练集的统计量.
    pub fn to_bytes(&self) -> crate::XlfmResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// 从 [`Self::to_bytes`] 的结果解码.
    pub fn from_bytes(bytes: &[u8]) -> crate::XlfmResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(feature = "rayon")]
mod par {
    use super::ChannelStats;
    use ndarray::parallel::prelude::*;
    use ndarray::{ArrayView, ArrayViewMut, Dimension};

    /// 并发操作部分
    impl ChannelStats {
        /// [`Self::of`] 的并行版本. 由于求和顺序不同, 结果可能有极小的舍入差异.
        pub fn par_of<D: Dimension>(data: ArrayView<f32, D>) -> Option<Self> {
            let n = data.len();
            if n == 0 {
                return None;
            }
            let mean = data
                .clone()
                .into_par_iter()
                .map(|&x| x as f64)
                .sum::<f64>()
                / n as f64;
            let ss = data
                .into_par_iter()
                .map(|&x| (x as f64 - mean).powi(2))
                .sum::<f64>();
            Some(Self::finish(mean, ss, n))
        }

        /// [`Self::standardize`] 的并行版本.
        pub fn par_standardize<D: Dimension>(&self, mut data: ArrayViewMut<f32, D>) {
            let (mean, div) = (self.mean, self.divisor());
            data.par_mapv_inplace(|x| (x - mean) / div);
        }
    }
}
