//! 运行时错误.

use ndarray_npy::ReadNpzError;
use thiserror::Error;

/// 数据集组装过程中的运行时错误.
#[derive(Debug, Error)]
pub enum XlfmError {
    /// 透镜坐标文件中存在无法解析为两个整数的行.
    ///
    /// `line` 从 1 开始计数; 文件不含任何坐标时 `line` 为 0.
    #[error("透镜坐标文件格式错误 (第 {line} 行): `{content}`")]
    MalformedCoordinateFile {
        /// 出错行号.
        line: usize,
        /// 出错行原文.
        content: String,
    },

    /// 解码得到的体数据包含 inf 或 NaN. 视为损坏输入, 不可恢复.
    #[error("第 {index} 帧体数据包含非有限值")]
    DecodeInfinity {
        /// 物理帧索引.
        index: usize,
    },

    /// 形状不符合预期.
    #[error("{what} 形状不匹配: 期望 {expected:?}, 实际 {found:?}")]
    ShapeMismatch {
        /// 出错对象的简短描述.
        what: &'static str,
        /// 期望形状.
        expected: Vec<usize>,
        /// 实际形状.
        found: Vec<usize>,
    },

    /// 要求加载副通道 (sparse), 但未提供数据源.
    ///
    /// 该错误可恢复: 数据集会关闭副通道并继续加载.
    #[error("副通道 (sparse) 数据源缺失")]
    MissingSecondarySource,

    /// 必需的数据源缺失.
    #[error("缺少 {0} 数据源")]
    MissingSource(&'static str),

    /// 请求的物理帧超出数据源范围.
    #[error("物理帧索引 {index} 越界 (数据源长度 {len})")]
    FrameOutOfRange {
        /// 请求的索引.
        index: usize,
        /// 数据源长度.
        len: usize,
    },

    /// npz 工作通道太多. 最多支持 64.
    #[error("npz 工作通道过多, 最多支持 {0} 个")]
    TooManyWorkers(usize),

    /// 打开或读取 npz 文件错误.
    #[error(transparent)]
    Npz(#[from] ReadNpzError),

    /// 统计量编码/解码错误.
    #[cfg(feature = "serde")]
    #[error("统计量编解码失败: {0}")]
    Codec(#[from] bincode::Error),

    /// 其他底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl XlfmError {
    /// 构造 [`XlfmError::ShapeMismatch`].
    #[inline]
    pub(crate) fn shape(what: &'static str, expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// 错误是否可恢复.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingSecondarySource)
    }
}
