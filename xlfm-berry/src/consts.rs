//! 通用常量.

/// 默认配置.
pub mod defaults {
    /// 透镜坐标的默认统一偏移量 (像素).
    pub const LENSLET_OFFSET: i32 = 50;

    /// 体数据深度方向默认填充层数.
    pub const N_DEPTHS_TO_FILL: usize = 120;

    /// 体数据六个表面默认置零厚度 (体素).
    pub const BORDER_BLANKING: usize = 10;

    /// 默认时间偏移集合.
    pub const TEMPORAL_SHIFTS: [usize; 3] = [0, 1, 2];
}

/// 透镜坐标文件的列分隔符.
pub const COORDS_DELIMITER: char = '\t';

/// npz 归档中帧堆栈的默认条目名.
pub const NPZ_FRAMES_ENTRY: &str = "frames.npy";

/// npz 归档中副通道帧堆栈的默认条目名.
pub const NPZ_SPARSE_FRAMES_ENTRY: &str = "frames_sparse.npy";

/// npz 归档最多允许的工作通道数.
pub const NPZ_MAX_WORKERS: usize = 64;

/// 主通道 (原始传感器图像) 在视图 arena 尾轴上的位置.
pub const VIEW_CHANNEL: usize = 0;

/// 副通道 (sparse) 在视图 arena 尾轴上的位置.
pub const SPARSE_CHANNEL: usize = 1;
