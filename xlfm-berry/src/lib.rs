#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为 XLFM (扩展视场光场显微镜) 重建任务组装训练样本:
//! 从多透镜传感器帧序列与对应的三维荧光体数据真值出发,
//! 生成时间对齐、空间归一化的张量.
//!
//! 该 crate 目前仅提供 `safe` 接口. 文件发现与 TIFF 解码由调用方负责,
//! 本 crate 只接收已解码的数组 (见 [`dataset::FrameSource`] 与 [`dataset::VolumeSource`]).
//!
//! # 注意
//!
//! 1. 坐标 `(x, y)` 中 `x` 沿图像行方向 (高), `y` 沿列方向 (宽).
//! 2. 在非期望情况下 (如样本索引越界), 程序会直接 panic, 而不会导致内存错误.
//!   As what Rust promises.
//!
//! # 开发计划
//!
//! ### 透镜标定坐标读取 ✅
//!
//! 实现位于 `xlfm-berry/src/geometry.rs`.
//!
//! ### 透镜子图提取 ✅
//!
//! 下界截断, 上界由图像尺寸截断, 子图靠右下对齐写入.
//!
//! 实现位于 `xlfm-berry/src/extract.rs`.
//!
//! ### 体数据规范窗口与表面置零 ✅
//!
//! 实现位于 `xlfm-berry/src/data/window.rs` 与 `xlfm-berry/src/data/volume.rs`.
//!
//! ### 传感器帧补到最短边与中心裁剪 ✅
//!
//! 高度方向两侧各取完整差值, 宽度方向两侧各取一半. 该不对称性被如实保留.
//!
//! 实现位于 `xlfm-berry/src/data/frame.rs`.
//!
//! ### 时间窗口索引 (配对 / 配准 / 仅体数据) ✅
//!
//! 实现位于 `xlfm-berry/src/temporal.rs`.
//!
//! ### 数据集 arena 与归一化统计 ✅
//!
//! 实现位于 `xlfm-berry/src/dataset`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 带符号二维坐标. 透镜中心允许位于图像之外.
pub type Idx2dI32 = (i32, i32);

/// 本 crate 的 `Result`.
pub type XlfmResult<T> = Result<T, XlfmError>;

pub mod consts;
pub mod data;
pub mod dataset;
mod error;
pub mod extract;
mod geometry;
pub mod prelude;
pub mod temporal;

pub use data::CanonicalWindow;
pub use error::XlfmError;
pub use geometry::LensletCoords;
