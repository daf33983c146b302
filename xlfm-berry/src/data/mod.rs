//! 传感器帧与体数据的加载期预处理.

pub mod frame;
pub mod volume;
pub mod window;

pub use frame::{center_crop, pad_to_min, SignedPad};
pub use volume::blank_border;
pub use window::CanonicalWindow;
