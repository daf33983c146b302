//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx2dI32, XlfmResult};

pub use crate::{CanonicalWindow, LensletCoords, XlfmError};

pub use crate::data::{blank_border, center_crop, pad_to_min};
pub use crate::extract::{extract_frame_views, extract_views, PatchExtractor};

#[cfg(feature = "rayon")]
pub use crate::extract::par_extract_views;

pub use crate::temporal::{IngestMode, SamplingPolicy, ShiftSet, TemporalIndexer};

pub use crate::dataset::{
    ChannelMax, DatasetConfig, FrameSource, NormalizationStatistics, NpzArchive, Sample,
    SampleTensor, Sources, VolumeSource, XlfmDataset,
};
