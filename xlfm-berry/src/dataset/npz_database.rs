use ndarray::{Array3, Ix3, OwnedRepr};
use ndarray_npy::NpzReader;
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::source::VolumeSource;
use crate::consts::{NPZ_FRAMES_ENTRY, NPZ_MAX_WORKERS, NPZ_SPARSE_FRAMES_ENTRY};
use crate::{XlfmError, XlfmResult};

/// Npz 文件归档.
///
/// 该结构可用于建模硬盘上预先解码好的帧堆栈与体数据. 约定:
///
/// 1. 帧堆栈 `[F, H, W]` 存放在条目 `frames.npy` (副通道为 `frames_sparse.npy`);
/// 2. 第 `i` 个体数据 `[depth, H, W]` 存放在条目 `{i}.npy`. 体数据个数为最大编号加一;
///   编号不连续时, 读取缺失编号返回 [`XlfmError::Npz`].
pub struct NpzArchive {
    entries: Vec<Mutex<NpzReader<File>>>,
    turn: AtomicUsize,
    volumes: usize,
}

impl NpzArchive {
    /// 初始化.
    ///
    /// `workers` 指定了底层工作通道的个数, 最大为 64. 系统会从路径 `p` 打开文件
    /// `workers` 次, 并为每个打开通道指定一个排他入口点 (以期获得更高的并行度).
    pub fn new<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> XlfmResult<Self> {
        let workers = workers.get();
        if workers > NPZ_MAX_WORKERS {
            return Err(XlfmError::TooManyWorkers(NPZ_MAX_WORKERS));
        }
        let mut v = Vec::with_capacity(workers);
        for _ in 0..workers {
            let file = OpenOptions::new().read(true).open(p.as_ref())?;
            v.push(Mutex::new(NpzReader::new(file)?));
        }
        let mut ans = Self {
            entries: v,
            turn: AtomicUsize::new(0),
            volumes: 0,
        };
        ans.volumes = volume_index_bound(&ans.names()?);
        Ok(ans)
    }

    /// 读取主通道帧堆栈 `[F, H, W]`.
    #[inline]
    pub fn frame_stack(&self) -> XlfmResult<Array3<f32>> {
        self.stack_by_name(NPZ_FRAMES_ENTRY)
    }

    /// 读取副通道帧堆栈. 归档中没有该条目时返回 `Ok(None)`.
    pub fn sparse_frame_stack(&self) -> XlfmResult<Option<Array3<f32>>> {
        if !self.names()?.iter().any(|n| n == NPZ_SPARSE_FRAMES_ENTRY) {
            return Ok(None);
        }
        self.stack_by_name(NPZ_SPARSE_FRAMES_ENTRY).map(Some)
    }

    /// 通过 npz 索引文件名 `name` 获取三维数组.
    pub fn stack_by_name(&self, name: &str) -> XlfmResult<Array3<f32>> {
        let mut file = self.next_entry();
        Ok(file.by_name::<OwnedRepr<f32>, Ix3>(name)?)
    }

    /// 通过文件名 `{num}.npy` 获取体数据.
    pub fn volume_by_num_dot_npy(&self, num: usize) -> XlfmResult<Array3<f32>> {
        self.stack_by_name(format!("{num}.npy").as_str())
    }

    /// 获取底层 npz 文件包含的所有文件名.
    pub fn names(&self) -> XlfmResult<Vec<String>> {
        Ok(self.next_entry().names()?)
    }

    /// 工作通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    fn next_entry(&self) -> MutexGuard<'_, NpzReader<File>> {
        let slot = self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len();
        self.entries[slot]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// 形如 `{num}.npy` 的条目的最大编号加一. 没有此类条目时为 0.
fn volume_index_bound(names: &[String]) -> usize {
    names
        .iter()
        .filter_map(|n| n.strip_suffix(".npy"))
        .filter_map(|stem| stem.parse::<usize>().ok())
        .max()
        .map_or(0, |m| m + 1)
}

impl VolumeSource for NpzArchive {
    #[inline]
    fn len(&self) -> usize {
        self.volumes
    }

    fn volume(&self, index: usize) -> XlfmResult<Array3<f32>> {
        if index >= self.volumes {
            return Err(XlfmError::FrameOutOfRange {
                index,
                len: self.volumes,
            });
        }
        self.volume_by_num_dot_npy(index)
    }
}
