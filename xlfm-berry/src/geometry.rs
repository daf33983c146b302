//! 透镜阵列标定几何.
//!
//! 标定文件以制表符分隔, 每行一个透镜中心 `(x, y)`, 无表头.
//! 其中 `x` 沿传感器图像的行方向 (高), `y` 沿列方向 (宽).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Index;
use std::path::Path;

use itertools::Itertools;

use crate::consts::COORDS_DELIMITER;
use crate::{Idx2dI32, XlfmError, XlfmResult};

/// 透镜中心坐标表.
///
/// 顺序即透镜索引, 在所有输出中保持不变. 表至少包含一个透镜.
/// 坐标允许为负或越界, 由提取阶段负责截断.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LensletCoords {
    coords: Vec<Idx2dI32>,
}

impl Index<usize> for LensletCoords {
    type Output = Idx2dI32;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.coords[index]
    }
}

impl LensletCoords {
    /// 从 `path` 读取标定文件, 并对每个坐标的两个分量统一加上 `offset`.
    pub fn open<P: AsRef<Path>>(path: P, offset: i32) -> XlfmResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), offset)
    }

    /// 从任意按行读取的数据源解析标定表.
    ///
    /// 每行取前两列, 多余列被忽略, 空行被跳过.
    pub fn from_reader<R: BufRead>(reader: R, offset: i32) -> XlfmResult<Self> {
        let mut coords = Vec::with_capacity(64);
        for (no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (x, y) = parse_row(&line).ok_or_else(|| XlfmError::MalformedCoordinateFile {
                line: no + 1,
                content: line.clone(),
            })?;
            coords.push((x + offset, y + offset));
        }
        Self::from_vec(coords).ok_or(XlfmError::MalformedCoordinateFile {
            line: 0,
            content: String::new(),
        })
    }

    /// 直接由已偏移的坐标构建. `coords` 为空时返回 `None`.
    pub fn from_vec(coords: Vec<Idx2dI32>) -> Option<Self> {
        (!coords.is_empty()).then_some(Self { coords })
    }

    /// 透镜个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// 恒为 `false`. 仅为与 `len` 配对.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// 获取第 `index` 个透镜中心. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Idx2dI32> {
        self.coords.get(index).copied()
    }

    /// 按透镜索引升序迭代.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Idx2dI32> {
        self.coords.iter()
    }

    /// 底层坐标.
    #[inline]
    pub fn as_slice(&self) -> &[Idx2dI32] {
        &self.coords
    }
}

/// 解析 `x\ty` 行.
fn parse_row(line: &str) -> Option<Idx2dI32> {
    let (x, y) = line.split(COORDS_DELIMITER).map(str::trim).next_tuple()?;
    Some((x.parse().ok()?, y.parse().ok()?))
}
