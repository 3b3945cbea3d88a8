//! 切块: 坐标, 持久化与组织占比过滤.

mod store;
mod tiler;

pub use store::{home_output_dir, TileStore};
pub use tiler::{Tiler, TilingError};

use crate::consts::{TILE_EXT, TILE_PREFIX};
use image::RgbImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 切块左上角在原图上的坐标.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileCoord {
    #[allow(missing_docs)]
    pub x: u32,
    #[allow(missing_docs)]
    pub y: u32,
}

impl TileCoord {
    #[allow(missing_docs)]
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// 持久化文件名 `tile_<x>_<y>.jpg`. 同时也是切块的身份键.
    pub fn file_name(&self) -> String {
        format!("{TILE_PREFIX}{}_{}.{TILE_EXT}", self.x, self.y)
    }

    /// 由身份键恢复坐标. 接受完整路径或文件名, 扩展名任意.
    ///
    /// ```
    /// use slide_berry::TileCoord;
    ///
    /// let c = TileCoord::parse_key("out/slide/tile_512_768.jpg").unwrap();
    /// assert_eq!(c, TileCoord::new(512, 768));
    /// assert!(TileCoord::parse_key("tile_512.jpg").is_err());
    /// ```
    pub fn parse_key<P: AsRef<Path>>(key: P) -> Result<Self, ParseTileKeyError> {
        let stem = key
            .as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or(ParseTileKeyError::NoFileName)?;
        let rest = stem
            .strip_prefix(TILE_PREFIX)
            .ok_or(ParseTileKeyError::MissingPrefix)?;
        let mut parts = rest.split('_');
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ParseTileKeyError::BadCoordinates);
        };
        let parse = |s: &str| s.parse::<u32>().map_err(|_| ParseTileKeyError::BadNumber);
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = ParseTileKeyError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_key(s)
    }
}

/// 切块身份键格式错误.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTileKeyError {
    /// 路径没有文件名部分.
    NoFileName,

    /// 文件名不以 `tile_` 开头.
    MissingPrefix,

    /// 不是恰好两个以 `_` 分隔的坐标.
    BadCoordinates,

    /// 坐标不是非负整数.
    BadNumber,
}

impl fmt::Display for ParseTileKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseTileKeyError::NoFileName => "tile key has no file name",
            ParseTileKeyError::MissingPrefix => "tile key does not start with `tile_`",
            ParseTileKeyError::BadCoordinates => "tile key must hold exactly two coordinates",
            ParseTileKeyError::BadNumber => "tile coordinate is not a non-negative integer",
        })
    }
}

impl std::error::Error for ParseTileKeyError {}

/// 一个通过组织占比过滤、已经持久化的切块.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    /// 原图坐标.
    pub coord: TileCoord,

    /// 持久化路径.
    pub path: PathBuf,

    /// 局部 Otsu 门限下的组织占比, 位于 `(0.5, 1]`.
    pub tissue_ratio: f64,
}

impl Tile {
    /// 身份键, 即文件名.
    #[inline]
    pub fn key(&self) -> String {
        self.coord.file_name()
    }

    /// 从磁盘重新加载切块像素.
    pub fn load(&self) -> image::ImageResult<RgbImage> {
        Ok(image::open(&self.path)?.to_rgb8())
    }
}
