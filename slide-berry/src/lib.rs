#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对全切片病理图像 (Whole-Slide Image, WSI) 做组织区域检测、切块、
//! 切块分类结果聚合, 以及缩略图上的切块标注.
//!
//! 该 crate 目前仅提供 `safe` 接口. 神经网络本身不在本 crate 内,
//! 调用方通过实现 [`classify::Classifier`] 接入任意模型.
//!
//! # 坐标系
//!
//! 程序中同时存在三套坐标:
//!
//! 1. 原图 (level 0) 像素坐标, 以 `(x, y)` 表示, `x` 向右, `y` 向下;
//! 2. 缩略图像素坐标. 形态学处理与连通域标记都在这里进行,
//!   按照 `ndarray` 的习惯以 `(行, 列)` 即 `(h, w)` 表示;
//! 3. 切块网格, 以 [`consts::TILE_SIZE`] 为步长的原图坐标.
//!
//! 前两者之间只通过 [`DownsampleFactor`] 转换: `原图 = 缩略图 * factor`,
//! `缩略图 = 原图 / factor`.
//!
//! # 功能
//!
//! ### 切片访问 ✅
//!
//! 统一的 [`SlideSource`] 接口. 内置由普通栅格图像支撑的 [`ImageSlide`];
//! 打开 `openslide` feature 后提供金字塔格式支持.
//!
//! 实现位于 `slide-berry/src/slide`.
//!
//! ### 组织区域检测 ✅
//!
//! 灰度化 -> Otsu 全局门限 -> 5x5 闭运算 -> 8-邻域连通域标记.
//!
//! 实现位于 `slide-berry/src/tissue`.
//!
//! ### 切块与组织占比过滤 ✅
//!
//! 每个候选切块都会 **重新** 计算局部 Otsu 门限, 以适应染色强度的局部差异.
//! 这比复用缩略图全局门限更慢, 但更准确.
//!
//! 实现位于 `slide-berry/src/tile`.
//!
//! ### 切块分类与全片聚合 ✅
//!
//! 实现位于 `slide-berry/src/classify` 和 `slide-berry/src/aggregate`.
//!
//! ### 缩略图标注 ✅
//!
//! 实现位于 `slide-berry/src/overlay`.
//!
//! ### 结果缓存 ✅
//!
//! 以切片标识为键缓存上一次的预测结果, 避免重复计算.
//!
//! 实现位于 `slide-berry/src/cache.rs`.

/// 二维索引 (行, 列), 用于缩略图空间.
pub type Idx2d = (usize, usize);

pub mod consts;

mod class;

pub use class::{class_color, CellClass, ParseClassError};

pub mod slide;

pub use slide::{DownsampleFactor, ImageSlide, SlideReadError, SlideSource};

#[cfg(feature = "openslide")]
pub use slide::OpenSlideSource;

pub mod tissue;

pub use tissue::{detect_tissue, LabeledMask, TissueRegion};

pub mod tile;

pub use tile::{Tile, TileCoord, TileStore, Tiler};

pub mod classify;

pub use classify::{ClassDistribution, Classified, Classifier, ClassifyError, TilePrediction};

pub mod aggregate;

pub use aggregate::{aggregate, summarize, Aggregate, Diagnosis, SlideSummary};

pub mod overlay;

pub mod pipeline;

pub use pipeline::{Analysis, PipelineError, SlideAnalysis, SlidePipeline};

pub mod cache;

pub mod prelude;

/// 按 "四舍六入五成双" 规则保留两位小数.
#[inline]
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}
