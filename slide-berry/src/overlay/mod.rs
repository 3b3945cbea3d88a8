//! 在缩略图上标注切块.
//!
//! 切块坐标只通过 [`DownsampleFactor`] 映射回缩略图: 左上角为 `原图 / factor`,
//! 边长为 `TILE_SIZE / factor`. 切块身份从持久化的键 (文件名) 中恢复,
//! 恢复失败的切块会被跳过, 不影响其余切块的标注.

mod draw;

pub use draw::{draw_outline, ThumbBox};

use crate::classify::TilePrediction;
use crate::consts::{color, legend, THUMBNAIL_MAX, TILE_SIZE};
use crate::slide::{DownsampleFactor, SlideReadError, SlideSource};
use crate::tile::TileCoord;
use crate::class_color;
use image::{Rgb, RgbImage};
use std::fmt;

/// 原图坐标在缩略图上的精确位置 `(x / f, y / f)`.
#[inline]
pub fn map_to_thumbnail(coord: TileCoord, factor: DownsampleFactor) -> (f64, f64) {
    (factor.to_thumb(coord.x), factor.to_thumb(coord.y))
}

/// 切块在缩略图上的精确边长 `TILE_SIZE / f`.
#[inline]
pub fn thumb_box_size(factor: DownsampleFactor) -> f64 {
    factor.to_thumb(TILE_SIZE)
}

impl ThumbBox {
    /// 切块 `coord` 在缩略图上的标注框. 位置和边长都向零截断到整数像素.
    pub fn from_tile(coord: TileCoord, factor: DownsampleFactor) -> Self {
        let (x, y) = map_to_thumbnail(coord, factor);
        Self {
            x: x as u32,
            y: y as u32,
            size: thumb_box_size(factor) as u32,
        }
    }
}

/// 标注颜色策略.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorPolicy {
    /// 按类别着色, 无法识别的类名使用灰色.
    ByClass,

    /// 统一颜色. 用于只标注部分切块, 例如只标注肿瘤切块.
    Uniform(Rgb<u8>),

    /// 按 20 类图例着色, 图例中没有的类名使用黑色.
    Legend,
}

impl ColorPolicy {
    /// 类名 `label` 的标注颜色.
    #[inline]
    pub fn color_of(&self, label: &str) -> Rgb<u8> {
        match self {
            ColorPolicy::ByClass => class_color(label),
            ColorPolicy::Uniform(c) => *c,
            ColorPolicy::Legend => legend::legend_color(label).unwrap_or(color::BLACK),
        }
    }
}

/// 在 `thumbnail` 的副本上标注切块.
///
/// `tiles` 中每一项为 `(切块键, 类名)`. 键无法解析的切块被跳过.
pub fn overlay<I, K, L>(
    thumbnail: &RgbImage,
    tiles: I,
    factor: DownsampleFactor,
    policy: ColorPolicy,
) -> RgbImage
where
    I: IntoIterator<Item = (K, L)>,
    K: AsRef<str>,
    L: AsRef<str>,
{
    let mut img = thumbnail.clone();
    for (key, label) in tiles {
        let key = key.as_ref();
        let coord = match TileCoord::parse_key(key) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Skipping tile `{key}` in overlay: {e}");
                continue;
            }
        };
        let color = policy.color_of(label.as_ref());
        draw_outline(
            &mut img,
            ThumbBox::from_tile(coord, factor),
            color,
            color::OUTLINE_WIDTH,
        );
    }
    img
}

/// 标注图无法生成. 对整个处理流程来说这不是致命错误.
#[derive(Debug)]
pub enum OverlayError {
    /// 重新生成缩略图失败.
    Thumbnail(SlideReadError),

    /// 原图或缩略图宽度为 0, 无法求下采样倍率.
    Degenerate,
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayError::Thumbnail(e) => write!(f, "visualization unavailable: {e}"),
            OverlayError::Degenerate => {
                f.write_str("visualization unavailable: degenerate thumbnail")
            }
        }
    }
}

impl std::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OverlayError::Thumbnail(e) => Some(e),
            OverlayError::Degenerate => None,
        }
    }
}

impl From<SlideReadError> for OverlayError {
    #[inline]
    fn from(value: SlideReadError) -> Self {
        OverlayError::Thumbnail(value)
    }
}

/// 重新生成缩略图并标注 `tiles`.
pub fn render_overlay<S, I, K, L>(
    slide: &S,
    tiles: I,
    policy: ColorPolicy,
) -> Result<RgbImage, OverlayError>
where
    S: SlideSource + ?Sized,
    I: IntoIterator<Item = (K, L)>,
    K: AsRef<str>,
    L: AsRef<str>,
{
    let thumb = slide.thumbnail(THUMBNAIL_MAX)?;
    let factor =
        DownsampleFactor::new(slide.dimensions().0, thumb.width()).ok_or(OverlayError::Degenerate)?;
    Ok(overlay(&thumb, tiles, factor, policy))
}

/// 按预测类别着色的全部切块标注图.
pub fn render_class_map<S: SlideSource + ?Sized>(
    slide: &S,
    predictions: &[TilePrediction],
) -> Result<RgbImage, OverlayError> {
    render_overlay(
        slide,
        predictions.iter().map(|p| (p.key(), p.class.name())),
        ColorPolicy::ByClass,
    )
}

/// 只标注被预测为肿瘤的切块, 统一为红色.
pub fn render_tumor_map<S: SlideSource + ?Sized>(
    slide: &S,
    predictions: &[TilePrediction],
) -> Result<RgbImage, OverlayError> {
    render_overlay(
        slide,
        predictions
            .iter()
            .filter(|p| p.class.is_tumor())
            .map(|p| (p.key(), p.class.name())),
        ColorPolicy::Uniform(color::RED),
    )
}
