//! 全切片图像访问.
//!
//! 核心流程只依赖 [`SlideSource`] 提供的三种能力: 原图尺寸, 有界缩略图,
//! 以及原图任意矩形区域的读取.

mod factor;
mod image_slide;

pub use factor::DownsampleFactor;
pub use image_slide::ImageSlide;

cfg_if::cfg_if! {
    if #[cfg(feature = "openslide")] {
        mod open;

        pub use open::OpenSlideSource;
    }
}

use image::RgbImage;
use std::fmt;
use std::path::Path;

/// 读取切片时的错误. 对于一张切片的处理流程, 它们都是致命的, 不会重试.
#[derive(Debug)]
pub enum SlideReadError {
    /// 底层栅格图像解码/读取错误.
    Image(image::ImageError),

    /// 金字塔格式后端 (openslide) 报告的错误.
    Backend(String),

    /// 切片尺寸或缩略图最大尺寸为 0, 无法生成缩略图.
    EmptyThumbnail,

    /// 请求的矩形 `(x, y, w, h)` 超出原图范围 `(W, H)`.
    OutOfBounds {
        /// 请求的矩形.
        rect: (u32, u32, u32, u32),

        /// 原图尺寸.
        dims: (u32, u32),
    },
}

impl fmt::Display for SlideReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlideReadError::Image(e) => write!(f, "failed to decode slide image: {e}"),
            SlideReadError::Backend(e) => write!(f, "slide backend error: {e}"),
            SlideReadError::EmptyThumbnail => f.write_str("cannot generate an empty thumbnail"),
            SlideReadError::OutOfBounds {
                rect: (x, y, w, h),
                dims: (sw, sh),
            } => write!(
                f,
                "region ({x}, {y}, {w}, {h}) is out of slide bounds {sw}x{sh}"
            ),
        }
    }
}

impl std::error::Error for SlideReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SlideReadError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for SlideReadError {
    #[inline]
    fn from(value: image::ImageError) -> Self {
        SlideReadError::Image(value)
    }
}

/// 切片读取结果.
pub type SlideResult<T> = Result<T, SlideReadError>;

/// 一张可随机访问的全切片图像. 在一次处理流程中它是只读的.
pub trait SlideSource {
    /// 切片名. 用作切块输出目录名和默认缓存键.
    fn name(&self) -> &str;

    /// 切片文件路径. 内存中构建的切片返回 `None`.
    ///
    /// 切块目录以切片名命名, 不同路径下的同名切片靠它区分.
    #[inline]
    fn source(&self) -> Option<&Path> {
        None
    }

    /// 原图 (level 0) 尺寸 `(W, H)`.
    fn dimensions(&self) -> (u32, u32);

    /// 生成保持长宽比、能放进 `max_size` 的缩略图. 不会放大.
    fn thumbnail(&self, max_size: (u32, u32)) -> SlideResult<RgbImage>;

    /// 读取原图上左上角为 `(x, y)`、大小为 `w x h` 的矩形区域.
    ///
    /// 矩形越界时返回 [`SlideReadError::OutOfBounds`].
    fn read_region(&self, x: u32, y: u32, w: u32, h: u32) -> SlideResult<RgbImage>;

    /// 矩形 `(x, y, w, h)` 是否完全位于原图内?
    #[inline]
    fn contains(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        let (sw, sh) = self.dimensions();
        x.checked_add(w).is_some_and(|r| r <= sw) && y.checked_add(h).is_some_and(|b| b <= sh)
    }
}

/// 求缩略图尺寸: 保持长宽比, 不超过 `max_size`, 不放大, 每边至少 1 像素.
///
/// 原图本身已能放进 `max_size` 时原样返回.
pub fn thumbnail_size((w, h): (u32, u32), (max_w, max_h): (u32, u32)) -> (u32, u32) {
    if w <= max_w && h <= max_h {
        return (w, h);
    }
    let scale = f64::min(max_w as f64 / w as f64, max_h as f64 / h as f64);
    let tw = ((w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let th = ((h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (tw, th)
}

/// 取路径的文件名 (不含扩展名) 作为切片名. `a/b/x.svs` -> `x`.
pub fn slide_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_size() {
        assert_eq!(thumbnail_size((2048, 2048), (1024, 1024)), (1024, 1024));
        assert_eq!(thumbnail_size((4096, 2048), (1024, 1024)), (1024, 512));
        assert_eq!(thumbnail_size((2048, 8192), (1024, 1024)), (256, 1024));
        // 不放大
        assert_eq!(thumbnail_size((500, 300), (1024, 1024)), (500, 300));
        // 极端长宽比也至少保留 1 像素
        assert_eq!(thumbnail_size((100_000, 10), (1024, 1024)), (1024, 1));
    }

    #[test]
    fn test_slide_name() {
        assert_eq!(slide_name("uploaded_files/TCGA-01.svs"), "TCGA-01");
        assert_eq!(slide_name("x.tiff"), "x");
        assert_eq!(slide_name(""), "");
    }
}
