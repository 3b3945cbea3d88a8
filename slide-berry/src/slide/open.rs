//! 金字塔格式切片, 基于 `openslide-rs`.
//!
//! # 注意
//!
//! 需要 `openslide` feature 以及系统中的 libopenslide.

use super::{slide_name, thumbnail_size, SlideReadError, SlideResult, SlideSource};
use image::imageops::{self, FilterType};
use image::RgbImage;
use openslide_rs::traits::Slide;
use openslide_rs::{Address, OpenSlide, Region, Size};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 由 openslide 打开的全切片图像.
///
/// openslide 句柄不保证并发读安全, 所有读取都串行化在同一把锁后面;
/// 解码之后的切块处理仍然可以并行.
pub struct OpenSlideSource {
    name: String,
    source: PathBuf,
    dims: (u32, u32),
    inner: Mutex<OpenSlide>,
}

#[inline]
fn backend<E: std::fmt::Debug>(what: &str) -> impl FnOnce(E) -> SlideReadError + '_ {
    move |e| SlideReadError::Backend(format!("{what}: {e:?}"))
}

impl OpenSlideSource {
    /// 打开切片. 切片名取文件名 (不含扩展名).
    pub fn open<P: AsRef<Path>>(path: P) -> SlideResult<Self> {
        let path = path.as_ref();
        let slide = OpenSlide::new(path).map_err(backend("failed to open slide"))?;
        let dims = slide
            .get_level_dimensions(0)
            .map_err(backend("failed to get dimensions"))?;
        log::info!("Opened slide {}: {}x{}", path.display(), dims.w, dims.h);
        Ok(Self {
            name: slide_name(path),
            source: path.to_path_buf(),
            dims: (dims.w, dims.h),
            inner: Mutex::new(slide),
        })
    }

    /// 读取第 `level` 层上的区域. `(x, y)` 为 level 0 坐标, `(w, h)` 为该层像素.
    fn read_level(&self, level: u32, x: u32, y: u32, w: u32, h: u32) -> SlideResult<RgbImage> {
        let region = Region {
            address: Address { x, y },
            level,
            size: Size { w, h },
        };
        let bgra = {
            let slide = self
                .inner
                .lock()
                .map_err(|_| SlideReadError::Backend("slide lock poisoned".to_string()))?;
            slide
                .read_region(&region)
                .map_err(backend("read_region failed"))?
        };
        Ok(bgra_to_rgb(&bgra, w, h))
    }
}

/// 预乘 alpha 的 BGRA -> RGB. 全透明像素 (切片之外) 填为白色.
fn bgra_to_rgb(bgra: &[u8], w: u32, h: u32) -> RgbImage {
    let mut rgb = RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
    for (dst, src) in rgb.pixels_mut().zip(bgra.chunks_exact(4)) {
        let &[b, g, r, a] = src else { unreachable!() };
        match a {
            0 => {}
            255 => dst.0 = [r, g, b],
            _ => {
                let af = a as f32;
                let un = |c: u8| (c as f32 * 255.0 / af).round().min(255.0) as u8;
                dst.0 = [un(r), un(g), un(b)];
            }
        }
    }
    rgb
}

impl SlideSource for OpenSlideSource {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn source(&self) -> Option<&Path> {
        Some(&self.source)
    }

    #[inline]
    fn dimensions(&self) -> (u32, u32) {
        self.dims
    }

    fn thumbnail(&self, max_size: (u32, u32)) -> SlideResult<RgbImage> {
        let (w, h) = self.dims;
        if w == 0 || h == 0 || max_size.0 == 0 || max_size.1 == 0 {
            return Err(SlideReadError::EmptyThumbnail);
        }
        let (tw, th) = thumbnail_size(self.dims, max_size);
        let downsample = f64::max(w as f64 / tw as f64, h as f64 / th as f64);

        let (level, level_dims) = {
            let slide = self
                .inner
                .lock()
                .map_err(|_| SlideReadError::Backend("slide lock poisoned".to_string()))?;
            let level = slide
                .get_best_level_for_downsample(downsample)
                .map_err(backend("failed to pick pyramid level"))?;
            let dims = slide
                .get_level_dimensions(level)
                .map_err(backend("failed to get level dimensions"))?;
            (level, dims)
        };
        let whole = self.read_level(level, 0, 0, level_dims.w, level_dims.h)?;
        if whole.dimensions() == (tw, th) {
            Ok(whole)
        } else {
            Ok(imageops::resize(&whole, tw, th, FilterType::Triangle))
        }
    }

    fn read_region(&self, x: u32, y: u32, w: u32, h: u32) -> SlideResult<RgbImage> {
        if !self.contains(x, y, w, h) {
            return Err(SlideReadError::OutOfBounds {
                rect: (x, y, w, h),
                dims: self.dims,
            });
        }
        self.read_level(0, x, y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::bgra_to_rgb;

    #[test]
    fn test_bgra_to_rgb() {
        let bgra = [
            10, 20, 30, 255, // 不透明
            0, 0, 0, 0, // 透明 -> 白
            50, 50, 100, 128, // 预乘
        ];
        let rgb = bgra_to_rgb(&bgra, 3, 1);
        assert_eq!(rgb.get_pixel(0, 0).0, [30, 20, 10]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(2, 0).0, [199, 100, 100]);
    }
}
