use super::{slide_name, thumbnail_size, SlideReadError, SlideResult, SlideSource};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// 由普通栅格图像 (tiff, png, jpeg 等 `image` 能解码的格式) 支撑的切片.
///
/// 整张图会被解码进内存, 因此只适合较小的切片或测试. 金字塔格式请使用
/// `openslide` feature 下的 `OpenSlideSource`.
#[derive(Clone, Debug)]
pub struct ImageSlide {
    name: String,
    source: Option<PathBuf>,
    data: RgbImage,
}

impl ImageSlide {
    /// 打开图像文件. 切片名取文件名 (不含扩展名).
    pub fn open<P: AsRef<Path>>(path: P) -> SlideResult<Self> {
        let path = path.as_ref();
        let data = image::open(path)?.to_rgb8();
        Ok(Self {
            name: slide_name(path),
            source: Some(path.to_path_buf()),
            data,
        })
    }

    /// 直接由内存中的 RGB 图像创建.
    #[inline]
    pub fn from_rgb(name: impl Into<String>, data: RgbImage) -> Self {
        Self {
            name: name.into(),
            source: None,
            data,
        }
    }

    /// 获得底层图像.
    #[inline]
    pub fn as_rgb(&self) -> &RgbImage {
        &self.data
    }
}

impl SlideSource for ImageSlide {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[inline]
    fn dimensions(&self) -> (u32, u32) {
        self.data.dimensions()
    }

    fn thumbnail(&self, max_size: (u32, u32)) -> SlideResult<RgbImage> {
        let dims = self.dimensions();
        if dims.0 == 0 || dims.1 == 0 || max_size.0 == 0 || max_size.1 == 0 {
            return Err(SlideReadError::EmptyThumbnail);
        }
        let (tw, th) = thumbnail_size(dims, max_size);
        if (tw, th) == dims {
            Ok(self.data.clone())
        } else {
            Ok(imageops::resize(&self.data, tw, th, FilterType::Triangle))
        }
    }

    fn read_region(&self, x: u32, y: u32, w: u32, h: u32) -> SlideResult<RgbImage> {
        if !self.contains(x, y, w, h) {
            return Err(SlideReadError::OutOfBounds {
                rect: (x, y, w, h),
                dims: self.dimensions(),
            });
        }
        Ok(imageops::crop_imm(&self.data, x, y, w, h).to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(w: u32, h: u32) -> ImageSlide {
        ImageSlide::from_rgb(
            "gradient",
            RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0])),
        )
    }

    #[test]
    fn test_read_region() {
        let slide = gradient(300, 200);
        let region = slide.read_region(10, 20, 5, 6).unwrap();
        assert_eq!(region.dimensions(), (5, 6));
        assert_eq!(region.get_pixel(0, 0), &Rgb([10, 20, 0]));
        assert_eq!(region.get_pixel(4, 5), &Rgb([14, 25, 0]));
    }

    #[test]
    fn test_read_region_out_of_bounds() {
        let slide = gradient(300, 200);
        assert!(slide.read_region(0, 0, 300, 200).is_ok());
        assert!(matches!(
            slide.read_region(45, 0, 256, 10),
            Err(SlideReadError::OutOfBounds { dims: (300, 200), .. })
        ));
        assert!(slide.read_region(u32::MAX, 0, 2, 2).is_err());
    }

    #[test]
    fn test_thumbnail() {
        let slide = gradient(2048, 1024);
        let thumb = slide.thumbnail((1024, 1024)).unwrap();
        assert_eq!(thumb.dimensions(), (1024, 512));

        let small = gradient(100, 50);
        assert_eq!(small.thumbnail((1024, 1024)).unwrap(), *small.as_rgb());
        assert!(matches!(
            small.thumbnail((0, 1024)),
            Err(SlideReadError::EmptyThumbnail)
        ));
    }
}
