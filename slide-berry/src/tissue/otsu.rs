//! 灰度化与 Otsu 门限.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::otsu_level;

/// RGB -> 灰度, 与 OpenCV `COLOR_RGB2GRAY` 的定点实现逐像素一致.
///
/// `Y = 0.299 R + 0.587 G + 0.114 B`, 系数放大 2^14 后四舍五入.
#[inline]
pub fn luma(&Rgb([r, g, b]): &Rgb<u8>) -> u8 {
    ((r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14) as u8
}

/// 将 RGB 图像转为灰度图.
pub fn to_gray(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([luma(img.get_pixel(x, y))])
    })
}

/// 求 Otsu 门限. 空图像返回 `None`.
///
/// 对每个候选 `t` 把像素划分为 `<= t` 和 `> t` 两类, 取类间方差最大的 `t`;
/// 并列时取最小的 `t`. 只有一种灰度的图像门限为 0.
///
/// 调用方以 `gray < t` 判定前景 (组织), 因此单一灰度的图像不会产生任何前景.
pub fn otsu_threshold(gray: &GrayImage) -> Option<u8> {
    if gray.width() == 0 || gray.height() == 0 {
        return None;
    }
    Some(otsu_level(gray))
}

/// 全局 Otsu 二值化: `gray < t` 的像素为 255 (组织), 其余为 0.
pub fn tissue_mask(gray: &GrayImage) -> GrayImage {
    let t = otsu_threshold(gray).unwrap_or(0);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] < t {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// 由局部 Otsu 门限求组织占比: 灰度严格小于门限的像素比例.
///
/// 空图像的组织占比为 0.
pub fn tissue_ratio(gray: &GrayImage) -> f64 {
    let Some(t) = otsu_threshold(gray) else {
        return 0.0;
    };
    let tissue = gray.pixels().filter(|p| p[0] < t).count();
    tissue as f64 / (gray.width() as f64 * gray.height() as f64)
}
