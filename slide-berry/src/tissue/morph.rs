//! 二值形态学. 结构元素为 `size x size` 的正方形, 即 L∞ 范数下半径 `size / 2` 的球.
//!
//! 非零像素为前景. 图像之外的邻居不参与计算.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// 闭运算: 先膨胀后腐蚀. 用于填补组织内部的细小空隙.
///
/// # Panics
///
/// `size` 为偶数时 panic.
pub fn closing(mask: &GrayImage, size: u8) -> GrayImage {
    assert!(size % 2 == 1, "structuring element size must be odd, got {size}");
    morphology::close(mask, Norm::LInf, size / 2)
}
