//! 缩略图上的组织检测.
//!
//! 流程: 灰度化 -> 全局 Otsu 门限 (`gray < t` 为组织) -> 5x5 闭运算 -> 8-连通域标记.

mod label;
pub mod morph;
pub mod otsu;

pub use label::label8;
pub use otsu::tissue_mask;

use crate::consts::CLOSING_SIZE;
use crate::slide::DownsampleFactor;
use image::{GrayImage, RgbImage};
use ndarray::{Array2, ArrayView2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 缩略图上的一个组织连通域.
///
/// 外接框为半开区间 `[min_row, max_row) x [min_col, max_col)`, 单位为缩略图像素.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TissueRegion {
    /// 标记图中的编号, 从 1 开始.
    pub label: u32,
    #[allow(missing_docs)]
    pub min_row: usize,
    #[allow(missing_docs)]
    pub min_col: usize,
    #[allow(missing_docs)]
    pub max_row: usize,
    #[allow(missing_docs)]
    pub max_col: usize,
    /// 连通域像素数.
    pub area: usize,
}

/// 原图坐标下的外接框, 半开区间.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct FullBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TissueRegion {
    /// 由外接框 `(min_row, min_col, max_row, max_col)` 构建.
    #[inline]
    pub fn from_bbox(
        label: u32,
        (min_row, min_col, max_row, max_col): (usize, usize, usize, usize),
        area: usize,
    ) -> Self {
        Self {
            label,
            min_row,
            min_col,
            max_row,
            max_col,
            area,
        }
    }

    /// 外接框 `(min_row, min_col, max_row, max_col)`.
    #[inline]
    pub fn bbox(&self) -> (usize, usize, usize, usize) {
        (self.min_row, self.min_col, self.max_row, self.max_col)
    }

    /// 外接框的高和宽.
    #[inline]
    pub fn extent(&self) -> (usize, usize) {
        (self.max_row - self.min_row, self.max_col - self.min_col)
    }

    /// 映射到原图坐标. 每个端点分别乘以倍率后截断.
    pub fn to_full(&self, factor: DownsampleFactor) -> FullBox {
        FullBox {
            min_x: factor.to_full(self.min_col),
            min_y: factor.to_full(self.min_row),
            max_x: factor.to_full(self.max_col),
            max_y: factor.to_full(self.max_row),
        }
    }
}

/// 组织检测结果: 标记图和连通域列表.
#[derive(Clone, Debug)]
pub struct LabeledMask {
    labels: Array2<u32>,
    regions: Vec<TissueRegion>,
}

impl LabeledMask {
    /// 由二值组织掩码标记连通域.
    pub fn from_binary(mask: ArrayView2<bool>) -> Self {
        let (labels, regions) = label8(mask);
        Self { labels, regions }
    }

    /// 由灰度掩码标记连通域, 非零像素为前景.
    pub fn from_gray_mask(mask: &GrayImage) -> Self {
        let binary = Array2::from_shape_fn(
            (mask.height() as usize, mask.width() as usize),
            |(r, c)| mask.get_pixel(c as u32, r as u32)[0] > 0,
        );
        Self::from_binary(binary.view())
    }

    /// 所有连通域, 按编号升序.
    #[inline]
    pub fn regions(&self) -> &[TissueRegion] {
        &self.regions
    }

    /// 没有检测到组织?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// 标记图形状 `(高, 宽)`, 与缩略图一致.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.labels.dim()
    }

    /// 缩略图像素 `(row, col)` 的连通域编号. 背景或越界为 `None`.
    #[inline]
    pub fn label_at(&self, row: usize, col: usize) -> Option<u32> {
        self.labels.get((row, col)).copied().filter(|&l| l != 0)
    }

    /// 标记图.
    #[inline]
    pub fn labels(&self) -> &Array2<u32> {
        &self.labels
    }
}

/// 在缩略图上检测组织区域.
#[inline]
pub fn detect_tissue(thumbnail: &RgbImage) -> LabeledMask {
    detect_tissue_with(thumbnail, CLOSING_SIZE)
}

/// 同 [`detect_tissue`], 但指定闭运算结构元素边长 (必须为奇数).
pub fn detect_tissue_with(thumbnail: &RgbImage, closing_size: u8) -> LabeledMask {
    let gray = otsu::to_gray(thumbnail);
    let mask = morph::closing(&tissue_mask(&gray), closing_size);
    let found = LabeledMask::from_gray_mask(&mask);
    log::debug!(
        "Detected {} tissue region(s) on {}x{} thumbnail",
        found.regions.len(),
        thumbnail.width(),
        thumbnail.height()
    );
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{blank_rgb, textured_rgb};
    use image::Rgb;

    #[test]
    fn test_detect_checkerboard_block() {
        let thumb = RgbImage::from_fn(64, 64, |x, y| {
            let (r, c) = (y as usize, x as usize);
            let v = if (10..=20).contains(&r) && (10..=30).contains(&c) {
                if (r + c) % 2 == 0 {
                    60
                } else {
                    100
                }
            } else {
                240
            };
            Rgb([v, v, v])
        });
        let gray = otsu::to_gray(&thumb);
        assert_eq!(otsu::otsu_threshold(&gray), Some(100));

        let found = detect_tissue(&thumb);
        assert_eq!(found.regions().len(), 1);
        let region = found.regions()[0];
        assert_eq!(region.bbox(), (10, 10, 21, 31));
        assert_eq!(region.area, 11 * 21);
        assert_eq!(found.label_at(15, 15), Some(1));
        assert_eq!(found.label_at(0, 0), None);
        assert_eq!(found.label_at(100, 0), None);
        assert_eq!(found.shape(), (64, 64));
    }

    #[test]
    fn test_detect_textured_slide() {
        let thumb = textured_rgb();
        let gray = otsu::to_gray(&thumb);
        assert_eq!(otsu::otsu_threshold(&gray), Some(85));

        let found = detect_tissue(&thumb);
        assert_eq!(found.regions().len(), 1);
        assert_eq!(found.regions()[0].bbox(), (256, 256, 512, 768));
    }

    #[test]
    fn test_detect_blank() {
        assert!(detect_tissue(&blank_rgb(128, 96)).is_empty());
    }

    #[test]
    fn test_region_to_full() {
        let region = TissueRegion::from_bbox(1, (10, 20, 30, 41), 5);
        assert_eq!(region.extent(), (20, 21));
        let full = region.to_full(DownsampleFactor::from_raw(2.5).unwrap());
        assert_eq!(
            full,
            FullBox {
                min_x: 50,
                min_y: 25,
                max_x: 102,
                max_y: 75,
            }
        );
    }
}
