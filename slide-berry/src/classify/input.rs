use crate::consts::MODEL_INPUT_SIZE;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array3;

/// 模型输入预处理: 双线性缩放到 `224 x 224`, 转为 `(通道, 高, 宽)` 排布、取值 `[0, 1]` 的 `f32` 张量.
pub fn prepare_input(tile: &RgbImage) -> Array3<f32> {
    let side = MODEL_INPUT_SIZE;
    let resized;
    let img = if tile.dimensions() == (side, side) {
        tile
    } else {
        resized = imageops::resize(tile, side, side, FilterType::Triangle);
        &resized
    };
    Array3::from_shape_fn((3, side as usize, side as usize), |(c, h, w)| {
        img.get_pixel(w as u32, h as u32).0[c] as f32 / 255.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_prepare_input() {
        let tile = RgbImage::from_pixel(256, 256, Rgb([255, 0, 51]));
        let t = prepare_input(&tile);
        assert_eq!(t.dim(), (3, 224, 224));
        assert_eq!(t[(0, 10, 200)], 1.0);
        assert_eq!(t[(1, 10, 200)], 0.0);
        assert_eq!(t[(2, 223, 0)], 0.2);
        assert!(t.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_prepare_input_layout() {
        let tile = RgbImage::from_fn(224, 224, |x, y| Rgb([x as u8, y as u8, 0]));
        let t = prepare_input(&tile);
        assert_eq!(t[(0, 5, 7)], 7.0 / 255.0);
        assert_eq!(t[(1, 5, 7)], 5.0 / 255.0);
    }
}
