use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// 缩略图上的标注框.
///
/// 覆盖 `[x, x + size] x [y, y + size]` 的闭区间, 即右下角也被绘制.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThumbBox {
    /// 左上角横坐标.
    pub x: u32,
    /// 左上角纵坐标.
    pub y: u32,
    /// 边长.
    pub size: u32,
}

/// 在 `img` 上画空心矩形框, 线宽 `width` 向框内增长. 超出图像的部分被裁掉.
///
/// 每一圈线框都是一个 [`Rect`], 由外向内逐圈缩小, 直到边长为 0.
pub fn draw_outline(img: &mut RgbImage, b: ThumbBox, color: Rgb<u8>, width: u32) {
    for i in 0..width {
        let side = b.size.saturating_add(1).saturating_sub(i.saturating_mul(2));
        if side == 0 {
            break;
        }
        let rect = Rect::at(b.x.saturating_add(i) as i32, b.y.saturating_add(i) as i32)
            .of_size(side, side);
        draw_hollow_rect_mut(img, rect, color);
    }
}
