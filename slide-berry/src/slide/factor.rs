//! 缩略图与原图之间的坐标变换.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 下采样倍率 `W / Tw`.
///
/// 假设缩略图在水平和垂直方向的缩放一致, 所有缩略图 <-> 原图的坐标变换都只用它:
/// `原图 = 缩略图 * factor`, `缩略图 = 原图 / factor`.
///
/// 该对象是只读的, 保证内部值有限且为正.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DownsampleFactor(f64);

impl DownsampleFactor {
    /// 由原图宽度 `full_width` 和缩略图宽度 `thumb_width` 构建.
    ///
    /// 任一宽度为 0 时返回 `None`.
    pub fn new(full_width: u32, thumb_width: u32) -> Option<Self> {
        if full_width == 0 || thumb_width == 0 {
            return None;
        }
        Some(Self(full_width as f64 / thumb_width as f64))
    }

    /// 直接由倍率构建. `factor` 必须有限且为正, 否则返回 `None`.
    pub fn from_raw(factor: f64) -> Option<Self> {
        (factor.is_finite() && factor > 0.0).then_some(Self(factor))
    }

    /// 倍率值.
    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    /// 缩略图坐标 -> 原图坐标, 向零截断到整数像素.
    #[inline]
    pub fn to_full(self, thumb: usize) -> u32 {
        (thumb as f64 * self.0) as u32
    }

    /// 原图坐标 -> 缩略图坐标 (不截断).
    #[inline]
    pub fn to_thumb(self, full: u32) -> f64 {
        full as f64 / self.0
    }
}

#[cfg(test)]
mod tests {
    use super::DownsampleFactor;

    #[test]
    fn test_factor_invalid_input() {
        assert!(DownsampleFactor::new(0, 1024).is_none());
        assert!(DownsampleFactor::new(2048, 0).is_none());
        assert!(DownsampleFactor::from_raw(0.0).is_none());
        assert!(DownsampleFactor::from_raw(f64::NAN).is_none());
        assert!(DownsampleFactor::from_raw(-1.0).is_none());
    }

    #[test]
    fn test_factor_transform() {
        let f = DownsampleFactor::new(2048, 1024).unwrap();
        assert_eq!(f.get(), 2.0);
        assert_eq!(f.to_full(256), 512);
        assert_eq!(f.to_thumb(768), 384.0);

        // 截断而不是四舍五入
        let f = DownsampleFactor::from_raw(2.7).unwrap();
        assert_eq!(f.to_full(3), 8);
    }
}
