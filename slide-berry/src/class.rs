//! 切块类别.

use crate::consts::color::*;
use image::Rgb;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 分类器输出的 4 个固定类别. 顺序即概率向量的顺序.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellClass {
    /// 肿瘤细胞.
    TumorCells,

    /// 有丝分裂.
    Mitosis,

    /// 核碎裂.
    Karyorrhexis,

    /// 间质.
    Stroma,
}

impl CellClass {
    /// 类别个数.
    pub const COUNT: usize = 4;

    /// 按概率向量顺序排列的全部类别.
    pub const ALL: [CellClass; Self::COUNT] = [
        CellClass::TumorCells,
        CellClass::Mitosis,
        CellClass::Karyorrhexis,
        CellClass::Stroma,
    ];

    /// 在概率向量中的下标.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 由概率向量下标得到类别. 越界时返回 `None`.
    #[inline]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// 展示名, 同时也是导出表格中的类名.
    pub const fn name(self) -> &'static str {
        match self {
            CellClass::TumorCells => "Tumor Cells",
            CellClass::Mitosis => "Mitosis",
            CellClass::Karyorrhexis => "Karyorrhexis",
            CellClass::Stroma => "Stroma",
        }
    }

    /// 缩略图标注颜色.
    pub const fn overlay_color(self) -> Rgb<u8> {
        match self {
            CellClass::TumorCells => RED,
            CellClass::Mitosis => BLUE,
            CellClass::Karyorrhexis => PURPLE,
            CellClass::Stroma => GREEN,
        }
    }

    /// 是否是决定全片阳性的肿瘤类别?
    #[inline]
    pub const fn is_tumor(self) -> bool {
        matches!(self, CellClass::TumorCells)
    }
}

impl fmt::Display for CellClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 类名无法识别.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseClassError(pub String);

impl fmt::Display for ParseClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown cell class `{}`", self.0)
    }
}

impl std::error::Error for ParseClassError {}

impl FromStr for CellClass {
    type Err = ParseClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ParseClassError(s.to_string()))
    }
}

/// 按类名取标注颜色. 无法识别的类名统一使用灰色.
pub fn class_color(label: &str) -> Rgb<u8> {
    label
        .parse::<CellClass>()
        .map_or(GRAY, CellClass::overlay_color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_order() {
        let names: Vec<_> = CellClass::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["Tumor Cells", "Mitosis", "Karyorrhexis", "Stroma"]);
        for (i, c) in CellClass::ALL.into_iter().enumerate() {
            assert_eq!(c.index(), i);
            assert_eq!(CellClass::from_index(i), Some(c));
        }
        assert_eq!(CellClass::from_index(4), None);
    }

    #[test]
    fn test_class_parse() {
        for c in CellClass::ALL {
            assert_eq!(c.to_string().parse::<CellClass>(), Ok(c));
        }
        assert!("tumor cells".parse::<CellClass>().is_err());
        assert!("Necrosis".parse::<CellClass>().is_err());
    }

    #[test]
    fn test_class_color_fallback() {
        assert_eq!(class_color("Tumor Cells"), RED);
        assert_eq!(class_color("Karyorrhexis"), PURPLE);
        assert_eq!(class_color("Necrosis"), GRAY);
        assert_eq!(class_color(""), GRAY);
    }
}
