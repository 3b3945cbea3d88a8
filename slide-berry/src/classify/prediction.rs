use super::Classified;
use crate::aggregate::{estimated_cell_count, Diagnosis};
use crate::tile::TileCoord;
use crate::CellClass;
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个切块的类别分布: 4 个百分比, 各自保留两位小数.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassDistribution([f64; CellClass::COUNT]);

impl ClassDistribution {
    /// 由已经取整的百分比构建.
    #[inline]
    pub fn from_percentages(percentages: [f64; CellClass::COUNT]) -> Self {
        Self(percentages)
    }

    /// 类别 `class` 的百分比.
    #[inline]
    pub fn get(&self, class: CellClass) -> f64 {
        self.0[class.index()]
    }

    /// 按 [`CellClass::ALL`] 顺序遍历 `(类别, 百分比)`.
    pub fn iter(&self) -> impl Iterator<Item = (CellClass, f64)> + '_ {
        CellClass::ALL.into_iter().zip(self.0.iter().copied())
    }

    /// 该切块中类别 `class` 的估计细胞数.
    #[inline]
    pub fn estimated_cells(&self, class: CellClass) -> u64 {
        estimated_cell_count(self.get(class))
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn as_array(&self) -> &[f64; CellClass::COUNT] {
        &self.0
    }
}

impl Index<CellClass> for ClassDistribution {
    type Output = f64;

    #[inline]
    fn index(&self, class: CellClass) -> &Self::Output {
        &self.0[class.index()]
    }
}

/// 单个切块的预测.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TilePrediction {
    /// 切块坐标.
    pub coord: TileCoord,

    /// 预测类别.
    pub class: CellClass,

    /// 类别分布.
    pub distribution: ClassDistribution,
}

impl TilePrediction {
    #[allow(missing_docs)]
    pub fn new(coord: TileCoord, classified: &Classified) -> Self {
        Self {
            coord,
            class: classified.class(),
            distribution: ClassDistribution(classified.percentages()),
        }
    }

    /// 身份键, 即持久化文件名.
    #[inline]
    pub fn key(&self) -> String {
        self.coord.file_name()
    }

    /// 切块级结论: 肿瘤细胞百分比大于 0 即为阳性.
    #[inline]
    pub fn diagnosis(&self) -> Diagnosis {
        Diagnosis::from_tumor_percentage(self.distribution[CellClass::TumorCells])
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn is_tumor_positive(&self) -> bool {
        self.diagnosis() == Diagnosis::TumorPositive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_from_classified() {
        let c = Classified::from_probabilities(&[0.004, 0.9, 0.05, 0.046]).unwrap();
        let p = TilePrediction::new(TileCoord::new(256, 512), &c);
        assert_eq!(p.class, CellClass::Mitosis);
        assert_eq!(p.distribution[CellClass::TumorCells], 0.4);
        assert_eq!(p.distribution.get(CellClass::Mitosis), 90.0);
        assert_eq!(p.key(), "tile_256_512.jpg");
        assert!(p.is_tumor_positive());
        // round(90 * 65536 / 10000) = round(589.824)
        assert_eq!(p.distribution.estimated_cells(CellClass::Mitosis), 590);
    }

    #[test]
    fn test_zero_tumor_is_negative() {
        let c = Classified::from_probabilities(&[0.0, 0.1, 0.2, 0.7]).unwrap();
        let p = TilePrediction::new(TileCoord::new(0, 0), &c);
        assert_eq!(p.diagnosis(), Diagnosis::TumorNegative);
        let classes: Vec<_> = p.distribution.iter().map(|(c, _)| c).collect();
        assert_eq!(classes, CellClass::ALL);
    }

    #[test]
    fn test_tiny_tumor_mass_rounds_away() {
        // 0.00004 * 100 = 0.004, 保留两位后为 0.
        let c = Classified::from_probabilities(&[0.00004, 0.1, 0.2, 0.69996]).unwrap();
        let p = TilePrediction::new(TileCoord::new(0, 0), &c);
        assert_eq!(p.distribution[CellClass::TumorCells], 0.0);
        assert!(!p.is_tumor_positive());
    }
}
