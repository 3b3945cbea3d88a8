use super::{aggregate, estimated_cell_count};
use crate::classify::TilePrediction;
use crate::{round2, CellClass};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 二元结论.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Diagnosis {
    #[allow(missing_docs)]
    TumorPositive,
    #[allow(missing_docs)]
    TumorNegative,
}

impl Diagnosis {
    /// 肿瘤细胞百分比 **严格大于** 0 即为阳性.
    ///
    /// # 注意
    ///
    /// 这是一条特异性很低的规则: 任何非零的肿瘤概率都会使结论为阳性.
    /// 在临床意图明确之前按原样保留.
    #[inline]
    pub fn from_tumor_percentage(percentage: f64) -> Self {
        if percentage > 0.0 {
            Diagnosis::TumorPositive
        } else {
            Diagnosis::TumorNegative
        }
    }

    /// 展示名.
    pub const fn name(self) -> &'static str {
        match self {
            Diagnosis::TumorPositive => "Tumor Positive",
            Diagnosis::TumorNegative => "Tumor Negative",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 全片汇总. 完全由切块预测集合导出.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlideSummary {
    percentages: [f64; CellClass::COUNT],
    cell_counts: [u64; CellClass::COUNT],
    most_common: CellClass,
    diagnosis: Diagnosis,
    mk_index: f64,
    tile_count: usize,
}

impl SlideSummary {
    /// 全片类别百分比: 所有切块上该类百分比的均值, 保留两位小数.
    #[inline]
    pub fn percentage(&self, class: CellClass) -> f64 {
        self.percentages[class.index()]
    }

    /// 全片类别估计细胞数: 各切块估计数之和.
    #[inline]
    pub fn cell_count(&self, class: CellClass) -> u64 {
        self.cell_counts[class.index()]
    }

    /// 被预测次数最多的类别.
    #[inline]
    pub fn most_common(&self) -> CellClass {
        self.most_common
    }

    /// 全片结论.
    #[inline]
    pub fn diagnosis(&self) -> Diagnosis {
        self.diagnosis
    }

    /// MK 指数: 全片有丝分裂百分比与核碎裂百分比之和. 只用于报告.
    #[inline]
    pub fn mk_index(&self) -> f64 {
        self.mk_index
    }

    /// 参与汇总的切块数.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tile_count
    }
}

/// 汇总全部切块预测. 没有切块时返回 `None`.
pub fn summarize(predictions: &[TilePrediction]) -> Option<SlideSummary> {
    let most_common = aggregate(predictions)?.most_common();
    let n = predictions.len() as f64;

    let mut sums = [0.0; CellClass::COUNT];
    let mut cell_counts = [0u64; CellClass::COUNT];
    for p in predictions {
        for (class, pct) in p.distribution.iter() {
            sums[class.index()] += pct;
            cell_counts[class.index()] += estimated_cell_count(pct);
        }
    }
    let percentages = sums.map(|s| round2(s / n));
    let pct = |c: CellClass| percentages[c.index()];

    Some(SlideSummary {
        percentages,
        cell_counts,
        most_common,
        diagnosis: Diagnosis::from_tumor_percentage(pct(CellClass::TumorCells)),
        mk_index: round2(pct(CellClass::Mitosis) + pct(CellClass::Karyorrhexis)),
        tile_count: predictions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::prediction;
    use CellClass::*;

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_summarize_means_and_counts() {
        let preds = [
            prediction(0, TumorCells, [60.0, 10.0, 10.0, 20.0]),
            prediction(1, Stroma, [0.0, 5.5, 4.5, 90.0]),
            prediction(2, Stroma, [0.0, 0.0, 0.0, 100.0]),
        ];
        let s = summarize(&preds).unwrap();
        assert_eq!(s.tile_count(), 3);
        assert_eq!(s.percentage(TumorCells), 20.0);
        assert_eq!(s.percentage(Mitosis), 5.17);
        assert_eq!(s.percentage(Karyorrhexis), 4.83);
        assert_eq!(s.percentage(Stroma), 70.0);
        assert_eq!(s.most_common(), Stroma);
        assert_eq!(s.diagnosis(), Diagnosis::TumorPositive);
        assert_eq!(s.mk_index(), 10.0);

        // 60% -> round(393.216), 0 -> 0, 0 -> 0
        assert_eq!(s.cell_count(TumorCells), 393);
        // 10% -> 65.536 -> 66, 5.5% -> 36.0448 -> 36
        assert_eq!(s.cell_count(Mitosis), 66 + 36);
        // 20% -> 131.072, 90% -> 589.824, 100% -> 655.36
        assert_eq!(s.cell_count(Stroma), 131 + 590 + 655);
    }

    #[test]
    fn test_all_zero_tumor_is_negative() {
        let preds = [
            prediction(0, Stroma, [0.0, 10.0, 10.0, 80.0]),
            prediction(1, Mitosis, [0.0, 70.0, 10.0, 20.0]),
        ];
        let s = summarize(&preds).unwrap();
        assert_eq!(s.diagnosis(), Diagnosis::TumorNegative);
        assert_eq!(s.diagnosis().to_string(), "Tumor Negative");
        assert_eq!(s.most_common(), Stroma);
    }

    #[test]
    fn test_tiny_tumor_mass_is_positive() {
        let preds = [prediction(0, Stroma, [0.01, 0.0, 0.0, 99.99])];
        let s = summarize(&preds).unwrap();
        assert_eq!(s.percentage(TumorCells), 0.01);
        assert_eq!(s.diagnosis(), Diagnosis::TumorPositive);
    }

    #[test]
    fn test_mean_rounding_can_hide_tumor() {
        // 0.01 / 3 = 0.0033.., 保留两位后为 0.
        let preds = [
            prediction(0, Stroma, [0.01, 0.0, 0.0, 99.99]),
            prediction(1, Stroma, [0.0, 0.0, 0.0, 100.0]),
            prediction(2, Stroma, [0.0, 0.0, 0.0, 100.0]),
        ];
        let s = summarize(&preds).unwrap();
        assert_eq!(s.percentage(TumorCells), 0.0);
        assert_eq!(s.diagnosis(), Diagnosis::TumorNegative);
    }
}
