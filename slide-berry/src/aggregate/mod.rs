//! 切块预测的全片聚合.
//!
//! 零个切块上的百分比没有定义. 这种情况下 [`aggregate`] 和 [`summarize`] 都返回 `None`,
//! 调用方需要自行处理 "没有切块" 的结果.

mod export;
mod summary;

pub use export::{save_csv, write_csv, SUMMARY_ROW_NAME};
pub use summary::{summarize, Diagnosis, SlideSummary};

use crate::classify::TilePrediction;
use crate::consts::TILE_AREA;
use crate::{round2, CellClass};

/// 由百分比估计切块中某类细胞的个数: `round(pct * TILE_SIZE^2 / 10000)`.
///
/// 这是面积占比的粗略换算, 不是标定过的细胞计数.
#[inline]
pub fn estimated_cell_count(percentage: f64) -> u64 {
    (percentage * TILE_AREA as f64 / 10000.0).round_ties_even() as u64
}

/// 按预测类别计数的聚合结果.
///
/// 类别按第一次出现的顺序排列, 从未被预测过的类别不出现.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Aggregate {
    counts: Vec<(CellClass, usize)>,
    total: usize,
}

impl Aggregate {
    /// 统计各预测类别的出现次数. 输入为空时返回 `None`.
    pub fn from_classes<I: IntoIterator<Item = CellClass>>(classes: I) -> Option<Self> {
        let mut counts: Vec<(CellClass, usize)> = Vec::with_capacity(CellClass::COUNT);
        let mut total = 0;
        for class in classes {
            total += 1;
            match counts.iter_mut().find(|(c, _)| *c == class) {
                Some((_, n)) => *n += 1,
                None => counts.push((class, 1)),
            }
        }
        (total > 0).then_some(Self { counts, total })
    }

    /// 出现次数最多的类别. 次数并列时取最先出现者.
    pub fn most_common(&self) -> CellClass {
        let mut best = self.counts[0];
        for &(class, n) in &self.counts[1..] {
            if n > best.1 {
                best = (class, n);
            }
        }
        best.0
    }

    /// 切块总数, 总是大于 0.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// 类别 `class` 被预测的次数.
    pub fn count(&self, class: CellClass) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| *c == class)
            .map_or(0, |&(_, n)| n)
    }

    /// 各类别占切块总数的百分比, 保留两位小数, 按第一次出现的顺序排列.
    pub fn percentages(&self) -> Vec<(CellClass, f64)> {
        self.counts
            .iter()
            .map(|&(c, n)| (c, share(n, self.total)))
            .collect()
    }

    /// 类别 `class` 的百分比. 从未被预测过的类别返回 `None`.
    pub fn percentage(&self, class: CellClass) -> Option<f64> {
        self.counts
            .iter()
            .find(|(c, _)| *c == class)
            .map(|&(_, n)| share(n, self.total))
    }

    /// 以切块占比折算的类别 `class` 估计细胞数. 从未被预测过的类别为 0.
    #[inline]
    pub fn estimated_cells(&self, class: CellClass) -> u64 {
        self.percentage(class).map_or(0, estimated_cell_count)
    }
}

/// 计数 `n` 占 `total` 的百分比: 先求比例再乘以 100, 保留两位小数.
#[inline]
fn share(n: usize, total: usize) -> f64 {
    round2(n as f64 / total as f64 * 100.0)
}

/// 对全部切块预测做类别计数. 没有切块时返回 `None`.
pub fn aggregate(predictions: &[TilePrediction]) -> Option<Aggregate> {
    Aggregate::from_classes(predictions.iter().map(|p| p.class))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classify::ClassDistribution;
    use crate::tile::TileCoord;
    use CellClass::*;

    /// 构造第 `i` 个切块的预测.
    pub(crate) fn prediction(i: u32, class: CellClass, pct: [f64; 4]) -> TilePrediction {
        TilePrediction {
            coord: TileCoord::new(256 * i, 0),
            class,
            distribution: ClassDistribution::from_percentages(pct),
        }
    }

    fn classes(cs: &[CellClass]) -> Vec<TilePrediction> {
        cs.iter()
            .enumerate()
            .map(|(i, &c)| {
                let mut pct = [0.0; 4];
                pct[c.index()] = 100.0;
                prediction(i as u32, c, pct)
            })
            .collect()
    }

    #[test]
    fn test_empty_is_undefined() {
        assert!(aggregate(&[]).is_none());
        assert!(Aggregate::from_classes([]).is_none());
    }

    #[test]
    fn test_three_tumor_seven_stroma() {
        let mut cs = vec![TumorCells; 3];
        cs.extend([Stroma; 7]);
        let agg = aggregate(&classes(&cs)).unwrap();
        assert_eq!(agg.most_common(), Stroma);
        assert_eq!(agg.percentages(), vec![(TumorCells, 30.0), (Stroma, 70.0)]);
        assert_eq!(agg.total(), 10);
        assert_eq!(agg.count(Stroma), 7);
        assert_eq!(agg.count(Mitosis), 0);
        assert_eq!(agg.percentage(Mitosis), None);
        // round(30 * 65536 / 10000) = round(196.608)
        assert_eq!(agg.estimated_cells(TumorCells), 197);
        assert_eq!(agg.estimated_cells(Mitosis), 0);
    }

    #[test]
    fn test_ties_first_encountered() {
        let agg = aggregate(&classes(&[Mitosis, Stroma, Stroma, Mitosis])).unwrap();
        assert_eq!(agg.most_common(), Mitosis);
        let agg = aggregate(&classes(&[Stroma, Mitosis, Mitosis, Stroma])).unwrap();
        assert_eq!(agg.most_common(), Stroma);
        let classes_in_order: Vec<_> = agg.percentages().into_iter().map(|(c, _)| c).collect();
        assert_eq!(classes_in_order, vec![Stroma, Mitosis]);
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let cs = [TumorCells, Mitosis, Karyorrhexis, TumorCells, Stroma, Stroma, Stroma];
        let agg = aggregate(&classes(&cs)).unwrap();
        let sum: f64 = agg.percentages().iter().map(|(_, p)| p).sum();
        assert!((sum - 100.0).abs() <= 0.1);
        assert_eq!(agg.percentage(Mitosis), Some(14.29));
    }

    #[test]
    fn test_percentage_ratio_first() {
        // 23 / 160 * 100 略小于 14.375, 因此舍入为 14.37.
        let agg = Aggregate::from_classes(
            std::iter::repeat(TumorCells)
                .take(23)
                .chain(std::iter::repeat(Stroma).take(137)),
        )
        .unwrap();
        assert_eq!(agg.percentage(TumorCells), Some(14.37));
        assert_eq!(agg.percentage(Stroma), Some(85.62));
        assert_eq!(agg.estimated_cells(TumorCells), 94);
    }

    #[test]
    fn test_estimated_cell_count() {
        assert_eq!(estimated_cell_count(0.0), 0);
        assert_eq!(estimated_cell_count(100.0), 655);
        assert_eq!(estimated_cell_count(1.0), 7);
        assert_eq!(estimated_cell_count(0.01), 0);
        assert_eq!(estimated_cell_count(50.0), 328);
    }
}
