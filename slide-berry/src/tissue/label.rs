//! 8-连通域标记.

use super::TissueRegion;
use crate::Idx2d;
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

/// 获得 `(h, w)` 的 8-邻居索引. 不检查越界, 越界的索引会在下标访问时被过滤.
#[inline]
pub(crate) fn neighbour8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}

/// 对二值图做 8-连通域标记.
///
/// 返回标记图 (背景为 0, 连通域从 1 开始编号) 和每个连通域的外接框.
/// 编号顺序为各连通域首个像素的光栅扫描顺序.
pub fn label8(mask: ArrayView2<bool>) -> (Array2<u32>, Vec<TissueRegion>) {
    let mut labels = Array2::<u32>::zeros(mask.raw_dim());
    let mut regions = Vec::new();
    let mut bfs_q = VecDeque::with_capacity(16);

    for (start, &fg) in mask.indexed_iter() {
        if !fg || labels[start] != 0 {
            continue;
        }
        let label = regions.len() as u32 + 1;
        let (mut min_r, mut min_c, mut max_r, mut max_c) = (start.0, start.1, start.0, start.1);
        let mut area = 0;

        labels[start] = label;
        bfs_q.push_back(start);
        while let Some(cur @ (r, c)) = bfs_q.pop_front() {
            area += 1;
            min_r = min_r.min(r);
            min_c = min_c.min(c);
            max_r = max_r.max(r);
            max_c = max_c.max(c);
            for n in neighbour8(cur) {
                if mask.get(n).copied().unwrap_or(false) && labels[n] == 0 {
                    labels[n] = label;
                    bfs_q.push_back(n);
                }
            }
        }
        regions.push(TissueRegion::from_bbox(
            label,
            (min_r, min_c, max_r + 1, max_c + 1),
            area,
        ));
    }
    (labels, regions)
}
