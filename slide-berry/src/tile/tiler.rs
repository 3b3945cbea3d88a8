use super::{Tile, TileCoord, TileStore};
use crate::cache::SlideKey;
use crate::consts::{TILE_SIZE, TISSUE_THRESHOLD};
use crate::slide::{DownsampleFactor, SlideReadError, SlideSource};
use crate::tissue::otsu::{tissue_ratio, to_gray};
use crate::tissue::{LabeledMask, TissueRegion};
use itertools::iproduct;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::PathBuf;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 切块过程中的错误.
#[derive(Debug)]
pub enum TilingError {
    /// 读取候选切块失败.
    Read(SlideReadError),

    /// 保存切块失败.
    Persist {
        /// 切块坐标.
        coord: TileCoord,

        /// 底层错误.
        source: image::ImageError,
    },

    /// 读写切块目录的归属记录失败.
    Claim(io::Error),

    /// 切块目录已属于另一张同名切片.
    Conflict {
        /// 切块目录.
        dir: PathBuf,

        /// 目录的现有归属.
        owner: SlideKey,
    },
}

impl fmt::Display for TilingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilingError::Read(e) => write!(f, "failed to read tile: {e}"),
            TilingError::Persist { coord, source } => {
                write!(f, "failed to persist tile at {coord}: {source}")
            }
            TilingError::Claim(e) => write!(f, "failed to claim tile directory: {e}"),
            TilingError::Conflict { dir, owner } => write!(
                f,
                "tile directory {} already belongs to {}",
                dir.display(),
                owner.as_str()
            ),
        }
    }
}

impl std::error::Error for TilingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TilingError::Read(e) => Some(e),
            TilingError::Persist { source, .. } => Some(source),
            TilingError::Claim(e) => Some(e),
            TilingError::Conflict { .. } => None,
        }
    }
}

impl From<SlideReadError> for TilingError {
    #[inline]
    fn from(value: SlideReadError) -> Self {
        TilingError::Read(value)
    }
}

/// 在组织区域上按固定网格切块, 并按局部组织占比过滤.
///
/// 接受的切块会被持久化到 [`TileStore`] 中.
#[derive(Copy, Clone, Debug)]
pub struct Tiler<'s> {
    store: &'s TileStore,
}

impl<'s> Tiler<'s> {
    /// 创建切块器, 接受的切块写入 `store`.
    #[inline]
    pub fn new(store: &'s TileStore) -> Self {
        Self { store }
    }

    /// 切块目录.
    #[inline]
    pub fn store(&self) -> &'s TileStore {
        self.store
    }

    /// 来自文件的切片先登记切块目录, 避免覆盖另一张同名切片的切块.
    fn claim<S: SlideSource + ?Sized>(&self, slide: &S) -> Result<(), TilingError> {
        let Some(path) = slide.source() else {
            return Ok(());
        };
        match self.store.claim(&SlideKey::from_path(path)) {
            Ok(None) => Ok(()),
            Ok(Some(owner)) => Err(TilingError::Conflict {
                dir: self.store.dir().to_path_buf(),
                owner,
            }),
            Err(e) => Err(TilingError::Claim(e)),
        }
    }

    /// 枚举所有候选切块坐标.
    ///
    /// 对每个区域: 外接框乘以 `factor` 后截断, 以 [`TILE_SIZE`] 为步长, 外层 `x` 内层 `y`.
    /// 越出原图 `dims` 的格子被跳过; 多个区域重叠产生的重复坐标只保留第一次出现.
    pub fn candidates(
        regions: &[TissueRegion],
        factor: DownsampleFactor,
        (w, h): (u32, u32),
    ) -> Vec<TileCoord> {
        let fits = |v: u32, limit: u32| v.checked_add(TILE_SIZE).is_some_and(|e| e <= limit);
        let step = TILE_SIZE as usize;

        let mut seen = HashSet::new();
        let mut ans = Vec::new();
        for region in regions {
            let b = region.to_full(factor);
            for (x, y) in iproduct!(
                (b.min_x..b.max_x).step_by(step),
                (b.min_y..b.max_y).step_by(step)
            ) {
                let coord = TileCoord::new(x, y);
                if fits(x, w) && fits(y, h) && seen.insert(coord) {
                    ans.push(coord);
                }
            }
        }
        ans
    }

    /// 评估单个候选切块: 读取, 局部 Otsu, 组织占比 **严格大于** 门限时保存.
    ///
    /// 被拒绝的切块返回 `Ok(None)`.
    pub fn evaluate<S: SlideSource + ?Sized>(
        &self,
        slide: &S,
        coord: TileCoord,
    ) -> Result<Option<Tile>, TilingError> {
        let rgb = slide.read_region(coord.x, coord.y, TILE_SIZE, TILE_SIZE)?;
        let ratio = tissue_ratio(&to_gray(&rgb));
        if ratio <= TISSUE_THRESHOLD {
            log::debug!("Rejected tile {coord}: tissue ratio {ratio:.4}");
            return Ok(None);
        }
        let path = self
            .store
            .save(coord, &rgb)
            .map_err(|source| TilingError::Persist { coord, source })?;
        log::debug!("Accepted tile {coord}: tissue ratio {ratio:.4}");
        Ok(Some(Tile {
            coord,
            path,
            tissue_ratio: ratio,
        }))
    }

    /// 在检测到的全部组织区域上切块.
    #[inline]
    pub fn tile<S: SlideSource + ?Sized>(
        &self,
        slide: &S,
        mask: &LabeledMask,
        factor: DownsampleFactor,
    ) -> Result<Vec<Tile>, TilingError> {
        self.tile_regions(slide, mask.regions(), factor)
    }

    /// 在给定区域上切块. 返回的切块按候选枚举顺序排列.
    pub fn tile_regions<S: SlideSource + ?Sized>(
        &self,
        slide: &S,
        regions: &[TissueRegion],
        factor: DownsampleFactor,
    ) -> Result<Vec<Tile>, TilingError> {
        self.claim(slide)?;
        let candidates = Self::candidates(regions, factor, slide.dimensions());
        let total = candidates.len();
        let mut ans = Vec::new();
        for coord in candidates {
            if let Some(tile) = self.evaluate(slide, coord)? {
                ans.push(tile);
            }
        }
        log::info!("Accepted {} of {total} candidate tiles", ans.len());
        Ok(ans)
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl<'s> Tiler<'s> {
    /// 借助 `rayon`, 并行地在全部组织区域上切块. 结果与 [`Tiler::tile`] 完全一致.
    #[inline]
    pub fn par_tile<S: SlideSource + Sync + ?Sized>(
        &self,
        slide: &S,
        mask: &LabeledMask,
        factor: DownsampleFactor,
    ) -> Result<Vec<Tile>, TilingError> {
        self.par_tile_regions(slide, mask.regions(), factor)
    }

    /// 借助 `rayon`, 并行地在给定区域上切块. 结果仍按候选枚举顺序排列.
    pub fn par_tile_regions<S: SlideSource + Sync + ?Sized>(
        &self,
        slide: &S,
        regions: &[TissueRegion],
        factor: DownsampleFactor,
    ) -> Result<Vec<Tile>, TilingError> {
        self.claim(slide)?;
        let candidates = Self::candidates(regions, factor, slide.dimensions());
        let total = candidates.len();
        let evaluated: Vec<Option<Tile>> = candidates
            .into_par_iter()
            .map(|coord| self.evaluate(slide, coord))
            .collect::<Result<_, _>>()?;
        let ans: Vec<Tile> = evaluated.into_iter().flatten().collect();
        log::info!("Accepted {} of {total} candidate tiles", ans.len());
        Ok(ans)
    }
}
