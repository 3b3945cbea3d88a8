//! 单张切片的完整处理流程.
//!
//! 缩略图 -> 组织检测 -> 切块 -> 分类 -> 聚合. 每次调用都是无状态的;
//! 跨调用复用结果请使用 [`crate::cache::ResultCache`].

use crate::aggregate::{aggregate, save_csv, summarize, Aggregate, SlideSummary};
use crate::classify::{classify_tiles, Classifier, ClassifyError, TilePrediction};
use crate::consts::THUMBNAIL_MAX;
use crate::slide::{DownsampleFactor, SlideReadError, SlideSource};
use crate::tile::{Tile, TileStore, Tiler, TilingError};
use crate::tissue::{detect_tissue, TissueRegion};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// 处理流程中的致命错误.
#[derive(Debug)]
pub enum PipelineError {
    /// 切片读取失败.
    Slide(SlideReadError),

    /// 切块失败.
    Tiling(TilingError),

    /// 分类失败.
    Classify(ClassifyError),

    /// 其他 I/O 错误.
    Io(io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Slide(e) => write!(f, "slide error: {e}"),
            PipelineError::Tiling(e) => write!(f, "tiling error: {e}"),
            PipelineError::Classify(e) => write!(f, "classification error: {e}"),
            PipelineError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Slide(e) => Some(e),
            PipelineError::Tiling(e) => Some(e),
            PipelineError::Classify(e) => Some(e),
            PipelineError::Io(e) => Some(e),
        }
    }
}

impl From<SlideReadError> for PipelineError {
    #[inline]
    fn from(value: SlideReadError) -> Self {
        PipelineError::Slide(value)
    }
}

impl From<TilingError> for PipelineError {
    #[inline]
    fn from(value: TilingError) -> Self {
        PipelineError::Tiling(value)
    }
}

impl From<ClassifyError> for PipelineError {
    #[inline]
    fn from(value: ClassifyError) -> Self {
        PipelineError::Classify(value)
    }
}

impl From<io::Error> for PipelineError {
    #[inline]
    fn from(value: io::Error) -> Self {
        PipelineError::Io(value)
    }
}

/// 没有得到任何切块的原因.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmptyReason {
    /// 缩略图上没有检测到组织.
    NoTissue,

    /// 有组织区域, 但没有切块通过组织占比过滤.
    NoTiles {
        /// 组织区域个数.
        regions: usize,
    },
}

/// 一次完整处理的结果.
#[derive(Clone, Debug)]
pub struct SlideAnalysis {
    /// 切片名.
    pub slide: String,

    /// 下采样倍率.
    pub factor: DownsampleFactor,

    /// 组织区域.
    pub regions: Vec<TissueRegion>,

    /// 接受的切块, 按候选枚举顺序排列.
    pub tiles: Vec<Tile>,

    /// 切块预测, 与 `tiles` 一一对应.
    pub predictions: Vec<TilePrediction>,

    /// 类别计数.
    pub aggregate: Aggregate,

    /// 全片汇总.
    pub summary: SlideSummary,
}

impl SlideAnalysis {
    /// 被预测为肿瘤的切块.
    pub fn tumor_predictions(&self) -> impl Iterator<Item = &TilePrediction> + '_ {
        self.predictions.iter().filter(|p| p.class.is_tumor())
    }

    /// 保存汇总表.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        save_csv(path, &self.slide, &self.predictions, &self.summary)
    }
}

/// 处理结果. 没有组织或没有切块是预期之内的结果, 不是错误.
#[derive(Clone, Debug)]
pub enum Analysis {
    /// 没有可用的切块.
    Empty {
        #[allow(missing_docs)]
        reason: EmptyReason,
        #[allow(missing_docs)]
        factor: DownsampleFactor,
    },

    /// 完整结果.
    Complete(Box<SlideAnalysis>),
}

impl Analysis {
    /// 完整结果. 空结果返回 `None`.
    #[inline]
    pub fn complete(&self) -> Option<&SlideAnalysis> {
        match self {
            Analysis::Complete(a) => Some(a),
            Analysis::Empty { .. } => None,
        }
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn into_complete(self) -> Option<SlideAnalysis> {
        match self {
            Analysis::Complete(a) => Some(*a),
            Analysis::Empty { .. } => None,
        }
    }
}

/// 处理流程. 分类器以引用的方式显式传入.
pub struct SlidePipeline<'c, C: ?Sized> {
    classifier: &'c C,
    output_root: PathBuf,
}

/// 缩略图, 下采样倍率与组织区域.
struct Detected {
    factor: DownsampleFactor,
    regions: Vec<TissueRegion>,
}

impl<'c, C: Classifier + ?Sized> SlidePipeline<'c, C> {
    /// 切块写入 `output_root/<切片名>/`.
    pub fn new<P: Into<PathBuf>>(classifier: &'c C, output_root: P) -> Self {
        Self {
            classifier,
            output_root: output_root.into(),
        }
    }

    /// 切块输出根目录.
    #[inline]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    fn detect<S: SlideSource + ?Sized>(&self, slide: &S) -> Result<Detected, PipelineError> {
        let thumb = slide.thumbnail(THUMBNAIL_MAX)?;
        let factor = DownsampleFactor::new(slide.dimensions().0, thumb.width())
            .ok_or(SlideReadError::EmptyThumbnail)?;
        log::info!(
            "Slide {}: {:?} -> thumbnail {:?}, factor {}",
            slide.name(),
            slide.dimensions(),
            thumb.dimensions(),
            factor.get()
        );
        let regions = detect_tissue(&thumb).regions().to_vec();
        log::info!("Detected {} tissue region(s)", regions.len());
        Ok(Detected { factor, regions })
    }

    fn finish<S: SlideSource + ?Sized>(
        slide: &S,
        detected: Detected,
        tiles: Vec<Tile>,
        predictions: Vec<TilePrediction>,
    ) -> Analysis {
        let Detected { factor, regions } = detected;
        let (Some(aggregate), Some(summary)) = (aggregate(&predictions), summarize(&predictions))
        else {
            return Analysis::Empty {
                reason: EmptyReason::NoTiles {
                    regions: regions.len(),
                },
                factor,
            };
        };
        log::info!(
            "Slide {}: {} tiles, most common {}, {}",
            slide.name(),
            predictions.len(),
            summary.most_common(),
            summary.diagnosis()
        );
        Analysis::Complete(Box::new(SlideAnalysis {
            slide: slide.name().to_string(),
            factor,
            regions,
            tiles,
            predictions,
            aggregate,
            summary,
        }))
    }

    /// 顺序处理一张切片.
    pub fn run<S: SlideSource + ?Sized>(&self, slide: &S) -> Result<Analysis, PipelineError> {
        let detected = self.detect(slide)?;
        if detected.regions.is_empty() {
            return Ok(Analysis::Empty {
                reason: EmptyReason::NoTissue,
                factor: detected.factor,
            });
        }
        let store = TileStore::for_slide(&self.output_root, slide.name());
        let tiles = Tiler::new(&store).tile_regions(slide, &detected.regions, detected.factor)?;
        let predictions = classify_tiles(self.classifier, &tiles)?;
        Ok(Self::finish(slide, detected, tiles, predictions))
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl<'c, C: Classifier + Sync + ?Sized> SlidePipeline<'c, C> {
    /// 借助 `rayon`, 并行地切块和分类. 所有分类完成之后才开始聚合, 结果与 [`SlidePipeline::run`] 一致.
    pub fn par_run<S: SlideSource + Sync + ?Sized>(
        &self,
        slide: &S,
    ) -> Result<Analysis, PipelineError> {
        let detected = self.detect(slide)?;
        if detected.regions.is_empty() {
            return Ok(Analysis::Empty {
                reason: EmptyReason::NoTissue,
                factor: detected.factor,
            });
        }
        let store = TileStore::for_slide(&self.output_root, slide.name());
        let tiles =
            Tiler::new(&store).par_tile_regions(slide, &detected.regions, detected.factor)?;
        let predictions = crate::classify::par_classify_tiles(self.classifier, &tiles)?;
        Ok(Self::finish(slide, detected, tiles, predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::tests::DarknessClassifier;
    use crate::slide::ImageSlide;
    use crate::testing::{blank_rgb, half_tissue_rgb, temp_dir, textured_rgb};
    use crate::tile::TileCoord;
    use crate::{CellClass, Diagnosis};

    #[test]
    fn test_blank_slide_is_empty() {
        let root = temp_dir("pipeline-blank");
        let slide = ImageSlide::from_rgb("blank", blank_rgb(2048, 1024));
        let analysis = SlidePipeline::new(&DarknessClassifier, &root)
            .run(&slide)
            .unwrap();
        match analysis {
            Analysis::Empty { reason, factor } => {
                assert_eq!(reason, EmptyReason::NoTissue);
                assert_eq!(factor.get(), 2.0);
            }
            Analysis::Complete(_) => panic!("blank slide produced tiles"),
        }
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_tissue_without_tiles_is_empty() {
        let root = temp_dir("pipeline-half");
        let slide = ImageSlide::from_rgb("half", half_tissue_rgb());
        let analysis = SlidePipeline::new(&DarknessClassifier, &root)
            .run(&slide)
            .unwrap();
        match analysis {
            Analysis::Empty { reason, factor } => {
                assert_eq!(reason, EmptyReason::NoTiles { regions: 1 });
                assert_eq!(factor.get(), 1.0);
            }
            Analysis::Complete(_) => panic!("half-tissue tile was accepted"),
        }
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_textured_slide() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
        let root = temp_dir("pipeline-textured");
        let slide = ImageSlide::from_rgb("textured", textured_rgb());
        let analysis = SlidePipeline::new(&DarknessClassifier, &root)
            .run(&slide)
            .unwrap()
            .into_complete()
            .unwrap();

        assert_eq!(analysis.slide, "textured");
        assert_eq!(analysis.factor.get(), 1.0);
        assert_eq!(analysis.regions.len(), 1);
        let coords: Vec<_> = analysis.predictions.iter().map(|p| p.coord).collect();
        assert_eq!(coords, vec![TileCoord::new(256, 256), TileCoord::new(512, 256)]);

        assert_eq!(analysis.aggregate.most_common(), CellClass::TumorCells);
        assert_eq!(analysis.summary.percentage(CellClass::TumorCells), 70.0);
        assert_eq!(analysis.summary.diagnosis(), Diagnosis::TumorPositive);
        assert_eq!(analysis.summary.mk_index(), 20.0);
        assert_eq!(analysis.tumor_predictions().count(), 2);

        let csv = root.join("results.csv");
        analysis.save_csv(&csv).unwrap();
        let text = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().nth(1).unwrap().starts_with("tile_256_256.jpg,Tumor Cells,textured,"));
        let _ = std::fs::remove_dir_all(root);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_run_matches_run() {
        let root = temp_dir("pipeline-par");
        let slide = ImageSlide::from_rgb("textured", textured_rgb());
        let pipeline = SlidePipeline::new(&DarknessClassifier, &root);
        let seq = pipeline.run(&slide).unwrap().into_complete().unwrap();
        let par = pipeline.par_run(&slide).unwrap().into_complete().unwrap();
        assert_eq!(seq.predictions, par.predictions);
        assert_eq!(seq.summary, par.summary);
        let _ = std::fs::remove_dir_all(root);
    }
}
