//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::consts::{THUMBNAIL_MAX, TILE_SIZE, TISSUE_THRESHOLD};
pub use crate::{class_color, CellClass};

pub use crate::slide::{DownsampleFactor, ImageSlide, SlideReadError, SlideSource};

#[cfg(feature = "openslide")]
pub use crate::slide::OpenSlideSource;

pub use crate::tissue::{detect_tissue, LabeledMask, TissueRegion};

pub use crate::tile::{home_output_dir, Tile, TileCoord, TileStore, Tiler};

pub use crate::classify::{
    classify_tiles, prepare_input, ClassDistribution, Classified, Classifier, ClassifyError,
    TilePrediction,
};

#[cfg(feature = "rayon")]
pub use crate::classify::par_classify_tiles;

pub use crate::aggregate::{aggregate, summarize, Aggregate, Diagnosis, SlideSummary};

pub use crate::overlay::{overlay, render_class_map, render_tumor_map, ColorPolicy, OverlayError};

pub use crate::pipeline::{Analysis, EmptyReason, PipelineError, SlideAnalysis, SlidePipeline};

pub use crate::cache::{ResultCache, SlideKey};
