//! 程序运行函数.

use crate::result::TilingReport;
use slide_berry::consts::{color, THUMBNAIL_MAX};
use slide_berry::overlay::{overlay, ColorPolicy};
use slide_berry::prelude::*;
use std::error::Error;
use std::path::Path;
use utils::loader;

/// 标注图文件名.
const OVERLAY_NAME: &str = "tiles_map.png";

type BoxedSlide = Box<dyn SlideSource + Sync>;

#[cfg(feature = "openslide")]
fn open_slide(path: &Path) -> Result<BoxedSlide, SlideReadError> {
    const PYRAMIDAL: [&str; 7] = ["svs", "ndpi", "mrxs", "scn", "vms", "vmu", "bif"];

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if PYRAMIDAL.contains(&ext.as_str()) {
        Ok(Box::new(OpenSlideSource::open(path)?))
    } else {
        Ok(Box::new(ImageSlide::open(path)?))
    }
}

#[cfg(not(feature = "openslide"))]
fn open_slide(path: &Path) -> Result<BoxedSlide, SlideReadError> {
    Ok(Box::new(ImageSlide::open(path)?))
}

/// 实际运行: 检测组织, 并行切块, 生成切块分布图.
pub fn run() -> Result<TilingReport, Box<dyn Error>> {
    let path = loader::slide_path_from_args_or_env()
        .ok_or("no slide given: pass a path or set $WSI_SLIDE")?;
    let root = loader::output_dir_from_env_or_home();

    let slide = open_slide(&path)?;
    let thumb = slide.thumbnail(THUMBNAIL_MAX)?;
    let factor = DownsampleFactor::new(slide.dimensions().0, thumb.width())
        .ok_or(SlideReadError::EmptyThumbnail)?;
    let mask = detect_tissue(&thumb);

    let store = TileStore::for_slide(&root, slide.name());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(utils::cpus())
        .build()?;
    println!("Tiling {} with {} threads...", path.display(), pool.current_num_threads());
    let tiles = pool.install(|| Tiler::new(&store).par_tile(&*slide, &mask, factor))?;

    let overlay_path = if tiles.is_empty() {
        None
    } else {
        let map = overlay(
            &thumb,
            tiles.iter().map(|t| (t.key(), "")),
            factor,
            ColorPolicy::Uniform(color::GREEN),
        );
        let p = store.dir().join(OVERLAY_NAME);
        match map.save(&p) {
            Ok(()) => Some(p),
            Err(e) => {
                log::warn!("Tile map unavailable: {e}");
                None
            }
        }
    };

    Ok(TilingReport {
        slide: slide.name().to_string(),
        dimensions: slide.dimensions(),
        thumbnail: thumb.dimensions(),
        factor,
        regions: mask.regions().len(),
        tiles: tiles.iter().map(|t| (t.coord, t.tissue_ratio)).collect(),
        output: store.dir().to_path_buf(),
        overlay: overlay_path,
    })
}
