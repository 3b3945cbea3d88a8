//! 切块结果.

use slide_berry::{DownsampleFactor, TileCoord};
use std::io::{self, Write};
use std::path::PathBuf;

/// 一次切块的结果.
pub struct TilingReport {
    pub slide: String,
    pub dimensions: (u32, u32),
    pub thumbnail: (u32, u32),
    pub factor: DownsampleFactor,
    pub regions: usize,
    pub tiles: Vec<(TileCoord, f64)>,
    pub output: PathBuf,
    pub overlay: Option<PathBuf>,
}

impl TilingReport {
    /// 平均组织占比. 没有切块时为 `None`.
    fn mean_ratio(&self) -> Option<f64> {
        (!self.tiles.is_empty())
            .then(|| self.tiles.iter().map(|(_, r)| r).sum::<f64>() / self.tiles.len() as f64)
    }

    /// 将结果写进 `w` 中.
    fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        let (sw, sh) = self.dimensions;
        let (tw, th) = self.thumbnail;
        writeln!(w, "Slide `{}`:", self.slide)?;
        writeln!(w, "{S4}Dimensions: {sw}x{sh}")?;
        writeln!(w, "{S4}Thumbnail: {tw}x{th} (factor {:.4})", self.factor.get())?;
        writeln!(w, "{S4}Tissue regions: {}", self.regions)?;
        writeln!(w, "{S4}Accepted tiles: {}", self.tiles.len())?;
        match self.mean_ratio() {
            Some(r) => writeln!(w, "{S4}Average tissue ratio: {r:.6}")?,
            None => writeln!(w, "{S4}Average tissue ratio: /")?,
        }
        writeln!(w, "{S4}Tiles saved to {}", self.output.display())?;
        match &self.overlay {
            Some(p) => write!(w, "{S4}Tile map: {}", p.display())?,
            None => write!(w, "{S4}Tile map: /")?,
        }
        Ok(())
    }

    /// 输出运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        utils::sep_to(&mut out)?;
        self.describe_into(&mut out)?;
        writeln!(out)?;
        utils::sep_to(&mut out)
    }
}
