use super::TileCoord;
use crate::cache::SlideKey;
use crate::consts::TILE_EXT;
use image::RgbImage;
use std::io;
use std::path::{Path, PathBuf};

/// 获取 `{用户主目录}/wsi/tiles` 目录.
pub fn home_output_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.extend(["wsi", "tiles"]);
    Some(ans)
}

/// 记录切块目录归属的文件名.
const OWNER_FILE: &str = ".slide";

/// 单张切片的切块目录 `<root>/<slide-name>/`.
///
/// 每个坐标只会由一个写者写入一次, 文件名即切块身份键.
/// 不同路径下的同名切片会映射到同一个目录, 由 [`TileStore::claim`] 检出.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileStore {
    dir: PathBuf,
}

impl TileStore {
    /// 切片 `slide_name` 在 `root` 下的切块目录. 目录在第一次登记或保存时才创建.
    pub fn for_slide<P: AsRef<Path>>(root: P, slide_name: &str) -> Self {
        Self {
            dir: root.as_ref().join(slide_name),
        }
    }

    /// 切块目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 将目录登记给切片 `owner`.
    ///
    /// 目录未登记或已登记给 `owner` 时返回 `Ok(None)`; 已登记给另一张切片时
    /// 不做任何修改, 返回 `Ok(Some(已登记的切片))`.
    pub fn claim(&self, owner: &SlideKey) -> io::Result<Option<SlideKey>> {
        let path = self.dir.join(OWNER_FILE);
        match std::fs::read_to_string(&path) {
            Ok(s) if s == owner.as_str() => Ok(None),
            Ok(s) => Ok(Some(SlideKey::new(s))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                std::fs::create_dir_all(&self.dir)?;
                std::fs::write(&path, owner.as_str())?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// 坐标 `coord` 对应的持久化路径.
    #[inline]
    pub fn path_of(&self, coord: TileCoord) -> PathBuf {
        self.dir.join(coord.file_name())
    }

    /// 保存切块并返回其路径.
    pub fn save(&self, coord: TileCoord, tile: &RgbImage) -> image::ImageResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_of(coord);
        tile.save(&path)?;
        Ok(path)
    }

    /// 列出目录中已持久化的切块坐标, 按 `(x, y)` 升序.
    ///
    /// 目录不存在时返回空列表; 名字不合法的文件会被跳过.
    pub fn list(&self) -> io::Result<Vec<TileCoord>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut ans = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TILE_EXT) {
                continue;
            }
            match TileCoord::parse_key(&path) {
                Ok(c) => ans.push(c),
                Err(e) => log::warn!("Skipping {}: {e}", path.display()),
            }
        }
        ans.sort_unstable();
        Ok(ans)
    }
}
