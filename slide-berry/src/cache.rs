//! 以切片标识为键的结果缓存.
//!
//! 处理流程本身是无状态的. 对同一张切片的重复请求, 由调用方持有的 [`ResultCache`]
//! 直接返回上一次的预测和汇总, 不再重新计算.

use crate::aggregate::SlideSummary;
use crate::classify::TilePrediction;
use crate::pipeline::{Analysis, PipelineError, SlideAnalysis};
use crate::slide::DownsampleFactor;
use std::collections::HashMap;
use std::path::Path;

cfg_if::cfg_if! {
    if #[cfg(feature = "serde")] {
        use serde::{Deserialize, Serialize};
        use std::fs::File;
        use std::io::{self, BufReader, BufWriter};
    }
}

/// 切片标识.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlideKey(String);

impl SlideKey {
    /// 由任意标识 (例如内容哈希) 构建.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 以规范化的文件路径为标识. 无法规范化时使用原路径.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Self(path.to_string_lossy().into_owned())
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 一张切片上一次的计算结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CachedResult {
    /// 切块预测.
    pub predictions: Vec<TilePrediction>,

    /// 全片汇总.
    pub summary: SlideSummary,

    /// 下采样倍率, 用于重新生成标注图.
    pub factor: DownsampleFactor,
}

impl From<SlideAnalysis> for CachedResult {
    fn from(value: SlideAnalysis) -> Self {
        Self {
            predictions: value.predictions,
            summary: value.summary,
            factor: value.factor,
        }
    }
}

/// 结果缓存. 只缓存完整结果, "没有组织" 与 "没有切块" 不会被缓存.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultCache {
    entries: HashMap<SlideKey, CachedResult>,
}

impl ResultCache {
    #[allow(missing_docs)]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询缓存.
    #[inline]
    pub fn get(&self, key: &SlideKey) -> Option<&CachedResult> {
        self.entries.get(key)
    }

    /// 写入缓存, 返回被替换的旧结果.
    #[inline]
    pub fn insert(&mut self, key: SlideKey, result: CachedResult) -> Option<CachedResult> {
        self.entries.insert(key, result)
    }

    /// 使某张切片的缓存失效.
    #[inline]
    pub fn remove(&mut self, key: &SlideKey) -> Option<CachedResult> {
        self.entries.remove(key)
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// 命中时直接返回缓存; 否则调用 `compute` 计算并缓存.
    ///
    /// `compute` 得到空结果时返回 `Ok(None)`, 且不写入缓存.
    pub fn get_or_compute<F>(
        &mut self,
        key: SlideKey,
        compute: F,
    ) -> Result<Option<&CachedResult>, PipelineError>
    where
        F: FnOnce() -> Result<Analysis, PipelineError>,
    {
        if !self.entries.contains_key(&key) {
            match compute()? {
                Analysis::Complete(a) => {
                    log::info!("Caching result for {}", key.as_str());
                    self.entries.insert(key.clone(), CachedResult::from(*a));
                }
                Analysis::Empty { reason, .. } => {
                    log::info!("Nothing to cache for {}: {reason:?}", key.as_str());
                    return Ok(None);
                }
            }
        } else {
            log::debug!("Cache hit for {}", key.as_str());
        }
        Ok(self.entries.get(&key))
    }
}

/// 持久化部分
#[cfg(feature = "serde")]
impl ResultCache {
    /// 以 `bincode` 格式保存到 `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let w = BufWriter::new(File::create(path)?);
        bincode::serialize_into(w, self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// 从 `path` 加载.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let r = BufReader::new(File::open(path)?);
        bincode::deserialize_from(r).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::tests::DarknessClassifier;
    use crate::pipeline::SlidePipeline;
    use crate::slide::ImageSlide;
    use crate::testing::{blank_rgb, temp_dir, textured_rgb};
    use std::cell::Cell;

    #[test]
    fn test_computes_once_per_key() {
        let root = temp_dir("cache");
        let slide = ImageSlide::from_rgb("textured", textured_rgb());
        let pipeline = SlidePipeline::new(&DarknessClassifier, &root);
        let runs = Cell::new(0);
        let run = || {
            runs.set(runs.get() + 1);
            pipeline.run(&slide)
        };

        let mut cache = ResultCache::new();
        let key = SlideKey::new("textured");
        let first = cache.get_or_compute(key.clone(), run).unwrap().cloned();
        let second = cache.get_or_compute(key.clone(), run).unwrap().cloned();
        assert_eq!(runs.get(), 1);
        assert_eq!(first, second);
        assert_eq!(first.unwrap().predictions.len(), 2);

        assert!(cache.remove(&key).is_some());
        cache.get_or_compute(key, run).unwrap();
        assert_eq!(runs.get(), 2);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_empty_outcome_not_cached() {
        let root = temp_dir("cache-empty");
        let slide = ImageSlide::from_rgb("blank", blank_rgb(300, 300));
        let pipeline = SlidePipeline::new(&DarknessClassifier, &root);

        let mut cache = ResultCache::new();
        let got = cache
            .get_or_compute(SlideKey::new("blank"), || pipeline.run(&slide))
            .unwrap();
        assert!(got.is_none());
        assert!(cache.is_empty());
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_key_from_path() {
        assert_eq!(
            SlideKey::from_path("/no/such/slide.svs").as_str(),
            "/no/such/slide.svs"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_save_and_load() {
        let root = temp_dir("cache-serde");
        let slide = ImageSlide::from_rgb("textured", textured_rgb());
        let pipeline = SlidePipeline::new(&DarknessClassifier, &root);

        let mut cache = ResultCache::new();
        cache
            .get_or_compute(SlideKey::new("textured"), || pipeline.run(&slide))
            .unwrap();
        let path = root.join("cache.bin");
        cache.save(&path).unwrap();

        let loaded = ResultCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(&SlideKey::new("textured")),
            cache.get(&SlideKey::new("textured"))
        );
        let _ = std::fs::remove_dir_all(root);
    }
}
