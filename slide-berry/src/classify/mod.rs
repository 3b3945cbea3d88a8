//! 切块分类.
//!
//! 模型本身不在本 crate 内. 调用方实现 [`Classifier`], 把它显式地交给
//! [`classify_tiles`] 或 [`crate::SlidePipeline`]; 没有任何全局的模型或设备状态.

mod input;
mod prediction;

pub use input::prepare_input;
pub use prediction::{ClassDistribution, TilePrediction};

use crate::tile::Tile;
use crate::CellClass;
use image::RgbImage;
use ordered_float::NotNan;
use std::fmt;
use std::path::PathBuf;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 概率之和与 1 的最大允许偏差.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-3;

/// 分类过程中的错误.
#[derive(Debug)]
pub enum ClassifyError {
    /// 模型推理失败.
    Model(Box<dyn std::error::Error + Send + Sync>),

    /// 输出向量长度不是 [`CellClass::COUNT`].
    Arity(usize),

    /// 输出含有 NaN 或无穷.
    NotFinite,

    /// 概率为负.
    Negative,

    /// 概率之和偏离 1.
    NotNormalized(f64),

    /// 无法重新加载持久化的切块.
    Load {
        /// 切块路径.
        path: PathBuf,

        /// 底层错误.
        source: image::ImageError,
    },
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::Model(e) => write!(f, "classifier failed: {e}"),
            ClassifyError::Arity(n) => write!(
                f,
                "classifier returned {n} scores, expected {}",
                CellClass::COUNT
            ),
            ClassifyError::NotFinite => f.write_str("classifier returned non-finite scores"),
            ClassifyError::Negative => f.write_str("classifier returned negative probabilities"),
            ClassifyError::NotNormalized(s) => {
                write!(f, "probabilities sum to {s}, expected 1")
            }
            ClassifyError::Load { path, source } => {
                write!(f, "failed to load tile {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ClassifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClassifyError::Model(e) => Some(e.as_ref()),
            ClassifyError::Load { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// 单个切块的分类结果: 预测类别和概率向量.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Classified {
    class: CellClass,
    probabilities: [f64; CellClass::COUNT],
}

/// 数值稳定的 softmax.
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|&v| v as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|&v| (v as f64 - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// 最大概率对应的类别. 并列时取下标最小者.
fn argmax(p: &[f64; CellClass::COUNT]) -> Option<CellClass> {
    CellClass::ALL
        .into_iter()
        .rev()
        .filter_map(|c| NotNan::new(p[c.index()]).ok().map(|v| (v, c)))
        .max_by_key(|&(v, _)| v)
        .map(|(_, c)| c)
}

impl Classified {
    /// 由模型原始输出 (logits) 构建: softmax 之后取最大者.
    pub fn from_logits(logits: &[f32]) -> Result<Self, ClassifyError> {
        if logits.len() != CellClass::COUNT {
            return Err(ClassifyError::Arity(logits.len()));
        }
        if logits.iter().any(|v| !v.is_finite()) {
            return Err(ClassifyError::NotFinite);
        }
        Self::from_probabilities(&softmax(logits))
    }

    /// 由概率向量构建. 概率必须有限, 非负, 且和为 1 (允许 [`NORMALIZATION_TOLERANCE`] 的误差).
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self, ClassifyError> {
        let p: [f64; CellClass::COUNT] = probabilities
            .try_into()
            .map_err(|_| ClassifyError::Arity(probabilities.len()))?;
        if p.iter().any(|v| !v.is_finite()) {
            return Err(ClassifyError::NotFinite);
        }
        if p.iter().any(|&v| v < 0.0) {
            return Err(ClassifyError::Negative);
        }
        let sum: f64 = p.iter().sum();
        if (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(ClassifyError::NotNormalized(sum));
        }
        let class = argmax(&p).ok_or(ClassifyError::NotFinite)?;
        Ok(Self {
            class,
            probabilities: p,
        })
    }

    /// 预测类别.
    #[inline]
    pub fn class(&self) -> CellClass {
        self.class
    }

    /// 概率向量, 按 [`CellClass::ALL`] 排列.
    #[inline]
    pub fn probabilities(&self) -> &[f64; CellClass::COUNT] {
        &self.probabilities
    }

    /// 百分比, 保留两位小数.
    pub fn percentages(&self) -> [f64; CellClass::COUNT] {
        self.probabilities.map(|p| crate::round2(p * 100.0))
    }
}

/// 不透明的切块分类器.
///
/// 对同一张切块多次调用应当得到相同结果. 需要并行分类时实现者还应当是 `Sync` 的.
pub trait Classifier {
    /// 对一张切块 (原始分辨率 RGB) 分类. 输入预处理由实现者负责,
    /// 通常可以直接使用 [`prepare_input`].
    fn classify(&self, tile: &RgbImage) -> Result<Classified, ClassifyError>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    #[inline]
    fn classify(&self, tile: &RgbImage) -> Result<Classified, ClassifyError> {
        (**self).classify(tile)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    #[inline]
    fn classify(&self, tile: &RgbImage) -> Result<Classified, ClassifyError> {
        (**self).classify(tile)
    }
}

fn classify_one<C: Classifier + ?Sized>(
    classifier: &C,
    tile: &Tile,
) -> Result<TilePrediction, ClassifyError> {
    let rgb = tile.load().map_err(|source| ClassifyError::Load {
        path: tile.path.clone(),
        source,
    })?;
    let classified = classifier.classify(&rgb)?;
    log::debug!("Tile {} classified as {}", tile.coord, classified.class());
    Ok(TilePrediction::new(tile.coord, &classified))
}

/// 重新加载每个持久化的切块并分类. 结果与 `tiles` 顺序一致.
pub fn classify_tiles<C: Classifier + ?Sized>(
    classifier: &C,
    tiles: &[Tile],
) -> Result<Vec<TilePrediction>, ClassifyError> {
    tiles.iter().map(|t| classify_one(classifier, t)).collect()
}

/// 借助 `rayon`, 并行地分类. 全部切块完成之后才返回, 结果与 `tiles` 顺序一致.
#[cfg(feature = "rayon")]
pub fn par_classify_tiles<C: Classifier + Sync + ?Sized>(
    classifier: &C,
    tiles: &[Tile],
) -> Result<Vec<TilePrediction>, ClassifyError> {
    tiles
        .par_iter()
        .map(|t| classify_one(classifier, t))
        .collect()
}
