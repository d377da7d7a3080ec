//! # Mirrored Statistics
//!
//! A computation graph built on top of a [`crate::Normalizer`] keeps its own
//! copy of the statistics. That copy is a one-directional cache: the
//! normalizer pushes `(count, mean, std)` through [`StatsMirror::sync`] when
//! asked to, and the consumer never assumes anything fresher than the last
//! push.
//!
//! [`ResourceMirror`] is the stock consumer. It swaps in a complete
//! [`MirrorSnapshot`] under a write lock, so readers on other threads see
//! either the previous triple or the new one, never a mix.

use crate::error::NormalizerError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Receiving end of a statistics push.
pub trait StatsMirror: Send + Sync {
    /// Replaces the held statistics. Returns `false` if the push was
    /// rejected and the previous view is still in place.
    fn sync(&self, count: u64, mean: &[f64], std: &[f64]) -> bool;
}

/// One consistent view of pushed statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorSnapshot {
    pub count: u64,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    /// Number of pushes received so far; 0 for the initial identity view.
    pub version: u64,
}

impl MirrorSnapshot {
    fn identity(dimension: usize) -> Self {
        Self {
            count: 0,
            mean: vec![0.0; dimension],
            std: vec![1.0; dimension],
            version: 0,
        }
    }
}

/// Graph-side replica of a normalizer's statistics.
pub struct ResourceMirror {
    name: String,
    dimension: usize,
    clip: f64,
    passthrough: Vec<bool>,
    current: RwLock<Arc<MirrorSnapshot>>,
}

impl ResourceMirror {
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: usize, clip: f64) -> Self {
        Self {
            name: name.into(),
            dimension,
            clip,
            passthrough: vec![false; dimension],
            current: RwLock::new(Arc::new(MirrorSnapshot::identity(dimension))),
        }
    }

    /// Builds a mirror shaped like `normalizer`. It holds identity statistics
    /// until the first push.
    #[must_use]
    pub fn for_normalizer(normalizer: &crate::Normalizer) -> Arc<Self> {
        let mut mirror = Self::new(normalizer.name(), normalizer.dimension(), normalizer.clip());
        mirror.passthrough = normalizer
            .group_of()
            .iter()
            .map(|id| id.is_none())
            .collect();
        Arc::new(mirror)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The last pushed statistics.
    #[must_use]
    pub fn snapshot(&self) -> Arc<MirrorSnapshot> {
        Arc::clone(&self.current.read())
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// `clamp((x - mean) / std, -clip, clip)` against the last pushed view.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if `x` has the wrong length.
    pub fn normalize(&self, x: &[f64]) -> Result<Vec<f64>, NormalizerError> {
        NormalizerError::check_len(self.dimension, x.len())?;
        let snap = self.snapshot();
        Ok(x.iter()
            .zip(snap.mean.iter().zip(&snap.std))
            .zip(&self.passthrough)
            .map(|((&v, (&m, &s)), &skip)| {
                if skip {
                    v
                } else {
                    ((v - m) / s).clamp(-self.clip, self.clip)
                }
            })
            .collect())
    }

    /// `nx * std + mean` against the last pushed view.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if `nx` has the wrong length.
    pub fn unnormalize(&self, nx: &[f64]) -> Result<Vec<f64>, NormalizerError> {
        NormalizerError::check_len(self.dimension, nx.len())?;
        let snap = self.snapshot();
        Ok(nx
            .iter()
            .zip(snap.mean.iter().zip(&snap.std))
            .map(|(&v, (&m, &s))| v * s + m)
            .collect())
    }
}

impl StatsMirror for ResourceMirror {
    fn sync(&self, count: u64, mean: &[f64], std: &[f64]) -> bool {
        if mean.len() != self.dimension || std.len() != self.dimension {
            warn!(
                "[{}] ignoring push of {}/{} values into a mirror of dimension {}",
                self.name,
                mean.len(),
                std.len(),
                self.dimension
            );
            return false;
        }
        let mut current = self.current.write();
        let version = current.version + 1;
        *current = Arc::new(MirrorSnapshot {
            count,
            mean: mean.to_vec(),
            std: std.to_vec(),
            version,
        });
        debug!("[{}] mirror synced (version {version}, count {count})", self.name);
        true
    }
}
