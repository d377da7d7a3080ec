//! # Normalizer
//!
//! The authoritative owner of one stream's running statistics (states,
//! goals or actions). It validates every input at the boundary, exposes
//! `normalize`/`unnormalize`, persists through [`NormalizerRecord`], and
//! tracks whether its attached mirrors still reflect the current values.

use crate::accumulator::{std_from_moments, BatchMoments, GroupedAccumulator};
use crate::error::NormalizerError;
use crate::group::{GroupId, GroupLayout};
use crate::mirror::StatsMirror;
use crate::record::NormalizerRecord;
use std::sync::Arc;
use tracing::{debug, warn};

/// Standard deviation floor used when none is given.
pub const DEFAULT_EPS: f64 = 0.02;

/// Running mean/std normalizer with grouped dimensions.
pub struct Normalizer {
    name: String,
    stats: GroupedAccumulator,
    clip: f64,
    generation: u64,
    synced_generation: Option<u64>,
    mirrors: Vec<Arc<dyn StatsMirror>>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("name", &self.name)
            .field("stats", &self.stats)
            .field("clip", &self.clip)
            .field("generation", &self.generation)
            .field("synced_generation", &self.synced_generation)
            .field("mirrors", &self.mirrors.len())
            .finish()
    }
}

impl Normalizer {
    /// Singleton groups, [`DEFAULT_EPS`], no clipping.
    #[must_use]
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            stats: GroupedAccumulator::new(GroupLayout::singletons(size), DEFAULT_EPS),
            clip: f64::INFINITY,
            generation: 0,
            synced_generation: None,
            mirrors: Vec::new(),
        }
    }

    /// Fully specified constructor. `groups = None` gives every dimension
    /// its own group.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if `groups` is not `size` long, and
    /// [`NormalizerError::InvalidParameter`] for a non-positive `eps` or
    /// `clip`.
    pub fn with_options(
        name: impl Into<String>,
        size: usize,
        groups: Option<Vec<GroupId>>,
        eps: f64,
        clip: f64,
    ) -> Result<Self, NormalizerError> {
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(NormalizerError::InvalidParameter { name: "eps", value: eps });
        }
        if !(clip > 0.0) {
            return Err(NormalizerError::InvalidParameter { name: "clip", value: clip });
        }
        let layout = match groups {
            Some(ids) => {
                NormalizerError::check_len(size, ids.len())?;
                GroupLayout::from_ids(ids)
            }
            None => GroupLayout::singletons(size),
        };
        Ok(Self {
            name: name.into(),
            stats: GroupedAccumulator::new(layout, eps),
            clip,
            generation: 0,
            synced_generation: None,
            mirrors: Vec::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.stats.dimension()
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.stats.count()
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        self.stats.mean()
    }

    #[must_use]
    pub fn std(&self) -> &[f64] {
        self.stats.std()
    }

    #[must_use]
    pub fn clip(&self) -> f64 {
        self.clip
    }

    #[must_use]
    pub fn eps(&self) -> f64 {
        self.stats.eps()
    }

    #[must_use]
    pub fn group_of(&self) -> &[GroupId] {
        self.stats.layout().group_of()
    }

    #[must_use]
    pub fn accumulator(&self) -> &GroupedAccumulator {
        &self.stats
    }

    /// Bumped by every successful mutation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Absorbs a batch of samples.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if any sample has the wrong length,
    /// [`NormalizerError::NonFiniteSample`] for a NaN or infinite value; the
    /// statistics are left untouched in both cases.
    pub fn update<V: AsRef<[f64]>>(&mut self, batch: &[V]) -> Result<(), NormalizerError> {
        match self.batch_moments(batch)? {
            Some(moments) => self.absorb(&moments),
            None => Ok(()),
        }
    }

    /// Validates `batch` and computes its moments without mutating anything.
    /// Paired with [`Normalizer::absorb`] this lets several normalizers be
    /// checked before any of them changes.
    ///
    /// # Errors
    ///
    /// As [`Normalizer::update`].
    pub fn batch_moments<V: AsRef<[f64]>>(
        &self,
        batch: &[V],
    ) -> Result<Option<BatchMoments>, NormalizerError> {
        self.stats.batch_moments(batch)
    }

    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if `moments` were computed for
    /// another dimension.
    pub fn absorb(&mut self, moments: &BatchMoments) -> Result<(), NormalizerError> {
        self.stats.absorb(moments)?;
        if moments.count > 0 {
            self.touch();
            debug!(
                "[{}] absorbed {} samples (count {})",
                self.name,
                moments.count,
                self.count()
            );
        }
        Ok(())
    }

    /// `clamp((x - mean) / std, -clip, clip)` element-wise. Excluded
    /// dimensions are returned unchanged and are not clipped.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if `x` has the wrong length.
    pub fn normalize(&self, x: &[f64]) -> Result<Vec<f64>, NormalizerError> {
        NormalizerError::check_len(self.dimension(), x.len())?;
        let layout = self.stats.layout();
        Ok(x.iter()
            .zip(self.mean().iter().zip(self.std()))
            .enumerate()
            .map(|(i, (&v, (&m, &s)))| {
                if layout.is_excluded(i) {
                    v
                } else {
                    ((v - m) / s).clamp(-self.clip, self.clip)
                }
            })
            .collect())
    }

    /// `nx * std + mean` element-wise.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if `nx` has the wrong length.
    pub fn unnormalize(&self, nx: &[f64]) -> Result<Vec<f64>, NormalizerError> {
        NormalizerError::check_len(self.dimension(), nx.len())?;
        Ok(nx
            .iter()
            .zip(self.mean().iter().zip(self.std()))
            .map(|(&v, (&m, &s))| v * s + m)
            .collect())
    }

    /// # Errors
    ///
    /// Fails on the first sample with the wrong length.
    pub fn normalize_batch<V: AsRef<[f64]>>(
        &self,
        batch: &[V],
    ) -> Result<Vec<Vec<f64>>, NormalizerError> {
        batch.iter().map(|x| self.normalize(x.as_ref())).collect()
    }

    /// # Errors
    ///
    /// Fails on the first sample with the wrong length.
    pub fn unnormalize_batch<V: AsRef<[f64]>>(
        &self,
        batch: &[V],
    ) -> Result<Vec<Vec<f64>>, NormalizerError> {
        batch.iter().map(|x| self.unnormalize(x.as_ref())).collect()
    }

    /// Administrative override of the statistics; `count` is kept.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`], [`NormalizerError::NonFiniteMean`]
    /// or [`NormalizerError::InvalidStatistics`]; nothing changes on error.
    pub fn set_mean_std(&mut self, mean: &[f64], std: &[f64]) -> Result<(), NormalizerError> {
        self.stats.overwrite(None, mean, std)?;
        self.touch();
        debug!("[{}] mean/std overridden", self.name);
        Ok(())
    }

    /// Seeds the statistics from a known offset and scale, so that
    /// `normalize(x) = (x + offset) * scale`.
    ///
    /// # Errors
    ///
    /// As [`Normalizer::set_mean_std`]; a zero scale yields an infinite std
    /// and is rejected.
    pub fn set_offset_scale(&mut self, offset: &[f64], scale: &[f64]) -> Result<(), NormalizerError> {
        let mean: Vec<f64> = offset.iter().map(|o| -o).collect();
        let std: Vec<f64> = scale.iter().map(|s| 1.0 / s).collect();
        self.set_mean_std(&mean, &std)
    }

    #[must_use]
    pub fn save(&self) -> NormalizerRecord {
        NormalizerRecord {
            dimension: self.dimension(),
            group_of: self.group_of().to_vec(),
            count: self.count(),
            mean: self.mean().to_vec(),
            std: self.std().to_vec(),
        }
    }

    /// Restores `(count, mean, std)`. The count is taken from the record so
    /// later updates weigh the restored history correctly. A record saved
    /// with a different group assignment is pooled into the configured
    /// groups.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if the record describes a different
    /// dimension, [`NormalizerError::NonFiniteMean`] or
    /// [`NormalizerError::InvalidStatistics`] for bad values.
    pub fn load(&mut self, record: &NormalizerRecord) -> Result<(), NormalizerError> {
        NormalizerError::check_len(self.dimension(), record.dimension)?;
        NormalizerError::check_len(self.dimension(), record.group_of.len())?;
        if record.group_of == self.group_of() {
            self.stats
                .overwrite(Some(record.count), &record.mean, &record.std)?;
        } else {
            warn!(
                "[{}] stored group assignment differs from the configured one; pooling into configured groups",
                self.name
            );
            let (mean, std) = self.pool_into_groups(&record.mean, &record.std)?;
            self.stats.overwrite(Some(record.count), &mean, &std)?;
        }
        self.touch();
        debug!("[{}] loaded statistics (count {})", self.name, self.count());
        Ok(())
    }

    /// Averages per-dimension statistics over each configured group so that
    /// grouped dimensions share one mean and std again.
    fn pool_into_groups(
        &self,
        mean: &[f64],
        std: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), NormalizerError> {
        NormalizerError::check_len(self.dimension(), mean.len())?;
        NormalizerError::check_len(self.dimension(), std.len())?;
        let mut pooled_mean = mean.to_vec();
        let mut pooled_std = std.to_vec();
        for members in self.stats.layout().groups() {
            if members.len() < 2 {
                continue;
            }
            let k = members.len() as f64;
            let m = members.iter().map(|&i| mean[i]).sum::<f64>() / k;
            let m_sq = members
                .iter()
                .map(|&i| std[i] * std[i] + mean[i] * mean[i])
                .sum::<f64>()
                / k;
            let s = std_from_moments(m, m_sq, self.eps());
            for &i in members {
                pooled_mean[i] = m;
                pooled_std[i] = s;
            }
        }
        Ok((pooled_mean, pooled_std))
    }

    /// Registers a consumer. It is considered stale until the next
    /// [`Normalizer::sync_mirror`].
    pub fn attach_mirror(&mut self, mirror: Arc<dyn StatsMirror>) {
        self.mirrors.push(mirror);
        self.synced_generation = None;
    }

    #[must_use]
    pub fn mirror_count(&self) -> usize {
        self.mirrors.len()
    }

    /// Whether every attached mirror holds the current statistics.
    #[must_use]
    pub fn mirror_is_current(&self) -> bool {
        self.synced_generation == Some(self.generation)
    }

    /// Pushes the current statistics to every attached mirror and returns
    /// how many accepted the push. The mirrors count as current only when
    /// every one of them accepted.
    pub fn sync_mirror(&mut self) -> usize {
        let (count, mean, std) = (self.count(), self.mean(), self.std());
        let accepted = self
            .mirrors
            .iter()
            .filter(|mirror| mirror.sync(count, mean, std))
            .count();
        if accepted == self.mirrors.len() {
            self.synced_generation = Some(self.generation);
        } else {
            warn!(
                "[{}] {} of {} mirrors rejected the push",
                self.name,
                self.mirrors.len() - accepted,
                self.mirrors.len()
            );
            self.synced_generation = None;
        }
        accepted
    }

    fn touch(&mut self) {
        self.generation += 1;
    }
}
