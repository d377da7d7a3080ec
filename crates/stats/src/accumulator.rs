//! # Grouped Running Moments
//!
//! [`GroupedAccumulator`] keeps a running count together with the first and
//! second moments of every dimension. Batches are folded in with the
//! weighted parallel-combination identity
//!
//! ```text
//! n     = n_a + n_b
//! mean  = mean_a  + (mean_b  - mean_a)  * n_b / n
//! msq   = msq_a   + (msq_b   - msq_a)   * n_b / n
//! ```
//!
//! so the history is never re-averaged and precision does not decay as the
//! count grows. Before combination the batch moments are pooled per group:
//! every member of a group receives the average of the group's per-dimension
//! batch moments. Excluded dimensions never take part and stay at mean 0,
//! std 1.

use crate::error::NormalizerError;
use crate::group::GroupLayout;

/// Moments of a single batch, already pooled per group.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchMoments {
    pub count: u64,
    pub mean: Vec<f64>,
    pub mean_sq: Vec<f64>,
}

/// Per-dimension running count, mean and mean-of-squares.
#[derive(Clone, Debug)]
pub struct GroupedAccumulator {
    layout: GroupLayout,
    eps: f64,
    count: u64,
    mean: Vec<f64>,
    mean_sq: Vec<f64>,
    std: Vec<f64>,
}

/// `sqrt(max(mean_sq - mean², eps²))`, never below `eps`.
#[must_use]
pub fn std_from_moments(mean: f64, mean_sq: f64, eps: f64) -> f64 {
    (mean_sq - mean * mean).max(eps * eps).sqrt().max(eps)
}

impl GroupedAccumulator {
    #[must_use]
    pub fn new(layout: GroupLayout, eps: f64) -> Self {
        let dimension = layout.dimension();
        Self {
            layout,
            eps,
            count: 0,
            mean: vec![0.0; dimension],
            mean_sq: vec![1.0; dimension],
            std: vec![1.0; dimension],
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.layout.dimension()
    }

    #[must_use]
    pub fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    #[must_use]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn mean_sq(&self) -> &[f64] {
        &self.mean_sq
    }

    #[must_use]
    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Computes the pooled moments of `batch` without touching the running
    /// statistics. Returns `Ok(None)` for an empty batch.
    ///
    /// Excluded dimensions are never read, so they may carry any value.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if any row has the wrong length,
    /// [`NormalizerError::NonFiniteSample`] for a NaN or infinite value.
    pub fn batch_moments<V: AsRef<[f64]>>(
        &self,
        batch: &[V],
    ) -> Result<Option<BatchMoments>, NormalizerError> {
        let dimension = self.dimension();
        for (r, row) in batch.iter().enumerate() {
            let row = row.as_ref();
            NormalizerError::check_len(dimension, row.len())?;
            if let Some((index, &value)) = row
                .iter()
                .enumerate()
                .find(|&(i, x)| !x.is_finite() && !self.layout.is_excluded(i))
            {
                return Err(NormalizerError::NonFiniteSample { row: r, index, value });
            }
        }
        if batch.is_empty() {
            return Ok(None);
        }

        let mut sum = vec![0.0_f64; dimension];
        let mut sum_sq = vec![0.0_f64; dimension];
        for row in batch {
            for (i, &x) in row.as_ref().iter().enumerate() {
                sum[i] += x;
                sum_sq[i] += x * x;
            }
        }

        let n = batch.len() as f64;
        let raw_mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let raw_mean_sq: Vec<f64> = sum_sq.iter().map(|s| s / n).collect();

        let mut mean = raw_mean.clone();
        let mut mean_sq = raw_mean_sq.clone();
        for members in self.layout.groups() {
            if members.len() < 2 {
                continue;
            }
            let k = members.len() as f64;
            let pooled_mean = members.iter().map(|&i| raw_mean[i]).sum::<f64>() / k;
            let pooled_mean_sq = members.iter().map(|&i| raw_mean_sq[i]).sum::<f64>() / k;
            for &i in members {
                mean[i] = pooled_mean;
                mean_sq[i] = pooled_mean_sq;
            }
        }
        for &i in self.layout.excluded() {
            mean[i] = 0.0;
            mean_sq[i] = 1.0;
        }

        Ok(Some(BatchMoments {
            count: batch.len() as u64,
            mean,
            mean_sq,
        }))
    }

    /// Folds pre-computed batch moments into the running statistics.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if the moments were computed for a
    /// different dimension.
    pub fn absorb(&mut self, moments: &BatchMoments) -> Result<(), NormalizerError> {
        NormalizerError::check_len(self.dimension(), moments.mean.len())?;
        NormalizerError::check_len(self.dimension(), moments.mean_sq.len())?;
        if moments.count == 0 {
            return Ok(());
        }

        let total = self.count + moments.count;
        if self.count == 0 {
            self.mean.copy_from_slice(&moments.mean);
            self.mean_sq.copy_from_slice(&moments.mean_sq);
        } else {
            let w_new = moments.count as f64 / total as f64;
            for i in 0..self.dimension() {
                if self.layout.is_excluded(i) {
                    continue;
                }
                self.mean[i] += (moments.mean[i] - self.mean[i]) * w_new;
                self.mean_sq[i] += (moments.mean_sq[i] - self.mean_sq[i]) * w_new;
            }
        }
        self.count = total;
        self.refresh_std();
        Ok(())
    }

    /// Absorbs a batch of samples. All-or-nothing: a malformed row leaves the
    /// statistics untouched.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] if any row has the wrong length.
    pub fn update<V: AsRef<[f64]>>(&mut self, batch: &[V]) -> Result<u64, NormalizerError> {
        match self.batch_moments(batch)? {
            Some(moments) => {
                self.absorb(&moments)?;
                Ok(moments.count)
            }
            None => Ok(0),
        }
    }

    /// Replaces mean and std outright, bypassing the running average.
    /// `count` is replaced only when given. Standard deviations below `eps`
    /// are raised to `eps`; excluded dimensions stay at mean 0, std 1.
    ///
    /// # Errors
    ///
    /// [`NormalizerError::ShapeMismatch`] for wrong-length vectors,
    /// [`NormalizerError::NonFiniteMean`] for a NaN or infinite mean and
    /// [`NormalizerError::InvalidStatistics`] for a non-positive or
    /// non-finite std. Excluded dimensions are not checked.
    pub fn overwrite(
        &mut self,
        count: Option<u64>,
        mean: &[f64],
        std: &[f64],
    ) -> Result<(), NormalizerError> {
        NormalizerError::check_len(self.dimension(), mean.len())?;
        NormalizerError::check_len(self.dimension(), std.len())?;
        let layout = &self.layout;
        if let Some((index, &value)) = mean
            .iter()
            .enumerate()
            .find(|&(i, m)| !m.is_finite() && !layout.is_excluded(i))
        {
            return Err(NormalizerError::NonFiniteMean { index, value });
        }
        if let Some((index, &value)) = std
            .iter()
            .enumerate()
            .find(|&(i, &s)| !(s > 0.0 && s.is_finite()) && !layout.is_excluded(i))
        {
            return Err(NormalizerError::InvalidStatistics { index, value });
        }

        for i in 0..self.dimension() {
            if self.layout.is_excluded(i) {
                self.mean[i] = 0.0;
                self.std[i] = 1.0;
            } else {
                self.mean[i] = mean[i];
                self.std[i] = std[i].max(self.eps);
            }
            self.mean_sq[i] = self.std[i] * self.std[i] + self.mean[i] * self.mean[i];
        }
        if let Some(count) = count {
            self.count = count;
        }
        Ok(())
    }

    fn refresh_std(&mut self) {
        for i in 0..self.dimension() {
            self.std[i] = if self.layout.is_excluded(i) {
                1.0
            } else {
                std_from_moments(self.mean[i], self.mean_sq[i], self.eps)
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_variance_floors_at_eps() {
        assert!((std_from_moments(3.0, 9.0, 0.02) - 0.02).abs() < 1e-15);
        assert!(std_from_moments(3.0, 8.0, 0.02) >= 0.02);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut acc = GroupedAccumulator::new(GroupLayout::singletons(2), 0.02);
        let empty: Vec<Vec<f64>> = Vec::new();
        assert_eq!(acc.update(&empty).unwrap(), 0);
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.std(), &[1.0, 1.0]);
    }
}
