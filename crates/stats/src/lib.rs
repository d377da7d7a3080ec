#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]
//! # Running Normalization Statistics
//!
//! Online mean/standard-deviation estimation for the observation, goal and
//! action vectors fed to a learning agent.
//!
//! ## Key Components
//!
//! -   **[`GroupedAccumulator`]:** running count and first/second moments per
//!     dimension, combined batch-by-batch with the weighted parallel
//!     identity so precision holds as the count grows. Dimensions can be
//!     pooled into groups or excluded with [`GroupId::NONE`].
//! -   **[`Normalizer`]:** the authoritative owner of one stream's
//!     statistics. Adds clipping, administrative overrides and save/load.
//! -   **[`ResourceMirror`]:** a read-only replica consumed by an external
//!     computation graph. It only changes when the normalizer explicitly
//!     pushes to it.
//! -   **[`StatsStore`]:** named [`NormalizerRecord`]s persisted as JSON.
//!
//! ## Usage
//!
//! ```rust
//! use stats::{Normalizer, ResourceMirror};
//!
//! let mut norm = Normalizer::new("s_norm", 2);
//! let mirror = ResourceMirror::for_normalizer(&norm);
//! norm.attach_mirror(mirror.clone());
//!
//! norm.update(&[[0.0, 0.0], [2.0, 0.0], [4.0, 0.0]])?;
//! assert!(!norm.mirror_is_current());
//! norm.sync_mirror();
//! assert_eq!(mirror.snapshot().count, 3);
//! # Ok::<(), stats::NormalizerError>(())
//! ```

pub mod accumulator;
pub mod error;
pub mod group;
pub mod mirror;
pub mod normalizer;
pub mod record;

pub use accumulator::{std_from_moments, BatchMoments, GroupedAccumulator};
pub use error::{NormalizerError, StoreError};
pub use group::{GroupId, GroupLayout};
pub use mirror::{MirrorSnapshot, ResourceMirror, StatsMirror};
pub use normalizer::{Normalizer, DEFAULT_EPS};
pub use record::{NormalizerRecord, StatsStore};
