//! # World Capability Interface
//!
//! The scheduler never looks inside an environment. It drives it through the
//! [`World`] trait, whose required methods are exactly the ones needed to
//! step time forward and detect episode boundaries. The remaining methods are
//! notification hooks with empty default bodies.

use std::error::Error;
use thiserror::Error;

/// Opaque failure raised by an environment.
///
/// The scheduler passes it through untouched; callers are expected to halt
/// the session rather than keep stepping a possibly corrupt world.
#[derive(Error, Debug)]
#[error("environment fault: {source}")]
pub struct EnvironmentFault {
    #[source]
    source: Box<dyn Error + Send + Sync + 'static>,
}

impl EnvironmentFault {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn into_inner(self) -> Box<dyn Error + Send + Sync + 'static> {
        self.source
    }
}

/// A steppable environment with episode semantics.
pub trait World {
    /// Number of sub-steps one update is split into. Values below 1 are
    /// treated as 1.
    fn num_update_substeps(&self) -> u32;

    /// Advances the environment by `dt` seconds. `dt` is negative during
    /// reverse playback and zero for a frozen single-frame step.
    ///
    /// # Errors
    ///
    /// Any unrecoverable environment failure.
    fn update(&mut self, dt: f64) -> Result<(), EnvironmentFault>;

    /// Whether the current rollout is still a legitimate episode.
    fn check_valid_episode(&self) -> bool;

    /// Whether the current episode reached its natural end.
    fn is_episode_end(&self) -> bool;

    /// Orderly end-of-episode bookkeeping, called before [`World::reset`].
    fn end_episode(&mut self);

    fn reset(&mut self);

    fn set_playback_speed(&mut self, _speed: f64) {}

    fn set_updates_per_sec(&mut self, _updates_per_sec: f64) {}

    fn set_training(&mut self, _enabled: bool) {}

    /// A world that reports `true` here ends its session after the current
    /// tick.
    fn is_done(&self) -> bool {
        false
    }

    fn shutdown(&mut self) {}
}

impl<W: World + ?Sized> World for Box<W> {
    fn num_update_substeps(&self) -> u32 {
        (**self).num_update_substeps()
    }

    fn update(&mut self, dt: f64) -> Result<(), EnvironmentFault> {
        (**self).update(dt)
    }

    fn check_valid_episode(&self) -> bool {
        (**self).check_valid_episode()
    }

    fn is_episode_end(&self) -> bool {
        (**self).is_episode_end()
    }

    fn end_episode(&mut self) {
        (**self).end_episode();
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn set_playback_speed(&mut self, speed: f64) {
        (**self).set_playback_speed(speed);
    }

    fn set_updates_per_sec(&mut self, updates_per_sec: f64) {
        (**self).set_updates_per_sec(updates_per_sec);
    }

    fn set_training(&mut self, enabled: bool) {
        (**self).set_training(enabled);
    }

    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn shutdown(&mut self) {
        (**self).shutdown();
    }
}
