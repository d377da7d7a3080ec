#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
//! # Simulation Scheduling
//!
//! Drives an environment forward in time at a user-chosen playback speed
//! and applies episode semantics between fixed sub-steps.
//!
//! ## Key Components
//!
//! -   **[`World`]:** the capability interface every environment implements.
//!     The scheduler never looks inside a world.
//! -   **[`EpisodeScheduler`]:** splits one time delta into sub-steps and
//!     resets the world when an episode ends or becomes invalid.
//! -   **[`PlaybackController`]:** turns timer ticks into scheduler calls,
//!     supports reverse playback, pausing and single-frame steps, and owns
//!     its [`TickTimer`].
//! -   **[`Session`]:** everything a run needs, with seeding, reloads and
//!     cooperative shutdown.
//!
//! ## Usage
//!
//! ```rust
//! use sim::{EnvironmentFault, Session, SessionConfig, World};
//! use std::time::Duration;
//!
//! struct Clock(f64);
//!
//! impl World for Clock {
//!     fn num_update_substeps(&self) -> u32 { 1 }
//!     fn update(&mut self, dt: f64) -> Result<(), EnvironmentFault> {
//!         self.0 += dt;
//!         Ok(())
//!     }
//!     fn check_valid_episode(&self) -> bool { true }
//!     fn is_episode_end(&self) -> bool { false }
//!     fn end_episode(&mut self) {}
//!     fn reset(&mut self) { self.0 = 0.0; }
//! }
//!
//! let config = SessionConfig { seed: Some(1), ..SessionConfig::default() };
//! let mut session = Session::new(|_: &mut fastrand::Rng| Ok::<_, EnvironmentFault>(Clock(0.0)), config)?;
//! session.set_speed(3.0);
//! let report = session.tick(Duration::from_millis(16))?;
//! assert_eq!(report.steps, 3);
//! assert!((session.world().0 - 3.0 / 60.0).abs() < 1e-12);
//! # Ok::<(), sim::SessionError>(())
//! ```

pub mod playback;
pub mod scheduler;
pub mod seed;
pub mod session;
pub mod throughput;
pub mod world;

pub use playback::{
    tick_delay, PlaybackConfig, PlaybackController, StepDirection, TickReport, TickTimer,
    MAX_PLAYBACK_SPEED, SPEED_EPSILON,
};
pub use scheduler::{
    plan_substeps, AdvanceReport, EpisodeOutcome, EpisodeScheduler, SchedulerState,
    SchedulerStats,
};
pub use seed::{rank_seed, resolve_seed, RANK_SEED_STRIDE};
pub use session::{Session, SessionConfig, SessionError, WorldFactory};
pub use throughput::UpdateRate;
pub use world::{EnvironmentFault, World};
