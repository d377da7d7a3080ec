//! # Episode Scheduler
//!
//! Converts one requested time delta into a sequence of fixed sub-steps and
//! applies episode semantics after each one:
//!
//! ```text
//! Idle -> Stepping -> { Continuing | EndingEpisode | Invalidating } -> Resetting -> Stepping ...
//! ```
//!
//! A reset always aborts the remaining sub-steps of the current
//! [`EpisodeScheduler::advance`] call. It does not abort further `advance`
//! calls issued by the same playback tick; those run against the freshly
//! reset episode.

use crate::world::{EnvironmentFault, World};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No world has been advanced yet.
    Idle,
    Stepping,
    Continuing,
    EndingEpisode,
    Invalidating,
    Resetting,
    Shutdown,
}

/// How an `advance` call finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeOutcome {
    /// Every planned sub-step ran and the episode goes on.
    Continuing,
    /// The episode reached its end; `end_episode` and `reset` were called.
    Ended,
    /// The episode became invalid; `reset` was called.
    Invalidated,
    /// The scheduler is shut down and did nothing.
    Halted,
}

impl EpisodeOutcome {
    #[must_use]
    pub fn reset_world(self) -> bool {
        matches!(self, Self::Ended | Self::Invalidated)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdvanceReport {
    pub substeps_planned: u32,
    pub substeps_run: u32,
    pub dt: f64,
    pub outcome: EpisodeOutcome,
}

/// Running totals, mostly for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub advances: u64,
    pub substeps: u64,
    pub episodes_ended: u64,
    pub episodes_invalidated: u64,
}

/// Sub-step count and size for one `advance`. A zero delta still performs
/// exactly one sub-step, at `dt = 0`.
#[must_use]
pub fn plan_substeps(reported: u32, elapsed_time: f64) -> (u32, f64) {
    if elapsed_time == 0.0 {
        return (1, 0.0);
    }
    let substeps = reported.max(1);
    (substeps, elapsed_time / f64::from(substeps))
}

pub struct EpisodeScheduler {
    state: SchedulerState,
    stats: SchedulerStats,
}

impl Default for EpisodeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodeScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            stats: SchedulerStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Advances `world` by `elapsed_time`, split into the world's sub-steps.
    ///
    /// # Errors
    ///
    /// Returns the world's [`EnvironmentFault`] as soon as an update fails;
    /// no further sub-step runs and nothing is reset.
    pub fn advance<W: World + ?Sized>(
        &mut self,
        world: &mut W,
        elapsed_time: f64,
    ) -> Result<AdvanceReport, EnvironmentFault> {
        if self.state == SchedulerState::Shutdown {
            warn!("advance requested after shutdown; ignoring");
            return Ok(AdvanceReport {
                substeps_planned: 0,
                substeps_run: 0,
                dt: 0.0,
                outcome: EpisodeOutcome::Halted,
            });
        }

        let reported = world.num_update_substeps();
        if reported == 0 {
            warn!("world reported 0 update substeps; using 1");
        }
        let (substeps, dt) = plan_substeps(reported, elapsed_time);
        self.stats.advances += 1;

        let report = |run, outcome| AdvanceReport {
            substeps_planned: substeps,
            substeps_run: run,
            dt,
            outcome,
        };

        for i in 1..=substeps {
            self.state = SchedulerState::Stepping;
            world.update(dt)?;
            self.stats.substeps += 1;

            if !world.check_valid_episode() {
                self.state = SchedulerState::Invalidating;
                debug!("Invalid episode at substep {i}/{substeps}; resetting");
                self.stats.episodes_invalidated += 1;
                self.reset(world);
                return Ok(report(i, EpisodeOutcome::Invalidated));
            }

            if world.is_episode_end() {
                self.state = SchedulerState::EndingEpisode;
                info!("End of episode: {dt}");
                world.end_episode();
                self.stats.episodes_ended += 1;
                self.reset(world);
                return Ok(report(i, EpisodeOutcome::Ended));
            }

            self.state = SchedulerState::Continuing;
        }

        Ok(report(substeps, EpisodeOutcome::Continuing))
    }

    /// Terminal: later `advance` calls do nothing.
    pub fn shutdown(&mut self) {
        self.state = SchedulerState::Shutdown;
    }

    fn reset<W: World + ?Sized>(&mut self, world: &mut W) {
        self.state = SchedulerState::Resetting;
        world.reset();
    }
}
