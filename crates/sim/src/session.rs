//! # Session Context
//!
//! A [`Session`] owns everything a running simulation needs: the world, the
//! episode scheduler, the playback controller, and the seeded random stream
//! used to build worlds. It is created at session start and dropped at
//! session end; nothing lives in globals.
//!
//! All mutation happens on the thread that calls [`Session::tick`].
//! Shutdown is cooperative: a request is honoured once the current tick has
//! completed.

use crate::playback::{PlaybackConfig, PlaybackController, StepDirection, TickReport};
use crate::scheduler::{AdvanceReport, EpisodeScheduler};
use crate::seed::resolve_seed;
use crate::world::{EnvironmentFault, World};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Environment(#[from] EnvironmentFault),
    #[error("session has been shut down")]
    ShutDown,
}

/// Builds worlds for a session, on start-up and on every reload.
pub trait WorldFactory {
    type World: World;

    /// # Errors
    ///
    /// Any failure to construct the environment.
    fn build(&mut self, rng: &mut fastrand::Rng) -> Result<Self::World, EnvironmentFault>;
}

impl<W, F> WorldFactory for F
where
    W: World,
    F: FnMut(&mut fastrand::Rng) -> Result<W, EnvironmentFault>,
{
    type World = W;

    fn build(&mut self, rng: &mut fastrand::Rng) -> Result<W, EnvironmentFault> {
        self(rng)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub playback: PlaybackConfig,
    /// Base random seed; `None` draws a fresh one.
    pub seed: Option<u64>,
    /// Process rank, offsets the base seed.
    pub rank: u32,
    pub training: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            seed: None,
            rank: 0,
            training: true,
        }
    }
}

pub struct Session<F: WorldFactory> {
    factory: F,
    world: F::World,
    scheduler: EpisodeScheduler,
    playback: PlaybackController,
    rng: fastrand::Rng,
    seed: u64,
    training: bool,
    shutdown_requested: bool,
    shut_down: bool,
}

impl<F: WorldFactory> Session<F> {
    /// Resolves the process seed, seeds the random streams, and builds the
    /// first world.
    ///
    /// # Errors
    ///
    /// Fails if the factory cannot build the world.
    pub fn new(mut factory: F, config: SessionConfig) -> Result<Self, SessionError> {
        let seed = resolve_seed(config.seed, config.rank);
        fastrand::seed(seed);
        let mut rng = fastrand::Rng::with_seed(seed);
        info!("Session seed: {seed} (rank {})", config.rank);

        info!("Preparing world...");
        let mut world = factory.build(&mut rng)?;
        let playback = PlaybackController::new(config.playback);
        world.set_playback_speed(playback.speed());
        world.set_training(config.training);

        Ok(Self {
            factory,
            world,
            scheduler: EpisodeScheduler::new(),
            playback,
            rng,
            seed,
            training: config.training,
            shutdown_requested: false,
            shut_down: false,
        })
    }

    #[must_use]
    pub fn world(&self) -> &F::World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut F::World {
        &mut self.world
    }

    /// The factory used by [`Session::reload`]; adjust it before reloading
    /// to change what the next world looks like.
    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    #[must_use]
    pub fn scheduler(&self) -> &EpisodeScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn is_training(&self) -> bool {
        self.training
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Delay until the next tick is due, or `None` if nothing is scheduled.
    #[must_use]
    pub fn next_tick(&self) -> Option<Duration> {
        if self.shut_down {
            None
        } else {
            self.playback.timer().delay()
        }
    }

    /// Handles one timer tick.
    ///
    /// # Errors
    ///
    /// [`SessionError::Environment`] if the world failed; playback is stopped
    /// and the session should not be stepped again.
    /// [`SessionError::ShutDown`] after shutdown.
    pub fn tick(&mut self, wall_elapsed: Duration) -> Result<TickReport, SessionError> {
        if self.shut_down {
            return Err(SessionError::ShutDown);
        }
        let report = self
            .playback
            .on_tick(&mut self.scheduler, &mut self.world, wall_elapsed)
            .map_err(|fault| self.halt(fault))?;

        if self.world.is_done() {
            info!("World reports done");
            self.shutdown_requested = true;
        }
        if self.shutdown_requested {
            self.shutdown();
        }
        Ok(report)
    }

    /// Single-frame step, forward or backward; pauses playback.
    ///
    /// # Errors
    ///
    /// As [`Session::tick`].
    pub fn step_frame(&mut self, direction: StepDirection) -> Result<AdvanceReport, SessionError> {
        if self.shut_down {
            return Err(SessionError::ShutDown);
        }
        self.playback
            .step_frame(&mut self.scheduler, &mut self.world, direction)
            .map_err(|fault| self.halt(fault))
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.playback.set_speed(speed);
        self.world.set_playback_speed(self.playback.speed());
    }

    pub fn faster(&mut self) {
        self.playback.faster();
        self.world.set_playback_speed(self.playback.speed());
    }

    pub fn slower(&mut self) {
        self.playback.slower();
        self.world.set_playback_speed(self.playback.speed());
    }

    pub fn reset_speed(&mut self) {
        self.playback.reset_speed();
        self.world.set_playback_speed(self.playback.speed());
    }

    /// Pauses or resumes playback; returns whether it is now playing.
    pub fn toggle_animation(&mut self) -> bool {
        self.playback.toggle()
    }

    /// Replaces the world with a freshly built one. The seeded random stream
    /// continues; it is not reseeded.
    ///
    /// # Errors
    ///
    /// If the factory fails the current world is kept.
    pub fn reload(&mut self) -> Result<(), SessionError> {
        info!("Reloading world...");
        let mut world = self.factory.build(&mut self.rng)?;
        world.set_playback_speed(self.playback.speed());
        world.set_training(self.training);
        self.world = world;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.world.reset();
    }

    /// Flips the training flag and forwards it to the world.
    pub fn toggle_training(&mut self) -> bool {
        self.training = !self.training;
        self.world.set_training(self.training);
        if self.training {
            info!("Training enabled");
        } else {
            info!("Training disabled");
        }
        self.training
    }

    /// Honoured at the end of the current tick.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Stops playback, shuts the scheduler and the world down. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        info!("Shutting down...");
        self.playback.stop();
        self.scheduler.shutdown();
        self.world.shutdown();
        self.shut_down = true;
    }

    fn halt(&mut self, fault: EnvironmentFault) -> SessionError {
        error!("Halting session: {fault}");
        self.playback.stop();
        SessionError::Environment(fault)
    }
}
