//! # Playback Controller
//!
//! Turns timer ticks into scheduler calls. The signed playback speed picks
//! both the direction and the number of fixed-size steps per tick:
//!
//! -   `num_steps = max(1, round(|speed|))`
//! -   `timestep = +base_timestep` for `speed >= 0`, `-base_timestep` otherwise
//!
//! Fast playback is "more steps per tick", never "bigger steps". Slow
//! playback (`|speed| < 1`) keeps one step per tick and stretches the delay
//! until the next tick instead.
//!
//! The controller owns its [`TickTimer`]. It decides after every tick
//! whether to re-arm, and a controller whose speed is effectively zero
//! stays disarmed until [`PlaybackController::set_speed`] moves it away
//! from zero.

use crate::scheduler::{AdvanceReport, EpisodeScheduler};
use crate::throughput::UpdateRate;
use crate::world::{EnvironmentFault, World};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Speeds with a smaller magnitude count as stopped.
pub const SPEED_EPSILON: f64 = 1e-4;

/// Largest accepted `|speed|`; one tick never runs more than this many
/// scheduler advances.
pub const MAX_PLAYBACK_SPEED: f64 = 1000.0;

fn clamp_speed(speed: f64) -> f64 {
    if speed.abs() > MAX_PLAYBACK_SPEED {
        warn!("playback speed {speed} clamped to +/-{MAX_PLAYBACK_SPEED}");
        speed.clamp(-MAX_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
    } else {
        speed
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Fixed physical step, in seconds.
    pub base_timestep: f64,
    pub speed: f64,
    /// Increment used by [`PlaybackController::faster`] and
    /// [`PlaybackController::slower`].
    pub speed_delta: f64,
    /// Smoothing factor of the updates-per-second meter, in `[0, 1)`.
    pub fps_decay: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::from_fps(60.0)
    }
}

impl PlaybackConfig {
    #[must_use]
    pub fn from_fps(fps: f64) -> Self {
        Self {
            base_timestep: 1.0 / fps,
            speed: 1.0,
            speed_delta: 0.05,
            fps_decay: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

/// Explicit armed/disarmed tick source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickTimer {
    armed: Option<Duration>,
}

impl TickTimer {
    pub fn arm(&mut self, delay: Duration) {
        self.armed = Some(delay);
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Delay until the next tick is due, if armed.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        self.armed
    }
}

/// What one tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub steps: u32,
    pub timestep: f64,
    /// How many of the steps ended in a world reset.
    pub resets: u32,
    pub updates_per_sec: f64,
    pub next_delay: Option<Duration>,
}

/// Delay before the next tick: `base_timestep * num_steps / |speed|` minus
/// the time already spent updating, floored at zero. `None` when the speed
/// is effectively zero.
#[must_use]
pub fn tick_delay(
    base_timestep: f64,
    num_steps: u32,
    speed: f64,
    update_duration: Duration,
) -> Option<Duration> {
    if speed.abs() < SPEED_EPSILON {
        return None;
    }
    let secs = base_timestep * f64::from(num_steps) / speed.abs();
    let interval = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
    Some(interval.saturating_sub(update_duration))
}

pub struct PlaybackController {
    speed: f64,
    base_timestep: f64,
    speed_delta: f64,
    animating: bool,
    timer: TickTimer,
    rate: UpdateRate,
}

impl PlaybackController {
    /// Starts animating with the timer armed for one display interval.
    #[must_use]
    pub fn new(config: PlaybackConfig) -> Self {
        let base_timestep = if config.base_timestep.is_finite() && config.base_timestep > 0.0 {
            config.base_timestep
        } else {
            warn!(
                "invalid base timestep {}; falling back to 1/60",
                config.base_timestep
            );
            1.0 / 60.0
        };
        let speed = if config.speed.is_finite() { clamp_speed(config.speed) } else { 1.0 };
        let mut controller = Self {
            speed,
            base_timestep,
            speed_delta: config.speed_delta,
            animating: true,
            timer: TickTimer::default(),
            rate: UpdateRate::new(config.fps_decay),
        };
        if speed.abs() > SPEED_EPSILON {
            controller.timer.arm(controller.display_interval());
        }
        controller
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[must_use]
    pub fn base_timestep(&self) -> f64 {
        self.base_timestep
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    #[must_use]
    pub fn timer(&self) -> TickTimer {
        self.timer
    }

    #[must_use]
    pub fn updates_per_sec(&self) -> f64 {
        self.rate.per_sec()
    }

    /// `max(1, round(|speed|))`.
    #[must_use]
    pub fn num_steps(&self) -> u32 {
        // `as` saturates for out-of-range floats
        (self.speed.abs().round() as u32).max(1)
    }

    /// `±base_timestep`, signed like the speed.
    #[must_use]
    pub fn signed_timestep(&self) -> f64 {
        if self.speed >= 0.0 {
            self.base_timestep
        } else {
            -self.base_timestep
        }
    }

    #[must_use]
    pub fn display_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_timestep).unwrap_or(Duration::ZERO)
    }

    /// Runs one tick: `num_steps` scheduler advances of `signed_timestep`
    /// each, then the throughput update and the re-arm decision.
    ///
    /// A paused controller does nothing and drops its timer.
    ///
    /// # Errors
    ///
    /// Propagates the first [`EnvironmentFault`]; the remaining steps of the
    /// tick are skipped.
    pub fn on_tick<W: World + ?Sized>(
        &mut self,
        scheduler: &mut EpisodeScheduler,
        world: &mut W,
        wall_elapsed: Duration,
    ) -> Result<TickReport, EnvironmentFault> {
        if !self.animating {
            self.timer.disarm();
            return Ok(TickReport {
                steps: 0,
                timestep: 0.0,
                resets: 0,
                updates_per_sec: self.rate.per_sec(),
                next_delay: None,
            });
        }

        let started = Instant::now();
        let steps = self.num_steps();
        let timestep = self.signed_timestep();
        let mut resets = 0;
        for _ in 0..steps {
            let report = scheduler.advance(world, timestep)?;
            if report.outcome.reset_world() {
                resets += 1;
            }
        }

        if let Some(rate) = self.rate.record(steps, wall_elapsed) {
            world.set_updates_per_sec(rate);
        }

        let next_delay = tick_delay(self.base_timestep, steps, self.speed, started.elapsed());
        match next_delay {
            Some(delay) => self.timer.arm(delay),
            None => {
                debug!("playback speed is zero; tick source stalled");
                self.timer.disarm();
            }
        }

        Ok(TickReport {
            steps,
            timestep,
            resets,
            updates_per_sec: self.rate.per_sec(),
            next_delay,
        })
    }

    /// Advances a single frame of `±base_timestep` and pauses playback.
    ///
    /// # Errors
    ///
    /// Propagates the world's [`EnvironmentFault`].
    pub fn step_frame<W: World + ?Sized>(
        &mut self,
        scheduler: &mut EpisodeScheduler,
        world: &mut W,
        direction: StepDirection,
    ) -> Result<AdvanceReport, EnvironmentFault> {
        let timestep = match direction {
            StepDirection::Forward => self.base_timestep,
            StepDirection::Backward => -self.base_timestep,
        };
        let report = scheduler.advance(world, timestep);
        self.stop();
        report
    }

    /// Sets the signed speed. Leaving the stopped band re-arms the timer.
    /// Non-finite values are ignored; magnitudes above
    /// [`MAX_PLAYBACK_SPEED`] are clamped.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            warn!("ignoring non-finite playback speed {speed}");
            return;
        }
        let speed = clamp_speed(speed);
        let previous = self.speed;
        self.speed = speed;
        info!("Playback speed: {speed:.2}");
        if previous.abs() < SPEED_EPSILON && speed.abs() > SPEED_EPSILON {
            self.timer.arm(self.display_interval());
        }
    }

    pub fn change_speed(&mut self, delta: f64) {
        self.set_speed(self.speed + delta);
    }

    pub fn faster(&mut self) {
        self.change_speed(self.speed_delta);
    }

    pub fn slower(&mut self) {
        self.change_speed(-self.speed_delta);
    }

    /// Back to real time, forward.
    pub fn reset_speed(&mut self) {
        self.set_speed(1.0);
    }

    pub fn start(&mut self) {
        self.animating = true;
        self.timer.arm(self.display_interval());
    }

    /// No further ticks are scheduled until [`PlaybackController::start`] or
    /// [`PlaybackController::toggle`].
    pub fn stop(&mut self) {
        self.animating = false;
        self.timer.disarm();
    }

    /// Flips between playing and paused; returns the new state.
    pub fn toggle(&mut self) -> bool {
        if self.animating {
            self.stop();
        } else {
            self.start();
        }
        self.animating
    }
}
