//! # Run Configuration
//!
//! Settings come from two places: an optional JSON argument file and the
//! command line. The file is read first, then every flag given on the
//! command line overrides the matching file value.
//!
//! ```json
//! {
//!     "rand_seed": 42,
//!     "fps": 60,
//!     "playback_speed": 4.0,
//!     "stats_out": "stats.json"
//! }
//! ```

use crate::cartpole::CartPoleParams;
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use sim::{PlaybackConfig, SessionConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Command line of the `workbench` binary.
#[derive(Parser, Debug, Default)]
#[command(name = "workbench", about = "Run a cart-pole agent at a controllable playback speed")]
pub struct Cli {
    /// JSON file with run settings; flags below override it.
    #[arg(long)]
    pub arg_file: Option<PathBuf>,
    /// Base random seed, offset by 1000 per rank.
    #[arg(long)]
    pub rand_seed: Option<u64>,
    #[arg(long)]
    pub rank: Option<u32>,
    /// Display rate; the base timestep is `1 / fps`.
    #[arg(long)]
    pub fps: Option<f64>,
    /// Signed playback speed, negative plays backwards.
    #[arg(long, allow_hyphen_values = true)]
    pub playback_speed: Option<f64>,
    #[arg(long)]
    pub playback_delta: Option<f64>,
    #[arg(long)]
    pub fps_decay: Option<f64>,
    /// World sub-steps per update.
    #[arg(long)]
    pub substeps: Option<u32>,
    /// Stop after this many ticks.
    #[arg(long)]
    pub max_ticks: Option<u64>,
    /// Stop after this many completed episodes.
    #[arg(long)]
    pub max_episodes: Option<u64>,
    /// Run as fast as possible instead of in real time.
    #[arg(long)]
    pub headless: bool,
    /// Normalizer statistics to load at start-up.
    #[arg(long)]
    pub stats_in: Option<PathBuf>,
    /// Where to save normalizer statistics at shutdown.
    #[arg(long)]
    pub stats_out: Option<PathBuf>,
    #[arg(long)]
    pub clip: Option<f64>,
    #[arg(long)]
    pub eps: Option<f64>,
    /// Start with normalizer training disabled.
    #[arg(long)]
    pub no_training: bool,
    /// Reload the world whenever the argument file changes.
    #[arg(long)]
    pub watch: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkbenchConfig {
    pub rand_seed: Option<u64>,
    pub rank: u32,
    pub fps: f64,
    pub playback_speed: f64,
    pub playback_delta: f64,
    pub fps_decay: f64,
    pub substeps: u32,
    /// Length of one episode, in simulated seconds.
    pub episode_length: f64,
    pub max_ticks: Option<u64>,
    pub max_episodes: Option<u64>,
    pub headless: bool,
    pub stats_in: Option<PathBuf>,
    pub stats_out: Option<PathBuf>,
    /// Normalized values are clamped to `[-clip, clip]`; `None` disables
    /// clipping.
    pub clip: Option<f64>,
    pub eps: f64,
    pub training: bool,
    pub watch: bool,
    /// Amplitude of the uniform exploration noise added to the controller.
    pub action_noise: f64,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            rand_seed: None,
            rank: 0,
            fps: 60.0,
            playback_speed: 1.0,
            playback_delta: 0.05,
            fps_decay: 0.0,
            substeps: 10,
            episode_length: 10.0,
            max_ticks: None,
            max_episodes: None,
            headless: false,
            stats_in: None,
            stats_out: None,
            clip: None,
            eps: stats::DEFAULT_EPS,
            training: true,
            watch: false,
            action_noise: 1.0,
        }
    }
}

impl WorkbenchConfig {
    /// # Errors
    ///
    /// Malformed JSON, unknown keys, or out-of-range values.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("Failed to parse run settings")?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// The file cannot be read or does not hold valid settings.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read argument file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("In argument file {}", path.display()))
    }

    /// # Errors
    ///
    /// The first setting that is out of range.
    pub fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            bail!("fps must be positive, got {}", self.fps);
        }
        if !(self.playback_speed.abs() <= sim::MAX_PLAYBACK_SPEED) {
            bail!(
                "playback_speed must lie in [-{max}, {max}], got {}",
                self.playback_speed,
                max = sim::MAX_PLAYBACK_SPEED
            );
        }
        if !(self.playback_delta.is_finite() && self.playback_delta > 0.0) {
            bail!("playback_delta must be positive, got {}", self.playback_delta);
        }
        if !(0.0..1.0).contains(&self.fps_decay) {
            bail!("fps_decay must lie in [0, 1), got {}", self.fps_decay);
        }
        if !(self.episode_length.is_finite() && self.episode_length > 0.0) {
            bail!("episode_length must be positive, got {}", self.episode_length);
        }
        if let Some(clip) = self.clip {
            if !(clip > 0.0) {
                bail!("clip must be positive, got {clip}");
            }
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            bail!("eps must be positive, got {}", self.eps);
        }
        if !(self.action_noise.is_finite() && self.action_noise >= 0.0) {
            bail!("action_noise must be non-negative, got {}", self.action_noise);
        }
        Ok(())
    }

    #[must_use]
    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig {
            base_timestep: 1.0 / self.fps,
            speed: self.playback_speed,
            speed_delta: self.playback_delta,
            fps_decay: self.fps_decay,
        }
    }

    #[must_use]
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            playback: self.playback(),
            seed: self.rand_seed,
            rank: self.rank,
            training: self.training,
        }
    }

    #[must_use]
    pub fn cartpole(&self) -> CartPoleParams {
        CartPoleParams {
            substeps: self.substeps,
            episode_length: self.episode_length,
            max_episodes: self.max_episodes,
            action_noise: self.action_noise,
            clip: self.clip.unwrap_or(f64::INFINITY),
            eps: self.eps,
            ..CartPoleParams::default()
        }
    }
}

impl Cli {
    /// Reads the argument file, if any, and applies the command-line
    /// overrides on top.
    ///
    /// # Errors
    ///
    /// The argument file is unreadable or the merged settings are invalid.
    pub fn resolve(&self) -> Result<WorkbenchConfig> {
        let mut config = match &self.arg_file {
            Some(path) => WorkbenchConfig::read(path)?,
            None => WorkbenchConfig::default(),
        };

        if self.rand_seed.is_some() {
            config.rand_seed = self.rand_seed;
        }
        if let Some(rank) = self.rank {
            config.rank = rank;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(speed) = self.playback_speed {
            config.playback_speed = speed;
        }
        if let Some(delta) = self.playback_delta {
            config.playback_delta = delta;
        }
        if let Some(decay) = self.fps_decay {
            config.fps_decay = decay;
        }
        if let Some(substeps) = self.substeps {
            config.substeps = substeps;
        }
        if self.max_ticks.is_some() {
            config.max_ticks = self.max_ticks;
        }
        if self.max_episodes.is_some() {
            config.max_episodes = self.max_episodes;
        }
        if self.stats_in.is_some() {
            config.stats_in.clone_from(&self.stats_in);
        }
        if self.stats_out.is_some() {
            config.stats_out.clone_from(&self.stats_out);
        }
        if self.clip.is_some() {
            config.clip = self.clip;
        }
        if let Some(eps) = self.eps {
            config.eps = eps;
        }
        config.headless |= self.headless;
        config.watch |= self.watch;
        if self.no_training {
            config.training = false;
        }

        config.validate()?;
        Ok(config)
    }
}
