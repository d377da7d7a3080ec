//! # Cart-Pole World
//!
//! The classic cart-pole balancing task, integrated analytically with
//! semi-implicit Euler so it runs identically forwards and backwards in time.
//! A noisy linear controller plays the role of the agent.
//!
//! The world collects the observations and actions of each episode. When an
//! episode ends naturally and training is enabled, the samples are absorbed
//! into the `s_norm` and `a_norm` normalizers and their mirrors are synced.
//! Invalidated episodes (pole fallen or cart out of bounds) are discarded.

use sim::{EnvironmentFault, World, WorldFactory};
use stats::{Normalizer, NormalizerError, ResourceMirror, StatsStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const STATE_SIZE: usize = 4;
pub const ACTION_SIZE: usize = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct CartPoleParams {
    pub gravity: f64,
    pub cart_mass: f64,
    pub pole_mass: f64,
    /// Half the pole length, in meters.
    pub half_length: f64,
    pub force_limit: f64,
    /// Pole angle beyond which the episode is invalid (radians).
    pub angle_limit: f64,
    /// Cart position beyond which the episode is invalid (meters).
    pub position_limit: f64,
    pub episode_length: f64,
    pub substeps: u32,
    /// Reset draws every state component uniformly from `[-spread, spread]`.
    pub reset_spread: f64,
    /// Controller gains applied to `[x, x_dot, theta, theta_dot]`.
    pub gains: [f64; STATE_SIZE],
    pub action_noise: f64,
    pub max_episodes: Option<u64>,
    pub clip: f64,
    pub eps: f64,
}

impl Default for CartPoleParams {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            cart_mass: 1.0,
            pole_mass: 0.1,
            half_length: 0.5,
            force_limit: 10.0,
            angle_limit: 12.0_f64.to_radians(),
            position_limit: 2.4,
            episode_length: 10.0,
            substeps: 10,
            reset_spread: 0.05,
            gains: [1.0, 1.6, 18.0, 3.0],
            action_noise: 1.0,
            max_episodes: None,
            clip: f64::INFINITY,
            eps: stats::DEFAULT_EPS,
        }
    }
}

/// Cart-pole state: `[x, x_dot, theta, theta_dot]`.
pub type State = [f64; STATE_SIZE];

pub struct CartPoleWorld {
    params: CartPoleParams,
    rng: fastrand::Rng,
    state: State,
    time: f64,
    s_norm: Normalizer,
    a_norm: Normalizer,
    s_mirror: Arc<ResourceMirror>,
    a_mirror: Arc<ResourceMirror>,
    states: Vec<State>,
    actions: Vec<[f64; ACTION_SIZE]>,
    training: bool,
    playback_speed: f64,
    updates_per_sec: f64,
    episodes: u64,
}

impl CartPoleWorld {
    /// # Errors
    ///
    /// Invalid normalizer parameters in `params`.
    pub fn new(params: CartPoleParams, seed: u64) -> Result<Self, NormalizerError> {
        let s_norm = Normalizer::with_options("s_norm", STATE_SIZE, None, params.eps, params.clip)?;
        let a_norm = Normalizer::with_options("a_norm", ACTION_SIZE, None, params.eps, params.clip)?;
        let mut world = Self {
            s_mirror: ResourceMirror::for_normalizer(&s_norm),
            a_mirror: ResourceMirror::for_normalizer(&a_norm),
            s_norm,
            a_norm,
            rng: fastrand::Rng::with_seed(seed),
            state: [0.0; STATE_SIZE],
            time: 0.0,
            states: Vec::new(),
            actions: Vec::new(),
            training: true,
            playback_speed: 1.0,
            updates_per_sec: 0.0,
            episodes: 0,
            params,
        };
        world.s_norm.attach_mirror(world.s_mirror.clone());
        world.a_norm.attach_mirror(world.a_mirror.clone());
        world.s_norm.sync_mirror();
        world.a_norm.sync_mirror();
        world.reset_state();
        Ok(world)
    }

    /// Loads any stored statistics for `s_norm` and `a_norm` and syncs the
    /// mirrors.
    ///
    /// # Errors
    ///
    /// A stored record does not fit the normalizer it is meant for.
    pub fn restore(&mut self, store: &StatsStore) -> Result<(), StoreError> {
        for norm in [&mut self.s_norm, &mut self.a_norm] {
            if store.restore(norm)? {
                info!("Restored {} (count {})", norm.name(), norm.count());
            }
            norm.sync_mirror();
        }
        Ok(())
    }

    #[must_use]
    pub fn stats_store(&self) -> StatsStore {
        let mut store = StatsStore::new();
        store.insert(&self.s_norm);
        store.insert(&self.a_norm);
        store
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub fn s_norm(&self) -> &Normalizer {
        &self.s_norm
    }

    #[must_use]
    pub fn a_norm(&self) -> &Normalizer {
        &self.a_norm
    }

    #[must_use]
    pub fn s_mirror(&self) -> &ResourceMirror {
        &self.s_mirror
    }

    #[must_use]
    pub fn a_mirror(&self) -> &ResourceMirror {
        &self.a_mirror
    }

    /// Current observation as the graph side sees it, normalized with the
    /// last synced statistics.
    ///
    /// # Errors
    ///
    /// Never in practice; the mirror is built with the state's dimension.
    pub fn normalized_observation(&self) -> Result<Vec<f64>, NormalizerError> {
        self.s_mirror.normalize(&self.state)
    }

    #[must_use]
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    #[must_use]
    pub fn is_training(&self) -> bool {
        self.training
    }

    #[must_use]
    pub fn playback_speed(&self) -> f64 {
        self.playback_speed
    }

    #[must_use]
    pub fn updates_per_sec(&self) -> f64 {
        self.updates_per_sec
    }

    /// Samples collected in the current episode.
    #[must_use]
    pub fn pending_samples(&self) -> usize {
        self.states.len()
    }

    fn action(&mut self) -> f64 {
        let feedback: f64 = self
            .params
            .gains
            .iter()
            .zip(&self.state)
            .map(|(k, s)| k * s)
            .sum();
        let noise = (self.rng.f64() * 2.0 - 1.0) * self.params.action_noise;
        (feedback + noise).clamp(-self.params.force_limit, self.params.force_limit)
    }

    fn integrate(&mut self, force: f64, dt: f64) {
        let p = &self.params;
        let [x, x_dot, theta, theta_dot] = self.state;
        let total_mass = p.cart_mass + p.pole_mass;
        let pole_moment = p.pole_mass * p.half_length;
        let (sin, cos) = theta.sin_cos();

        let temp = (force + pole_moment * theta_dot * theta_dot * sin) / total_mass;
        let theta_acc = (p.gravity * sin - cos * temp)
            / (p.half_length * (4.0 / 3.0 - p.pole_mass * cos * cos / total_mass));
        let x_acc = temp - pole_moment * theta_acc * cos / total_mass;

        let x_dot = x_dot + dt * x_acc;
        let theta_dot = theta_dot + dt * theta_acc;
        self.state = [x + dt * x_dot, x_dot, theta + dt * theta_dot, theta_dot];
    }

    fn reset_state(&mut self) {
        let spread = self.params.reset_spread;
        for s in &mut self.state {
            *s = (self.rng.f64() * 2.0 - 1.0) * spread;
        }
        self.time = 0.0;
        self.states.clear();
        self.actions.clear();
    }
}

impl World for CartPoleWorld {
    fn num_update_substeps(&self) -> u32 {
        self.params.substeps
    }

    fn update(&mut self, dt: f64) -> Result<(), EnvironmentFault> {
        let force = self.action();
        if dt != 0.0 {
            self.states.push(self.state);
            self.actions.push([force]);
        }
        self.integrate(force, dt);
        self.time += dt;

        if self.state.iter().any(|s| !s.is_finite()) {
            return Err(EnvironmentFault::new(format!(
                "cart-pole state diverged at t = {:.3}: {:?}",
                self.time, self.state
            )));
        }
        Ok(())
    }

    fn check_valid_episode(&self) -> bool {
        let [x, _, theta, _] = self.state;
        theta.abs() <= self.params.angle_limit && x.abs() <= self.params.position_limit
    }

    fn is_episode_end(&self) -> bool {
        self.time >= self.params.episode_length
    }

    fn end_episode(&mut self) {
        self.episodes += 1;
        if !self.training || self.states.is_empty() {
            return;
        }
        // both batches are checked before either normalizer changes
        let (s_moments, a_moments) = match (
            self.s_norm.batch_moments(&self.states),
            self.a_norm.batch_moments(&self.actions),
        ) {
            (Ok(s), Ok(a)) => (s, a),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Discarding episode samples: {e}");
                return;
            }
        };
        let absorbed = s_moments
            .map_or(Ok(()), |m| self.s_norm.absorb(&m))
            .and_then(|()| a_moments.map_or(Ok(()), |m| self.a_norm.absorb(&m)));
        if let Err(e) = absorbed {
            warn!("Discarding episode samples: {e}");
            return;
        }
        self.s_norm.sync_mirror();
        self.a_norm.sync_mirror();
        debug!(
            "Episode {} absorbed {} samples; s_norm mean {:?}",
            self.episodes,
            self.states.len(),
            self.s_norm.mean()
        );
    }

    fn reset(&mut self) {
        self.reset_state();
    }

    fn set_playback_speed(&mut self, speed: f64) {
        self.playback_speed = speed;
    }

    fn set_updates_per_sec(&mut self, updates_per_sec: f64) {
        self.updates_per_sec = updates_per_sec;
    }

    fn set_training(&mut self, enabled: bool) {
        self.training = enabled;
    }

    fn is_done(&self) -> bool {
        self.params
            .max_episodes
            .is_some_and(|max| self.episodes >= max)
    }

    fn shutdown(&mut self) {
        info!(
            "Cart-pole finished after {} episodes (s_norm count {}, a_norm count {})",
            self.episodes,
            self.s_norm.count(),
            self.a_norm.count()
        );
    }
}

/// Builds cart-pole worlds seeded from the session stream, carrying
/// normalizer statistics across reloads.
pub struct CartPoleFactory {
    pub params: CartPoleParams,
    pub stats: StatsStore,
}

impl CartPoleFactory {
    #[must_use]
    pub fn new(params: CartPoleParams, stats: StatsStore) -> Self {
        Self { params, stats }
    }
}

impl WorldFactory for CartPoleFactory {
    type World = CartPoleWorld;

    fn build(&mut self, rng: &mut fastrand::Rng) -> Result<CartPoleWorld, EnvironmentFault> {
        let mut world =
            CartPoleWorld::new(self.params.clone(), rng.u64(..)).map_err(EnvironmentFault::new)?;
        world.restore(&self.stats).map_err(EnvironmentFault::new)?;
        Ok(world)
    }
}
