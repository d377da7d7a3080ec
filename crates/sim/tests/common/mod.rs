#![allow(dead_code)]

use sim::{EnvironmentFault, World};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Update(f64),
    EndEpisode,
    Reset,
    Speed(f64),
    UpdatesPerSec(f64),
    Training(bool),
    Shutdown,
}

/// Scriptable world that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingWorld {
    pub calls: Vec<Call>,
    pub substeps: u32,
    /// Episode becomes invalid after this many updates since the last reset.
    pub invalid_after: Option<usize>,
    /// Episode ends after this many updates since the last reset.
    pub end_after: Option<usize>,
    /// The n-th update overall fails.
    pub fail_on: Option<usize>,
    pub done: bool,
    pub time: f64,
    updates: usize,
    since_reset: usize,
}

impl RecordingWorld {
    pub fn with_substeps(substeps: u32) -> Self {
        Self {
            substeps,
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Update(dt) => Some(*dt),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    /// Calls without the hook notifications.
    pub fn episode_calls(&self) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Update(_) | Call::EndEpisode | Call::Reset))
            .cloned()
            .collect()
    }
}

impl World for RecordingWorld {
    fn num_update_substeps(&self) -> u32 {
        self.substeps
    }

    fn update(&mut self, dt: f64) -> Result<(), EnvironmentFault> {
        self.updates += 1;
        if self.fail_on == Some(self.updates) {
            return Err(EnvironmentFault::new("solver diverged"));
        }
        self.since_reset += 1;
        self.time += dt;
        self.calls.push(Call::Update(dt));
        Ok(())
    }

    fn check_valid_episode(&self) -> bool {
        self.invalid_after.map_or(true, |n| self.since_reset < n)
    }

    fn is_episode_end(&self) -> bool {
        self.end_after.map_or(false, |n| self.since_reset >= n)
    }

    fn end_episode(&mut self) {
        self.calls.push(Call::EndEpisode);
    }

    fn reset(&mut self) {
        self.since_reset = 0;
        self.calls.push(Call::Reset);
    }

    fn set_playback_speed(&mut self, speed: f64) {
        self.calls.push(Call::Speed(speed));
    }

    fn set_updates_per_sec(&mut self, updates_per_sec: f64) {
        self.calls.push(Call::UpdatesPerSec(updates_per_sec));
    }

    fn set_training(&mut self, enabled: bool) {
        self.calls.push(Call::Training(enabled));
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn shutdown(&mut self) {
        self.calls.push(Call::Shutdown);
    }
}
