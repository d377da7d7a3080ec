//! # Workbench Application Logic
//!
//! Builds the session from the resolved configuration and drives it, either
//! headless (as fast as possible, for a bounded number of ticks) or in real
//! time, sleeping for whatever delay the playback controller asks for.
//!
//! Normalizer statistics are loaded before the first world is built and
//! saved after the session has shut down, including when the loop ended on
//! an environment fault.

use anyhow::Result;
use sim::{Session, TickReport};
use stats::StatsStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use workbench::cartpole::CartPoleFactory;
use workbench::config::Cli;

use crate::watcher;

/// Ticks between progress lines.
const LOG_INTERVAL: u64 = 300;
/// Headless run length when no `max_ticks` is given.
const DEFAULT_HEADLESS_TICKS: u64 = 10_000;

type CartPoleSession = Session<CartPoleFactory>;

/// Runs one workbench session to completion.
///
/// # Errors
///
/// Invalid settings, unreadable statistics, a world that cannot be built, an
/// environment fault during the run, or a failure to save statistics.
pub fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve()?;

    let stats = match &config.stats_in {
        Some(path) => StatsStore::read(path)?,
        None => StatsStore::new(),
    };
    let factory = CartPoleFactory::new(config.cartpole(), stats);
    let mut session = Session::new(factory, config.session())?;

    let reload = Arc::new(AtomicBool::new(false));
    let _arg_watcher = match (&cli.arg_file, config.watch) {
        (Some(path), true) => match watcher::start(path, Arc::clone(&reload)) {
            Ok(watcher_instance) => Some(watcher_instance),
            Err(e) => {
                error!("Failed to start argument file watcher: {e:?}");
                None
            }
        },
        (None, true) => {
            warn!("--watch needs --arg-file; nothing to watch");
            None
        }
        _ => None,
    };

    let mut driver = Driver {
        cli,
        reload,
        ticks: 0,
    };
    let outcome = if config.headless {
        driver.run_headless(&mut session, config.max_ticks.unwrap_or(DEFAULT_HEADLESS_TICKS))
    } else {
        driver.run_realtime(&mut session, config.max_ticks)
    };

    session.shutdown();
    let scheduler = session.scheduler().stats();
    info!(
        "Ran {} ticks: {} updates, {} episodes ended, {} invalidated",
        driver.ticks, scheduler.substeps, scheduler.episodes_ended, scheduler.episodes_invalidated
    );
    if let Some(path) = &config.stats_out {
        session.world().stats_store().write(path)?;
    }
    outcome
}

struct Driver<'a> {
    cli: &'a Cli,
    reload: Arc<AtomicBool>,
    ticks: u64,
}

impl Driver<'_> {
    fn run_headless(&mut self, session: &mut CartPoleSession, max_ticks: u64) -> Result<()> {
        info!("Starting headless run for {max_ticks} ticks...");
        let mut last = Instant::now();
        while self.ticks < max_ticks && !session.is_shut_down() {
            let now = Instant::now();
            let report = session.tick(now.duration_since(last))?;
            last = now;
            self.after_tick(session, &report);
        }
        Ok(())
    }

    fn run_realtime(&mut self, session: &mut CartPoleSession, max_ticks: Option<u64>) -> Result<()> {
        info!(
            "Starting real-time loop at speed {:.2}...",
            session.playback().speed()
        );
        let mut last = Instant::now();
        while !session.is_shut_down() {
            if max_ticks.is_some_and(|max| self.ticks >= max) {
                break;
            }
            let Some(delay) = session.next_tick() else {
                info!("Playback stalled or paused; leaving the loop");
                break;
            };
            std::thread::sleep(delay);

            let now = Instant::now();
            let report = session.tick(now.duration_since(last))?;
            last = now;
            self.after_tick(session, &report);
        }
        Ok(())
    }

    fn after_tick(&mut self, session: &mut CartPoleSession, report: &TickReport) {
        self.ticks += 1;
        if self.ticks % LOG_INTERVAL == 0 {
            let world = session.world();
            info!(
                "Tick {}: {} episodes, {:.0} updates/s, speed {:.2}, s_norm count {}",
                self.ticks,
                world.episodes(),
                report.updates_per_sec,
                session.playback().speed(),
                world.s_norm().count()
            );
        }
        if self.reload.swap(false, Ordering::AcqRel) {
            self.reload_world(session);
        }
    }

    /// Re-reads the settings and rebuilds the world, carrying the current
    /// statistics over.
    fn reload_world(&self, session: &mut CartPoleSession) {
        match self.cli.resolve() {
            Ok(config) => {
                session.factory_mut().params = config.cartpole();
                session.set_speed(config.playback_speed);
            }
            Err(e) => error!("Keeping previous settings: {e:#}"),
        }
        let stats = session.world().stats_store();
        session.factory_mut().stats = stats;
        if let Err(e) = session.reload() {
            error!("Reload failed; keeping the current world: {e}");
        }
    }
}
