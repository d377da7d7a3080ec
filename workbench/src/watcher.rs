//! # Argument File Watching
//!
//! Watches the JSON argument file so edits can be picked up without
//! restarting. The watcher runs on `notify`'s own thread and never touches
//! the session; it only raises a flag that the tick loop consumes between
//! ticks.

use anyhow::{anyhow, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Raises the reload flag when the watched file changes.
struct ArgFileChangeHandler {
    file_name: PathBuf,
    reload: Arc<AtomicBool>,
}

impl ArgFileChangeHandler {
    fn handle_event(&self, result: notify::Result<Event>) {
        match result {
            Ok(event) => self.process_event(&event),
            Err(e) => error!("File watcher error: {e:?}"),
        }
    }

    fn process_event(&self, event: &Event) {
        if !event.kind.is_modify() && !event.kind.is_create() {
            return;
        }
        if event.paths.iter().any(|path| self.is_arg_file(path)) {
            info!("Argument file {:?} modified; reload scheduled", self.file_name);
            self.reload.store(true, Ordering::Release);
        }
    }

    fn is_arg_file(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| Path::new(name) == self.file_name)
    }
}

/// Starts watching `arg_file`. The directory holding it is watched rather
/// than the file itself, so editors that replace the file on save still
/// trigger a reload.
///
/// The caller must keep the returned watcher alive; dropping it stops the
/// watch.
///
/// # Errors
///
/// The file has no name, or `notify` cannot watch its directory.
pub fn start(arg_file: &Path, reload: Arc<AtomicBool>) -> Result<RecommendedWatcher> {
    let file_name = arg_file
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Argument file {} has no file name", arg_file.display()))?;
    let directory = match arg_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let handler = ArgFileChangeHandler { file_name, reload };
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        handler.handle_event(result);
    })
    .map_err(|e| anyhow!("Failed to create file watcher: {e}"))?;
    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .map_err(|e| anyhow!("Failed to watch {}: {e}", directory.display()))?;

    info!("Watching {} for changes", arg_file.display());
    Ok(watcher)
}
