//! Filesystem watcher feeding the watch loop.
//!
//! A polling watcher is used so behavior is identical across platforms and
//! inside containers or network mounts where native notifications are
//! unreliable. Every create/modify event under an exercise is forwarded as an
//! [`Input::FileChanged`] with a root-relative path; deciding whether the
//! change matters is left to the state machine.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::core::catalog::Catalog;
use crate::core::machine::{FileChange, Input};

/// Keeps the underlying watcher alive; dropping it stops event delivery.
pub struct SourceWatcher {
    _watcher: PollWatcher,
    targets: Vec<PathBuf>,
}

impl SourceWatcher {
    /// Absolute paths being watched.
    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }
}

/// Start watching every exercise source under `root`.
///
/// `root` should be canonical so emitted paths can be made relative to it.
pub fn spawn_source_watcher(
    root: &Path,
    catalog: &Catalog,
    poll_interval: Duration,
    tx: Sender<Input>,
) -> Result<SourceWatcher> {
    let event_root = root.to_path_buf();
    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| match res {
            Ok(event) => {
                for input in change_inputs(&event_root, &event) {
                    // The loop has exited; nothing left to notify.
                    if tx.send(input).is_err() {
                        return;
                    }
                }
            }
            Err(err) => warn!(%err, "file watcher error"),
        },
        notify::Config::default()
            .with_poll_interval(poll_interval)
            .with_compare_contents(true),
    )
    .context("create file watcher")?;

    let targets = watch_targets(root, catalog);
    for target in &targets {
        let mode = if target.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(target, mode)
            .with_context(|| format!("watch {}", target.display()))?;
        debug!(path = %target.display(), "watching");
    }
    info!(
        targets = targets.len(),
        poll_ms = poll_interval.as_millis() as u64,
        "file watcher started"
    );

    Ok(SourceWatcher {
        _watcher: watcher,
        targets,
    })
}

/// Minimal set of absolute paths covering every exercise's watch scope.
///
/// Targets nested inside another target are dropped.
fn watch_targets(root: &Path, catalog: &Catalog) -> Vec<PathBuf> {
    let scopes: BTreeSet<PathBuf> = catalog
        .exercises()
        .iter()
        .map(|exercise| {
            let scope = exercise.scope();
            if scope.as_os_str().is_empty() {
                root.join(&exercise.path)
            } else {
                root.join(scope)
            }
        })
        .collect();

    let mut targets: Vec<PathBuf> = Vec::new();
    for scope in scopes {
        if targets.iter().any(|target| scope.starts_with(target)) {
            continue;
        }
        targets.push(scope);
    }
    targets
}

/// Translate one notify event into watch loop inputs.
///
/// Only creations and modifications count; removals and access events are
/// dropped. Paths outside `root` are ignored.
pub fn change_inputs(root: &Path, event: &NotifyEvent) -> Vec<Input> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }
    let at = SystemTime::now();
    event
        .paths
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .map(|relative| {
            Input::FileChanged(FileChange {
                path: relative.to_path_buf(),
                at,
            })
        })
        .collect()
}
