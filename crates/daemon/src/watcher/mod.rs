// File watcher: fsevents/inotify → work queue.
// Raw notify events are translated into `RawFsEvent`s and handed to the
// commit loop over a channel; the loop decides what they mean.

pub mod coalesce;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Kind of filesystem change reported by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsEventKind {
    Create,
    Modify,
    Remove,
    Rename,
}

impl FsEventKind {
    pub const ALL: [FsEventKind; 4] =
        [FsEventKind::Create, FsEventKind::Modify, FsEventKind::Remove, FsEventKind::Rename];

    pub fn name(self) -> &'static str {
        match self {
            FsEventKind::Create => "create",
            FsEventKind::Modify => "modify",
            FsEventKind::Remove => "remove",
            FsEventKind::Rename => "rename",
        }
    }

    fn bit(self) -> u8 {
        match self {
            FsEventKind::Create => 1,
            FsEventKind::Modify => 1 << 1,
            FsEventKind::Remove => 1 << 2,
            FsEventKind::Rename => 1 << 3,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "create" | "created" => Some(FsEventKind::Create),
            "modify" | "modified" | "change" | "changed" => Some(FsEventKind::Modify),
            "remove" | "removed" | "delete" | "deleted" => Some(FsEventKind::Remove),
            "rename" | "renamed" => Some(FsEventKind::Rename),
            _ => None,
        }
    }
}

impl fmt::Display for FsEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FsEventKind::Create => "Created",
            FsEventKind::Modify => "Changed",
            FsEventKind::Remove => "Deleted",
            FsEventKind::Rename => "Renamed",
        };
        f.write_str(label)
    }
}

/// Set of event kinds the watcher subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    bits: u8,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::from_kinds(FsEventKind::ALL)
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = FsEventKind>) -> Self {
        Self { bits: kinds.into_iter().fold(0, |bits, kind| bits | kind.bit()) }
    }

    /// Parse a comma-separated list such as `create,modify,delete`.
    /// Unknown names are ignored; an empty result subscribes to everything.
    pub fn parse(raw: &str) -> Self {
        let mut kinds = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            match FsEventKind::from_name(name) {
                Some(kind) => kinds.push(kind),
                None => warn!(name, "unknown watch event kind, ignoring"),
            }
        }

        if kinds.is_empty() {
            warn!(value = raw, "no usable watch event kinds, subscribing to all");
            return Self::all();
        }
        Self::from_kinds(kinds)
    }

    pub fn contains(&self, kind: FsEventKind) -> bool {
        self.bits & kind.bit() != 0
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = FsEventKind::ALL
            .iter()
            .filter(|kind| self.contains(**kind))
            .map(|kind| kind.name())
            .collect();
        f.write_str(&names.join(","))
    }
}

/// A filesystem event as delivered to the commit loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
    /// Whether the path was a directory when the event was observed.
    pub is_dir: bool,
    /// When the notify backend delivered the event.
    pub observed_at: Instant,
}

impl RawFsEvent {
    /// One-line human description used for the per-event log.
    pub fn describe(&self) -> String {
        if self.is_dir {
            format!("Directory changed: {}", self.path.display())
        } else {
            format!("File changed ({}): {}", self.kind, self.path.display())
        }
    }
}

/// Capacity for the internal event channel.
const EVENT_CHANNEL_CAPACITY: usize = 512;

/// Watches a directory tree recursively using the OS-native backend.
///
/// Events are sent to the returned receiver. Watching stops when the
/// handle is dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root` recursively for the kinds in `filter`.
    pub fn start(root: &Path, filter: EventFilter) -> Result<(Self, mpsc::Receiver<RawFsEvent>)> {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to canonicalize watch root: {}", root.display()))?;
        if !root.is_dir() {
            anyhow::bail!("watch root is not a directory: {}", root.display());
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let Some(raw_events) = translate_event(&event, filter, Instant::now()) else {
                        return;
                    };
                    for raw in raw_events {
                        match tx.try_send(raw) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(raw)) => {
                                // Queue already holds pending changes; dirty is set either way.
                                trace!(path = %raw.path.display(), "event queue full, dropping event");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                debug!("event channel closed, stopping event dispatch");
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "file watcher error");
                }
            }
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch directory: {}", root.display()))?;

        debug!(path = %root.display(), %filter, "file watcher started");

        Ok((Self { _watcher: watcher, root }, rx))
    }

    /// The canonicalized root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map a notify event kind onto ours. `None` for changes that carry no
/// content (access, metadata-only).
fn classify(kind: &EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Create(_) => Some(FsEventKind::Create),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FsEventKind::Rename),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(FsEventKind::Modify),
        EventKind::Remove(_) => Some(FsEventKind::Remove),
        _ => None,
    }
}

/// Translate a `notify::Event` into zero or more `RawFsEvent`s.
fn translate_event(event: &Event, filter: EventFilter, now: Instant) -> Option<Vec<RawFsEvent>> {
    let Some(kind) = classify(&event.kind) else {
        trace!(kind = ?event.kind, "skipping non-content event");
        return None;
    };

    if !filter.contains(kind) {
        trace!(?kind, "event kind not subscribed");
        return None;
    }

    // A paired rename carries [from, to]; report the destination only.
    let paths = match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            &event.paths[1..]
        }
        _ => &event.paths[..],
    };

    let events: Vec<RawFsEvent> = paths
        .iter()
        .map(|path| RawFsEvent { kind, path: path.clone(), is_dir: path.is_dir(), observed_at: now })
        .collect();

    if events.is_empty() {
        None
    } else {
        Some(events)
    }
}
