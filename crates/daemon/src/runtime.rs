// Commit loop: one task consumes watcher events and timer ticks in order.
//
// Because ticks and events share a single queue, a cycle can never overlap
// another and no pause/resume of the watcher is needed; events raised while
// a cycle runs are recognised by timestamp and discarded.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::AutoCommitConfig;
use crate::git::cycle::{CommitCycle, CycleReport, CycleSettings};
use crate::git::prompt::{MessagePrompt, StdinPrompt};
use crate::git::worker::{CommandExecutor, GitWorker};
use crate::watcher::coalesce::{ChangeTracker, CoalesceConfig};
use crate::watcher::{FileWatcher, RawFsEvent};

/// Timing for the commit loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub commit_interval: Duration,
    pub coalesce: CoalesceConfig,
}

impl From<&AutoCommitConfig> for LoopConfig {
    fn from(config: &AutoCommitConfig) -> Self {
        Self { commit_interval: config.commit_interval, coalesce: CoalesceConfig::default() }
    }
}

/// Returned when the loop stops.
#[derive(Debug, Clone, Default)]
pub struct LoopSummary {
    pub cycles_started: u64,
    pub last_report: Option<CycleReport>,
    /// Changes seen but not yet committed when the loop stopped.
    pub pending_changes: bool,
}

/// Run the commit loop until `shutdown` fires or the event channel closes.
///
/// The first tick fires immediately; later ticks follow `commit_interval`,
/// measured from the end of the last cycle.
pub async fn run_commit_loop<E, P>(
    mut events: mpsc::Receiver<RawFsEvent>,
    mut cycle: CommitCycle<E, P>,
    config: LoopConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> LoopSummary
where
    E: CommandExecutor,
    P: MessagePrompt,
{
    let mut tracker = ChangeTracker::new(config.coalesce);
    let mut ticker = tokio::time::interval(config.commit_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_report = None;

    info!(interval_secs = config.commit_interval.as_secs(), "commit loop started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                info!("commit loop shutting down");
                break;
            }

            maybe_event = events.recv() => {
                match maybe_event {
                    Some(event) => {
                        tracker.observe(&event);
                    }
                    None => {
                        warn!("watcher event channel closed, commit loop exiting");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if !tracker.begin_cycle() {
                    continue;
                }

                let report = tokio::select! {
                    biased;

                    _ = shutdown.recv() => {
                        info!("shutdown requested during commit cycle, abandoning it");
                        break;
                    }

                    report = cycle.run() => report,
                };

                tracker.finish_cycle();
                ticker.reset();
                debug!(cycles = tracker.cycles_started(), "commit loop idle");
                last_report = Some(report);
            }
        }
    }

    LoopSummary {
        cycles_started: tracker.cycles_started(),
        last_report,
        pending_changes: tracker.is_dirty(),
    }
}

/// Start the watcher and run the commit loop until Ctrl-C.
pub async fn run(config: AutoCommitConfig) -> Result<()> {
    config.log_banner();

    if !config.project_path.is_dir() {
        warn!(path = %config.project_path.display(), "project path is not a directory, git calls will fail");
    }

    let (watcher, events) = FileWatcher::start(&config.watch_path, config.watch_events)
        .context("failed to start file watcher")?;

    let cycle = CommitCycle::new(
        GitWorker::new(&config.project_path),
        StdinPrompt::stdin(config.prompt_timeout),
        CycleSettings::from(&config),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for Ctrl-C");
            return;
        }
        let _ = shutdown_tx.send(());
    });

    info!(root = %watcher.root().display(), "Waiting for manual exit (Ctrl-C)...");
    let summary = run_commit_loop(events, cycle, LoopConfig::from(&config), shutdown_rx).await;
    drop(watcher);

    if summary.pending_changes {
        warn!("stopping with uncommitted changes");
    }
    info!(cycles = summary.cycles_started, "autocommit stopped");
    Ok(())
}
