// Change tracker for the commit loop.
//
// Collapses any number of filesystem events into a single dirty flag and
// tracks whether a commit cycle is running. Events observed while a cycle is
// in flight (or shortly after it ends) are the tool's own git writes and are
// discarded instead of re-arming the flag.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use super::RawFsEvent;

/// Default window after a cycle during which late events are still discarded.
const DEFAULT_FEEDBACK_GRACE_MS: u64 = 250;

/// Commit loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Timer running, events accepted.
    Idle,
    /// Cycle running: ticks are not serviced and events are discarded.
    Committing,
}

#[derive(Debug, Clone)]
pub struct CoalesceConfig {
    pub feedback_grace: Duration,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self { feedback_grace: Duration::from_millis(DEFAULT_FEEDBACK_GRACE_MS) }
    }
}

/// Dirty flag plus the Idle/Committing state machine.
///
/// Call `observe()` for each dequeued event, `begin_cycle()` on every timer
/// tick, and `finish_cycle()` once the git operations are done.
#[derive(Debug)]
pub struct ChangeTracker {
    config: CoalesceConfig,
    dirty: bool,
    state: CycleState,
    cycle_started_at: Option<Instant>,
    suppress_until: Option<Instant>,
    cycles_started: u64,
}

impl ChangeTracker {
    pub fn new(config: CoalesceConfig) -> Self {
        Self {
            config,
            dirty: false,
            state: CycleState::Idle,
            cycle_started_at: None,
            suppress_until: None,
            cycles_started: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Total number of cycles entered since startup.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    /// Record a filesystem event. Returns true if it marked the tree dirty.
    pub fn observe(&mut self, event: &RawFsEvent) -> bool {
        if self.is_suppressed(event) {
            trace!(path = %event.path.display(), "suppressing event raised during commit cycle");
            return false;
        }

        info!("{}", event.describe());
        self.dirty = true;
        true
    }

    /// Timer tick. Returns true (and enters `Committing`) only when dirty.
    /// Clears the dirty flag on entry.
    pub fn begin_cycle(&mut self) -> bool {
        self.begin_cycle_at(Instant::now())
    }

    fn begin_cycle_at(&mut self, now: Instant) -> bool {
        if self.state == CycleState::Committing {
            debug!("tick ignored, commit cycle already running");
            return false;
        }
        if !self.dirty {
            trace!("tick: no changes");
            return false;
        }

        self.state = CycleState::Committing;
        self.dirty = false;
        self.cycle_started_at = Some(now);
        self.cycles_started += 1;
        true
    }

    /// Return to `Idle`, whatever the outcome of the cycle.
    pub fn finish_cycle(&mut self) {
        self.finish_cycle_at(Instant::now());
    }

    fn finish_cycle_at(&mut self, now: Instant) {
        self.state = CycleState::Idle;
        self.suppress_until = Some(now + self.config.feedback_grace);
    }

    fn is_suppressed(&self, event: &RawFsEvent) -> bool {
        if self.state == CycleState::Committing {
            return true;
        }
        // Dequeued after the cycle, but raised while it was running.
        match (self.cycle_started_at, self.suppress_until) {
            (Some(start), Some(until)) => event.observed_at >= start && event.observed_at < until,
            _ => false,
        }
    }
}
