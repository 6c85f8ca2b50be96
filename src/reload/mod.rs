//! Debounced, retrying reload protocol.
//!
//! ```text
//! Idle ──signal──▶ PendingReload ──deadline──▶ Verifying ──newer──▶ Reloading
//!   ▲                    ▲                         │                   │
//!   │                    └──────── locked, retries left ◀──────────────┤
//!   └──── stale / not newer / readable / retries exhausted ◀───────────┘
//! ```
//!
//! The coordinator owns no timer. The owner asks [`ReloadCoordinator::sleep_duration`]
//! how long to wait and then calls [`ReloadCoordinator::poll`] with the
//! current instant, which keeps the state machine deterministic under test.


use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cache::FileBinding;
use crate::fs::{FileStat, same_path};

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_RETRIES: u32 = 3;

/// Sleep used while no cycle is active.
const IDLE_SLEEP: Duration = Duration::from_secs(86400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    /// Waiting for the debounce deadline.
    PendingReload,
    /// Comparing modification times.
    Verifying,
    /// Probing whether the writer has released the file.
    Reloading,
}

impl ReloadState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PendingReload => "pending",
            Self::Verifying => "verifying",
            Self::Reloading => "reloading",
        }
    }
}

/// How a deadline expiry was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The file is newer and readable; the owner should reload it.
    FileChanged(PathBuf),
    /// Modification time did not advance (or could not be read).
    Unchanged,
    /// The cycle's path no longer matches the binding.
    Stale,
    /// Still locked; another attempt is scheduled.
    Retry { remaining: u32 },
    /// Still locked after the last attempt.
    Abandoned,
}

#[derive(Debug)]
pub struct ReloadCoordinator {
    state: ReloadState,
    retries: u32,
    deadline: Option<Instant>,
    cycle_path: Option<PathBuf>,
    debounce: Duration,
    max_retries: u32,
}

impl Default for ReloadCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS), DEFAULT_RETRIES)
    }
}

impl ReloadCoordinator {
    pub fn new(debounce: Duration, max_retries: u32) -> Self {
        let max_retries = max_retries.max(1);
        Self {
            state: ReloadState::Idle,
            retries: max_retries,
            deadline: None,
            cycle_path: None,
            debounce,
            max_retries,
        }
    }

    pub fn state(&self) -> ReloadState {
        self.state
    }

    /// Attempts left in the current (or last) cycle.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_active(&self) -> bool {
        self.state != ReloadState::Idle
    }

    fn transition(&mut self, next: ReloadState) {
        if self.state != next {
            crate::debug!("reload"; "{} -> {}", self.state.label(), next.label());
            self.state = next;
        }
    }

    fn reset(&mut self) {
        self.transition(ReloadState::Idle);
        self.deadline = None;
        self.cycle_path = None;
    }

    /// Record a possible external change to `path`.
    ///
    /// Starts a cycle when idle. During a cycle on the same path the
    /// deadline restarts and the retry counter is kept.
    pub fn signal(&mut self, path: &Path, now: Instant) {
        let same_cycle = self.is_active()
            && self
                .cycle_path
                .as_deref()
                .is_some_and(|current| same_path(current, path));

        if !same_cycle {
            self.retries = self.max_retries;
            self.cycle_path = Some(path.to_path_buf());
        }
        self.transition(ReloadState::PendingReload);
        self.deadline = Some(now + self.debounce);
    }

    /// Drop the active cycle, if any.
    pub fn cancel(&mut self) {
        if self.is_active() {
            crate::debug!("reload"; "cycle cancelled");
        }
        self.reset();
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.state == ReloadState::PendingReload && self.deadline.is_some_and(|d| d <= now)
    }

    /// Time until the next deadline.
    pub fn sleep_duration(&self, now: Instant) -> Duration {
        let Some(deadline) = self.deadline else {
            return IDLE_SLEEP;
        };
        deadline
            .saturating_duration_since(now)
            .max(Duration::from_millis(1))
    }

    /// Resolve an expired deadline against the current binding.
    ///
    /// Returns `None` when no deadline has expired.
    pub fn poll(
        &mut self,
        now: Instant,
        binding: Option<&FileBinding>,
        stat: &dyn FileStat,
    ) -> Option<CycleOutcome> {
        if !self.is_ready(now) {
            return None;
        }
        let path = self.cycle_path.clone()?;
        self.transition(ReloadState::Verifying);

        let Some(binding) = binding.filter(|b| same_path(&b.path, &path)) else {
            crate::debug!("reload"; "stale cycle for {}", path.display());
            self.reset();
            return Some(CycleOutcome::Stale);
        };

        match stat.modified(&path) {
            Ok(modified) if modified > binding.last_modified => {}
            _ => {
                self.reset();
                return Some(CycleOutcome::Unchanged);
            }
        }

        self.transition(ReloadState::Reloading);
        match stat.probe_shared_read(&path) {
            Ok(()) => {
                self.reset();
                Some(CycleOutcome::FileChanged(path))
            }
            Err(e) => {
                self.retries = self.retries.saturating_sub(1);
                if self.retries == 0 {
                    crate::debug!("reload"; "giving up on {}: {}", path.display(), e);
                    self.reset();
                    return Some(CycleOutcome::Abandoned);
                }
                crate::debug!(
                    "reload";
                    "{} still locked ({} left): {}",
                    path.display(),
                    self.retries,
                    e
                );
                self.transition(ReloadState::PendingReload);
                self.deadline = Some(now + self.debounce);
                Some(CycleOutcome::Retry {
                    remaining: self.retries,
                })
            }
        }
    }
}
