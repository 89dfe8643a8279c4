//! Quota cooldown window
//!
//! When the quota runs out the loop suspends until the reported reset time.
//! The coordinator only tracks the window; the loop polls it, so pause and
//! resume stay responsive while suspended.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// An active suspension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindow {
    pub reset_time: DateTime<Utc>,
    pub entered_at: DateTime<Utc>,
}

/// Result of polling the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownPoll {
    /// No cooldown in effect
    Idle,
    /// Still suspended
    Waiting { remaining: Duration },
    /// The window just ended. Reported once per window.
    Resumed,
}

const DEFAULT_STALE_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CooldownCoordinator {
    window: Option<CooldownWindow>,
    last_probe: Option<DateTime<Utc>>,
    /// Wait applied when the reported reset time is not in the future
    stale_wait: Duration,
}

impl Default for CooldownCoordinator {
    fn default() -> Self {
        Self::with_stale_wait(DEFAULT_STALE_WAIT)
    }
}

impl CooldownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_wait(stale_wait: Duration) -> Self {
        Self {
            window: None,
            last_probe: None,
            stale_wait,
        }
    }

    pub fn is_active(&self) -> bool {
        self.window.is_some()
    }

    pub fn window(&self) -> Option<CooldownWindow> {
        self.window
    }

    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        self.window.map(|w| w.reset_time)
    }

    /// Begin suspension until `reset_time`
    ///
    /// A reset time at or before `now` (server or clock drift) is pushed out
    /// to `now + stale_wait`, so an exhausted quota is not re-checked every
    /// poll. Returns `false` if a window was already active; the existing
    /// window keeps its original reset time.
    pub fn enter(&mut self, reset_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.window.is_some() {
            return false;
        }
        let reset_time = if reset_time <= now {
            now + chrono::Duration::from_std(self.stale_wait)
                .unwrap_or_else(|_| chrono::Duration::seconds(30))
        } else {
            reset_time
        };
        self.window = Some(CooldownWindow {
            reset_time,
            entered_at: now,
        });
        self.last_probe = Some(now);
        true
    }

    /// Advance the window against `now`
    pub fn poll(&mut self, now: DateTime<Utc>) -> CooldownPoll {
        match self.window {
            None => CooldownPoll::Idle,
            Some(window) if now >= window.reset_time => {
                self.clear();
                CooldownPoll::Resumed
            }
            Some(window) => CooldownPoll::Waiting {
                remaining: (window.reset_time - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO),
            },
        }
    }

    /// Drop the window if its reset time has passed
    ///
    /// Returns `true` if a window ended.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        matches!(self.poll(now), CooldownPoll::Resumed)
    }

    /// End the window early because the service reported quota available
    ///
    /// Returns `true` if a window was active.
    pub fn confirm_available(&mut self) -> bool {
        let was_active = self.window.is_some();
        self.clear();
        was_active
    }

    /// Whether it is time to ask the service again whether the cooldown holds
    ///
    /// Marks the probe as taken when it returns `true`.
    pub fn probe_due(&mut self, now: DateTime<Utc>, interval: Duration) -> bool {
        if self.window.is_none() {
            return false;
        }
        let interval =
            chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
        let due = self.last_probe.map_or(true, |last| now - last >= interval);
        if due {
            self.last_probe = Some(now);
        }
        due
    }

    fn clear(&mut self) {
        self.window = None;
        self.last_probe = None;
    }
}
