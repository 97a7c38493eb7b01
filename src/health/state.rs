//! Backend health state.
//!
//! # States
//! - Unknown: no probe has completed yet (treated as down)
//! - Up: last probe returned a status below 300
//! - Down: last probe failed or returned 300+
//!
//! # Design Decisions
//! - Status and transition time live in one immutable snapshot that is
//!   swapped atomically, so readers never observe a torn pair and never block
//! - `since` moves only when `is_down` flips

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backend status as last observed by the health monitor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Unknown = 0,
    Up = 1,
    Down = 2,
}

impl BackendStatus {
    pub fn from_is_down(is_down: bool) -> Self {
        if is_down {
            BackendStatus::Down
        } else {
            BackendStatus::Up
        }
    }

    pub fn is_down(self) -> bool {
        self != BackendStatus::Up
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendStatus::Unknown => "unknown",
            BackendStatus::Up => "up",
            BackendStatus::Down => "down",
        }
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consistent view of the health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub status: BackendStatus,
    /// When `is_down` last changed (or when the state was created).
    pub since: Instant,
}

impl HealthSnapshot {
    pub fn is_down(&self) -> bool {
        self.status.is_down()
    }

    /// Time spent in the current up/down state.
    pub fn elapsed(&self) -> Duration {
        self.since.elapsed()
    }
}

/// Shared record of whether the backend is reachable.
#[derive(Debug)]
pub struct HealthState {
    current: ArcSwap<HealthSnapshot>,
}

impl HealthState {
    /// Create a new state in `Unknown`, stamped with the current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(at: Instant) -> Self {
        Self {
            current: ArcSwap::from_pointee(HealthSnapshot {
                status: BackendStatus::Unknown,
                since: at,
            }),
        }
    }

    /// Read the current status and transition time.
    pub fn read(&self) -> HealthSnapshot {
        **self.current.load()
    }

    pub fn is_down(&self) -> bool {
        self.current.load().is_down()
    }

    /// Record an observation.
    ///
    /// Returns `true` when `is_down` flipped and `since` was moved to `at`.
    /// Leaving `Unknown` for `Down` records the status but keeps `since`.
    pub fn transition_to(&self, is_down: bool, at: Instant) -> bool {
        let next = BackendStatus::from_is_down(is_down);
        let mut flipped = false;

        self.current.rcu(|prev| {
            flipped = prev.is_down() != is_down;
            if flipped {
                Arc::new(HealthSnapshot { status: next, since: at })
            } else if prev.status != next {
                Arc::new(HealthSnapshot { status: next, since: prev.since })
            } else {
                Arc::clone(prev)
            }
        });

        flipped
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unknown_and_down() {
        let t0 = Instant::now();
        let state = HealthState::starting_at(t0);
        let snap = state.read();
        assert_eq!(snap.status, BackendStatus::Unknown);
        assert!(snap.is_down());
        assert_eq!(snap.since, t0);
    }

    #[test]
    fn test_since_moves_only_on_flip() {
        let t0 = Instant::now();
        let state = HealthState::starting_at(t0);
        let t = |ms| t0 + Duration::from_millis(ms);

        // Unknown -> Down keeps `since`
        assert!(!state.transition_to(true, t(1)));
        assert_eq!(state.read(), HealthSnapshot { status: BackendStatus::Down, since: t0 });

        assert!(state.transition_to(false, t(2)));
        assert_eq!(state.read(), HealthSnapshot { status: BackendStatus::Up, since: t(2) });

        // repeated up is a no-op
        assert!(!state.transition_to(false, t(3)));
        assert_eq!(state.read().since, t(2));

        assert!(state.transition_to(true, t(4)));
        assert_eq!(state.read(), HealthSnapshot { status: BackendStatus::Down, since: t(4) });
    }

    #[test]
    fn test_tracks_latest_observation_for_any_sequence() {
        let t0 = Instant::now();
        let observations = [true, true, false, true, false, false, false, true, true, false];
        let state = HealthState::starting_at(t0);

        let mut expected_since = t0;
        let mut last_is_down = true;
        for (i, &obs) in observations.iter().enumerate() {
            let at = t0 + Duration::from_secs(i as u64 + 1);
            let flipped = state.transition_to(obs, at);
            assert_eq!(flipped, obs != last_is_down);
            if flipped {
                expected_since = at;
            }
            last_is_down = obs;

            let snap = state.read();
            assert_eq!(snap.is_down(), obs);
            assert_eq!(snap.since, expected_since);
        }
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots() {
        let start = Instant::now();
        let state = Arc::new(HealthState::starting_at(start));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let snap = state.read();
                        assert!(snap.since >= start);
                        if snap.status == BackendStatus::Unknown {
                            assert_eq!(snap.since, start);
                        }
                    }
                })
            })
            .collect();

        for i in 0..1_000u64 {
            state.transition_to(i % 2 == 0, Instant::now());
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
