//! Per-thruster liveness tracking.
//!
//! The sample's `status` field flips immediately with the alive register
//! (no debounce); this tracker sits beside the pollers to count
//! consecutive failures and surface state transitions exactly once, for
//! logging and status output.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use t100_telemetry_common::telemetry::{LinkStatus, current_timestamp_millis};

/// Tracked state for one thruster.
#[derive(Debug, Clone)]
struct DeviceState {
    status: LinkStatus,
    last_seen: i64,
    consecutive_failures: u32,
}

/// Serializable per-device liveness information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLiveness {
    /// Thruster label.
    pub device: String,
    /// Current status.
    pub status: LinkStatus,
    /// Last successful poll timestamp (millis since epoch), 0 if never.
    pub last_seen: i64,
    /// Consecutive failed cycles.
    pub consecutive_failures: u32,
}

/// Tracks liveness across all configured thrusters.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    devices: HashMap<String, DeviceState>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one poll cycle.
    ///
    /// Returns the previous status when this cycle changed it, so the
    /// caller can log the transition exactly once.
    pub fn record(&mut self, device: &str, status: LinkStatus) -> Option<LinkStatus> {
        let state = self
            .devices
            .entry(device.to_string())
            .or_insert(DeviceState {
                status: LinkStatus::Disconnected,
                last_seen: 0,
                consecutive_failures: 0,
            });

        let previous = state.status;

        match status {
            LinkStatus::Connected => {
                state.last_seen = current_timestamp_millis();
                state.consecutive_failures = 0;
            }
            LinkStatus::Disconnected => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            }
        }
        state.status = status;

        (previous != status).then_some(previous)
    }

    /// Consecutive failed cycles for a device, 0 if unknown.
    pub fn consecutive_failures(&self, device: &str) -> u32 {
        self.devices
            .get(device)
            .map(|s| s.consecutive_failures)
            .unwrap_or(0)
    }

    /// Snapshot of all tracked devices, sorted by name.
    pub fn snapshot(&self) -> Vec<DeviceLiveness> {
        let mut entries: Vec<DeviceLiveness> = self
            .devices
            .iter()
            .map(|(device, state)| DeviceLiveness {
                device: device.clone(),
                status: state.status,
                last_seen: state.last_seen,
                consecutive_failures: state.consecutive_failures,
            })
            .collect();
        entries.sort_by(|a, b| a.device.cmp(&b.device));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_connect_is_a_transition() {
        let mut tracker = LivenessTracker::new();

        let transition = tracker.record("t0", LinkStatus::Connected);
        assert_eq!(transition, Some(LinkStatus::Disconnected));

        // Staying connected is not a transition.
        assert_eq!(tracker.record("t0", LinkStatus::Connected), None);
    }

    #[test]
    fn test_failure_counting() {
        let mut tracker = LivenessTracker::new();

        tracker.record("t0", LinkStatus::Connected);
        tracker.record("t0", LinkStatus::Disconnected);
        tracker.record("t0", LinkStatus::Disconnected);
        assert_eq!(tracker.consecutive_failures("t0"), 2);

        tracker.record("t0", LinkStatus::Connected);
        assert_eq!(tracker.consecutive_failures("t0"), 0);
    }

    #[test]
    fn test_transition_reported_once() {
        let mut tracker = LivenessTracker::new();

        tracker.record("t0", LinkStatus::Connected);
        assert_eq!(
            tracker.record("t0", LinkStatus::Disconnected),
            Some(LinkStatus::Connected)
        );
        assert_eq!(tracker.record("t0", LinkStatus::Disconnected), None);
    }

    #[test]
    fn test_snapshot_sorted() {
        let mut tracker = LivenessTracker::new();
        tracker.record("stbd", LinkStatus::Connected);
        tracker.record("port", LinkStatus::Disconnected);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].device, "port");
        assert_eq!(snapshot[0].consecutive_failures, 1);
        assert_eq!(snapshot[1].device, "stbd");
        assert!(snapshot[1].last_seen > 0);
    }
}
