// Copyright 2025 The Skein Authors
// SPDX-License-Identifier: AGPL-3.0-only

//! Soft-state health tracking for disks and data nodes.
//!
//! Every resource in the cluster map owns a [`HealthTracker`]. The storage I/O
//! path reports failures through [`HealthTracker::report_error`]; routing logic
//! reads [`HealthTracker::state`] before dispatching to the resource.
//!
//! # Algorithm
//!
//! Errors are counted inside a window that opens with the first error. An
//! error arriving after the window has expired opens a fresh window. Once the
//! count exceeds the threshold the resource is soft-down until the retry
//! backoff has elapsed since the last error, after which it reads as
//! available again without any explicit reset. The next error after such a
//! recovery opens a fresh window, so a recovered resource does not re-trip on
//! a single error.
//!
//! # Concurrency
//!
//! The tracker is three independent atomics. Reporters never block each other
//! or readers. A window reset is claimed by a compare-and-swap on the window
//! start so only one of several racing reporters performs it; the others count
//! into the new window. The last-error timestamp is published before the
//! count, so a reader that observes an over-threshold count also observes a
//! last-error time at least as recent as the error that pushed it over.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use skein_clustermap::health::{
//!     HardwareState, HealthPolicy, HealthTracker, ManualClock, ResourceKind,
//! };
//!
//! let clock = Arc::new(ManualClock::new());
//! let policy = HealthPolicy::new(Duration::from_secs(2), 1, Duration::from_secs(10));
//! let tracker = HealthTracker::new(ResourceKind::Disk, "/mnt1", policy, clock.clone());
//!
//! tracker.report_error();
//! tracker.report_error();
//! assert_eq!(tracker.state(false), HardwareState::Unavailable);
//!
//! clock.advance(Duration::from_secs(10));
//! assert_eq!(tracker.state(false), HardwareState::Available);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use serde::{Deserialize, Serialize};
use skein_core::{ClusterMapConfig, HealthPolicyConfig};
use tracing::{debug, warn};

/// Availability of a disk or data node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HardwareState {
    /// The resource may be used.
    #[default]
    Available,
    /// The resource must not be used.
    Unavailable,
}

impl HardwareState {
    /// Returns the external name of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Unavailable => "UNAVAILABLE",
        }
    }

    /// Returns true if the state is [`HardwareState::Available`].
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for HardwareState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Kind of resource a tracker belongs to, used to label logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A disk mounted on a data node.
    Disk,
    /// A data node.
    Node,
}

impl ResourceKind {
    /// Returns the label value for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Node => "node",
        }
    }
}

/// Monotonic millisecond time source.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds elapsed since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
}

/// Clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Clock that only moves when told to.
///
/// Intended for tests and simulations that need to step through windows and
/// backoffs without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now_ms.fetch_add(by, Ordering::AcqRel);
    }

    /// Sets the clock to an absolute reading. May move backwards.
    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Acquire)
    }
}

/// Soft-state parameters of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Span within which errors are counted together.
    pub window: Duration,
    /// Errors tolerated within one window.
    pub error_threshold: u32,
    /// Quiet time after the last error before a soft-down resource recovers.
    pub retry_backoff: Duration,
}

impl HealthPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(window: Duration, error_threshold: u32, retry_backoff: Duration) -> Self {
        Self { window, error_threshold, retry_backoff }
    }

    fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }

    fn retry_backoff_ms(&self) -> u64 {
        u64::try_from(self.retry_backoff.as_millis()).unwrap_or(u64::MAX)
    }
}

impl From<&HealthPolicyConfig> for HealthPolicy {
    fn from(config: &HealthPolicyConfig) -> Self {
        Self::new(config.window(), config.error_threshold, config.retry_backoff())
    }
}

impl From<HealthPolicyConfig> for HealthPolicy {
    fn from(config: HealthPolicyConfig) -> Self {
        Self::from(&config)
    }
}

/// Policies and time source handed to every resource built for a cluster map.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Policy for disk trackers.
    pub disk: HealthPolicy,
    /// Policy for data node trackers.
    pub node: HealthPolicy,
    /// Clock shared by all trackers.
    pub clock: Arc<dyn Clock>,
}

impl HealthSettings {
    /// Builds settings from configuration, using a [`MonotonicClock`].
    #[must_use]
    pub fn from_config(config: &ClusterMapConfig) -> Self {
        Self {
            disk: HealthPolicy::from(&config.disk),
            node: HealthPolicy::from(&config.node),
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a disk tracker.
    #[must_use]
    pub fn disk_tracker(&self, resource: impl Into<String>) -> HealthTracker {
        HealthTracker::new(ResourceKind::Disk, resource, self.disk, Arc::clone(&self.clock))
    }

    /// Creates a data node tracker.
    #[must_use]
    pub fn node_tracker(&self, resource: impl Into<String>) -> HealthTracker {
        HealthTracker::new(ResourceKind::Node, resource, self.node, Arc::clone(&self.clock))
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self::from_config(&ClusterMapConfig::default())
    }
}

/// Windowed error counter with retry backoff for one resource.
pub struct HealthTracker {
    kind: ResourceKind,
    resource: String,
    policy: HealthPolicy,
    clock: Arc<dyn Clock>,
    /// Errors counted in the current window.
    error_count: AtomicU32,
    /// Clock reading of the first error in the current window.
    window_start_ms: AtomicU64,
    /// Clock reading of the most recent error.
    last_error_ms: AtomicU64,
}

impl HealthTracker {
    /// Creates a tracker with no recorded errors.
    pub fn new(
        kind: ResourceKind,
        resource: impl Into<String>,
        policy: HealthPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            kind,
            resource: resource.into(),
            policy,
            clock,
            error_count: AtomicU32::new(0),
            window_start_ms: AtomicU64::new(0),
            last_error_ms: AtomicU64::new(0),
        }
    }

    /// Records one I/O failure against the resource.
    pub fn report_error(&self) {
        let now = self.clock.now_ms();
        let count = self.error_count.load(Ordering::Acquire);
        let last_error = self.last_error_ms.load(Ordering::Acquire);
        let window_start = self.window_start_ms.load(Ordering::Acquire);

        let recovered = self.backoff_expired(count, last_error, now);
        let window_expired = elapsed_ms(window_start, now) > self.policy.window_ms();
        let fresh_window = count == 0 || recovered || window_expired;

        self.last_error_ms.fetch_max(now, Ordering::AcqRel);

        let new_count = if fresh_window
            && self
                .window_start_ms
                .compare_exchange(window_start, now, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.error_count.store(1, Ordering::Release);
            if count > 0 {
                debug!(
                    kind = self.kind.as_str(),
                    resource = %self.resource,
                    previous_errors = count,
                    recovered,
                    "Opened new error window"
                );
            }
            1
        } else {
            self.error_count.fetch_add(1, Ordering::AcqRel).saturating_add(1)
        };

        counter!("skein_clustermap_resource_errors_total", "kind" => self.kind.as_str())
            .increment(1);

        if new_count == self.policy.error_threshold.saturating_add(1) {
            warn!(
                kind = self.kind.as_str(),
                resource = %self.resource,
                errors = new_count,
                backoff_ms = self.policy.retry_backoff_ms(),
                "Resource exceeded error threshold, marking soft-down"
            );
        }
    }

    /// Derives the current state. `hard_down` is the administrator flag of the
    /// owning resource and wins over any soft state.
    #[must_use]
    pub fn state(&self, hard_down: bool) -> HardwareState {
        if hard_down || self.is_soft_down() {
            HardwareState::Unavailable
        } else {
            HardwareState::Available
        }
    }

    /// Returns true if recent errors make the resource unusable.
    #[must_use]
    pub fn is_soft_down(&self) -> bool {
        let count = self.error_count.load(Ordering::Acquire);
        if count <= self.policy.error_threshold {
            return false;
        }
        let last_error = self.last_error_ms.load(Ordering::Acquire);
        !self.backoff_expired(count, last_error, self.clock.now_ms())
    }

    /// Errors counted in the current window.
    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Acquire)
    }

    /// Clock reading of the most recent error, if any error was reported.
    #[must_use]
    pub fn last_error_ms(&self) -> Option<u64> {
        if self.error_count() == 0 {
            None
        } else {
            Some(self.last_error_ms.load(Ordering::Acquire))
        }
    }

    /// The policy this tracker applies.
    #[must_use]
    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Kind of the tracked resource.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn backoff_expired(&self, count: u32, last_error_ms: u64, now: u64) -> bool {
        count > self.policy.error_threshold
            && elapsed_ms(last_error_ms, now) >= self.policy.retry_backoff_ms()
    }
}

impl fmt::Debug for HealthTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthTracker")
            .field("kind", &self.kind)
            .field("resource", &self.resource)
            .field("policy", &self.policy)
            .field("error_count", &self.error_count())
            .finish_non_exhaustive()
    }
}

/// Elapsed time between two readings, clamped to zero when `then` is ahead.
fn elapsed_ms(then: u64, now: u64) -> u64 {
    now.saturating_sub(then)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const WINDOW: Duration = Duration::from_millis(1_000);
    const BACKOFF: Duration = Duration::from_millis(5_000);

    fn tracker(threshold: u32) -> (HealthTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = HealthPolicy::new(WINDOW, threshold, BACKOFF);
        let tracker = HealthTracker::new(ResourceKind::Disk, "/mnt1", policy, clock.clone());
        (tracker, clock)
    }

    #[test]
    fn test_new_tracker_is_available() {
        let (tracker, _) = tracker(3);
        assert_eq!(tracker.state(false), HardwareState::Available);
        assert_eq!(tracker.error_count(), 0);
        assert!(tracker.last_error_ms().is_none());
    }

    #[test]
    fn test_threshold_plus_one_errors_trip() {
        for threshold in 0..6 {
            let (tracker, _) = tracker(threshold);
            for _ in 0..threshold {
                tracker.report_error();
            }
            assert_eq!(tracker.state(false), HardwareState::Available, "threshold {threshold}");
            tracker.report_error();
            assert_eq!(tracker.state(false), HardwareState::Unavailable, "threshold {threshold}");
        }
    }

    #[test]
    fn test_zero_threshold_trips_on_single_error() {
        let (tracker, _) = tracker(0);
        tracker.report_error();
        assert!(tracker.is_soft_down());
    }

    #[test]
    fn test_recovers_after_backoff_without_reset() {
        let (tracker, clock) = tracker(2);
        for _ in 0..3 {
            tracker.report_error();
        }
        assert_eq!(tracker.state(false), HardwareState::Unavailable);

        clock.advance(BACKOFF - Duration::from_millis(1));
        assert_eq!(tracker.state(false), HardwareState::Unavailable);

        clock.advance(Duration::from_millis(1));
        assert_eq!(tracker.state(false), HardwareState::Available);
    }

    #[test]
    fn test_error_after_recovery_starts_fresh_window() {
        let (tracker, clock) = tracker(2);
        for _ in 0..3 {
            tracker.report_error();
        }
        clock.advance(BACKOFF);
        assert_eq!(tracker.state(false), HardwareState::Available);

        tracker.report_error();
        assert_eq!(tracker.error_count(), 1);
        assert_eq!(tracker.state(false), HardwareState::Available);
    }

    #[test]
    fn test_recovery_applies_even_if_never_observed() {
        let (tracker, clock) = tracker(1);
        tracker.report_error();
        tracker.report_error();
        // Nobody reads the state while the backoff runs out.
        clock.advance(BACKOFF + Duration::from_millis(1));
        tracker.report_error();
        assert_eq!(tracker.error_count(), 1);
        assert_eq!(tracker.state(false), HardwareState::Available);
    }

    #[test]
    fn test_errors_spread_over_windows_never_trip() {
        let (tracker, clock) = tracker(2);
        for _ in 0..10 {
            assert_eq!(tracker.state(false), HardwareState::Available);
            tracker.report_error();
            clock.advance(WINDOW + Duration::from_millis(1));
        }
        assert_eq!(tracker.state(false), HardwareState::Available);
        assert_eq!(tracker.error_count(), 1);
    }

    #[test]
    fn test_error_exactly_at_window_edge_counts() {
        let (tracker, clock) = tracker(1);
        tracker.report_error();
        clock.advance(WINDOW);
        tracker.report_error();
        assert_eq!(tracker.error_count(), 2);
        assert!(tracker.is_soft_down());
    }

    #[test]
    fn test_hard_down_overrides_soft_state() {
        let (tracker, _) = tracker(5);
        assert_eq!(tracker.state(true), HardwareState::Unavailable);
        tracker.report_error();
        assert_eq!(tracker.state(true), HardwareState::Unavailable);
    }

    #[test]
    fn test_clearing_hard_down_keeps_soft_degradation() {
        let (tracker, _) = tracker(0);
        tracker.report_error();
        assert_eq!(tracker.state(true), HardwareState::Unavailable);
        assert_eq!(tracker.state(false), HardwareState::Unavailable);
    }

    #[test]
    fn test_backoff_shorter_than_window() {
        let clock = Arc::new(ManualClock::new());
        let policy = HealthPolicy::new(
            Duration::from_millis(10_000),
            0,
            Duration::from_millis(100),
        );
        let tracker = HealthTracker::new(ResourceKind::Node, "node-1:6667", policy, clock.clone());

        tracker.report_error();
        assert!(tracker.is_soft_down());
        clock.advance(Duration::from_millis(100));
        assert!(!tracker.is_soft_down());

        // Recovery opened a new window even though the old one had not expired.
        tracker.report_error();
        assert_eq!(tracker.error_count(), 1);
        assert!(tracker.is_soft_down());
    }

    #[test]
    fn test_clock_moving_backwards_is_clamped() {
        let (tracker, clock) = tracker(1);
        clock.set_ms(10_000);
        tracker.report_error();
        tracker.report_error();
        assert!(tracker.is_soft_down());

        clock.set_ms(5_000);
        assert!(tracker.is_soft_down());
        tracker.report_error();
        assert_eq!(tracker.last_error_ms(), Some(10_000));
        assert_eq!(tracker.error_count(), 3);
    }

    #[test]
    fn test_state_read_has_no_side_effects() {
        let (tracker, clock) = tracker(1);
        tracker.report_error();
        tracker.report_error();
        clock.advance(BACKOFF);
        for _ in 0..5 {
            assert_eq!(tracker.state(false), HardwareState::Available);
        }
        assert_eq!(tracker.error_count(), 2);
    }

    #[test]
    fn test_concurrent_reports_trip_resource() {
        let (tracker, _) = tracker(10);
        let tracker = Arc::new(tracker);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.report_error();
                        let _ = tracker.state(false);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(tracker.error_count() > 10);
        assert!(tracker.error_count() <= 800);
        assert_eq!(tracker.state(false), HardwareState::Unavailable);
    }

    #[test]
    fn test_concurrent_reports_across_window_reset_and_recovery() {
        use std::sync::atomic::AtomicBool;

        let (tracker, clock) = tracker(3);
        let backoff_ms = BACKOFF.as_millis() as u64;

        // Reporters race the clock across several window boundaries.
        let done = AtomicBool::new(false);
        thread::scope(|scope| {
            let reader = scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    if tracker.state(false) == HardwareState::Unavailable {
                        assert!(tracker.last_error_ms().is_some());
                    }
                }
            });
            let reporters: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        for _ in 0..200 {
                            tracker.report_error();
                        }
                    })
                })
                .collect();
            let ticker = scope.spawn(|| {
                for _ in 0..100 {
                    clock.advance(Duration::from_millis(50));
                    thread::yield_now();
                }
            });
            for reporter in reporters {
                reporter.join().unwrap();
            }
            ticker.join().unwrap();
            done.store(true, Ordering::Release);
            reader.join().unwrap();
        });

        for _ in 0..4 {
            tracker.report_error();
        }
        assert_eq!(tracker.state(false), HardwareState::Unavailable);
        let last_error = tracker.last_error_ms().unwrap();
        assert_eq!(last_error, clock.now_ms());

        // Readers race the clock past the backoff.
        let done = AtomicBool::new(false);
        thread::scope(|scope| {
            let readers: Vec<_> = (0..3)
                .map(|_| {
                    scope.spawn(|| {
                        while !done.load(Ordering::Acquire) {
                            let now = clock.now_ms();
                            let state = tracker.state(false);
                            if now >= last_error + backoff_ms {
                                assert_eq!(state, HardwareState::Available);
                            }
                        }
                    })
                })
                .collect();
            for _ in 0..60 {
                clock.advance(Duration::from_millis(100));
                thread::yield_now();
            }
            done.store(true, Ordering::Release);
            for reader in readers {
                reader.join().unwrap();
            }
        });
        assert_eq!(tracker.state(false), HardwareState::Available);

        // The first error after recovery opens a fresh window while readers poll.
        let done = AtomicBool::new(false);
        thread::scope(|scope| {
            let reader = scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let _ = tracker.state(false);
                }
            });
            scope.spawn(|| tracker.report_error()).join().unwrap();
            done.store(true, Ordering::Release);
            reader.join().unwrap();
        });

        assert_eq!(tracker.error_count(), 1);
        assert_eq!(tracker.last_error_ms(), Some(clock.now_ms()));
        assert_eq!(tracker.state(false), HardwareState::Available);
    }

    #[test]
    fn test_real_clock_scenario() {
        let threshold = 2;
        let window = Duration::from_millis(200);
        let backoff = Duration::from_millis(50);
        let policy = HealthPolicy::new(window, threshold, backoff);
        let tracker = HealthTracker::new(
            ResourceKind::Disk,
            "/mnt1",
            policy,
            Arc::new(MonotonicClock::new()),
        );

        for _ in 0..=threshold {
            assert_eq!(tracker.state(false), HardwareState::Available);
            tracker.report_error();
        }
        assert_eq!(tracker.state(false), HardwareState::Unavailable);

        thread::sleep(backoff + Duration::from_millis(1));
        assert_eq!(tracker.state(false), HardwareState::Available);

        for _ in 0..=threshold {
            assert_eq!(tracker.state(false), HardwareState::Available);
            tracker.report_error();
            thread::sleep(window + Duration::from_millis(1));
        }
        assert_eq!(tracker.state(false), HardwareState::Available);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = HealthPolicy::from(HealthPolicyConfig::disk());
        assert_eq!(policy.window, Duration::from_millis(2_000));
        assert_eq!(policy.error_threshold, 1);
        assert_eq!(policy.retry_backoff, Duration::from_millis(10_000));
    }

    #[test]
    fn test_hardware_state_serde() {
        let json = serde_json::to_string(&HardwareState::Unavailable).unwrap();
        assert_eq!(json, "\"UNAVAILABLE\"");
        let state: HardwareState = serde_json::from_str("\"AVAILABLE\"").unwrap();
        assert_eq!(state, HardwareState::Available);
    }
}
