//! Latency samples for slow eviction events.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;

/// Samples kept per event.
pub const LATENCY_HISTORY_LEN: usize = 160;

/// Event name for a whole eviction cycle.
pub const EVENT_EVICTION_CYCLE: &str = "eviction-cycle";

/// Event name for a single eviction delete.
pub const EVENT_EVICTION_DEL: &str = "eviction-del";

#[derive(Debug, Default)]
struct LatencySeries {
    samples: VecDeque<u64>,
    max: u64,
}

/// Records events that took at least `threshold_ms`.
///
/// A threshold of 0 disables recording entirely.
#[derive(Debug)]
pub struct LatencyMonitor {
    threshold_ms: u64,
    series: Mutex<HashMap<&'static str, LatencySeries>>,
}

impl LatencyMonitor {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold_ms,
            series: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.threshold_ms > 0
    }

    /// Record `elapsed` for `event` if it reaches the threshold.
    pub fn add_sample_if_needed(&self, event: &'static str, elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        let ms = elapsed.as_millis() as u64;
        if ms < self.threshold_ms {
            return;
        }

        let mut series = self.series.lock();
        let ts = series.entry(event).or_default();
        if ts.samples.len() == LATENCY_HISTORY_LEN {
            ts.samples.pop_front();
        }
        ts.samples.push_back(ms);
        ts.max = ts.max.max(ms);
    }

    /// Most recent sample of `event`, in milliseconds.
    pub fn latest(&self, event: &str) -> Option<u64> {
        self.series.lock().get(event)?.samples.back().copied()
    }

    /// Largest sample of `event` since the last reset.
    pub fn max(&self, event: &str) -> Option<u64> {
        self.series.lock().get(event).map(|ts| ts.max)
    }

    /// All retained samples of `event`, oldest first.
    pub fn history(&self, event: &str) -> Vec<u64> {
        self.series
            .lock()
            .get(event)
            .map(|ts| ts.samples.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        self.series.lock().clear();
    }
}
