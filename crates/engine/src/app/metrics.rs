use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

/// Lifetime totals read from the streaming core once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingSample {
    pub zone_loads: u64,
    pub evictions: u64,
    pub disposed_resources: u64,
    pub loaded_zones: usize,
    pub cached_resources: usize,
}

/// Per-interval view: rates and deltas over the last interval, gauges as of
/// its end.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamingMetricsSnapshot {
    pub tps: f32,
    pub zone_loads: u64,
    pub evictions: u64,
    pub reclaimed: u64,
    pub loaded_zones: usize,
    pub cached_resources: usize,
}

#[derive(Clone, Debug)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<StreamingMetricsSnapshot>>,
}

impl Default for MetricsHandle {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(StreamingMetricsSnapshot::default())),
        }
    }
}

impl MetricsHandle {
    pub fn snapshot(&self) -> StreamingMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: StreamingMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Duration,
    interval: Duration,
    ticks: u32,
    baseline: StreamingSample,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, baseline: StreamingSample) -> Self {
        Self {
            interval_start: Duration::ZERO,
            interval,
            ticks: 0,
            baseline,
        }
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// `now` is loop time since start.
    pub(crate) fn maybe_snapshot(
        &mut self,
        now: Duration,
        sample: StreamingSample,
    ) -> Option<StreamingMetricsSnapshot> {
        let elapsed = now.saturating_sub(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let snapshot = StreamingMetricsSnapshot {
            tps: self.ticks as f32 / elapsed_seconds,
            zone_loads: sample.zone_loads.saturating_sub(self.baseline.zone_loads),
            evictions: sample.evictions.saturating_sub(self.baseline.evictions),
            reclaimed: sample
                .disposed_resources
                .saturating_sub(self.baseline.disposed_resources),
            loaded_zones: sample.loaded_zones,
            cached_resources: sample.cached_resources,
        };

        self.interval_start = now;
        self.ticks = 0;
        self.baseline = sample;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock;
    use std::thread;

    use super::*;

    fn poison_lock(lock: &RwLock<StreamingMetricsSnapshot>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });
    }

    #[test]
    fn snapshot_reports_rates_and_interval_deltas() {
        let mut accumulator = MetricsAccumulator::new(
            Duration::from_secs(1),
            StreamingSample {
                zone_loads: 1,
                ..StreamingSample::default()
            },
        );
        for _ in 0..60 {
            accumulator.record_tick();
        }

        let snapshot = accumulator
            .maybe_snapshot(
                Duration::from_secs(1),
                StreamingSample {
                    zone_loads: 3,
                    evictions: 1,
                    disposed_resources: 4,
                    loaded_zones: 2,
                    cached_resources: 9,
                },
            )
            .expect("snapshot should be emitted");

        assert!((snapshot.tps - 60.0).abs() < 0.05);
        assert_eq!(snapshot.zone_loads, 2);
        assert_eq!(snapshot.evictions, 1);
        assert_eq!(snapshot.reclaimed, 4);
        assert_eq!(snapshot.loaded_zones, 2);
        assert_eq!(snapshot.cached_resources, 9);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), StreamingSample::default());
        accumulator.record_tick();

        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(500), StreamingSample::default())
            .is_none());
    }

    #[test]
    fn deltas_restart_after_each_snapshot() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), StreamingSample::default());
        let sample = StreamingSample {
            zone_loads: 2,
            ..StreamingSample::default()
        };
        accumulator.maybe_snapshot(Duration::from_secs(1), sample);
        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(2), sample)
            .expect("second snapshot");
        assert_eq!(snapshot.zone_loads, 0);
    }

    #[test]
    fn snapshot_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        let snapshot = handle.snapshot();
        assert_eq!(snapshot, StreamingMetricsSnapshot::default());
    }

    #[test]
    fn publish_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        let expected = StreamingMetricsSnapshot {
            tps: 60.0,
            zone_loads: 1,
            evictions: 0,
            reclaimed: 3,
            loaded_zones: 1,
            cached_resources: 7,
        };
        handle.publish(expected);

        assert_eq!(handle.snapshot(), expected);
    }
}
