use std::time::Duration;

use tracing::{info, warn};

use super::metrics::{MetricsAccumulator, StreamingSample};
use super::MetricsHandle;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// The simulation driven by [`run_fixed_step`].
pub trait TickHandler {
    fn tick(&mut self, fixed_dt: Duration) -> TickControl;

    fn streaming_sample(&self) -> StreamingSample {
        StreamingSample::default()
    }

    fn shutdown(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub ticks: u64,
    pub simulated: Duration,
    pub dropped_backlog: Duration,
    pub stopped_by_handler: bool,
}

/// Feeds frame deltas through an accumulator and runs whole fixed steps,
/// capping the ticks per frame and dropping backlog beyond the cap. Stops
/// when the frames run out or the handler asks to.
pub fn run_fixed_step<H, I>(
    config: &LoopConfig,
    frames: I,
    handler: &mut H,
    metrics_handle: &MetricsHandle,
) -> LoopSummary
where
    H: TickHandler + ?Sized,
    I: IntoIterator<Item = Duration>,
{
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    let mut summary = LoopSummary::default();
    let mut accumulator = Duration::ZERO;
    let mut clock = Duration::ZERO;
    let mut metrics_accumulator =
        MetricsAccumulator::new(metrics_log_interval, handler.streaming_sample());

    'frames: for raw_frame_dt in frames {
        summary.frames = summary.frames.saturating_add(1);
        let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
        clock = clock.saturating_add(clamped_frame_dt);
        accumulator = accumulator.saturating_add(clamped_frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        accumulator = step_plan.remaining_accumulator;
        if step_plan.dropped_backlog > Duration::ZERO {
            summary.dropped_backlog = summary
                .dropped_backlog
                .saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        for _ in 0..step_plan.ticks_to_run {
            let control = handler.tick(fixed_dt);
            summary.ticks = summary.ticks.saturating_add(1);
            summary.simulated = summary.simulated.saturating_add(fixed_dt);
            metrics_accumulator.record_tick();
            if control == TickControl::Stop {
                summary.stopped_by_handler = true;
                break 'frames;
            }
        }

        let sample = handler.streaming_sample();
        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(clock, sample) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                zone_loads = snapshot.zone_loads,
                evictions = snapshot.evictions,
                reclaimed = snapshot.reclaimed,
                loaded_zones = snapshot.loaded_zones,
                cached_resources = snapshot.cached_resources,
                "streaming_metrics"
            );
        }
    }

    handler.shutdown();
    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        simulated_ms = summary.simulated.as_millis() as u64,
        stopped_by_handler = summary.stopped_by_handler,
        "shutdown"
    );
    summary
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler {
        ticks: u32,
        stop_after: Option<u32>,
        shut_down: bool,
    }

    impl TickHandler for CountingHandler {
        fn tick(&mut self, _fixed_dt: Duration) -> TickControl {
            self.ticks += 1;
            match self.stop_after {
                Some(limit) if self.ticks >= limit => TickControl::Stop,
                _ => TickControl::Continue,
            }
        }

        fn streaming_sample(&self) -> StreamingSample {
            StreamingSample {
                zone_loads: u64::from(self.ticks),
                ..StreamingSample::default()
            }
        }

        fn shutdown(&mut self) {
            self.shut_down = true;
        }
    }

    fn config() -> LoopConfig {
        LoopConfig {
            target_tps: 50,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_durations_fall_back() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn frames_drive_whole_ticks_and_shutdown_runs() {
        let mut handler = CountingHandler {
            ticks: 0,
            stop_after: None,
            shut_down: false,
        };
        let frames = std::iter::repeat(Duration::from_millis(20)).take(100);
        let summary = run_fixed_step(&config(), frames, &mut handler, &MetricsHandle::default());

        assert_eq!(summary.frames, 100);
        assert_eq!(summary.ticks, 100);
        assert_eq!(handler.ticks, 100);
        assert!(handler.shut_down);
        assert!(!summary.stopped_by_handler);
    }

    #[test]
    fn handler_can_stop_the_loop() {
        let mut handler = CountingHandler {
            ticks: 0,
            stop_after: Some(7),
            shut_down: false,
        };
        let frames = std::iter::repeat(Duration::from_millis(20));
        let summary = run_fixed_step(&config(), frames, &mut handler, &MetricsHandle::default());

        assert!(summary.stopped_by_handler);
        assert_eq!(summary.ticks, 7);
        assert!(handler.shut_down);
    }

    #[test]
    fn metrics_are_published_each_interval() {
        let mut handler = CountingHandler {
            ticks: 0,
            stop_after: None,
            shut_down: false,
        };
        let metrics = MetricsHandle::default();
        let frames = std::iter::repeat(Duration::from_millis(20)).take(50);
        run_fixed_step(&config(), frames, &mut handler, &metrics);

        let snapshot = metrics.snapshot();
        assert!((snapshot.tps - 50.0).abs() < 0.5);
        assert_eq!(snapshot.zone_loads, 50);
    }
}
