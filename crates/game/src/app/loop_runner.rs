use std::collections::VecDeque;
use std::process::ExitCode;
use std::time::Duration;

use stellar_engine::app::{
    ConsoleCommandProcessor, DebugOverlay, OverlayData, StreamingSample,
};
use stellar_engine::zones::{ZoneDebugCommand, ZoneEvent};
use stellar_engine::{run_fixed_step, MetricsHandle, TickControl, TickHandler};
use tracing::{error, info, warn};

use super::bootstrap::{AppWiring, GameZoneManager};
use super::tour::TourStep;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        loop_config,
        frame_delta,
        mut manager,
        tour,
    } = app;

    if let Err(err) = manager.start() {
        error!(error = %err, "start_zone_incomplete");
    }

    let frame_ms = frame_delta.as_millis().max(1);
    let max_frames = (tour.max_duration().as_millis() / frame_ms) as usize;
    let metrics = MetricsHandle::default();
    let mut pilot = TourPilot::new(manager, tour.into_queue(), metrics.clone());

    let frames = std::iter::repeat(frame_delta).take(max_frames);
    let summary = run_fixed_step(&loop_config, frames, &mut pilot, &metrics);

    if !pilot.finished() {
        warn!(
            remaining_steps = pilot.remaining_steps(),
            simulated_ms = summary.simulated.as_millis() as u64,
            "tour_incomplete"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Plays a tour script against the zone manager, one fixed tick at a time.
pub(crate) struct TourPilot {
    manager: GameZoneManager,
    steps: VecDeque<TourStep>,
    waiting: Duration,
    release_warp: bool,
    console: ConsoleCommandProcessor,
    pending_commands: Vec<ZoneDebugCommand>,
    overlay: DebugOverlay,
    metrics: MetricsHandle,
}

impl TourPilot {
    pub(crate) fn new(
        manager: GameZoneManager,
        steps: VecDeque<TourStep>,
        metrics: MetricsHandle,
    ) -> Self {
        Self {
            manager,
            steps,
            waiting: Duration::ZERO,
            release_warp: false,
            console: ConsoleCommandProcessor::new(),
            pending_commands: Vec::new(),
            overlay: DebugOverlay::new(false),
            metrics,
        }
    }

    pub(crate) fn finished(&self) -> bool {
        self.steps.is_empty() && self.waiting.is_zero() && !self.manager.is_transitioning()
    }

    pub(crate) fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    #[cfg(test)]
    pub(crate) fn manager(&self) -> &GameZoneManager {
        &self.manager
    }

    /// Runs steps until one of them has to wait for simulated time.
    fn advance_script(&mut self, fixed_dt: Duration) {
        if self.waiting > Duration::ZERO {
            self.waiting = self.waiting.saturating_sub(fixed_dt);
            if self.waiting > Duration::ZERO {
                return;
            }
        }

        while let Some(step) = self.steps.front() {
            if *step == TourStep::AwaitArrival {
                if self.manager.is_transitioning() {
                    return;
                }
                self.steps.pop_front();
                continue;
            }

            let Some(step) = self.steps.pop_front() else {
                return;
            };
            info!(step = ?step, "tour_step");
            if self.run_step(step) {
                return;
            }
        }
    }

    /// Returns `true` when the script should yield until the next tick.
    fn run_step(&mut self, step: TourStep) -> bool {
        match step {
            TourStep::Travel(zone) => {
                // Refusals already reached the pilot through the HUD.
                let _ = self.manager.travel_to_zone(&zone);
                false
            }
            TourStep::FlyToGate(target) => {
                let gate = self.manager.current_zone().and_then(|current| {
                    self.manager
                        .warp_gates()
                        .find(|gate| &gate.zone == current && gate.target == target)
                        .map(|gate| gate.position)
                });
                match gate {
                    Some(position) => {
                        let shell = self.manager.shell_mut();
                        shell.move_to(position);
                        shell.press_warp();
                        self.release_warp = true;
                        true
                    }
                    None => {
                        warn!(target = %target, "tour_gate_missing");
                        false
                    }
                }
            }
            TourStep::AwaitArrival => false,
            TourStep::WaitMs(ms) => {
                self.waiting = Duration::from_millis(ms);
                !self.waiting.is_zero()
            }
            TourStep::Console(line) => {
                self.run_console_line(&line);
                false
            }
            TourStep::Unlock(zone) => {
                self.manager.unlock_zone(&zone);
                false
            }
            TourStep::Discover(zone) => {
                self.manager.discover_zone(&zone);
                false
            }
            TourStep::Unload(zone) => {
                if !self.manager.unload_zone(&zone) {
                    warn!(zone = %zone, "tour_unload_refused");
                }
                false
            }
            TourStep::ToggleOverlay => {
                self.overlay.toggle();
                self.log_overlay();
                false
            }
        }
    }

    fn run_console_line(&mut self, line: &str) {
        info!(line, "console_input");
        for output in self.console.process_line(line) {
            info!(output = %output, "console_output");
        }
        self.console
            .drain_pending_debug_commands_into(&mut self.pending_commands);
        for command in std::mem::take(&mut self.pending_commands) {
            for output in self.manager.execute_debug_command(command) {
                info!(output = %output, "console_output");
            }
        }
    }

    fn log_events(&mut self) {
        let mut arrived = false;
        for event in self.manager.drain_events() {
            match &event {
                ZoneEvent::ZoneLoaded {
                    zone,
                    objects,
                    failed_parts,
                } => info!(zone = %zone, objects, failed_parts, "event_zone_loaded"),
                ZoneEvent::ZoneUnloaded { zone } => info!(zone = %zone, "event_zone_unloaded"),
                ZoneEvent::ZoneChanged { from, to } => {
                    arrived = true;
                    info!(
                        from = from.as_ref().map_or("none", |zone| zone.as_str()),
                        to = %to,
                        "event_zone_changed"
                    );
                }
                ZoneEvent::TransitionStarted { from, to } => {
                    info!(from = %from, to = %to, "event_transition_started")
                }
                ZoneEvent::PreloadFinished {
                    zone,
                    warmed,
                    failed,
                } => info!(zone = %zone, warmed, failed, "event_preload_finished"),
                ZoneEvent::ZoneDiscovered { zone } => info!(zone = %zone, "event_zone_discovered"),
            }
        }
        if arrived {
            self.log_hud();
            self.log_overlay();
        }
    }

    fn log_hud(&self) {
        let shell = self.manager.shell();
        let Some(collections) = self
            .manager
            .current_zone()
            .and_then(|zone| shell.collections(zone))
        else {
            return;
        };
        info!(
            bodies = ?collections.planets,
            stations = collections.stations,
            asteroid_fields = collections.asteroid_fields,
            "hud_zone_summary"
        );
    }

    fn log_overlay(&self) {
        let data = OverlayData {
            metrics: self.metrics.snapshot(),
            zones: self.manager.debug_snapshot(),
        };
        for line in self.overlay.lines(&data) {
            info!(line = %line, "overlay");
        }
    }
}

impl TickHandler for TourPilot {
    fn tick(&mut self, fixed_dt: Duration) -> TickControl {
        self.manager.update(fixed_dt);
        if self.release_warp {
            self.manager.shell_mut().release_warp();
            self.release_warp = false;
        }
        self.log_events();
        self.advance_script(fixed_dt);

        if self.finished() {
            TickControl::Stop
        } else {
            TickControl::Continue
        }
    }

    fn streaming_sample(&self) -> StreamingSample {
        let counters = self.manager.counters();
        let stats = self.manager.assets().stats();
        StreamingSample {
            zone_loads: counters.zone_loads,
            evictions: counters.evictions,
            disposed_resources: stats.disposed_total,
            loaded_zones: self.manager.loaded_zones().len(),
            cached_resources: stats.geometries + stats.materials,
        }
    }

    fn shutdown(&mut self) {
        let counters = self.manager.counters();
        info!(
            zone_loads = counters.zone_loads,
            zone_switches = counters.zone_switches,
            evictions = counters.evictions,
            preloads = counters.preloads_completed,
            warps = counters.transitions_completed,
            hud_messages = self.manager.shell().messages().len(),
            "tour_finished"
        );
        self.manager.shutdown();
        let stats = self.manager.assets().stats();
        info!(
            created = stats.created_total,
            disposed = stats.disposed_total,
            live = self.manager.assets().backend().live_allocations(),
            "assets_released"
        );
    }
}
