mod config;
mod loop_runner;
mod metrics;
mod scene;
mod shell;
mod tools;

pub use config::{
    load_streaming_config, resolve_config_path, ConfigError, StreamingConfig, CONFIG_ENV_VAR,
};
pub use loop_runner::{run_fixed_step, LoopConfig, LoopSummary, TickControl, TickHandler};
pub use metrics::{MetricsHandle, StreamingMetricsSnapshot, StreamingSample};
pub use scene::{
    AttachedObject, HeadlessScene, ObjectId, ObjectIdAllocator, ObjectKind, Orbit, SceneHost,
    SceneObject, Vec3,
};
pub use shell::{GameShell, RecordingShell, ShellCall};
pub use tools::{
    CommandParseError, ConsoleCommandProcessor, ConsoleCommandRegistry, DebugOverlay, LocalAction,
    OverlayData, ParsedCommand, MAX_PENDING_DEBUG_COMMANDS,
};
