use std::path::Path;
use std::time::Duration;

use stellar_engine::app::resolve_config_path;
use stellar_engine::zones::ZoneTableError;
use stellar_engine::{
    load_streaming_config, load_zone_content, parse_zone_content, resolve_app_paths,
    ConfigError, HeadlessBackend, HeadlessScene, LoopConfig, StartupError, StreamingConfig,
    ZoneContent, ZoneManager,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::factories;
use super::shell::PilotShell;
use super::tour::{load_tour, TourError, TourScript};

const EMBEDDED_ZONES: &str = include_str!("../../../../content/zones.json");
const EMBEDDED_TOUR: &str = include_str!("../../../../content/tour.json");
const TOUR_ENV_VAR: &str = "STELLAR_TOUR";
const FRAME_DELTA: Duration = Duration::from_millis(16);

pub(crate) type GameZoneManager = ZoneManager<HeadlessScene, PilotShell>;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Zones(#[from] ZoneTableError),
    #[error(transparent)]
    Tour(#[from] TourError),
}

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) frame_delta: Duration,
    pub(crate) manager: GameZoneManager,
    pub(crate) tour: TourScript,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Stellar Startup ===");

    let root = match resolve_app_paths() {
        Ok(paths) => Some(paths),
        Err(err) => {
            log_root_fallback(&err);
            None
        }
    };

    let streaming = match &root {
        Some(paths) => load_streaming_config(&resolve_config_path(&paths.root)?)?,
        None => StreamingConfig::default(),
    }
    .normalized();
    info!(
        max_loaded_zones = streaming.max_loaded_zones,
        preload_distance = streaming.preload_distance,
        transition_ms = streaming.transition_duration_ms,
        "streaming_config"
    );

    let content = match &root {
        Some(paths) => load_content_or_embedded(&paths.zone_table())?,
        None => parse_zone_content(EMBEDDED_ZONES, "embedded zones.json")?,
    };

    let tour = match std::env::var_os(TOUR_ENV_VAR) {
        Some(path) => load_tour(Path::new(&path))?,
        None => match &root {
            Some(paths) if paths.content_dir.join("tour.json").is_file() => {
                load_tour(&paths.content_dir.join("tour.json"))?
            }
            _ => TourScript::parse(EMBEDDED_TOUR, "embedded tour.json")?,
        },
    };
    info!(tour = %tour.name, steps = tour.steps.len(), "tour_loaded");

    let manager = ZoneManager::new(
        streaming,
        content,
        Box::new(HeadlessBackend::new()),
        factories::register_all(),
        HeadlessScene::new(),
        PilotShell::new(),
    );

    Ok(AppWiring {
        loop_config: LoopConfig::default(),
        frame_delta: FRAME_DELTA,
        manager,
        tour,
    })
}

fn load_content_or_embedded(path: &Path) -> Result<ZoneContent, ZoneTableError> {
    if path.is_file() {
        return load_zone_content(path);
    }
    warn!(path = %path.display(), "zone_table_missing_using_embedded");
    parse_zone_content(EMBEDDED_ZONES, "embedded zones.json")
}

fn log_root_fallback(err: &StartupError) {
    warn!(error = %err, "project_root_unresolved_using_embedded_content");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
