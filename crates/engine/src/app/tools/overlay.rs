use tracing::info;

use crate::app::StreamingMetricsSnapshot;
use crate::zones::ZoneDebugSnapshot;

const STREAMING_SECTION_LABEL: &str = "Streaming";
const ASSETS_SECTION_LABEL: &str = "Assets";
const ZONES_SECTION_LABEL: &str = "Zones";

#[derive(Debug, Clone)]
pub struct OverlayData {
    pub metrics: StreamingMetricsSnapshot,
    pub zones: ZoneDebugSnapshot,
}

/// Operator panel listing live streaming state. Hidden panels produce no
/// lines.
#[derive(Debug, Clone, Default)]
pub struct DebugOverlay {
    visible: bool,
}

impl DebugOverlay {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        info!(overlay_visible = self.visible, "overlay_toggled");
        self.visible
    }

    pub fn lines(&self, data: &OverlayData) -> Vec<String> {
        if !self.visible {
            return Vec::new();
        }
        build_overlay_lines(data)
    }
}

fn build_overlay_lines(data: &OverlayData) -> Vec<String> {
    let zones = &data.zones;
    let mut lines = vec![
        STREAMING_SECTION_LABEL.to_string(),
        format!("TPS: {:.1}", data.metrics.tps),
        format!(
            "Zone: {}",
            zones.current.as_ref().map_or("none", |zone| zone.as_str())
        ),
        match zones.transition_progress {
            Some(progress) => format!("Warp: {:.0}%", progress * 100.0),
            None => "Warp: idle".to_string(),
        },
        format!(
            "loads/evict: {}/{}",
            data.metrics.zone_loads, data.metrics.evictions
        ),
        format!("Loaded: {}", join_or_none(zones.loaded.iter().map(|zone| zone.as_str()))),
        format!(
            "Preload: {}",
            join_or_none(zones.preloading.iter().map(|zone| zone.as_str()))
        ),
        String::new(),
        ASSETS_SECTION_LABEL.to_string(),
        format!(
            "geo/mat: {}/{}",
            zones.assets.geometries, zones.assets.materials
        ),
        format!(
            "meshes/refs: {}/{}",
            zones.assets.live_meshes, zones.assets.total_references
        ),
        format!("pending: {}", zones.assets.pending_reclaims),
        format!("reclaimed: {}", data.metrics.reclaimed),
        format!("est: {} KiB", zones.assets.estimated_bytes / 1024),
        String::new(),
        ZONES_SECTION_LABEL.to_string(),
        format!(
            "static/dynamic: {}/{}",
            zones.static_zones, zones.dynamic_zones
        ),
    ];

    for row in &zones.rows {
        let marker = if zones.current.as_ref() == Some(&row.id) {
            '*'
        } else if row.loaded {
            '+'
        } else {
            ' '
        };
        let lock = if row.unlocked { "" } else { " locked" };
        lines.push(format!("{marker} {} ({}){lock}", row.id, row.objects));
    }

    lines
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let joined = items.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}
