use std::fmt::Write as _;

use tracing::info;

use crate::app::{GameShell, SceneHost};
use crate::assets::AssetStats;

use super::definition::ZoneId;
use super::manager::ZoneManager;
use super::table::ZoneOrigin;

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDebugRow {
    pub id: ZoneId,
    pub name: String,
    pub origin: ZoneOrigin,
    pub unlocked: bool,
    pub discovered: bool,
    pub loaded: bool,
    pub objects: usize,
    pub connections: Vec<ZoneId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDebugSnapshot {
    pub current: Option<ZoneId>,
    pub loaded: Vec<ZoneId>,
    pub preloading: Vec<ZoneId>,
    pub transition_progress: Option<f32>,
    pub assets: AssetStats,
    pub static_zones: usize,
    pub dynamic_zones: usize,
    pub rows: Vec<ZoneDebugRow>,
}

impl ZoneDebugSnapshot {
    pub fn render_human_readable(&self) -> String {
        let mut out = String::new();
        let current = self.current.as_ref().map_or("-", ZoneId::as_str);
        let _ = writeln!(out, "current: {current}");
        let _ = writeln!(out, "loaded: {}", join_ids(&self.loaded));
        let _ = writeln!(out, "preloading: {}", join_ids(&self.preloading));
        match self.transition_progress {
            Some(progress) => {
                let _ = writeln!(out, "transition: {:.0}%", progress * 100.0);
            }
            None => {
                let _ = writeln!(out, "transition: idle");
            }
        }
        let _ = writeln!(
            out,
            "assets: geometries={} materials={} meshes={} refs={} pending={} bytes={}",
            self.assets.geometries,
            self.assets.materials,
            self.assets.live_meshes,
            self.assets.total_references,
            self.assets.pending_reclaims,
            self.assets.estimated_bytes,
        );
        let _ = writeln!(
            out,
            "zones: {} static, {} dynamic",
            self.static_zones, self.dynamic_zones
        );
        for row in &self.rows {
            let origin = match row.origin {
                ZoneOrigin::Static => "static",
                ZoneOrigin::Dynamic => "dynamic",
            };
            let _ = writeln!(
                out,
                "  {} ({}) {origin} unlocked={} discovered={} loaded={} objects={} -> [{}]",
                row.id,
                row.name,
                row.unlocked,
                row.discovered,
                row.loaded,
                row.objects,
                join_ids(&row.connections),
            );
        }
        out
    }
}

fn join_ids(ids: &[ZoneId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(ZoneId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Operator commands accepted by [`ZoneManager::execute_debug_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneDebugCommand {
    Discover(ZoneId),
    Unlock(ZoneId),
    Connect {
        from: ZoneId,
        to: ZoneId,
        bidirectional: bool,
    },
    Travel(ZoneId),
    Dump,
    CollectGarbage,
}

impl<S: SceneHost, G: GameShell> ZoneManager<S, G> {
    pub fn debug_snapshot(&self) -> ZoneDebugSnapshot {
        let rows = self
            .zones()
            .iter()
            .map(|(definition, origin)| ZoneDebugRow {
                id: definition.id.clone(),
                name: definition.name.clone(),
                origin,
                unlocked: definition.unlocked,
                discovered: definition.discovered,
                loaded: self.is_loaded(&definition.id),
                objects: self.zone_objects(&definition.id).len(),
                connections: self.zone_connections(&definition.id),
            })
            .collect();

        ZoneDebugSnapshot {
            current: self.current_zone().cloned(),
            loaded: self.loaded_zones().iter().cloned().collect(),
            preloading: self.preloading().iter().cloned().collect(),
            transition_progress: self.transition_progress(),
            assets: self.assets().stats(),
            static_zones: self.zones().static_count(),
            dynamic_zones: self.zones().dynamic_count(),
            rows,
        }
    }

    /// Runs one operator command and returns the lines to show for it.
    pub fn execute_debug_command(&mut self, command: ZoneDebugCommand) -> Vec<String> {
        info!(command = ?command, "zone_debug_command");
        match command {
            ZoneDebugCommand::Discover(zone) => {
                if !self.zones().contains(&zone) {
                    return vec![format!("unknown zone '{zone}'")];
                }
                let changed = self.discover_zone(&zone);
                vec![if changed {
                    format!("{zone} discovered")
                } else {
                    format!("{zone} was already discovered; event sent")
                }]
            }
            ZoneDebugCommand::Unlock(zone) => {
                if !self.zones().contains(&zone) {
                    return vec![format!("unknown zone '{zone}'")];
                }
                if self.unlock_zone(&zone) {
                    vec![format!("{zone} unlocked")]
                } else {
                    vec![format!("{zone} was already unlocked")]
                }
            }
            ZoneDebugCommand::Connect {
                from,
                to,
                bidirectional,
            } => {
                if self.add_connection(&from, &to, bidirectional) {
                    let arrow = if bidirectional { "<->" } else { "->" };
                    vec![format!("connected {from} {arrow} {to}")]
                } else {
                    vec![format!("no new connection between {from} and {to}")]
                }
            }
            ZoneDebugCommand::Travel(zone) => match self.travel_to_zone(&zone) {
                Ok(()) => vec![format!("warping to {zone}")],
                Err(rejection) => vec![format!("travel refused: {rejection}")],
            },
            ZoneDebugCommand::Dump => self
                .debug_snapshot()
                .render_human_readable()
                .lines()
                .map(str::to_string)
                .collect(),
            ZoneDebugCommand::CollectGarbage => {
                let reclaimed = self.assets_mut().perform_garbage_collection();
                vec![format!("reclaimed {reclaimed} resource(s)")]
            }
        }
    }
}
