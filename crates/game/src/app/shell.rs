use std::collections::BTreeMap;

use stellar_engine::zones::{FeatureTag, ZoneDefinition, ZoneId};
use stellar_engine::{GameShell, Vec3};
use tracing::{debug, info};

/// What the HUD lists for the zone the pilot is in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ZoneCollections {
    pub(crate) planets: Vec<String>,
    pub(crate) stations: usize,
    pub(crate) asteroid_fields: usize,
}

/// Headless stand-in for the game UI: notices go to the log, and the pilot's
/// position and warp trigger are driven by the tour script.
#[derive(Debug, Default)]
pub(crate) struct PilotShell {
    position: Vec3,
    warp_confirm: bool,
    loading: Option<ZoneId>,
    messages: Vec<String>,
    collections: BTreeMap<ZoneId, ZoneCollections>,
}

impl PilotShell {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn move_to(&mut self, position: Vec3) {
        self.position = position;
    }

    pub(crate) fn press_warp(&mut self) {
        self.warp_confirm = true;
    }

    pub(crate) fn release_warp(&mut self) {
        self.warp_confirm = false;
    }

    #[cfg(test)]
    pub(crate) fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub(crate) fn messages(&self) -> &[String] {
        &self.messages
    }

    pub(crate) fn collections(&self, zone: &ZoneId) -> Option<&ZoneCollections> {
        self.collections.get(zone)
    }
}

impl GameShell for PilotShell {
    fn show_message(&mut self, message: &str) {
        info!(message, "hud_message");
        self.messages.push(message.to_string());
    }

    fn show_loading(&mut self, zone: &ZoneId) {
        debug!(zone = %zone, "loading_overlay_shown");
        self.loading = Some(zone.clone());
    }

    fn hide_loading(&mut self) {
        if let Some(zone) = self.loading.take() {
            debug!(zone = %zone, "loading_overlay_hidden");
        }
    }

    fn refresh_zone_ui(&mut self, zone: &ZoneDefinition) {
        let mut planets = vec![zone.name.clone()];
        planets.extend(zone.discovered_satellites().map(|sat| sat.name.clone()));
        let count = |tag: FeatureTag| zone.features.iter().filter(|f| **f == tag).count();
        let entry = ZoneCollections {
            planets,
            stations: count(FeatureTag::SpaceStation) + count(FeatureTag::GasStation),
            asteroid_fields: count(FeatureTag::AsteroidField),
        };
        info!(
            zone = %zone.id,
            bodies = entry.planets.len(),
            stations = entry.stations,
            asteroid_fields = entry.asteroid_fields,
            "zone_ui_refreshed"
        );
        self.collections.insert(zone.id.clone(), entry);
    }

    fn zone_changed(&mut self, zone: &ZoneId) {
        info!(zone = %zone, "pilot_arrived");
        self.position = Vec3::ZERO;
        self.warp_confirm = false;
    }

    fn clear_zone_collections(&mut self, zone: &ZoneId) {
        if self.collections.remove(zone).is_some() {
            debug!(zone = %zone, "zone_collections_cleared");
        }
    }

    fn player_position(&self) -> Vec3 {
        self.position
    }

    fn warp_confirm_pressed(&self) -> bool {
        self.warp_confirm
    }
}
