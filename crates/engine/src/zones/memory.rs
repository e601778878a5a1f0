use tracing::{debug, info, warn};

use crate::app::{GameShell, SceneHost, StreamingConfig};

use super::definition::ZoneId;
use super::manager::ZoneManager;

/// Residency rules for loaded zones: how many may stay resident and how far
/// ahead of the player to warm resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneMemoryPolicy {
    pub max_loaded_zones: usize,
    pub preload_distance: u32,
}

impl Default for ZoneMemoryPolicy {
    fn default() -> Self {
        Self::from_config(&StreamingConfig::default())
    }
}

impl ZoneMemoryPolicy {
    pub fn from_config(config: &StreamingConfig) -> Self {
        Self {
            max_loaded_zones: config.max_loaded_zones.max(1),
            preload_distance: config.preload_distance,
        }
    }

    /// Evicts zones until loading `incoming` (if it is not resident yet)
    /// keeps the loaded count within budget. Returns the evicted zones.
    pub fn manage_memory<S: SceneHost, G: GameShell>(
        &self,
        manager: &mut ZoneManager<S, G>,
        incoming: Option<&ZoneId>,
    ) -> Vec<ZoneId> {
        let victims = self.select_zones_to_unload(manager, incoming);
        if victims.is_empty() {
            return victims;
        }

        let mut evicted = Vec::with_capacity(victims.len());
        for zone in victims {
            if self.unload_zone(manager, &zone) {
                evicted.push(zone);
            }
        }
        info!(
            incoming = incoming.map(ZoneId::as_str).unwrap_or("-"),
            evicted = evicted.len(),
            loaded = manager.loaded_zones().len(),
            "zone_memory_managed"
        );
        evicted
    }

    /// Picks eviction victims, never the current or incoming zone. Zones not
    /// adjacent to the incoming zone (or the current one when nothing is
    /// incoming) go first; adjacent ones only fill what is still missing.
    pub fn select_zones_to_unload<S: SceneHost, G: GameShell>(
        &self,
        manager: &ZoneManager<S, G>,
        incoming: Option<&ZoneId>,
    ) -> Vec<ZoneId> {
        let loaded = manager.loaded_zones();
        let reserve = usize::from(incoming.is_some_and(|zone| !loaded.contains(zone)));
        let needed = (loaded.len() + reserve).saturating_sub(self.max_loaded_zones);
        if needed == 0 {
            return Vec::new();
        }

        let current = manager.current_zone();
        let anchor = incoming.or(current);
        let (far, near): (Vec<&ZoneId>, Vec<&ZoneId>) = loaded
            .iter()
            .filter(|zone| Some(*zone) != current && Some(*zone) != incoming)
            .partition(|zone| anchor.map_or(true, |anchor| !manager.graph().is_adjacent(zone, anchor)));

        let victims: Vec<ZoneId> = far
            .into_iter()
            .chain(near)
            .take(needed)
            .cloned()
            .collect();
        if victims.len() < needed {
            warn!(
                needed,
                selected = victims.len(),
                max_loaded_zones = self.max_loaded_zones,
                "zone_budget_unreachable"
            );
        }
        victims
    }

    /// Fully releases a resident zone. The current zone and zones that are
    /// not loaded are refused.
    pub fn unload_zone<S: SceneHost, G: GameShell>(
        &self,
        manager: &mut ZoneManager<S, G>,
        zone: &ZoneId,
    ) -> bool {
        if !manager.is_loaded(zone) {
            debug!(zone = %zone, "unload_skipped_not_loaded");
            return false;
        }
        if manager.current_zone() == Some(zone) {
            warn!(zone = %zone, "unload_refused_current_zone");
            return false;
        }

        let tracked = manager
            .zone_asset_record(zone)
            .map_or(0, |record| record.signatures.len());
        let released = manager.clear_zone_objects(Some(zone));
        manager.forget_loaded_zone(zone);
        let reclaimed = manager.assets_mut().perform_garbage_collection();
        info!(zone = %zone, released, tracked, reclaimed, "zone_unloaded");
        true
    }

    /// Queues unlocked, unloaded zones within `preload_distance` hops of the
    /// current zone. Returns how many were newly queued.
    pub fn schedule_preloading<S: SceneHost, G: GameShell>(
        &self,
        manager: &mut ZoneManager<S, G>,
    ) -> usize {
        let Some(current) = manager.current_zone().cloned() else {
            return 0;
        };
        let candidates: Vec<ZoneId> = manager
            .graph()
            .neighbors_within(&current, self.preload_distance)
            .into_iter()
            .filter(|zone| {
                manager.zones().is_unlocked(zone)
                    && !manager.is_loaded(zone)
                    && !manager.is_preloading(zone)
            })
            .collect();

        let mut scheduled = 0;
        for zone in &candidates {
            if manager.begin_preload(zone) {
                debug!(zone = %zone, from = %current, "preload_scheduled");
                scheduled += 1;
            }
        }
        scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{HeadlessScene, RecordingShell};
    use crate::assets::HeadlessBackend;
    use crate::zones::{parse_zone_content, ContentFactories};

    const CONTENT: &str = r#"{
        "start_zone": "a",
        "zones": [
            { "id": "a", "name": "A", "ring_position": 0, "radius": 1000.0, "solar_distance": 1.0,
              "unlocked": true, "planet": { "radius": 10.0 } },
            { "id": "b", "name": "B", "ring_position": 1, "radius": 1000.0, "solar_distance": 2.0,
              "unlocked": true, "planet": { "radius": 10.0 } },
            { "id": "c", "name": "C", "ring_position": 2, "radius": 1000.0, "solar_distance": 3.0,
              "unlocked": true, "planet": { "radius": 10.0 } },
            { "id": "d", "name": "D", "ring_position": 3, "radius": 1000.0, "solar_distance": 4.0,
              "unlocked": true, "planet": { "radius": 10.0 } }
        ],
        "connections": [
            { "from": "a", "to": "b" },
            { "from": "b", "to": "c" },
            { "from": "c", "to": "d" }
        ]
    }"#;

    fn manager(max_loaded_zones: usize) -> ZoneManager<HeadlessScene, RecordingShell> {
        let config = StreamingConfig {
            max_loaded_zones,
            ..StreamingConfig::default()
        };
        ZoneManager::new(
            config,
            parse_zone_content(CONTENT, "test").expect("content"),
            Box::new(HeadlessBackend::new()),
            ContentFactories::new(),
            HeadlessScene::new(),
            RecordingShell::new(),
        )
    }

    fn id(raw: &str) -> ZoneId {
        ZoneId::from(raw)
    }

    #[test]
    fn within_budget_nothing_is_selected() {
        let mut manager = manager(3);
        manager.start().expect("start");
        let policy = manager.memory_policy();
        assert!(policy
            .select_zones_to_unload(&manager, Some(&id("b")))
            .is_empty());
    }

    #[test]
    fn non_adjacent_zones_are_evicted_first() {
        let mut manager = manager(3);
        manager.start().expect("a");
        manager.load_zone(&id("d"), true).expect("d");
        manager.load_zone(&id("b"), true).expect("b");
        // loaded: a, b, d with b current; c is adjacent to b and d
        let policy = manager.memory_policy();
        let victims = policy.select_zones_to_unload(&manager, Some(&id("c")));
        assert_eq!(victims, vec![id("a")]);
    }

    #[test]
    fn adjacent_zones_are_taken_when_nothing_else_qualifies() {
        let mut manager = manager(2);
        manager.start().expect("a");
        manager.load_zone(&id("b"), true).expect("b");
        // loading c needs a slot; a is the only non-current candidate and is
        // not adjacent to c, so it goes
        let policy = manager.memory_policy();
        assert_eq!(
            policy.select_zones_to_unload(&manager, Some(&id("c"))),
            vec![id("a")]
        );

        let mut manager = self::manager(2);
        manager.start().expect("a");
        manager.load_zone(&id("c"), true).expect("c");
        manager.load_zone(&id("a"), false).expect("switch back");
        // current a, loaded a and c; loading d (adjacent to c) still has to
        // evict c
        let policy = manager.memory_policy();
        assert_eq!(
            policy.select_zones_to_unload(&manager, Some(&id("d"))),
            vec![id("c")]
        );
    }

    #[test]
    fn current_zone_is_never_unloaded() {
        let mut manager = manager(3);
        manager.start().expect("start");
        assert!(!manager.unload_zone(&id("a")));
        assert!(!manager.unload_zone(&id("c")));
        assert!(manager.is_loaded(&id("a")));
    }

    #[test]
    fn unload_releases_objects_and_emits_event() {
        let mut manager = manager(3);
        manager.start().expect("a");
        manager.load_zone(&id("b"), true).expect("b");
        manager.drain_events();

        assert!(manager.unload_zone(&id("a")));
        assert!(!manager.is_loaded(&id("a")));
        assert!(manager.zone_objects(&id("a")).is_empty());
        assert!(manager.warp_gate("a:gate:b").is_none());
        assert_eq!(manager.counters().evictions, 1);
        assert!(manager
            .drain_events()
            .iter()
            .any(|event| matches!(event, crate::zones::ZoneEvent::ZoneUnloaded { zone } if zone == &id("a"))));
    }

    #[test]
    fn preloading_respects_distance() {
        let config = StreamingConfig {
            preload_distance: 2,
            ..StreamingConfig::default()
        };
        let mut manager = ZoneManager::new(
            config,
            parse_zone_content(CONTENT, "test").expect("content"),
            Box::new(HeadlessBackend::new()),
            ContentFactories::new(),
            HeadlessScene::new(),
            RecordingShell::new(),
        );
        let report = manager.start().expect("start");
        assert_eq!(report.preloads_scheduled, 2);
        assert!(manager.is_preloading(&id("b")));
        assert!(manager.is_preloading(&id("c")));
        assert!(!manager.is_preloading(&id("d")));
        assert_eq!(manager.schedule_preloading(), 0);
    }
}
