use std::time::Duration;

use stellar_engine::app::{
    GameShell, HeadlessScene, ObjectKind, RecordingShell, SceneHost, ShellCall, StreamingConfig,
};
use stellar_engine::assets::{HeadlessBackend, ResourceBackend};
use stellar_engine::zones::{
    parse_zone_content, ContentFactories, TravelRejected, ZoneEvent, ZoneId, ZoneLoadError,
    ZoneManager,
};

const SOLAR_SYSTEM: &str = r#"{
    "start_zone": "earth",
    "zones": [
        { "id": "earth", "name": "Earth", "ring_position": 0, "radius": 5000.0,
          "solar_distance": 1.0, "unlocked": true,
          "planet": { "radius": 50.0, "color": 2250495, "has_atmosphere": true },
          "satellites": [
            { "name": "Moon", "radius": 12.0, "orbital_distance": 200.0, "discovered": true }
          ] },
        { "id": "mars", "name": "Mars", "ring_position": 1, "radius": 4000.0,
          "solar_distance": 1.52, "unlocked": true,
          "planet": { "radius": 30.0, "color": 13382451 },
          "satellites": [
            { "name": "Phobos", "radius": 3.0, "orbital_distance": 60.0, "discovered": true },
            { "name": "Deimos", "radius": 2.0, "orbital_distance": 90.0, "discovered": false }
          ] },
        { "id": "jupiter", "name": "Jupiter", "ring_position": 2, "radius": 9000.0,
          "solar_distance": 5.2, "unlocked": true,
          "planet": { "radius": 140.0, "color": 13148288 } },
        { "id": "venus", "name": "Venus", "ring_position": 3, "radius": 4000.0,
          "solar_distance": 0.72,
          "planet": { "radius": 48.0, "has_atmosphere": true } }
    ],
    "connections": [
        { "from": "earth", "to": "mars" },
        { "from": "earth", "to": "jupiter" },
        { "from": "earth", "to": "venus" }
    ]
}"#;

type Manager = ZoneManager<HeadlessScene, RecordingShell>;

fn manager_with(config: StreamingConfig, backend: HeadlessBackend) -> Manager {
    ZoneManager::new(
        config,
        parse_zone_content(SOLAR_SYSTEM, "solar_system").expect("content"),
        Box::new(backend),
        ContentFactories::new(),
        HeadlessScene::new(),
        RecordingShell::new(),
    )
}

fn manager(max_loaded_zones: usize) -> Manager {
    manager_with(
        StreamingConfig {
            max_loaded_zones,
            ..StreamingConfig::default()
        },
        HeadlessBackend::new(),
    )
}

fn id(raw: &str) -> ZoneId {
    ZoneId::from(raw)
}

fn assert_budget(manager: &Manager) {
    let loaded = manager.loaded_zones();
    assert!(
        loaded.len() <= manager.config().max_loaded_zones,
        "loaded {loaded:?} exceeds budget"
    );
    if let Some(current) = manager.current_zone() {
        assert!(loaded.contains(current), "current {current} not loaded");
    }
}

#[test]
fn reloading_current_zone_without_clear_reuses_objects() {
    let mut manager = manager(3);
    manager.start().expect("start");
    let objects_before: Vec<_> = manager
        .zone_objects(&id("earth"))
        .iter()
        .map(|object| object.id)
        .collect();
    let attach_calls = manager.scene().attach_calls();
    manager.shell_mut().clear_calls();

    let report = manager.load_zone(&id("earth"), false).expect("reload");

    assert!(report.reused);
    assert_eq!(report.objects_created, 0);
    assert_eq!(manager.current_zone(), Some(&id("earth")));
    assert_eq!(manager.scene().attach_calls(), attach_calls);
    let objects_after: Vec<_> = manager
        .zone_objects(&id("earth"))
        .iter()
        .map(|object| object.id)
        .collect();
    assert_eq!(objects_after, objects_before);
    assert_eq!(
        manager
            .shell()
            .count(|call| matches!(call, ShellCall::RefreshUi(_))),
        1
    );
}

#[test]
fn loading_a_second_zone_keeps_the_first_registered() {
    let mut manager = manager(3);
    manager.start().expect("start");
    let earth_objects = manager.zone_objects(&id("earth")).to_vec();

    let report = manager.load_zone(&id("mars"), true).expect("mars");

    assert!(report.evicted.is_empty());
    assert_eq!(
        manager.loaded_zones().iter().cloned().collect::<Vec<_>>(),
        vec![id("earth"), id("mars")]
    );
    assert!(!manager.zone_objects(&id("mars")).is_empty());
    assert_eq!(manager.zone_objects(&id("earth")), earth_objects.as_slice());
    assert_eq!(manager.current_zone(), Some(&id("mars")));
    // only mars is in the scene
    assert_eq!(
        manager.scene().attached_count(),
        manager.zone_objects(&id("mars")).len()
    );
    assert_eq!(manager.scene().origin(), manager.zone_definition(&id("mars")).expect("mars").world_anchor());
}

#[test]
fn undiscovered_satellites_are_not_built() {
    let mut manager = manager(3);
    manager.start().expect("start");
    manager.load_zone(&id("mars"), true).expect("mars");

    let satellites: Vec<&str> = manager
        .zone_objects(&id("mars"))
        .iter()
        .filter(|object| object.kind == ObjectKind::Satellite)
        .map(|object| object.name.as_str())
        .collect();
    assert_eq!(satellites, vec!["Phobos"]);
}

#[test]
fn eviction_prefers_zones_unrelated_to_the_incoming_one() {
    let mut manager = manager(2);
    manager.start().expect("start");
    manager.load_zone(&id("mars"), true).expect("mars");
    manager.load_zone(&id("earth"), false).expect("back to earth");
    assert_eq!(manager.current_zone(), Some(&id("earth")));
    assert_eq!(manager.loaded_zones().len(), 2);

    let report = manager.load_zone(&id("jupiter"), true).expect("jupiter");

    assert_eq!(report.evicted, vec![id("mars")]);
    assert_eq!(
        manager.loaded_zones().iter().cloned().collect::<Vec<_>>(),
        vec![id("earth"), id("jupiter")]
    );
    assert!(manager.zone_objects(&id("mars")).is_empty());
    assert!(manager.warp_gate("mars:gate:earth").is_none());

    let events = manager.drain_events();
    let unloaded = events
        .iter()
        .position(|event| matches!(event, ZoneEvent::ZoneUnloaded { zone } if zone == &id("mars")))
        .expect("mars unloaded");
    let loaded = events
        .iter()
        .position(|event| matches!(event, ZoneEvent::ZoneLoaded { zone, .. } if zone == &id("jupiter")))
        .expect("jupiter loaded");
    assert!(unloaded < loaded, "eviction must finish before construction");
}

#[test]
fn budget_holds_across_a_load_sequence() {
    for cap in 1..=3 {
        let mut manager = manager(cap);
        manager.start().expect("start");
        assert_budget(&manager);
        for (zone, clear) in [
            ("mars", true),
            ("jupiter", true),
            ("earth", false),
            ("venus", true),
            ("mars", true),
            ("mars", false),
            ("earth", true),
            ("jupiter", false),
        ] {
            // switching to an evicted zone without clear falls back to a full load
            manager.load_zone(&id(zone), clear).expect("load");
            assert_budget(&manager);
            assert_eq!(manager.current_zone(), Some(&id(zone)));
        }
    }
}

#[test]
fn victims_never_include_current_or_incoming() {
    let mut manager = manager(1);
    manager.start().expect("start");
    manager.load_zone(&id("mars"), true).expect("mars");
    let policy = manager.memory_policy();

    for incoming in ["earth", "mars", "jupiter", "venus"] {
        let victims = policy.select_zones_to_unload(&manager, Some(&id(incoming)));
        assert!(!victims.contains(&id(incoming)));
        assert!(!victims.contains(&id("mars")));
    }
}

#[test]
fn clearing_a_zone_twice_matches_clearing_once() {
    let mut manager = manager(3);
    manager.start().expect("start");
    manager.load_zone(&id("mars"), true).expect("mars");
    let live_before = manager.assets().stats().live_meshes;
    let earth_count = manager.zone_objects(&id("earth")).len();

    let first = manager.clear_zone_objects(Some(&id("earth")));
    let stats_after_first = manager.assets().stats();
    let second = manager.clear_zone_objects(Some(&id("earth")));

    assert_eq!(first, earth_count);
    assert_eq!(second, 0);
    assert_eq!(stats_after_first.live_meshes, live_before - earth_count);
    assert_eq!(manager.assets().stats(), stats_after_first);
    assert!(manager.zone_objects(&id("earth")).is_empty());
    assert_eq!(manager.scene().stray_detaches(), 0);
    assert!(manager.warp_gates().all(|gate| gate.zone != id("earth")));
}

#[test]
fn clearing_the_current_zone_detaches_it() {
    let mut manager = manager(3);
    manager.start().expect("start");
    let released = manager.clear_zone_objects(None);

    assert!(released > 0);
    assert_eq!(manager.scene().attached_count(), 0);
    assert_eq!(manager.scene().stray_detaches(), 0);
    assert_eq!(
        manager
            .shell()
            .count(|call| matches!(call, ShellCall::ClearCollections(zone) if zone == &id("earth"))),
        1
    );
}

#[test]
fn second_travel_request_is_refused_and_one_arrival_fires() {
    let mut manager = manager(3);
    manager.start().expect("start");
    manager.drain_events();

    manager.travel_to_zone(&id("mars")).expect("first travel");
    manager.update(Duration::from_millis(500));
    let rejection = manager.travel_to_zone(&id("mars")).expect_err("second travel");
    assert_eq!(rejection, TravelRejected::AlreadyTransitioning);
    assert!(manager
        .shell()
        .messages()
        .contains(&"A warp is already in progress."));

    for _ in 0..40 {
        manager.update(Duration::from_millis(100));
    }

    assert!(!manager.is_transitioning());
    assert_eq!(manager.current_zone(), Some(&id("mars")));
    assert_eq!(
        manager
            .shell()
            .count(|call| matches!(call, ShellCall::ZoneChanged(_))),
        1
    );
    let events = manager.drain_events();
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, ZoneEvent::TransitionStarted { .. }))
            .count(),
        1
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, ZoneEvent::ZoneDiscovered { zone } if zone == &id("mars"))));
    assert_eq!(manager.counters().transitions_completed, 1);
}

#[test]
fn refused_travel_leaves_state_untouched() {
    let mut manager = manager(3);
    manager.start().expect("start");
    let loaded_before = manager.loaded_zones().clone();

    assert_eq!(
        manager.travel_to_zone(&id("venus")),
        Err(TravelRejected::Locked(id("venus")))
    );
    assert_eq!(
        manager.travel_to_zone(&id("earth")),
        Err(TravelRejected::AlreadyThere(id("earth")))
    );
    assert_eq!(
        manager.travel_to_zone(&id("pluto")),
        Err(TravelRejected::UnknownZone(id("pluto")))
    );
    assert!(!manager.is_transitioning());
    assert_eq!(manager.loaded_zones(), &loaded_before);
    assert_eq!(manager.shell().messages().len(), 3);

    manager.unlock_zone(&id("venus"));
    assert!(manager.can_travel_to(&id("venus")));
}

#[test]
fn partial_construction_keeps_zone_loaded_and_hides_overlay() {
    let mut manager = manager_with(
        StreamingConfig::default(),
        HeadlessBackend::new().with_failing_geometry("torus"),
    );

    let error = manager.start().expect_err("gates should fail");
    match error {
        ZoneLoadError::PartialConstruction { zone, failed, .. } => {
            assert_eq!(zone, id("earth"));
            assert_eq!(failed, 3);
        }
        other => panic!("unexpected error {other}"),
    }

    assert_eq!(manager.current_zone(), Some(&id("earth")));
    assert!(manager.is_loaded(&id("earth")));
    assert!(!manager.shell().loading_visible());
    // planet, atmosphere, moon
    assert_eq!(manager.zone_objects(&id("earth")).len(), 3);
    assert_eq!(manager.warp_gates().count(), 0);

    // a failed geometry never leaves a dangling material reference behind
    assert_eq!(manager.assets().stats().live_meshes, 3);

    manager.shutdown();
    assert_eq!(manager.assets().backend().live_allocations(), 0);
}

#[test]
fn preload_warms_neighbors_without_building_them() {
    let mut manager = manager(3);
    let report = manager.start().expect("start");
    assert_eq!(report.preloads_scheduled, 2);
    assert!(manager.is_preloading(&id("mars")));
    assert!(manager.is_preloading(&id("jupiter")));
    assert!(!manager.is_preloading(&id("venus")));

    let cached_before = manager.assets().stats().geometries;
    manager.update(Duration::from_millis(16));
    manager.update(Duration::from_millis(16));

    assert!(manager.preloading().is_empty());
    assert!(manager.assets().stats().geometries > cached_before);
    assert!(manager.zone_objects(&id("mars")).is_empty());
    assert_eq!(manager.loaded_zones().len(), 1);

    // warmed resources are reused by the real load
    let created = manager.assets().stats().created_total;
    manager.load_zone(&id("mars"), true).expect("mars");
    assert_eq!(manager.assets().stats().created_total, created);
}

#[test]
fn unloaded_zone_resources_survive_the_debounce_window_then_go() {
    let mut manager = manager(3);
    manager.start().expect("start");
    manager.load_zone(&id("mars"), true).expect("mars");
    manager.load_zone(&id("earth"), false).expect("earth");
    assert!(manager.unload_zone(&id("mars")));

    let created = manager.assets().stats().created_total;
    manager.update(Duration::from_secs(5));
    manager.load_zone(&id("mars"), true).expect("mars again");
    assert_eq!(manager.assets().stats().created_total, created);

    manager.load_zone(&id("earth"), false).expect("earth");
    assert!(manager.unload_zone(&id("mars")));
    let disposed = manager.assets().stats().disposed_total;
    for _ in 0..8 {
        manager.update(Duration::from_secs(5));
    }
    assert!(manager.assets().stats().disposed_total > disposed);
}

#[test]
fn gates_sit_only_on_connected_routes() {
    let mut manager = manager(3);
    manager.start().expect("start");
    let mut targets: Vec<ZoneId> = manager
        .warp_gates()
        .map(|gate| gate.target.clone())
        .collect();
    targets.sort();
    assert_eq!(targets, vec![id("jupiter"), id("mars"), id("venus")]);
    assert!(manager
        .zone_objects(&id("earth"))
        .iter()
        .filter(|object| object.kind == ObjectKind::WarpGate)
        .all(|object| object.name.starts_with("earth:gate:")));
}

#[test]
fn shell_and_scene_contracts_are_object_safe() {
    fn takes_dyn(_scene: &dyn SceneHost, _shell: &dyn GameShell, _backend: &dyn ResourceBackend) {}
    let scene = HeadlessScene::new();
    let shell = RecordingShell::new();
    let backend = HeadlessBackend::new();
    takes_dyn(&scene, &shell, &backend);
}
