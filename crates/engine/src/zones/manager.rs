use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::app::{
    GameShell, ObjectIdAllocator, ObjectKind, SceneHost, SceneObject, StreamingConfig, Vec3,
};
use crate::assets::{AssetManager, ResourceBackend, ResourceSignature};

use super::blueprint::{build_blueprint, gate_id, ZoneBlueprint};
use super::definition::{ZoneDefinition, ZoneId};
use super::events::ZoneEvent;
use super::factories::{ContentFactories, FeatureBuilder, SpawnError};
use super::graph::ZoneGraph;
use super::memory::ZoneMemoryPolicy;
use super::table::{ZoneContent, ZoneTable, ZoneTableError};

/// Why a warp request was refused. The `Display` text is what the player sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TravelRejected {
    #[error("A warp is already in progress.")]
    AlreadyTransitioning,
    #[error("No zone is active yet.")]
    NoCurrentZone,
    #[error("Unknown destination `{0}`.")]
    UnknownZone(ZoneId),
    #[error("You are already in {0}.")]
    AlreadyThere(ZoneId),
    #[error("No warp route from {from} to {to}.")]
    NotConnected { from: ZoneId, to: ZoneId },
    #[error("{0} is still locked.")]
    Locked(ZoneId),
}

#[derive(Debug, Error)]
pub enum ZoneLoadError {
    #[error("zone `{0}` is not defined")]
    UnknownZone(ZoneId),
    #[error("zone `{zone}` loaded with {failed} failed part(s)")]
    PartialConstruction {
        zone: ZoneId,
        failed: usize,
        #[source]
        first: SpawnError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLoadReport {
    pub zone: ZoneId,
    /// The zone was already loaded and only became current again.
    pub reused: bool,
    pub objects_created: usize,
    pub evicted: Vec<ZoneId>,
    pub preloads_scheduled: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Dormant,
    InRange,
    Activated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarpGate {
    pub id: String,
    pub zone: ZoneId,
    pub target: ZoneId,
    pub position: Vec3,
    pub state: GateState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionState {
    Idle,
    Warping {
        from: ZoneId,
        target: ZoneId,
        elapsed: Duration,
        duration: Duration,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingCounters {
    pub zone_loads: u64,
    pub zone_switches: u64,
    pub evictions: u64,
    pub preloads_completed: u64,
    pub transitions_completed: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ZoneAssetRecord {
    pub signatures: BTreeSet<ResourceSignature>,
    pub failed_parts: usize,
}

pub struct ZoneManager<S: SceneHost, G: GameShell> {
    config: StreamingConfig,
    memory: ZoneMemoryPolicy,
    zones: ZoneTable,
    connections: ZoneGraph,
    start_zone: ZoneId,
    assets: AssetManager,
    factories: ContentFactories,
    scene: S,
    shell: G,
    current_zone: Option<ZoneId>,
    attached_zone: Option<ZoneId>,
    loaded_zones: BTreeSet<ZoneId>,
    zone_meshes: BTreeMap<ZoneId, Vec<SceneObject>>,
    zone_assets: BTreeMap<ZoneId, ZoneAssetRecord>,
    preloading: BTreeSet<ZoneId>,
    preload_queue: VecDeque<ZoneId>,
    warp_gates: BTreeMap<String, WarpGate>,
    transition: TransitionState,
    object_ids: ObjectIdAllocator,
    events: VecDeque<ZoneEvent>,
    counters: StreamingCounters,
}

impl<S: SceneHost, G: GameShell> ZoneManager<S, G> {
    pub fn new(
        config: StreamingConfig,
        content: ZoneContent,
        backend: Box<dyn ResourceBackend>,
        factories: ContentFactories,
        scene: S,
        shell: G,
    ) -> Self {
        let config = config.normalized();
        let mut connections = ZoneGraph::new();
        for connection in &content.connections {
            connections.add_connection(&connection.from, &connection.to, connection.bidirectional);
        }
        info!(
            zones = content.table.len(),
            connections = connections.edge_count(),
            factories = factories.len(),
            start_zone = %content.start_zone,
            "zone_manager_created"
        );
        Self {
            memory: ZoneMemoryPolicy::from_config(&config),
            assets: AssetManager::new(backend, config.cache_policy()),
            config,
            zones: content.table,
            connections,
            start_zone: content.start_zone,
            factories,
            scene,
            shell,
            current_zone: None,
            attached_zone: None,
            loaded_zones: BTreeSet::new(),
            zone_meshes: BTreeMap::new(),
            zone_assets: BTreeMap::new(),
            preloading: BTreeSet::new(),
            preload_queue: VecDeque::new(),
            warp_gates: BTreeMap::new(),
            transition: TransitionState::Idle,
            object_ids: ObjectIdAllocator::default(),
            events: VecDeque::new(),
            counters: StreamingCounters::default(),
        }
    }

    /// Loads the authored start zone.
    pub fn start(&mut self) -> Result<ZoneLoadReport, ZoneLoadError> {
        let start = self.start_zone.clone();
        self.load_zone(&start, true)
    }

    pub fn load_zone(
        &mut self,
        zone_id: &ZoneId,
        clear_current: bool,
    ) -> Result<ZoneLoadReport, ZoneLoadError> {
        let Some(definition) = self.zones.get(zone_id).cloned() else {
            warn!(zone = %zone_id, "zone_definition_missing");
            return Err(ZoneLoadError::UnknownZone(zone_id.clone()));
        };

        if !clear_current && self.loaded_zones.contains(zone_id) {
            return Ok(self.switch_to_loaded(&definition));
        }

        let memory = self.memory;
        let mut evicted = memory.manage_memory(self, Some(zone_id));

        let previous = self.current_zone.clone();
        if let Some(outgoing) = &previous {
            self.detach_zone(outgoing);
        }
        if self.zone_meshes.contains_key(zone_id) {
            self.release_zone_objects(zone_id);
        }

        self.scene.reset_origin(definition.world_anchor());
        self.shell.show_loading(zone_id);
        self.attached_zone = Some(zone_id.clone());
        let (objects_created, failures) = self.create_zone_objects(&definition);
        self.loaded_zones.insert(zone_id.clone());
        self.preloading.remove(zone_id);
        self.preload_queue.retain(|queued| queued != zone_id);
        self.current_zone = Some(zone_id.clone());
        self.shell.hide_loading();
        self.shell.refresh_zone_ui(&definition);

        evicted.extend(memory.manage_memory(self, None));
        let preloads_scheduled = memory.schedule_preloading(self);

        self.counters.zone_loads = self.counters.zone_loads.saturating_add(1);
        self.events.push_back(ZoneEvent::ZoneLoaded {
            zone: zone_id.clone(),
            objects: objects_created,
            failed_parts: failures.len(),
        });
        if previous.as_ref() != Some(zone_id) {
            self.events.push_back(ZoneEvent::ZoneChanged {
                from: previous,
                to: zone_id.clone(),
            });
        }
        info!(
            zone = %zone_id,
            objects = objects_created,
            failed_parts = failures.len(),
            loaded = self.loaded_zones.len(),
            evicted = evicted.len(),
            preloads_scheduled,
            "zone_loaded"
        );

        let failed = failures.len();
        match failures.into_iter().next() {
            Some(first) => Err(ZoneLoadError::PartialConstruction {
                zone: zone_id.clone(),
                failed,
                first,
            }),
            None => Ok(ZoneLoadReport {
                zone: zone_id.clone(),
                reused: false,
                objects_created,
                evicted,
                preloads_scheduled,
            }),
        }
    }

    fn switch_to_loaded(&mut self, definition: &ZoneDefinition) -> ZoneLoadReport {
        let target = &definition.id;
        let previous = self.current_zone.clone();
        let mut preloads_scheduled = 0;

        if previous.as_ref() != Some(target) {
            if let Some(outgoing) = &previous {
                self.detach_zone(outgoing);
            }
            self.scene.reset_origin(definition.world_anchor());
            self.attach_zone(target);
            self.current_zone = Some(target.clone());
            self.counters.zone_switches = self.counters.zone_switches.saturating_add(1);
            self.events.push_back(ZoneEvent::ZoneChanged {
                from: previous,
                to: target.clone(),
            });
            let memory = self.memory;
            preloads_scheduled = memory.schedule_preloading(self);
            info!(zone = %target, "zone_reactivated");
        }

        self.shell.refresh_zone_ui(definition);
        ZoneLoadReport {
            zone: target.clone(),
            reused: true,
            objects_created: 0,
            evicted: Vec::new(),
            preloads_scheduled,
        }
    }

    /// Instantiates the blueprint items best-effort, then the zone's features.
    /// Everything that got created is registered, failures are logged and
    /// returned.
    fn create_zone_objects(&mut self, definition: &ZoneDefinition) -> (usize, Vec<SpawnError>) {
        let zone_id = definition.id.clone();
        let blueprint = self.blueprint_for(definition);
        let mut objects = Vec::with_capacity(blueprint.items.len());
        let mut failures = Vec::new();
        let mut record = ZoneAssetRecord::default();

        for item in blueprint.items {
            let request = &item.assets;
            let mesh = match self.assets.create_mesh(
                request.geometry_kind,
                &request.geometry,
                request.material_kind,
                &request.material,
            ) {
                Ok(mesh) => mesh,
                Err(source) => {
                    error!(zone = %zone_id, part = %item.name, error = %source, "zone_part_failed");
                    failures.push(SpawnError::Asset {
                        part: item.name,
                        source,
                    });
                    continue;
                }
            };
            record.signatures.insert(mesh.geometry_signature.clone());
            record.signatures.insert(mesh.material_signature.clone());

            if let Some(target) = &item.gate_target {
                let id = gate_id(&zone_id, target);
                self.warp_gates.insert(
                    id.clone(),
                    WarpGate {
                        id,
                        zone: zone_id.clone(),
                        target: target.clone(),
                        position: item.position,
                        state: GateState::Dormant,
                    },
                );
            }

            let object = SceneObject {
                id: self.object_ids.allocate(),
                zone: zone_id.clone(),
                kind: item.kind,
                name: item.name,
                position: item.position,
                mesh: Some(mesh),
                orbit: item.orbit,
            };
            self.scene.attach(&object);
            objects.push(object);
        }

        for (index, feature) in definition.features.iter().copied().enumerate() {
            let Some(factory) = self.factories.get(feature) else {
                warn!(zone = %zone_id, feature = feature.as_token(), "content_factory_missing");
                continue;
            };
            let mut builder = FeatureBuilder::new(definition, feature, index, &mut self.assets);
            let result = factory.spawn(&mut builder);
            for part in builder.into_parts() {
                if let Some(mesh) = &part.mesh {
                    record.signatures.insert(mesh.geometry_signature.clone());
                    record.signatures.insert(mesh.material_signature.clone());
                }
                let object = SceneObject {
                    id: self.object_ids.allocate(),
                    zone: zone_id.clone(),
                    kind: ObjectKind::Feature(feature),
                    name: part.name,
                    position: part.position,
                    mesh: part.mesh,
                    orbit: part.orbit,
                };
                self.scene.attach(&object);
                objects.push(object);
            }
            if let Err(source) = result {
                error!(
                    zone = %zone_id,
                    feature = feature.as_token(),
                    error = %source,
                    "zone_feature_failed"
                );
                failures.push(source);
            }
        }

        record.failed_parts = failures.len();
        let created = objects.len();
        self.zone_meshes
            .entry(zone_id.clone())
            .or_default()
            .extend(objects);
        self.zone_assets.insert(zone_id, record);
        (created, failures)
    }

    fn blueprint_for(&self, definition: &ZoneDefinition) -> ZoneBlueprint {
        let targets: Vec<ZoneId> = self.connections.connections(&definition.id).cloned().collect();
        build_blueprint(definition, &targets, &self.config)
    }

    /// Takes a zone out of the scene without releasing anything it owns.
    fn detach_zone(&mut self, zone: &ZoneId) {
        if self.attached_zone.as_ref() == Some(zone) {
            if let Some(objects) = self.zone_meshes.get(zone) {
                for object in objects {
                    self.scene.detach(object.id);
                }
            }
            self.attached_zone = None;
        }
        self.shell.clear_zone_collections(zone);
        for gate in self.warp_gates.values_mut().filter(|gate| &gate.zone == zone) {
            gate.state = GateState::Dormant;
        }
    }

    fn attach_zone(&mut self, zone: &ZoneId) {
        if let Some(objects) = self.zone_meshes.get(zone) {
            for object in objects {
                self.scene.attach(object);
            }
        }
        self.attached_zone = Some(zone.clone());
    }

    fn release_zone_objects(&mut self, zone: &ZoneId) -> usize {
        let objects = self.zone_meshes.remove(zone).unwrap_or_default();
        let attached = self.attached_zone.as_ref() == Some(zone);
        for object in &objects {
            if attached {
                self.scene.detach(object.id);
            }
            if let Some(mesh) = &object.mesh {
                self.assets.dispose_mesh(mesh);
            }
        }
        if attached {
            self.attached_zone = None;
        }
        self.shell.clear_zone_collections(zone);
        let prefix = format!("{zone}:");
        self.warp_gates.retain(|id, _| !id.starts_with(&prefix));
        objects.len()
    }

    /// Detaches and releases every object registered for `zone` (the current
    /// zone when `None`), drops the shell's collections for it and removes its
    /// warp gates. Safe to repeat.
    pub fn clear_zone_objects(&mut self, zone: Option<&ZoneId>) -> usize {
        let Some(zone) = zone.or(self.current_zone.as_ref()).cloned() else {
            return 0;
        };
        let released = self.release_zone_objects(&zone);
        debug!(zone = %zone, released, "zone_objects_cleared");
        released
    }

    pub fn unload_zone(&mut self, zone: &ZoneId) -> bool {
        let memory = self.memory;
        memory.unload_zone(self, zone)
    }

    pub fn manage_memory(&mut self, incoming: Option<&ZoneId>) -> Vec<ZoneId> {
        let memory = self.memory;
        memory.manage_memory(self, incoming)
    }

    pub fn schedule_preloading(&mut self) -> usize {
        let memory = self.memory;
        memory.schedule_preloading(self)
    }

    pub fn travel_to_zone(&mut self, target: &ZoneId) -> Result<(), TravelRejected> {
        let from = match self.check_travel(target) {
            Ok(from) => from,
            Err(rejection) => {
                info!(target = %target, reason = %rejection, "travel_rejected");
                self.shell.show_message(&rejection.to_string());
                return Err(rejection);
            }
        };

        let duration = self.config.transition_duration();
        self.transition = TransitionState::Warping {
            from: from.clone(),
            target: target.clone(),
            elapsed: Duration::ZERO,
            duration,
        };
        self.events.push_back(ZoneEvent::TransitionStarted {
            from: from.clone(),
            to: target.clone(),
        });
        info!(
            from = %from,
            to = %target,
            duration_ms = duration.as_millis() as u64,
            "warp_started"
        );
        Ok(())
    }

    fn check_travel(&self, target: &ZoneId) -> Result<ZoneId, TravelRejected> {
        if self.is_transitioning() {
            return Err(TravelRejected::AlreadyTransitioning);
        }
        let Some(current) = self.current_zone.clone() else {
            return Err(TravelRejected::NoCurrentZone);
        };
        if !self.zones.contains(target) {
            return Err(TravelRejected::UnknownZone(target.clone()));
        }
        if &current == target {
            return Err(TravelRejected::AlreadyThere(current));
        }
        if !self.connections.is_connected(&current, target) {
            return Err(TravelRejected::NotConnected {
                from: current,
                to: target.clone(),
            });
        }
        if !self.zones.is_unlocked(target) {
            return Err(TravelRejected::Locked(target.clone()));
        }
        Ok(current)
    }

    pub fn update(&mut self, delta: Duration) {
        let reclaimed = self.assets.tick(delta);
        if reclaimed > 0 {
            debug!(reclaimed, "assets_reclaimed");
        }
        self.service_preloads();
        self.advance_transition(delta);
        self.advance_orbits(delta.as_secs_f32());
        self.update_gates();
    }

    fn service_preloads(&mut self) {
        for _ in 0..self.config.preloads_per_tick {
            let Some(zone) = self.preload_queue.pop_front() else {
                break;
            };
            let (warmed, failed) = self.preload_zone(&zone);
            self.preloading.remove(&zone);
            self.counters.preloads_completed = self.counters.preloads_completed.saturating_add(1);
            debug!(zone = %zone, warmed, failed, "preload_finished");
            self.events.push_back(ZoneEvent::PreloadFinished {
                zone,
                warmed,
                failed,
            });
        }
    }

    fn preload_zone(&mut self, zone: &ZoneId) -> (usize, usize) {
        if self.loaded_zones.contains(zone) {
            return (0, 0);
        }
        let Some(definition) = self.zones.get(zone) else {
            warn!(zone = %zone, "preload_zone_missing");
            return (0, 0);
        };
        let blueprint = self.blueprint_for(definition);

        let mut warmed = 0;
        let mut failed = 0;
        for item in &blueprint.items {
            let request = &item.assets;
            let geometry = self
                .assets
                .warm_geometry(request.geometry_kind, &request.geometry);
            let material = self
                .assets
                .warm_material(request.material_kind, &request.material);
            for result in [geometry, material] {
                match result {
                    Ok(_) => warmed += 1,
                    Err(error) => {
                        debug!(zone = %zone, part = %item.name, error = %error, "preload_part_failed");
                        failed += 1;
                    }
                }
            }
        }
        (warmed, failed)
    }

    fn advance_transition(&mut self, delta: Duration) {
        let finished = match &mut self.transition {
            TransitionState::Idle => return,
            TransitionState::Warping {
                elapsed, duration, ..
            } => {
                *elapsed = elapsed.saturating_add(delta);
                *elapsed >= *duration
            }
        };
        if !finished {
            return;
        }

        let TransitionState::Warping { from, target, .. } =
            std::mem::replace(&mut self.transition, TransitionState::Idle)
        else {
            return;
        };

        if let Err(error) = self.load_zone(&target, true) {
            error!(zone = %target, error = %error, "warp_arrival_load_failed");
        }
        if self.current_zone.as_ref() == Some(&target) {
            if self.zones.mark_discovered(&target) {
                self.events.push_back(ZoneEvent::ZoneDiscovered {
                    zone: target.clone(),
                });
            }
            self.shell.zone_changed(&target);
        }
        self.counters.transitions_completed =
            self.counters.transitions_completed.saturating_add(1);
        info!(from = %from, to = %target, "warp_completed");
    }

    fn advance_orbits(&mut self, dt_seconds: f32) {
        let Some(current) = self.current_zone.as_ref() else {
            return;
        };
        let attached = self.attached_zone.as_ref() == Some(current);
        let Some(objects) = self.zone_meshes.get_mut(current) else {
            return;
        };
        for object in objects.iter_mut() {
            if let Some(orbit) = object.orbit.as_mut() {
                object.position = orbit.advance(dt_seconds);
                if attached {
                    self.scene.set_position(object.id, object.position);
                }
            }
        }
    }

    fn update_gates(&mut self) {
        let Some(current) = self.current_zone.clone() else {
            return;
        };
        let player = self.shell.player_position();
        let confirm = self.shell.warp_confirm_pressed();
        let radius = self.config.gate_activation_radius;
        let transitioning = self.is_transitioning();

        let mut entered = Vec::new();
        let mut activated = None;
        for gate in self
            .warp_gates
            .values_mut()
            .filter(|gate| gate.zone == current)
        {
            let in_range = gate.position.distance(player) <= radius;
            if !in_range {
                gate.state = GateState::Dormant;
                continue;
            }
            if gate.state == GateState::Dormant {
                gate.state = GateState::InRange;
                entered.push(gate.target.clone());
            }
            if confirm && !transitioning && activated.is_none() && gate.state == GateState::InRange
            {
                gate.state = GateState::Activated;
                activated = Some((gate.id.clone(), gate.target.clone()));
            }
        }

        for target in entered {
            let name = self
                .zones
                .get(&target)
                .map(|zone| zone.name.clone())
                .unwrap_or_else(|| target.to_string());
            self.shell
                .show_message(&format!("Warp gate to {name} in range. Confirm to jump."));
        }

        if let Some((gate, target)) = activated {
            info!(gate = %gate, target = %target, "warp_gate_activated");
            if self.travel_to_zone(&target).is_err() {
                if let Some(gate) = self.warp_gates.get_mut(&gate) {
                    gate.state = GateState::InRange;
                }
            }
        }
    }

    pub fn unlock_zone(&mut self, zone: &ZoneId) -> bool {
        let changed = self.zones.unlock(zone);
        if changed {
            info!(zone = %zone, "zone_unlocked");
        }
        changed
    }

    /// Marks the zone discovered and always queues a `ZoneDiscovered` event
    /// for a known zone. Returns whether the flag changed.
    pub fn discover_zone(&mut self, zone: &ZoneId) -> bool {
        if !self.zones.contains(zone) {
            return false;
        }
        let changed = self.zones.mark_discovered(zone);
        self.events.push_back(ZoneEvent::ZoneDiscovered { zone: zone.clone() });
        info!(zone = %zone, changed, "zone_discovered");
        changed
    }

    pub fn add_dynamic_zone(&mut self, definition: ZoneDefinition) -> Result<(), ZoneTableError> {
        let id = definition.id.clone();
        self.zones.insert_dynamic(definition)?;
        info!(zone = %id, "dynamic_zone_added");
        Ok(())
    }

    /// New edges get gates the next time the zone is built.
    pub fn add_connection(&mut self, from: &ZoneId, to: &ZoneId, bidirectional: bool) -> bool {
        if !self.zones.contains(from) || !self.zones.contains(to) {
            warn!(from = %from, to = %to, "connection_unknown_zone");
            return false;
        }
        let added = self.connections.add_connection(from, to, bidirectional);
        if added {
            info!(from = %from, to = %to, bidirectional, "zone_connected");
        }
        added
    }

    pub fn zone_connections(&self, zone: &ZoneId) -> Vec<ZoneId> {
        self.connections.connections(zone).cloned().collect()
    }

    pub fn can_travel_to(&self, target: &ZoneId) -> bool {
        self.check_travel(target).is_ok()
    }

    pub fn drain_events(&mut self) -> Vec<ZoneEvent> {
        self.events.drain(..).collect()
    }

    /// Releases every loaded zone and tears down the asset cache.
    pub fn shutdown(&mut self) {
        let zones: Vec<ZoneId> = self.zone_meshes.keys().cloned().collect();
        for zone in &zones {
            self.release_zone_objects(zone);
        }
        self.loaded_zones.clear();
        self.zone_assets.clear();
        self.preloading.clear();
        self.preload_queue.clear();
        self.current_zone = None;
        self.transition = TransitionState::Idle;
        let disposed = self.assets.force_dispose_all();
        info!(zones = zones.len(), disposed, "zone_manager_shutdown");
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn memory_policy(&self) -> ZoneMemoryPolicy {
        self.memory
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn zone_definition(&self, zone: &ZoneId) -> Option<&ZoneDefinition> {
        self.zones.get(zone)
    }

    pub fn graph(&self) -> &ZoneGraph {
        &self.connections
    }

    pub fn start_zone(&self) -> &ZoneId {
        &self.start_zone
    }

    pub fn current_zone(&self) -> Option<&ZoneId> {
        self.current_zone.as_ref()
    }

    pub fn loaded_zones(&self) -> &BTreeSet<ZoneId> {
        &self.loaded_zones
    }

    pub fn is_loaded(&self, zone: &ZoneId) -> bool {
        self.loaded_zones.contains(zone)
    }

    pub fn preloading(&self) -> &BTreeSet<ZoneId> {
        &self.preloading
    }

    pub fn is_preloading(&self, zone: &ZoneId) -> bool {
        self.preloading.contains(zone)
    }

    pub fn zone_objects(&self, zone: &ZoneId) -> &[SceneObject] {
        self.zone_meshes
            .get(zone)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn warp_gates(&self) -> impl Iterator<Item = &WarpGate> {
        self.warp_gates.values()
    }

    pub fn warp_gate(&self, id: &str) -> Option<&WarpGate> {
        self.warp_gates.get(id)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.transition, TransitionState::Warping { .. })
    }

    pub fn transition(&self) -> &TransitionState {
        &self.transition
    }

    /// Fraction of the active warp in `0.0..=1.0`. Purely visual.
    pub fn transition_progress(&self) -> Option<f32> {
        match &self.transition {
            TransitionState::Idle => None,
            TransitionState::Warping {
                elapsed, duration, ..
            } => Some((elapsed.as_secs_f32() / duration.as_secs_f32().max(f32::EPSILON)).min(1.0)),
        }
    }

    pub fn counters(&self) -> StreamingCounters {
        self.counters
    }

    pub fn assets(&self) -> &AssetManager {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetManager {
        &mut self.assets
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn shell(&self) -> &G {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut G {
        &mut self.shell
    }

    pub(crate) fn zone_asset_record(&self, zone: &ZoneId) -> Option<&ZoneAssetRecord> {
        self.zone_assets.get(zone)
    }

    pub(crate) fn forget_loaded_zone(&mut self, zone: &ZoneId) {
        if self.loaded_zones.remove(zone) {
            self.zone_assets.remove(zone);
            self.counters.evictions = self.counters.evictions.saturating_add(1);
            self.events.push_back(ZoneEvent::ZoneUnloaded { zone: zone.clone() });
        }
    }

    pub(crate) fn begin_preload(&mut self, zone: &ZoneId) -> bool {
        if self.preloading.insert(zone.clone()) {
            self.preload_queue.push_back(zone.clone());
            true
        } else {
            false
        }
    }
}
