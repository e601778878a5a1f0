use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, trace};

use super::backend::{BackendError, GpuHandle, ResourceBackend};
use super::descriptors::{GeometryDesc, MaterialDesc};
use super::signature::{compute_signature, ResourceClass, ResourceParams, ResourceSignature};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(pub u64);

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to create {class} resource `{kind}`")]
    Backend {
        class: &'static str,
        kind: String,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    pub max_unused_time: Duration,
    pub gc_interval: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_unused_time: Duration::from_millis(30_000),
            gc_interval: Duration::from_millis(10_000),
        }
    }
}

/// A renderable composed from one cached geometry and one cached material.
///
/// The signatures and owner stamp are what `dispose_mesh` uses to release the
/// right cache entries; a mesh from another manager is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    id: MeshId,
    owner: ManagerId,
    pub geometry: GpuHandle,
    pub material: GpuHandle,
    pub geometry_signature: ResourceSignature,
    pub material_signature: ResourceSignature,
}

impl Mesh {
    pub fn id(&self) -> MeshId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub geometries: usize,
    pub materials: usize,
    pub live_meshes: usize,
    pub total_references: u64,
    pub pending_reclaims: usize,
    pub estimated_bytes: u64,
    pub created_total: u64,
    pub disposed_total: u64,
}

#[derive(Debug)]
struct CachedResource {
    handle: GpuHandle,
    ref_count: u32,
    last_used: Duration,
    bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ReclaimEntry {
    due: Duration,
    class: ResourceClass,
    signature: ResourceSignature,
}

#[derive(Debug, Default)]
struct ResourceTable {
    entries: HashMap<ResourceSignature, CachedResource>,
}

impl ResourceTable {
    fn acquire(&mut self, signature: &ResourceSignature, now: Duration) -> Option<GpuHandle> {
        let entry = self.entries.get_mut(signature)?;
        entry.ref_count = entry.ref_count.saturating_add(1);
        entry.last_used = now;
        Some(entry.handle)
    }

    /// Returns the new count, or `None` when the signature is not cached.
    fn release(&mut self, signature: &ResourceSignature, now: Duration) -> Option<u32> {
        let entry = self.entries.get_mut(signature)?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        entry.last_used = now;
        Some(entry.ref_count)
    }

    fn is_reclaimable(
        &self,
        signature: &ResourceSignature,
        now: Duration,
        max_unused: Duration,
    ) -> bool {
        self.entries.get(signature).is_some_and(|entry| {
            entry.ref_count == 0 && now.saturating_sub(entry.last_used) >= max_unused
        })
    }

    fn reclaimable(&self, now: Duration, max_unused: Duration) -> Vec<ResourceSignature> {
        let mut signatures: Vec<ResourceSignature> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.ref_count == 0 && now.saturating_sub(entry.last_used) >= max_unused
            })
            .map(|(signature, _)| signature.clone())
            .collect();
        signatures.sort();
        signatures
    }

    fn total_references(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |total, entry| {
                total.saturating_add(u64::from(entry.ref_count))
            })
    }

    fn total_bytes(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |total, entry| total.saturating_add(entry.bytes))
    }
}

pub struct AssetManager {
    id: ManagerId,
    backend: Box<dyn ResourceBackend>,
    policy: CachePolicy,
    geometries: ResourceTable,
    materials: ResourceTable,
    reclaim_queue: BinaryHeap<Reverse<ReclaimEntry>>,
    live_meshes: HashSet<MeshId>,
    next_mesh_id: u64,
    now: Duration,
    since_last_sweep: Duration,
    created_total: u64,
    disposed_total: u64,
}

impl AssetManager {
    pub fn new(backend: Box<dyn ResourceBackend>, policy: CachePolicy) -> Self {
        Self {
            id: ManagerId(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed)),
            backend,
            policy,
            geometries: ResourceTable::default(),
            materials: ResourceTable::default(),
            reclaim_queue: BinaryHeap::new(),
            live_meshes: HashSet::new(),
            next_mesh_id: 0,
            now: Duration::ZERO,
            since_last_sweep: Duration::ZERO,
            created_total: 0,
            disposed_total: 0,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn backend(&self) -> &dyn ResourceBackend {
        self.backend.as_ref()
    }

    pub fn get_geometry(
        &mut self,
        kind: &str,
        params: &ResourceParams,
    ) -> Result<GpuHandle, AssetError> {
        let signature = compute_signature(ResourceClass::Geometry, kind, params);
        self.acquire_geometry(&signature, kind, params)
    }

    pub fn get_material(
        &mut self,
        kind: &str,
        params: &ResourceParams,
    ) -> Result<GpuHandle, AssetError> {
        let signature = compute_signature(ResourceClass::Material, kind, params);
        self.acquire_material(&signature, kind, params)
    }

    fn acquire_geometry(
        &mut self,
        signature: &ResourceSignature,
        kind: &str,
        params: &ResourceParams,
    ) -> Result<GpuHandle, AssetError> {
        if let Some(handle) = self.geometries.acquire(signature, self.now) {
            trace!(signature = %signature, "geometry_cache_hit");
            return Ok(handle);
        }

        let desc = GeometryDesc::resolve(kind, params);
        let handle = self
            .backend
            .create_geometry(&desc)
            .map_err(|source| AssetError::Backend {
                class: ResourceClass::Geometry.as_token(),
                kind: kind.to_string(),
                source,
            })?;
        self.geometries.entries.insert(
            signature.clone(),
            CachedResource {
                handle,
                ref_count: 1,
                last_used: self.now,
                bytes: desc.estimated_bytes(),
            },
        );
        self.created_total = self.created_total.saturating_add(1);
        debug!(signature = %signature, bytes = desc.estimated_bytes(), "geometry_created");
        Ok(handle)
    }

    fn acquire_material(
        &mut self,
        signature: &ResourceSignature,
        kind: &str,
        params: &ResourceParams,
    ) -> Result<GpuHandle, AssetError> {
        if let Some(handle) = self.materials.acquire(signature, self.now) {
            trace!(signature = %signature, "material_cache_hit");
            return Ok(handle);
        }

        let desc = MaterialDesc::resolve(kind, params);
        let handle = self
            .backend
            .create_material(&desc)
            .map_err(|source| AssetError::Backend {
                class: ResourceClass::Material.as_token(),
                kind: kind.to_string(),
                source,
            })?;
        self.materials.entries.insert(
            signature.clone(),
            CachedResource {
                handle,
                ref_count: 1,
                last_used: self.now,
                bytes: desc.estimated_bytes(),
            },
        );
        self.created_total = self.created_total.saturating_add(1);
        debug!(signature = %signature, "material_created");
        Ok(handle)
    }

    pub fn create_mesh(
        &mut self,
        geometry_kind: &str,
        geometry_params: &ResourceParams,
        material_kind: &str,
        material_params: &ResourceParams,
    ) -> Result<Mesh, AssetError> {
        let geometry_signature =
            compute_signature(ResourceClass::Geometry, geometry_kind, geometry_params);
        let geometry =
            self.acquire_geometry(&geometry_signature, geometry_kind, geometry_params)?;

        let material_signature =
            compute_signature(ResourceClass::Material, material_kind, material_params);
        let material =
            match self.acquire_material(&material_signature, material_kind, material_params) {
                Ok(handle) => handle,
                Err(error) => {
                    self.remove_geometry_ref(&geometry_signature);
                    return Err(error);
                }
            };

        let id = MeshId(self.next_mesh_id);
        self.next_mesh_id = self.next_mesh_id.saturating_add(1);
        self.live_meshes.insert(id);
        Ok(Mesh {
            id,
            owner: self.id,
            geometry,
            material,
            geometry_signature,
            material_signature,
        })
    }

    pub fn owns(&self, mesh: &Mesh) -> bool {
        mesh.owner == self.id && self.live_meshes.contains(&mesh.id)
    }

    /// Releases both references held by `mesh`. Returns `false` for meshes
    /// this manager did not create or has already disposed.
    pub fn dispose_mesh(&mut self, mesh: &Mesh) -> bool {
        if mesh.owner != self.id || !self.live_meshes.remove(&mesh.id) {
            return false;
        }
        self.remove_geometry_ref(&mesh.geometry_signature);
        self.remove_material_ref(&mesh.material_signature);
        true
    }

    pub fn remove_geometry_ref(&mut self, signature: &ResourceSignature) -> bool {
        self.release(ResourceClass::Geometry, signature)
    }

    pub fn remove_material_ref(&mut self, signature: &ResourceSignature) -> bool {
        self.release(ResourceClass::Material, signature)
    }

    fn release(&mut self, class: ResourceClass, signature: &ResourceSignature) -> bool {
        let table = match class {
            ResourceClass::Geometry => &mut self.geometries,
            ResourceClass::Material => &mut self.materials,
        };
        let Some(remaining) = table.release(signature, self.now) else {
            return false;
        };
        if remaining == 0 {
            let due = self.now.saturating_add(self.policy.max_unused_time);
            self.reclaim_queue.push(Reverse(ReclaimEntry {
                due,
                class,
                signature: signature.clone(),
            }));
            trace!(signature = %signature, due_ms = due.as_millis() as u64, "reclaim_scheduled");
        }
        true
    }

    /// Acquire-then-release: leaves the resource cached and unreferenced with
    /// a fresh timestamp so a later `get_*` hits without a new allocation.
    pub fn warm_geometry(
        &mut self,
        kind: &str,
        params: &ResourceParams,
    ) -> Result<ResourceSignature, AssetError> {
        let signature = compute_signature(ResourceClass::Geometry, kind, params);
        self.acquire_geometry(&signature, kind, params)?;
        self.remove_geometry_ref(&signature);
        Ok(signature)
    }

    pub fn warm_material(
        &mut self,
        kind: &str,
        params: &ResourceParams,
    ) -> Result<ResourceSignature, AssetError> {
        let signature = compute_signature(ResourceClass::Material, kind, params);
        self.acquire_material(&signature, kind, params)?;
        self.remove_material_ref(&signature);
        Ok(signature)
    }

    /// Advances the cache clock, services due reclaim checks, and runs the
    /// periodic sweep once per `gc_interval`. Returns the number of disposed
    /// resources.
    pub fn tick(&mut self, delta: Duration) -> usize {
        self.now = self.now.saturating_add(delta);
        self.since_last_sweep = self.since_last_sweep.saturating_add(delta);

        let mut disposed = 0;
        while let Some(Reverse(entry)) = self.reclaim_queue.peek() {
            if entry.due > self.now {
                break;
            }
            let Some(Reverse(entry)) = self.reclaim_queue.pop() else {
                break;
            };
            if self.dispose_if_reclaimable(entry.class, &entry.signature) {
                disposed += 1;
            }
        }

        if self.since_last_sweep >= self.policy.gc_interval {
            self.since_last_sweep = Duration::ZERO;
            disposed += self.perform_garbage_collection();
        }
        disposed
    }

    pub fn perform_garbage_collection(&mut self) -> usize {
        let max_unused = self.policy.max_unused_time;
        let geometries = self.geometries.reclaimable(self.now, max_unused);
        let materials = self.materials.reclaimable(self.now, max_unused);

        let mut disposed = 0;
        for signature in &geometries {
            if self.dispose_if_reclaimable(ResourceClass::Geometry, signature) {
                disposed += 1;
            }
        }
        for signature in &materials {
            if self.dispose_if_reclaimable(ResourceClass::Material, signature) {
                disposed += 1;
            }
        }
        if disposed > 0 {
            debug!(
                disposed,
                geometries = self.geometries.entries.len(),
                materials = self.materials.entries.len(),
                "asset_gc_sweep"
            );
        }
        self.compact_reclaim_queue();
        disposed
    }

    fn dispose_if_reclaimable(&mut self, class: ResourceClass, signature: &ResourceSignature) -> bool {
        let max_unused = self.policy.max_unused_time;
        let table = match class {
            ResourceClass::Geometry => &mut self.geometries,
            ResourceClass::Material => &mut self.materials,
        };
        if !table.is_reclaimable(signature, self.now, max_unused) {
            return false;
        }
        let Some(entry) = table.entries.remove(signature) else {
            return false;
        };
        match class {
            ResourceClass::Geometry => self.backend.dispose_geometry(entry.handle),
            ResourceClass::Material => self.backend.dispose_material(entry.handle),
        }
        self.disposed_total = self.disposed_total.saturating_add(1);
        trace!(signature = %signature, bytes = entry.bytes, "resource_disposed");
        true
    }

    fn compact_reclaim_queue(&mut self) {
        let geometries = &self.geometries;
        let materials = &self.materials;
        self.reclaim_queue.retain(|Reverse(entry)| match entry.class {
            ResourceClass::Geometry => geometries.entries.contains_key(&entry.signature),
            ResourceClass::Material => materials.entries.contains_key(&entry.signature),
        });
    }

    /// Disposes every cached resource regardless of outstanding references.
    pub fn force_dispose_all(&mut self) -> usize {
        let mut disposed = 0;
        for (_, entry) in self.geometries.entries.drain() {
            self.backend.dispose_geometry(entry.handle);
            disposed += 1;
        }
        for (_, entry) in self.materials.entries.drain() {
            self.backend.dispose_material(entry.handle);
            disposed += 1;
        }
        self.reclaim_queue.clear();
        self.live_meshes.clear();
        self.disposed_total = self.disposed_total.saturating_add(disposed as u64);
        info!(disposed, "asset_cache_cleared");
        disposed
    }

    pub fn ref_count(&self, signature: &ResourceSignature) -> Option<u32> {
        self.table_for(signature)
            .and_then(|table| table.entries.get(signature))
            .map(|entry| entry.ref_count)
    }

    pub fn contains(&self, signature: &ResourceSignature) -> bool {
        self.table_for(signature)
            .is_some_and(|table| table.entries.contains_key(signature))
    }

    fn table_for(&self, signature: &ResourceSignature) -> Option<&ResourceTable> {
        match signature.class()? {
            ResourceClass::Geometry => Some(&self.geometries),
            ResourceClass::Material => Some(&self.materials),
        }
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.entries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.entries.len()
    }

    pub fn stats(&self) -> AssetStats {
        AssetStats {
            geometries: self.geometries.entries.len(),
            materials: self.materials.entries.len(),
            live_meshes: self.live_meshes.len(),
            total_references: self.geometries.total_references()
                + self.materials.total_references(),
            pending_reclaims: self.reclaim_queue.len(),
            estimated_bytes: self
                .geometries
                .total_bytes()
                .saturating_add(self.materials.total_bytes()),
            created_total: self.created_total,
            disposed_total: self.disposed_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::backend::HeadlessBackend;

    fn manager() -> AssetManager {
        AssetManager::new(Box::new(HeadlessBackend::new()), CachePolicy::default())
    }

    fn sphere(radius: f64) -> ResourceParams {
        ResourceParams::new().with("radius", radius)
    }

    #[test]
    fn equal_params_share_one_handle() {
        let mut assets = manager();
        let a = assets.get_geometry("sphere", &sphere(50.0)).expect("first");
        let b = assets.get_geometry("sphere", &sphere(50.0)).expect("second");
        assert_eq!(a, b);
        assert_eq!(assets.geometry_count(), 1);
        let signature = compute_signature(ResourceClass::Geometry, "sphere", &sphere(50.0));
        assert_eq!(assets.ref_count(&signature), Some(2));
    }

    #[test]
    fn oversized_segment_counts_still_create_a_geometry() {
        let mut assets = manager();
        let params = ResourceParams::new()
            .with("widthSegments", 1e10)
            .with("heightSegments", 1e10);
        assets.get_geometry("sphere", &params).expect("clamped sphere");

        assert_eq!(assets.geometry_count(), 1);
        assert!(assets.stats().estimated_bytes > 0);
    }

    #[test]
    fn refcount_saturates_at_zero() {
        let mut assets = manager();
        assets.get_geometry("sphere", &sphere(1.0)).expect("geometry");
        let signature = compute_signature(ResourceClass::Geometry, "sphere", &sphere(1.0));
        assert!(assets.remove_geometry_ref(&signature));
        assert!(assets.remove_geometry_ref(&signature));
        assert_eq!(assets.ref_count(&signature), Some(0));
    }

    #[test]
    fn release_of_unknown_signature_is_noop() {
        let mut assets = manager();
        let signature = compute_signature(ResourceClass::Material, "basic", &ResourceParams::new());
        assert!(!assets.remove_material_ref(&signature));
        assert_eq!(assets.stats().pending_reclaims, 0);
    }

    #[test]
    fn reclaim_waits_for_debounce_window() {
        let mut assets = manager();
        assets.get_geometry("sphere", &sphere(1.0)).expect("geometry");
        let signature = compute_signature(ResourceClass::Geometry, "sphere", &sphere(1.0));
        assets.remove_geometry_ref(&signature);

        assert_eq!(assets.tick(Duration::from_millis(29_999)), 0);
        assert!(assets.contains(&signature));
        assert_eq!(assets.tick(Duration::from_millis(1)), 1);
        assert!(!assets.contains(&signature));
        assert_eq!(assets.backend().live_allocations(), 0);
    }

    #[test]
    fn reacquired_resource_survives_delayed_check() {
        let mut assets = manager();
        assets.get_geometry("sphere", &sphere(1.0)).expect("geometry");
        let signature = compute_signature(ResourceClass::Geometry, "sphere", &sphere(1.0));
        assets.remove_geometry_ref(&signature);
        assets.tick(Duration::from_millis(5_000));
        assets.get_geometry("sphere", &sphere(1.0)).expect("reacquire");

        assets.tick(Duration::from_millis(40_000));
        assert!(assets.contains(&signature));
        assert_eq!(assets.ref_count(&signature), Some(1));
    }

    #[test]
    fn stale_heap_entry_does_not_dispose_recently_released_resource() {
        let mut assets = manager();
        let signature = compute_signature(ResourceClass::Geometry, "sphere", &sphere(1.0));
        assets.get_geometry("sphere", &sphere(1.0)).expect("geometry");
        assets.remove_geometry_ref(&signature);
        assets.tick(Duration::from_millis(20_000));
        assets.get_geometry("sphere", &sphere(1.0)).expect("reacquire");
        assets.remove_geometry_ref(&signature);

        // First entry is due at 30s, but the resource was released again at 20s.
        assets.tick(Duration::from_millis(10_000));
        assert!(assets.contains(&signature));
        assets.tick(Duration::from_millis(20_000));
        assert!(!assets.contains(&signature));
    }

    #[test]
    fn sweep_skips_referenced_resources() {
        let mut assets = manager();
        assets.get_geometry("sphere", &sphere(1.0)).expect("held");
        assets.get_geometry("sphere", &sphere(2.0)).expect("released");
        let released = compute_signature(ResourceClass::Geometry, "sphere", &sphere(2.0));
        assets.remove_geometry_ref(&released);

        assets.tick(Duration::from_secs(60));
        assert_eq!(assets.perform_garbage_collection(), 0);
        assert_eq!(assets.geometry_count(), 1);
        assert!(!assets.contains(&released));
    }

    #[test]
    fn mesh_roundtrip_releases_both_references() {
        let mut assets = manager();
        let mesh = assets
            .create_mesh("sphere", &sphere(5.0), "standard", &ResourceParams::new())
            .expect("mesh");
        assert!(assets.owns(&mesh));
        assert_eq!(assets.ref_count(&mesh.geometry_signature), Some(1));
        assert_eq!(assets.ref_count(&mesh.material_signature), Some(1));

        assert!(assets.dispose_mesh(&mesh));
        assert!(!assets.dispose_mesh(&mesh));
        assert_eq!(assets.ref_count(&mesh.geometry_signature), Some(0));
        assert_eq!(assets.ref_count(&mesh.material_signature), Some(0));
    }

    #[test]
    fn foreign_mesh_is_ignored() {
        let mut first = manager();
        let mut second = manager();
        let mesh = first
            .create_mesh("box", &ResourceParams::new(), "basic", &ResourceParams::new())
            .expect("mesh");
        second
            .create_mesh("box", &ResourceParams::new(), "basic", &ResourceParams::new())
            .expect("mesh");

        assert!(!second.dispose_mesh(&mesh));
        assert_eq!(second.ref_count(&mesh.geometry_signature), Some(1));
    }

    #[test]
    fn failed_material_releases_geometry() {
        let backend = HeadlessBackend::new().with_failing_material("phong");
        let mut assets = AssetManager::new(Box::new(backend), CachePolicy::default());
        let error = assets
            .create_mesh("sphere", &sphere(3.0), "phong", &ResourceParams::new())
            .expect_err("material should fail");
        assert!(matches!(error, AssetError::Backend { class: "material", .. }));

        let geometry = compute_signature(ResourceClass::Geometry, "sphere", &sphere(3.0));
        assert_eq!(assets.ref_count(&geometry), Some(0));
        assert_eq!(assets.stats().live_meshes, 0);
    }

    #[test]
    fn warmed_resource_is_cached_unreferenced() {
        let mut assets = manager();
        let signature = assets.warm_geometry("torus", &ResourceParams::new()).expect("warm");
        assert_eq!(assets.ref_count(&signature), Some(0));

        let created = assets.stats().created_total;
        assets.get_geometry("torus", &ResourceParams::new()).expect("hit");
        assert_eq!(assets.stats().created_total, created);
        assert_eq!(assets.ref_count(&signature), Some(1));
    }

    #[test]
    fn force_dispose_ignores_references() {
        let mut assets = manager();
        assets
            .create_mesh("sphere", &sphere(1.0), "basic", &ResourceParams::new())
            .expect("mesh");
        assets.warm_material("points", &ResourceParams::new()).expect("warm");

        assert_eq!(assets.force_dispose_all(), 3);
        let stats = assets.stats();
        assert_eq!(stats.geometries + stats.materials, 0);
        assert_eq!(stats.live_meshes, 0);
        assert_eq!(stats.pending_reclaims, 0);
        assert_eq!(assets.backend().live_allocations(), 0);
    }
}
