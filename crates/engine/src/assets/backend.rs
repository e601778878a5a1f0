use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::descriptors::{GeometryDesc, MaterialDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GpuHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend rejected {kind} geometry: {reason}")]
    Geometry { kind: String, reason: String },
    #[error("backend rejected {kind} material: {reason}")]
    Material { kind: String, reason: String },
}

/// Device side of the asset cache. Implementations allocate and free GPU
/// resources; the cache owns every decision about when to do either.
pub trait ResourceBackend {
    fn create_geometry(&mut self, desc: &GeometryDesc) -> Result<GpuHandle, BackendError>;
    fn create_material(&mut self, desc: &MaterialDesc) -> Result<GpuHandle, BackendError>;
    fn dispose_geometry(&mut self, handle: GpuHandle);
    fn dispose_material(&mut self, handle: GpuHandle);
    fn live_allocations(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllocationClass {
    Geometry,
    Material,
}

/// Allocation-tracking backend used by the headless host and tests.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    live: HashMap<GpuHandle, AllocationClass>,
    failing_geometry_kinds: HashSet<String>,
    failing_material_kinds: HashSet<String>,
    created_total: u64,
    disposed_total: u64,
    double_disposals: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_geometry(mut self, kind: &str) -> Self {
        self.failing_geometry_kinds.insert(kind.to_ascii_lowercase());
        self
    }

    pub fn with_failing_material(mut self, kind: &str) -> Self {
        self.failing_material_kinds.insert(kind.to_ascii_lowercase());
        self
    }

    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn created_total(&self) -> u64 {
        self.created_total
    }

    pub fn disposed_total(&self) -> u64 {
        self.disposed_total
    }

    pub fn double_disposals(&self) -> u64 {
        self.double_disposals
    }

    fn allocate(&mut self, class: AllocationClass) -> GpuHandle {
        let handle = GpuHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.live.insert(handle, class);
        self.created_total = self.created_total.saturating_add(1);
        handle
    }

    fn free(&mut self, handle: GpuHandle, class: AllocationClass) {
        match self.live.get(&handle) {
            Some(existing) if *existing == class => {
                self.live.remove(&handle);
                self.disposed_total = self.disposed_total.saturating_add(1);
            }
            _ => {
                self.double_disposals = self.double_disposals.saturating_add(1);
            }
        }
    }
}

impl ResourceBackend for HeadlessBackend {
    fn create_geometry(&mut self, desc: &GeometryDesc) -> Result<GpuHandle, BackendError> {
        let requested = desc.requested_kind.trim().to_ascii_lowercase();
        if self.failing_geometry_kinds.contains(&requested)
            || self.failing_geometry_kinds.contains(desc.kind.as_token())
        {
            return Err(BackendError::Geometry {
                kind: requested,
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.allocate(AllocationClass::Geometry))
    }

    fn create_material(&mut self, desc: &MaterialDesc) -> Result<GpuHandle, BackendError> {
        let requested = desc.requested_kind.trim().to_ascii_lowercase();
        if self.failing_material_kinds.contains(&requested)
            || self.failing_material_kinds.contains(desc.kind.as_token())
        {
            return Err(BackendError::Material {
                kind: requested,
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.allocate(AllocationClass::Material))
    }

    fn dispose_geometry(&mut self, handle: GpuHandle) {
        self.free(handle, AllocationClass::Geometry);
    }

    fn dispose_material(&mut self, handle: GpuHandle) {
        self.free(handle, AllocationClass::Material);
    }

    fn live_allocations(&self) -> usize {
        self.live.len()
    }
}
