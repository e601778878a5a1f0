mod backend;
mod descriptors;
mod manager;
mod signature;

pub use backend::{BackendError, GpuHandle, HeadlessBackend, ResourceBackend};
pub use descriptors::{
    GeometryDesc, GeometryKind, GeometryShape, MaterialDesc, MaterialKind, MAX_SEGMENTS,
};
pub use manager::{AssetError, AssetManager, AssetStats, CachePolicy, ManagerId, Mesh, MeshId};
pub use signature::{
    compute_signature, ParamValue, ResourceClass, ResourceParams, ResourceSignature,
};
