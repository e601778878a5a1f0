mod blueprint;
mod debug;
mod definition;
mod events;
mod factories;
mod graph;
mod manager;
mod memory;
mod table;

pub use blueprint::{build_blueprint, gate_id, gate_position, AssetRequest, BlueprintItem, ZoneBlueprint};
pub use debug::{ZoneDebugCommand, ZoneDebugRow, ZoneDebugSnapshot};
pub use definition::{FeatureTag, PlanetData, SatelliteDescriptor, ZoneDefinition, ZoneId};
pub use events::ZoneEvent;
pub use factories::{ContentFactories, ContentFactory, FeatureBuilder, SpawnError, SpawnedPart};
pub use graph::ZoneGraph;
pub use manager::{
    GateState, StreamingCounters, TransitionState, TravelRejected, WarpGate, ZoneLoadError,
    ZoneLoadReport, ZoneManager,
};
pub use memory::ZoneMemoryPolicy;
pub use table::{
    load_zone_content, parse_zone_content, ConnectionDef, ZoneContent, ZoneOrigin, ZoneTable,
    ZoneTableError,
};
