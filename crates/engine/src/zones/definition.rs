use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::app::Vec3;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureTag {
    SpaceStation,
    AsteroidField,
    MiningColony,
    GasStation,
}

impl FeatureTag {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::SpaceStation => "space_station",
            Self::AsteroidField => "asteroid_field",
            Self::MiningColony => "mining_colony",
            Self::GasStation => "gas_station",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanetData {
    pub radius: f32,
    #[serde(default = "default_planet_color")]
    pub color: u32,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub has_atmosphere: bool,
    #[serde(default)]
    pub facts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SatelliteDescriptor {
    pub name: String,
    pub radius: f32,
    pub orbital_distance: f32,
    #[serde(default)]
    pub discovered: bool,
    /// Radians per second.
    #[serde(default = "default_orbital_speed")]
    pub orbital_speed: f32,
    #[serde(default = "default_satellite_color")]
    pub color: u32,
}

/// Authored description of one zone. `unlocked` and `discovered` only ever
/// move from `false` to `true`; [`super::ZoneTable`] enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneDefinition {
    pub id: ZoneId,
    pub name: String,
    pub ring_position: u32,
    pub radius: f32,
    pub solar_distance: f32,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub discovered: bool,
    pub planet: PlanetData,
    #[serde(default)]
    pub satellites: Vec<SatelliteDescriptor>,
    #[serde(default)]
    pub features: Vec<FeatureTag>,
}

impl ZoneDefinition {
    /// Where this zone sits in the shared solar frame. Zones are rendered in
    /// their own local space, so the scene origin is moved here on load.
    pub fn world_anchor(&self) -> Vec3 {
        Vec3::new(self.solar_distance, 0.0, self.ring_position as f32 * self.radius)
    }

    pub fn discovered_satellites(&self) -> impl Iterator<Item = &SatelliteDescriptor> {
        self.satellites.iter().filter(|satellite| satellite.discovered)
    }
}

fn default_planet_color() -> u32 {
    0x8899aa
}

fn default_satellite_color() -> u32 {
    0xaaaaaa
}

fn default_orbital_speed() -> f32 {
    0.1
}
