use std::collections::HashMap;

use thiserror::Error;

use crate::app::{Orbit, Vec3};
use crate::assets::{AssetError, AssetManager, Mesh, ResourceParams};

use super::definition::{FeatureTag, ZoneDefinition};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("could not create `{part}`")]
    Asset {
        part: String,
        #[source]
        source: AssetError,
    },
    #[error("{feature} factory failed: {message}")]
    Content {
        feature: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedPart {
    pub name: String,
    pub position: Vec3,
    pub mesh: Option<Mesh>,
    pub orbit: Option<Orbit>,
}

/// Handed to a factory while it builds one feature. Parts are collected as
/// they are created, so anything made before a failure is still owned by the
/// zone and released with it.
pub struct FeatureBuilder<'a> {
    zone: &'a ZoneDefinition,
    feature: FeatureTag,
    index: usize,
    assets: &'a mut AssetManager,
    parts: Vec<SpawnedPart>,
}

impl<'a> FeatureBuilder<'a> {
    pub(crate) fn new(
        zone: &'a ZoneDefinition,
        feature: FeatureTag,
        index: usize,
        assets: &'a mut AssetManager,
    ) -> Self {
        Self {
            zone,
            feature,
            index,
            assets,
            parts: Vec::new(),
        }
    }

    pub fn zone(&self) -> &ZoneDefinition {
        self.zone
    }

    pub fn feature(&self) -> FeatureTag {
        self.feature
    }

    /// Position of this feature among the zone's features.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        position: Vec3,
        geometry_kind: &str,
        geometry: &ResourceParams,
        material_kind: &str,
        material: &ResourceParams,
    ) -> Result<(), SpawnError> {
        let name = name.into();
        let mesh = self
            .assets
            .create_mesh(geometry_kind, geometry, material_kind, material)
            .map_err(|source| SpawnError::Asset {
                part: name.clone(),
                source,
            })?;
        self.parts.push(SpawnedPart {
            name,
            position,
            mesh: Some(mesh),
            orbit: None,
        });
        Ok(())
    }

    pub fn add_orbiting_mesh(
        &mut self,
        name: impl Into<String>,
        orbit: Orbit,
        geometry_kind: &str,
        geometry: &ResourceParams,
        material_kind: &str,
        material: &ResourceParams,
    ) -> Result<(), SpawnError> {
        self.add_mesh(
            name,
            orbit.position(),
            geometry_kind,
            geometry,
            material_kind,
            material,
        )?;
        if let Some(part) = self.parts.last_mut() {
            part.orbit = Some(orbit);
        }
        Ok(())
    }

    /// A logical object with no renderable, such as a trigger volume.
    pub fn add_marker(&mut self, name: impl Into<String>, position: Vec3) {
        self.parts.push(SpawnedPart {
            name: name.into(),
            position,
            mesh: None,
            orbit: None,
        });
    }

    pub(crate) fn into_parts(self) -> Vec<SpawnedPart> {
        self.parts
    }
}

pub trait ContentFactory {
    fn spawn(&self, builder: &mut FeatureBuilder<'_>) -> Result<(), SpawnError>;
}

impl<F> ContentFactory for F
where
    F: Fn(&mut FeatureBuilder<'_>) -> Result<(), SpawnError>,
{
    fn spawn(&self, builder: &mut FeatureBuilder<'_>) -> Result<(), SpawnError> {
        self(builder)
    }
}

/// Constructors for zone features, injected when the zone manager is built.
#[derive(Default)]
pub struct ContentFactories {
    by_feature: HashMap<FeatureTag, Box<dyn ContentFactory>>,
}

impl ContentFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: FeatureTag, factory: impl ContentFactory + 'static) -> Self {
        self.register(feature, factory);
        self
    }

    /// Replaces any factory already registered for `feature`.
    pub fn register(&mut self, feature: FeatureTag, factory: impl ContentFactory + 'static) {
        self.by_feature.insert(feature, Box::new(factory));
    }

    pub fn get(&self, feature: FeatureTag) -> Option<&dyn ContentFactory> {
        self.by_feature.get(&feature).map(|factory| factory.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_feature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_feature.is_empty()
    }
}
