use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::definition::{ZoneDefinition, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneOrigin {
    /// Authored content loaded at startup.
    Static,
    /// Added while the game runs.
    Dynamic,
}

#[derive(Debug, Error)]
pub enum ZoneTableError {
    #[error("failed to read zone table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse zone table {label}: {message}")]
    Parse { label: String, message: String },
    #[error("zone table {label}: validation failed at {path}: {message}")]
    Invalid {
        label: String,
        path: String,
        message: String,
    },
    #[error("zone `{0}` is already defined")]
    DuplicateZone(ZoneId),
}

#[derive(Debug, Clone)]
struct ZoneEntry {
    definition: ZoneDefinition,
    origin: ZoneOrigin,
}

/// Zone definitions indexed by id. Ids never change once inserted and flags
/// only move forward.
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    entries: Vec<ZoneEntry>,
    index: HashMap<ZoneId, usize>,
}

impl ZoneTable {
    pub fn from_static(definitions: Vec<ZoneDefinition>) -> Result<Self, ZoneTableError> {
        let mut table = Self::default();
        for definition in definitions {
            table.insert(definition, ZoneOrigin::Static)?;
        }
        Ok(table)
    }

    pub fn insert_dynamic(&mut self, definition: ZoneDefinition) -> Result<(), ZoneTableError> {
        let label = format!("dynamic zone `{}`", definition.id);
        validate_definition(&definition, &label, "zone")?;
        self.insert(definition, ZoneOrigin::Dynamic)
    }

    fn insert(
        &mut self,
        definition: ZoneDefinition,
        origin: ZoneOrigin,
    ) -> Result<(), ZoneTableError> {
        if self.index.contains_key(&definition.id) {
            return Err(ZoneTableError::DuplicateZone(definition.id));
        }
        self.index.insert(definition.id.clone(), self.entries.len());
        self.entries.push(ZoneEntry { definition, origin });
        Ok(())
    }

    pub fn get(&self, id: &ZoneId) -> Option<&ZoneDefinition> {
        self.index
            .get(id)
            .and_then(|idx| self.entries.get(*idx))
            .map(|entry| &entry.definition)
    }

    pub fn contains(&self, id: &ZoneId) -> bool {
        self.index.contains_key(id)
    }

    pub fn origin(&self, id: &ZoneId) -> Option<ZoneOrigin> {
        self.index
            .get(id)
            .and_then(|idx| self.entries.get(*idx))
            .map(|entry| entry.origin)
    }

    pub fn is_unlocked(&self, id: &ZoneId) -> bool {
        self.get(id).is_some_and(|zone| zone.unlocked)
    }

    /// Returns `true` only when the flag actually flipped.
    pub fn unlock(&mut self, id: &ZoneId) -> bool {
        match self.get_mut(id) {
            Some(zone) if !zone.unlocked => {
                zone.unlocked = true;
                true
            }
            _ => false,
        }
    }

    pub fn mark_discovered(&mut self, id: &ZoneId) -> bool {
        match self.get_mut(id) {
            Some(zone) if !zone.discovered => {
                zone.discovered = true;
                true
            }
            _ => false,
        }
    }

    fn get_mut(&mut self, id: &ZoneId) -> Option<&mut ZoneDefinition> {
        let idx = *self.index.get(id)?;
        self.entries.get_mut(idx).map(|entry| &mut entry.definition)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneDefinition, ZoneOrigin)> {
        self.entries
            .iter()
            .map(|entry| (&entry.definition, entry.origin))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn static_count(&self) -> usize {
        self.count_origin(ZoneOrigin::Static)
    }

    pub fn dynamic_count(&self) -> usize {
        self.count_origin(ZoneOrigin::Dynamic)
    }

    fn count_origin(&self, origin: ZoneOrigin) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.origin == origin)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionDef {
    pub from: ZoneId,
    pub to: ZoneId,
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
}

fn default_bidirectional() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ZoneContentFile {
    start_zone: ZoneId,
    zones: Vec<ZoneDefinition>,
    #[serde(default)]
    connections: Vec<ConnectionDef>,
}

/// Everything the zone manager needs from authored content.
#[derive(Debug, Clone)]
pub struct ZoneContent {
    pub table: ZoneTable,
    pub connections: Vec<ConnectionDef>,
    pub start_zone: ZoneId,
}

pub fn load_zone_content(path: &Path) -> Result<ZoneContent, ZoneTableError> {
    let raw = fs::read_to_string(path).map_err(|source| ZoneTableError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_zone_content(&raw, &path.display().to_string())
}

pub fn parse_zone_content(raw: &str, label: &str) -> Result<ZoneContent, ZoneTableError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let file = match serde_path_to_error::deserialize::<_, ZoneContentFile>(&mut deserializer) {
        Ok(file) => file,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            let message = if path.is_empty() || path == "." {
                source.to_string()
            } else {
                format!("at {path}: {source}")
            };
            return Err(ZoneTableError::Parse {
                label: label.to_string(),
                message,
            });
        }
    };

    validate_content_file(&file, label)?;

    let ZoneContentFile {
        start_zone,
        zones,
        connections,
    } = file;
    let mut table = ZoneTable::from_static(zones)?;
    table.unlock(&start_zone);
    table.mark_discovered(&start_zone);

    Ok(ZoneContent {
        table,
        connections,
        start_zone,
    })
}

fn validate_content_file(file: &ZoneContentFile, label: &str) -> Result<(), ZoneTableError> {
    let invalid = |path: String, message: String| ZoneTableError::Invalid {
        label: label.to_string(),
        path,
        message,
    };

    if file.zones.is_empty() {
        return Err(invalid("zones".to_string(), "expected at least one zone".to_string()));
    }

    let mut seen = HashSet::with_capacity(file.zones.len());
    for (idx, zone) in file.zones.iter().enumerate() {
        let prefix = format!("zones[{idx}]");
        validate_definition(zone, label, &prefix)?;
        if !seen.insert(&zone.id) {
            return Err(invalid(
                format!("{prefix}.id"),
                format!("duplicate zone id `{}`", zone.id),
            ));
        }
    }

    if !seen.contains(&file.start_zone) {
        return Err(invalid(
            "start_zone".to_string(),
            format!("unknown zone `{}`", file.start_zone),
        ));
    }

    for (idx, connection) in file.connections.iter().enumerate() {
        for (field, id) in [("from", &connection.from), ("to", &connection.to)] {
            if !seen.contains(id) {
                return Err(invalid(
                    format!("connections[{idx}].{field}"),
                    format!("unknown zone `{id}`"),
                ));
            }
        }
        if connection.from == connection.to {
            return Err(invalid(
                format!("connections[{idx}]"),
                "a zone cannot connect to itself".to_string(),
            ));
        }
    }

    Ok(())
}

/// Checks that hold for every zone whether authored or added at runtime.
fn validate_definition(
    zone: &ZoneDefinition,
    label: &str,
    prefix: &str,
) -> Result<(), ZoneTableError> {
    let invalid = |field: &str, message: String| ZoneTableError::Invalid {
        label: label.to_string(),
        path: format!("{prefix}.{field}"),
        message,
    };

    if zone.id.as_str().trim().is_empty() {
        return Err(invalid("id", "must not be empty".to_string()));
    }
    for (field, value) in [
        ("radius", zone.radius),
        ("planet.radius", zone.planet.radius),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid(field, format!("expected positive number, got {value}")));
        }
    }
    if !(zone.solar_distance.is_finite() && zone.solar_distance >= 0.0) {
        return Err(invalid(
            "solar_distance",
            format!("expected non-negative number, got {}", zone.solar_distance),
        ));
    }
    for (sat_idx, satellite) in zone.satellites.iter().enumerate() {
        if !(satellite.radius.is_finite() && satellite.radius > 0.0) {
            return Err(invalid(
                &format!("satellites[{sat_idx}].radius"),
                format!("expected positive number, got {}", satellite.radius),
            ));
        }
        if !(satellite.orbital_distance.is_finite()
            && satellite.orbital_distance > zone.planet.radius)
        {
            return Err(invalid(
                &format!("satellites[{sat_idx}].orbital_distance"),
                format!(
                    "expected a distance beyond the planet radius {}, got {}",
                    zone.planet.radius, satellite.orbital_distance
                ),
            ));
        }
    }
    Ok(())
}
