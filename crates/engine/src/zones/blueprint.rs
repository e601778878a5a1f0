use std::f32::consts::TAU;

use crate::app::{ObjectKind, Orbit, StreamingConfig, Vec3};
use crate::assets::ResourceParams;

use super::definition::{ZoneDefinition, ZoneId};

const GOLDEN_ANGLE: f32 = 2.399_963;
const ATMOSPHERE_SCALE: f32 = 1.05;
const GATE_RADIUS: f32 = 60.0;
const GATE_TUBE: f32 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub geometry_kind: &'static str,
    pub geometry: ResourceParams,
    pub material_kind: &'static str,
    pub material: ResourceParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintItem {
    pub kind: ObjectKind,
    pub name: String,
    pub position: Vec3,
    pub orbit: Option<Orbit>,
    /// Set for warp gates.
    pub gate_target: Option<ZoneId>,
    pub assets: AssetRequest,
}

/// The core objects of a zone: planet, atmosphere, discovered satellites and
/// one gate per outgoing connection. Loading instantiates these items;
/// preloading only warms their resources, so both see the same signatures.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneBlueprint {
    pub zone: ZoneId,
    pub items: Vec<BlueprintItem>,
}

pub fn gate_id(zone: &ZoneId, target: &ZoneId) -> String {
    format!("{zone}:gate:{target}")
}

pub fn gate_position(index: usize, count: usize, ring_radius: f32) -> Vec3 {
    let angle = TAU * index as f32 / count.max(1) as f32;
    Vec3::new(angle.cos() * ring_radius, 0.0, angle.sin() * ring_radius)
}

pub fn build_blueprint(
    zone: &ZoneDefinition,
    gate_targets: &[ZoneId],
    config: &StreamingConfig,
) -> ZoneBlueprint {
    let mut items = Vec::with_capacity(2 + zone.satellites.len() + gate_targets.len());
    let planet = &zone.planet;

    let mut planet_material = ResourceParams::new().with("color", planet.color);
    if let Some(texture) = &planet.texture {
        planet_material.set("map", texture.as_str());
    }
    items.push(BlueprintItem {
        kind: ObjectKind::Planet,
        name: zone.name.clone(),
        position: Vec3::ZERO,
        orbit: None,
        gate_target: None,
        assets: AssetRequest {
            geometry_kind: "sphere",
            geometry: sphere_params(planet.radius, 64, 32),
            material_kind: "standard",
            material: planet_material,
        },
    });

    if planet.has_atmosphere {
        items.push(BlueprintItem {
            kind: ObjectKind::Atmosphere,
            name: format!("{} atmosphere", zone.name),
            position: Vec3::ZERO,
            orbit: None,
            gate_target: None,
            assets: AssetRequest {
                geometry_kind: "sphere",
                geometry: sphere_params(planet.radius * ATMOSPHERE_SCALE, 64, 32),
                material_kind: "basic",
                material: ResourceParams::new()
                    .with("color", 0x88ccffu32)
                    .with("opacity", 0.2)
                    .with("transparent", true),
            },
        });
    }

    for (idx, satellite) in zone.discovered_satellites().enumerate() {
        let orbit = Orbit {
            center: Vec3::ZERO,
            radius: satellite.orbital_distance,
            angle: idx as f32 * GOLDEN_ANGLE,
            angular_speed: satellite.orbital_speed,
        };
        items.push(BlueprintItem {
            kind: ObjectKind::Satellite,
            name: satellite.name.clone(),
            position: orbit.position(),
            orbit: Some(orbit),
            gate_target: None,
            assets: AssetRequest {
                geometry_kind: "sphere",
                geometry: sphere_params(satellite.radius, 32, 16),
                material_kind: "standard",
                material: ResourceParams::new().with("color", satellite.color),
            },
        });
    }

    for (idx, target) in gate_targets.iter().enumerate() {
        items.push(BlueprintItem {
            kind: ObjectKind::WarpGate,
            name: gate_id(&zone.id, target),
            position: gate_position(idx, gate_targets.len(), config.gate_ring_radius),
            orbit: None,
            gate_target: Some(target.clone()),
            assets: AssetRequest {
                geometry_kind: "torus",
                geometry: ResourceParams::new()
                    .with("radius", GATE_RADIUS)
                    .with("tube", GATE_TUBE)
                    .with("radialSegments", 16)
                    .with("tubularSegments", 64),
                material_kind: "basic",
                material: ResourceParams::new()
                    .with("color", 0x00ffffu32)
                    .with("opacity", 0.8),
            },
        });
    }

    ZoneBlueprint {
        zone: zone.id.clone(),
        items,
    }
}

fn sphere_params(radius: f32, width_segments: u32, height_segments: u32) -> ResourceParams {
    ResourceParams::new()
        .with("radius", radius)
        .with("widthSegments", width_segments)
        .with("heightSegments", height_segments)
}
