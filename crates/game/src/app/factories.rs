use std::f32::consts::TAU;

use stellar_engine::app::Orbit;
use stellar_engine::assets::ResourceParams;
use stellar_engine::zones::{ContentFactories, FeatureBuilder, FeatureTag, SpawnError};
use stellar_engine::Vec3;

const STATION_ALTITUDE: f32 = 1.6;
const ASTEROIDS_PER_FIELD: usize = 12;
const COLONY_DOMES: usize = 3;

pub(crate) fn register_all() -> ContentFactories {
    ContentFactories::new()
        .with(FeatureTag::SpaceStation, space_station)
        .with(FeatureTag::AsteroidField, asteroid_field)
        .with(FeatureTag::MiningColony, mining_colony)
        .with(FeatureTag::GasStation, gas_station)
}

/// Distance from the planet centre at which a feature sits, spread by the
/// feature's slot so two features in one zone never overlap.
fn feature_offset(builder: &FeatureBuilder<'_>, scale: f32) -> Vec3 {
    let planet_radius = builder.zone().planet.radius;
    let angle = builder.index() as f32 * 1.3;
    let distance = planet_radius * scale;
    Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
}

fn hull_material() -> ResourceParams {
    ResourceParams::new()
        .with("color", 0xc0c8d0u32)
        .with("metalness", 0.7)
        .with("roughness", 0.35)
}

fn space_station(builder: &mut FeatureBuilder<'_>) -> Result<(), SpawnError> {
    let zone = builder.zone().name.clone();
    let centre = feature_offset(builder, STATION_ALTITUDE);

    builder.add_mesh(
        format!("{zone} station hub"),
        centre,
        "cylinder",
        &ResourceParams::new()
            .with("radiusTop", 4.0)
            .with("radiusBottom", 4.0)
            .with("height", 10.0),
        "standard",
        &hull_material(),
    )?;
    builder.add_mesh(
        format!("{zone} station ring"),
        centre,
        "torus",
        &ResourceParams::new()
            .with("radius", 12.0)
            .with("tube", 1.0)
            .with("radialSegments", 12)
            .with("tubularSegments", 48),
        "standard",
        &hull_material(),
    )?;
    builder.add_marker(format!("{zone} docking beacon"), centre + Vec3::new(0.0, 8.0, 0.0));
    Ok(())
}

fn asteroid_field(builder: &mut FeatureBuilder<'_>) -> Result<(), SpawnError> {
    let zone = builder.zone().name.clone();
    let inner = builder.zone().planet.radius * 4.0;
    let rock = ResourceParams::new().with("color", 0x6b5d4fu32);

    for idx in 0..ASTEROIDS_PER_FIELD {
        // Three rock sizes keep the geometry cache to three entries per field.
        let size = 1.5 + (idx % 3) as f32;
        let orbit = Orbit {
            center: Vec3::ZERO,
            radius: inner + (idx % 4) as f32 * 15.0,
            angle: TAU * idx as f32 / ASTEROIDS_PER_FIELD as f32,
            angular_speed: 0.02,
        };
        builder.add_orbiting_mesh(
            format!("{zone} asteroid {idx}"),
            orbit,
            "icosahedron",
            &ResourceParams::new().with("radius", size).with("detail", 0),
            "lambert",
            &rock,
        )?;
    }
    Ok(())
}

fn mining_colony(builder: &mut FeatureBuilder<'_>) -> Result<(), SpawnError> {
    let zone = builder.zone().name.clone();
    let surface = feature_offset(builder, 1.0);
    let dome = ResourceParams::new()
        .with("radius", 3.0)
        .with("widthSegments", 16)
        .with("heightSegments", 8);
    let glass = ResourceParams::new()
        .with("color", 0x99ddffu32)
        .with("opacity", 0.5)
        .with("transparent", true);

    for idx in 0..COLONY_DOMES {
        let position = surface + Vec3::new(idx as f32 * 7.0, 0.0, 0.0);
        builder.add_mesh(
            format!("{zone} colony dome {idx}"),
            position,
            "sphere",
            &dome,
            "phong",
            &glass,
        )?;
    }
    builder.add_mesh(
        format!("{zone} ore refinery"),
        surface + Vec3::new(0.0, 0.0, 9.0),
        "box",
        &ResourceParams::new()
            .with("width", 6.0)
            .with("height", 4.0)
            .with("depth", 6.0),
        "standard",
        &hull_material(),
    )
}

fn gas_station(builder: &mut FeatureBuilder<'_>) -> Result<(), SpawnError> {
    let zone = builder.zone().clone();
    if !zone.planet.has_atmosphere {
        return Err(SpawnError::Content {
            feature: builder.feature().as_token(),
            message: format!("{} has no atmosphere to skim", zone.name),
        });
    }

    let orbit = Orbit {
        center: Vec3::ZERO,
        radius: zone.planet.radius * 1.25,
        angle: 0.0,
        angular_speed: 0.01,
    };
    builder.add_orbiting_mesh(
        format!("{} skimmer", zone.name),
        orbit,
        "cylinder",
        &ResourceParams::new()
            .with("radiusTop", 2.0)
            .with("radiusBottom", 6.0)
            .with("height", 18.0),
        "standard",
        &hull_material(),
    )?;
    builder.add_orbiting_mesh(
        format!("{} fuel tank", zone.name),
        Orbit {
            angle: 0.2,
            ..orbit
        },
        "sphere",
        &ResourceParams::new().with("radius", 5.0),
        "standard",
        &ResourceParams::new().with("color", 0xffaa33u32),
    )
}

#[cfg(test)]
mod tests {
    use stellar_engine::{
        parse_zone_content, HeadlessBackend, HeadlessScene, RecordingShell, StreamingConfig,
        ZoneLoadError, ZoneManager,
    };

    use super::*;

    const ZONES: &str = r#"{
        "start_zone": "belt",
        "zones": [
            { "id": "belt", "name": "Belt", "ring_position": 0, "radius": 6000.0,
              "solar_distance": 2.7, "planet": { "radius": 9.0 },
              "features": ["asteroid_field", "mining_colony", "space_station"] },
            { "id": "rock", "name": "Rock", "ring_position": 1, "radius": 3000.0,
              "solar_distance": 3.1, "unlocked": true, "planet": { "radius": 5.0 },
              "features": ["gas_station"] }
        ],
        "connections": [ { "from": "belt", "to": "rock" } ]
    }"#;

    fn manager() -> ZoneManager<HeadlessScene, RecordingShell> {
        ZoneManager::new(
            StreamingConfig::default(),
            parse_zone_content(ZONES, "test").expect("zones"),
            Box::new(HeadlessBackend::new()),
            register_all(),
            HeadlessScene::new(),
            RecordingShell::new(),
        )
    }

    #[test]
    fn belt_features_share_cached_resources() {
        let mut manager = manager();
        let report = manager.start().expect("start");

        // planet + 1 gate + 12 asteroids + 3 domes + refinery + hub + ring + beacon
        assert_eq!(report.objects_created, 1 + 1 + 12 + 4 + 3);
        let stats = manager.assets().stats();
        assert_eq!(stats.live_meshes, 1 + 1 + 12 + 4 + 2);
        assert!(stats.geometries < stats.live_meshes);
    }

    #[test]
    fn gas_station_without_atmosphere_fails_the_load() {
        let mut manager = manager();
        manager.start().expect("start");

        let error = manager
            .load_zone(&"rock".into(), true)
            .expect_err("gas station needs an atmosphere");
        assert!(matches!(error, ZoneLoadError::PartialConstruction { failed: 1, .. }));
        assert_eq!(manager.current_zone().map(|zone| zone.as_str()), Some("rock"));
    }
}
