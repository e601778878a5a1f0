use tracing::warn;

use super::signature::ResourceParams;

/// Upper bound for any segment count taken from content.
pub const MAX_SEGMENTS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Sphere,
    Torus,
    Box,
    Cylinder,
    Ring,
    Plane,
    Icosahedron,
}

impl GeometryKind {
    pub const FALLBACK: Self = Self::Box;

    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "sphere" => Some(Self::Sphere),
            "torus" => Some(Self::Torus),
            "box" => Some(Self::Box),
            "cylinder" => Some(Self::Cylinder),
            "ring" => Some(Self::Ring),
            "plane" => Some(Self::Plane),
            "icosahedron" => Some(Self::Icosahedron),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Torus => "torus",
            Self::Box => "box",
            Self::Cylinder => "cylinder",
            Self::Ring => "ring",
            Self::Plane => "plane",
            Self::Icosahedron => "icosahedron",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryShape {
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    },
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        theta_segments: u32,
    },
    Plane {
        width: f32,
        height: f32,
    },
    Icosahedron {
        radius: f32,
        detail: u32,
    },
}

/// Resolved geometry request handed to the backend. `requested_kind` keeps the
/// raw kind so fallbacks stay visible in logs and debug output.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryDesc {
    pub requested_kind: String,
    pub kind: GeometryKind,
    pub shape: GeometryShape,
}

impl GeometryDesc {
    pub fn resolve(kind: &str, params: &ResourceParams) -> Self {
        let resolved = GeometryKind::parse(kind).unwrap_or_else(|| {
            warn!(
                requested_kind = kind,
                fallback = GeometryKind::FALLBACK.as_token(),
                "unknown_geometry_kind"
            );
            GeometryKind::FALLBACK
        });

        let shape = match resolved {
            GeometryKind::Sphere => GeometryShape::Sphere {
                radius: positive(params, "radius", 1.0),
                width_segments: segments(params, "widthSegments", 32, 3),
                height_segments: segments(params, "heightSegments", 16, 2),
            },
            GeometryKind::Torus => GeometryShape::Torus {
                radius: positive(params, "radius", 1.0),
                tube: positive(params, "tube", 0.4),
                radial_segments: segments(params, "radialSegments", 12, 3),
                tubular_segments: segments(params, "tubularSegments", 48, 3),
            },
            GeometryKind::Box => GeometryShape::Box {
                width: positive(params, "width", 1.0),
                height: positive(params, "height", 1.0),
                depth: positive(params, "depth", 1.0),
            },
            GeometryKind::Cylinder => GeometryShape::Cylinder {
                radius_top: non_negative(params, "radiusTop", 1.0),
                radius_bottom: non_negative(params, "radiusBottom", 1.0),
                height: positive(params, "height", 1.0),
                radial_segments: segments(params, "radialSegments", 32, 3),
            },
            GeometryKind::Ring => GeometryShape::Ring {
                inner_radius: non_negative(params, "innerRadius", 0.5),
                outer_radius: positive(params, "outerRadius", 1.0),
                theta_segments: segments(params, "thetaSegments", 32, 3),
            },
            GeometryKind::Plane => GeometryShape::Plane {
                width: positive(params, "width", 1.0),
                height: positive(params, "height", 1.0),
            },
            GeometryKind::Icosahedron => GeometryShape::Icosahedron {
                radius: positive(params, "radius", 1.0),
                detail: segments(params, "detail", 0, 0).min(5),
            },
        };

        Self {
            requested_kind: kind.to_string(),
            kind: resolved,
            shape,
        }
    }

    pub fn vertex_count(&self) -> u64 {
        match self.shape {
            GeometryShape::Sphere {
                width_segments,
                height_segments,
                ..
            } => (width_segments as u64 + 1).saturating_mul(height_segments as u64 + 1),
            GeometryShape::Torus {
                radial_segments,
                tubular_segments,
                ..
            } => (radial_segments as u64 + 1).saturating_mul(tubular_segments as u64 + 1),
            GeometryShape::Box { .. } => 24,
            GeometryShape::Cylinder {
                radial_segments, ..
            } => (radial_segments as u64 + 1) * 2 + (radial_segments as u64 + 2) * 2,
            GeometryShape::Ring { theta_segments, .. } => (theta_segments as u64 + 1) * 2,
            GeometryShape::Plane { .. } => 4,
            GeometryShape::Icosahedron { detail, .. } => {
                let subdivisions = detail as u64 + 1;
                20 * subdivisions * subdivisions * 3
            }
        }
    }

    pub fn index_count(&self) -> u64 {
        match self.shape {
            GeometryShape::Sphere {
                width_segments,
                height_segments,
                ..
            } => (width_segments as u64)
                .saturating_mul(height_segments as u64)
                .saturating_mul(6),
            GeometryShape::Torus {
                radial_segments,
                tubular_segments,
                ..
            } => (radial_segments as u64)
                .saturating_mul(tubular_segments as u64)
                .saturating_mul(6),
            GeometryShape::Box { .. } => 36,
            GeometryShape::Cylinder {
                radial_segments, ..
            } => radial_segments as u64 * 12,
            GeometryShape::Ring { theta_segments, .. } => theta_segments as u64 * 6,
            GeometryShape::Plane { .. } => 6,
            GeometryShape::Icosahedron { .. } => 0,
        }
    }

    /// Position + normal + uv per vertex, 32-bit indices.
    pub fn estimated_bytes(&self) -> u64 {
        self.vertex_count()
            .saturating_mul(32)
            .saturating_add(self.index_count().saturating_mul(4))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Basic,
    Standard,
    Phong,
    Lambert,
    Points,
}

impl MaterialKind {
    pub const FALLBACK: Self = Self::Basic;

    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "standard" => Some(Self::Standard),
            "phong" => Some(Self::Phong),
            "lambert" => Some(Self::Lambert),
            "points" => Some(Self::Points),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Phong => "phong",
            Self::Lambert => "lambert",
            Self::Points => "points",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub requested_kind: String,
    pub kind: MaterialKind,
    pub color: u32,
    pub emissive: u32,
    pub opacity: f32,
    pub transparent: bool,
    pub wireframe: bool,
    pub texture: Option<String>,
}

impl MaterialDesc {
    pub fn resolve(kind: &str, params: &ResourceParams) -> Self {
        let resolved = MaterialKind::parse(kind).unwrap_or_else(|| {
            warn!(
                requested_kind = kind,
                fallback = MaterialKind::FALLBACK.as_token(),
                "unknown_material_kind"
            );
            MaterialKind::FALLBACK
        });

        let opacity = params
            .number("opacity")
            .map(|value| value.clamp(0.0, 1.0) as f32)
            .unwrap_or(1.0);

        Self {
            requested_kind: kind.to_string(),
            kind: resolved,
            color: color(params, "color", 0xffffff),
            emissive: color(params, "emissive", 0x000000),
            opacity,
            transparent: params.flag("transparent").unwrap_or(opacity < 1.0),
            wireframe: params.flag("wireframe").unwrap_or(false),
            texture: params.text("map").map(ToString::to_string),
        }
    }

    /// Uniform block plus one texture slot when mapped.
    pub fn estimated_bytes(&self) -> u64 {
        let texture_bytes = if self.texture.is_some() {
            1024 * 1024 * 4
        } else {
            0
        };
        256 + texture_bytes
    }
}

fn positive(params: &ResourceParams, key: &str, default: f32) -> f32 {
    match params.number(key) {
        Some(value) if value > 0.0 => value as f32,
        _ => default,
    }
}

fn non_negative(params: &ResourceParams, key: &str, default: f32) -> f32 {
    match params.number(key) {
        Some(value) if value >= 0.0 => value as f32,
        _ => default,
    }
}

fn segments(params: &ResourceParams, key: &str, default: u32, min: u32) -> u32 {
    match params.number(key) {
        Some(value) if value > MAX_SEGMENTS as f64 => {
            warn!(key, requested = value, max = MAX_SEGMENTS, "segment_count_clamped");
            MAX_SEGMENTS
        }
        Some(value) if value >= 0.0 => (value.round() as u32).max(min),
        _ => default,
    }
}

fn color(params: &ResourceParams, key: &str, default: u32) -> u32 {
    match params.number(key) {
        Some(value) if value >= 0.0 => (value as u64).min(0xffffff) as u32,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_segment_counts_are_clamped() {
        let params = ResourceParams::new()
            .with("widthSegments", 1e10)
            .with("heightSegments", 1e10);
        let desc = GeometryDesc::resolve("sphere", &params);

        assert_eq!(
            desc.shape,
            GeometryShape::Sphere {
                radius: 1.0,
                width_segments: MAX_SEGMENTS,
                height_segments: MAX_SEGMENTS,
            }
        );
        let vertices = u64::from(MAX_SEGMENTS + 1) * u64::from(MAX_SEGMENTS + 1);
        assert_eq!(desc.vertex_count(), vertices);
        assert!(desc.estimated_bytes() > vertices * 32);
    }

    #[test]
    fn unknown_geometry_kind_falls_back_to_box() {
        let desc = GeometryDesc::resolve("dodecahedron", &ResourceParams::new());
        assert_eq!(desc.kind, GeometryKind::Box);
        assert_eq!(desc.requested_kind, "dodecahedron");
        assert_eq!(
            desc.shape,
            GeometryShape::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0
            }
        );
    }

    #[test]
    fn sphere_params_override_defaults() {
        let params = ResourceParams::new()
            .with("radius", 50.0)
            .with("widthSegments", 64);
        let desc = GeometryDesc::resolve("sphere", &params);
        assert_eq!(
            desc.shape,
            GeometryShape::Sphere {
                radius: 50.0,
                width_segments: 64,
                height_segments: 16
            }
        );
        assert_eq!(desc.vertex_count(), 65 * 17);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let params = ResourceParams::new()
            .with("radius", -3.0)
            .with("tube", "thick");
        let desc = GeometryDesc::resolve("torus", &params);
        assert_eq!(
            desc.shape,
            GeometryShape::Torus {
                radius: 1.0,
                tube: 0.4,
                radial_segments: 12,
                tubular_segments: 48
            }
        );
    }

    #[test]
    fn unknown_material_kind_falls_back_to_basic() {
        let desc = MaterialDesc::resolve("toon", &ResourceParams::new().with("color", 0xff0000));
        assert_eq!(desc.kind, MaterialKind::Basic);
        assert_eq!(desc.color, 0xff0000);
        assert!(!desc.transparent);
    }

    #[test]
    fn partial_opacity_implies_transparency() {
        let desc = MaterialDesc::resolve("standard", &ResourceParams::new().with("opacity", 0.25));
        assert!(desc.transparent);
        assert!((desc.opacity - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn textured_material_reports_texture_memory() {
        let plain = MaterialDesc::resolve("standard", &ResourceParams::new());
        let textured = MaterialDesc::resolve(
            "standard",
            &ResourceParams::new().with("map", "textures/mars.jpg"),
        );
        assert!(textured.estimated_bytes() > plain.estimated_bytes());
        assert_eq!(textured.texture.as_deref(), Some("textures/mars.jpg"));
    }
}
