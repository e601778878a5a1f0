use std::collections::BTreeMap;
use std::ops::{Add, Sub};

use crate::assets::Mesh;
use crate::zones::{FeatureTag, ZoneId};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

#[derive(Debug, Default)]
pub struct ObjectIdAllocator {
    next: u64,
}

impl ObjectIdAllocator {
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Planet,
    Atmosphere,
    Satellite,
    WarpGate,
    Feature(FeatureTag),
}

/// Circular motion in the XZ plane around `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub center: Vec3,
    pub radius: f32,
    pub angle: f32,
    pub angular_speed: f32,
}

impl Orbit {
    pub fn advance(&mut self, dt_seconds: f32) -> Vec3 {
        self.angle = (self.angle + self.angular_speed * dt_seconds) % std::f32::consts::TAU;
        self.position()
    }

    pub fn position(&self) -> Vec3 {
        self.center
            + Vec3::new(
                self.angle.cos() * self.radius,
                0.0,
                self.angle.sin() * self.radius,
            )
    }
}

/// A renderable owned by exactly one zone's registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub zone: ZoneId,
    pub kind: ObjectKind,
    pub name: String,
    pub position: Vec3,
    pub mesh: Option<Mesh>,
    pub orbit: Option<Orbit>,
}

/// The rendering side of the world. The streaming core only adds, removes
/// and moves objects, and shifts the scene root when a zone becomes active.
pub trait SceneHost {
    fn attach(&mut self, object: &SceneObject);
    fn detach(&mut self, id: ObjectId);
    fn set_position(&mut self, id: ObjectId, position: Vec3);
    fn reset_origin(&mut self, origin: Vec3);
    fn attached_count(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachedObject {
    pub zone: ZoneId,
    pub kind: ObjectKind,
    pub name: String,
    pub position: Vec3,
}

#[derive(Debug, Default)]
pub struct HeadlessScene {
    attached: BTreeMap<ObjectId, AttachedObject>,
    origin: Vec3,
    origin_resets: Vec<Vec3>,
    attach_calls: u64,
    detach_calls: u64,
    stray_detaches: u64,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ObjectId) -> Option<&AttachedObject> {
        self.attached.get(&id)
    }

    pub fn objects_in_zone<'a>(
        &'a self,
        zone: &'a ZoneId,
    ) -> impl Iterator<Item = (&'a ObjectId, &'a AttachedObject)> + 'a {
        self.attached
            .iter()
            .filter(move |(_, object)| &object.zone == zone)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn origin_resets(&self) -> &[Vec3] {
        &self.origin_resets
    }

    pub fn attach_calls(&self) -> u64 {
        self.attach_calls
    }

    pub fn detach_calls(&self) -> u64 {
        self.detach_calls
    }

    /// Detaches of objects that were not attached.
    pub fn stray_detaches(&self) -> u64 {
        self.stray_detaches
    }
}

impl SceneHost for HeadlessScene {
    fn attach(&mut self, object: &SceneObject) {
        self.attach_calls = self.attach_calls.saturating_add(1);
        self.attached.insert(
            object.id,
            AttachedObject {
                zone: object.zone.clone(),
                kind: object.kind,
                name: object.name.clone(),
                position: object.position,
            },
        );
    }

    fn detach(&mut self, id: ObjectId) {
        self.detach_calls = self.detach_calls.saturating_add(1);
        if self.attached.remove(&id).is_none() {
            self.stray_detaches = self.stray_detaches.saturating_add(1);
        }
    }

    fn set_position(&mut self, id: ObjectId, position: Vec3) {
        if let Some(object) = self.attached.get_mut(&id) {
            object.position = position;
        }
    }

    fn reset_origin(&mut self, origin: Vec3) {
        self.origin = origin;
        self.origin_resets.push(origin);
    }

    fn attached_count(&self) -> usize {
        self.attached.len()
    }
}
