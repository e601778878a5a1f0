use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceClass {
    Geometry,
    Material,
}

impl ResourceClass {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Material => "material",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Construction parameters for a cached resource.
///
/// Keys are kept sorted so two structurally equal parameter sets produce the
/// same canonical byte stream regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceParams {
    values: BTreeMap<String, ParamValue>,
}

impl ResourceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(ParamValue::Number(value)) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ParamValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ParamValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceSignature(String);

impl ResourceSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn class(&self) -> Option<ResourceClass> {
        if self.0.starts_with("geometry:") {
            Some(ResourceClass::Geometry)
        } else if self.0.starts_with("material:") {
            Some(ResourceClass::Material)
        } else {
            None
        }
    }
}

impl fmt::Display for ResourceSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `<class>:<kind>:<sha256 of canonical params>`. The kind is lowercased so
/// `"Sphere"` and `"sphere"` share one cache entry.
pub fn compute_signature(
    class: ResourceClass,
    kind: &str,
    params: &ResourceParams,
) -> ResourceSignature {
    let kind = kind.trim().to_ascii_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(class.as_token().as_bytes());
    hasher.update([0u8]);
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    for (key, value) in &params.values {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        match value {
            ParamValue::Bool(flag) => {
                hasher.update([b'b', u8::from(*flag)]);
            }
            ParamValue::Number(number) => {
                hasher.update([b'n']);
                hasher.update(canonical_number_bits(*number).to_le_bytes());
            }
            ParamValue::Text(text) => {
                hasher.update([b's']);
                hasher.update((text.len() as u64).to_le_bytes());
                hasher.update(text.as_bytes());
            }
        }
        hasher.update([0u8]);
    }

    let digest = to_hex_lower(&hasher.finalize());
    ResourceSignature(format!("{}:{}:{}", class.as_token(), kind, digest))
}

fn canonical_number_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_does_not_change_signature() {
        let a = ResourceParams::new().with("radius", 50.0).with("widthSegments", 32);
        let b = ResourceParams::new().with("widthSegments", 32).with("radius", 50.0);
        assert_eq!(
            compute_signature(ResourceClass::Geometry, "sphere", &a),
            compute_signature(ResourceClass::Geometry, "sphere", &b)
        );
    }

    #[test]
    fn integer_and_float_params_with_equal_value_share_signature() {
        let int = ResourceParams::new().with("radius", 50);
        let float = ResourceParams::new().with("radius", 50.0f32);
        assert_eq!(
            compute_signature(ResourceClass::Geometry, "sphere", &int),
            compute_signature(ResourceClass::Geometry, "sphere", &float)
        );
    }

    #[test]
    fn negative_zero_is_normalized() {
        let pos = ResourceParams::new().with("offset", 0.0);
        let neg = ResourceParams::new().with("offset", -0.0);
        assert_eq!(
            compute_signature(ResourceClass::Geometry, "plane", &pos),
            compute_signature(ResourceClass::Geometry, "plane", &neg)
        );
    }

    #[test]
    fn class_kind_and_value_all_contribute() {
        let params = ResourceParams::new().with("radius", 1.0);
        let sphere = compute_signature(ResourceClass::Geometry, "sphere", &params);
        assert_ne!(
            sphere,
            compute_signature(ResourceClass::Material, "sphere", &params)
        );
        assert_ne!(
            sphere,
            compute_signature(ResourceClass::Geometry, "torus", &params)
        );
        assert_ne!(
            sphere,
            compute_signature(
                ResourceClass::Geometry,
                "sphere",
                &ResourceParams::new().with("radius", 2.0)
            )
        );
    }

    #[test]
    fn text_and_number_with_same_rendering_do_not_collide() {
        let text = ResourceParams::new().with("map", "1");
        let number = ResourceParams::new().with("map", 1.0);
        assert_ne!(
            compute_signature(ResourceClass::Material, "basic", &text),
            compute_signature(ResourceClass::Material, "basic", &number)
        );
    }

    #[test]
    fn signature_is_prefixed_with_class_and_kind() {
        let signature =
            compute_signature(ResourceClass::Geometry, " Sphere ", &ResourceParams::new());
        assert!(signature.as_str().starts_with("geometry:sphere:"));
        assert_eq!(signature.class(), Some(ResourceClass::Geometry));
    }

    #[test]
    fn signature_carries_the_full_sha256_digest() {
        let signature = compute_signature(
            ResourceClass::Geometry,
            "sphere",
            &ResourceParams::new().with("radius", 50),
        );
        let digest = signature
            .as_str()
            .strip_prefix("geometry:sphere:")
            .expect("prefix");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
