use macroquad::prelude::{Quat, Vec3};

/// Squared length below which a vector is treated as zero.
pub const EPSILON: f32 = 1.0e-6;

/// Unit vector in the direction of `v`, or zero for degenerate input.
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq.is_infinite() && v.is_finite() {
        // Components fit in f32 but their squares do not; rescale first.
        return normalize_or_zero(v / v.abs().max_element());
    }
    if len_sq <= EPSILON || !len_sq.is_finite() {
        return Vec3::ZERO;
    }
    v / len_sq.sqrt()
}

pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let n = normalize_or_zero(v);
    if n == Vec3::ZERO {
        fallback
    } else {
        n
    }
}

/// Mirror `v` about the plane whose normal is `normal`.
pub fn reflect(v: Vec3, normal: Vec3) -> Vec3 {
    let n = normalize_or_zero(normal);
    v - n * (2.0 * v.dot(n))
}

pub fn clamp_magnitude(v: Vec3, max_magnitude: f32) -> Vec3 {
    if max_magnitude <= 0.0 {
        return Vec3::ZERO;
    }
    let len = magnitude(v);
    if len <= max_magnitude {
        return v;
    }
    v * (max_magnitude / len)
}

/// Length of `v` that stays finite for any finite `v`.
pub fn magnitude(v: Vec3) -> f32 {
    let len_sq = v.length_squared();
    if len_sq.is_finite() {
        return len_sq.sqrt();
    }
    let scale = v.abs().max_element();
    scale * (v / scale).length()
}

/// Orthonormal (forward, up, right) frame for a heading. World up is +Y
/// unless the heading is nearly vertical, then +Z.
pub fn heading_basis(heading: Vec3) -> (Vec3, Vec3, Vec3) {
    let forward = normalize_or(heading, Vec3::Z);

    let mut up_ref = Vec3::Y;
    if forward.dot(up_ref).abs() > 0.97 {
        up_ref = Vec3::Z;
    }

    let right = normalize_or(up_ref.cross(forward), Vec3::X);
    let up = normalize_or(forward.cross(right), Vec3::Y);
    (forward, up, right)
}

pub fn rotate_about_axis(v: Vec3, axis: Vec3, angle_radians: f32) -> Vec3 {
    let axis = normalize_or_zero(axis);
    if axis == Vec3::ZERO {
        return v;
    }
    Quat::from_axis_angle(axis, angle_radians) * v
}

/// Serialize a `Vec3` as `[x, y, z]`.
pub mod serde_vec3 {
    use macroquad::prelude::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        v.to_array().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        let arr = <[f32; 3]>::deserialize(deserializer)?;
        Ok(Vec3::from_array(arr))
    }
}

pub mod serde_opt_vec3 {
    use macroquad::prelude::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec3>, serializer: S) -> Result<S::Ok, S::Error> {
        v.map(|v| v.to_array()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec3>, D::Error> {
        let arr = Option::<[f32; 3]>::deserialize(deserializer)?;
        Ok(arr.map(Vec3::from_array))
    }
}
