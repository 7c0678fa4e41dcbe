//! Math type re-exports and rigging-specific math utilities.
//!
//! This module re-exports types from `glam` and provides the small set of
//! helpers shared by the IK solver, the validator and bone transforms.

// Re-export glam types
pub use glam::{
    // Single precision vectors
    Vec2, Vec3, Vec3A, Vec4,
    // Single precision matrices
    Mat3, Mat4,
    // Quaternions
    Quat,
    // Affine transforms
    Affine3A,
};

/// Tolerance used by the solver, the validator and weight checks.
pub const EPSILON: f32 = f32::EPSILON;

/// Unit axes.
pub const UNIT_X: Vec3 = Vec3::X;
pub const UNIT_Y: Vec3 = Vec3::Y;
pub const UNIT_Z: Vec3 = Vec3::Z;

/// Check whether every component is within `eps` of zero.
#[inline]
pub fn is_null(v: Vec3, eps: f32) -> bool {
    v.abs().cmple(Vec3::splat(eps)).all()
}

/// Check whether a scalar equals another within `eps`.
#[inline]
pub fn epsilon_equal(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() < eps
}

/// Translation matrix helper.
#[inline]
pub fn translate(v: Vec3) -> Mat4 {
    Mat4::from_translation(v)
}

/// Origin of a transform (image of the zero vector).
#[inline]
pub fn transform_origin(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

/// Clamp an orientation to per-axis euler limits (radians).
///
/// The decomposition order is chosen from whichever axis keeps its limits
/// inside +-90 degrees, so the extracted angles stay in the asin range.
pub fn constrain_orientation(upper: Vec3, lower: Vec3, orientation: Quat) -> Quat {
    let half_pi = std::f32::consts::FRAC_PI_2;
    let m = Mat3::from_quat(orientation);
    if lower.x > -half_pi && upper.x < half_pi {
        let radians = Vec3::new(
            m.y_axis.z.clamp(-1.0, 1.0).asin(),
            (-m.x_axis.z).atan2(m.z_axis.z),
            (-m.y_axis.x).atan2(m.y_axis.y),
        );
        let (x, y, z) = unit_axes(radians, lower, upper);
        z * x * y
    } else if lower.y > -half_pi && upper.y < half_pi {
        let radians = Vec3::new(
            (-m.z_axis.y).atan2(m.z_axis.z),
            m.z_axis.x.clamp(-1.0, 1.0).asin(),
            (-m.y_axis.x).atan2(m.x_axis.x),
        );
        let (x, y, z) = unit_axes(radians, lower, upper);
        x * y * z
    } else {
        let radians = Vec3::new(
            (-m.z_axis.y).atan2(m.y_axis.y),
            (-m.x_axis.z).atan2(m.x_axis.x),
            m.x_axis.y.clamp(-1.0, 1.0).asin(),
        );
        let (x, y, z) = unit_axes(radians, lower, upper);
        y * z * x
    }
}

fn unit_axes(radians: Vec3, lower: Vec3, upper: Vec3) -> (Quat, Quat, Quat) {
    let r = radians.clamp(lower, upper);
    (
        Quat::from_axis_angle(UNIT_X, r.x),
        Quat::from_axis_angle(UNIT_Y, r.y),
        Quat::from_axis_angle(UNIT_Z, r.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_null() {
        assert!(is_null(Vec3::ZERO, EPSILON));
        assert!(!is_null(Vec3::new(0.0, 1e-3, 0.0), EPSILON));
    }

    #[test]
    fn test_constrain_orientation_clamps_x() {
        let q = Quat::from_axis_angle(UNIT_X, 1.2);
        let limited = constrain_orientation(
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(-0.5, 0.0, 0.0),
            q,
        );
        let (axis, angle) = limited.to_axis_angle();
        assert!((angle - 0.5).abs() < 1e-4);
        assert!((axis.x.abs() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_constrain_orientation_identity_inside_limits() {
        let q = Quat::from_axis_angle(UNIT_X, 0.25);
        let limited = constrain_orientation(Vec3::splat(1.0), Vec3::splat(-1.0), q);
        assert!(limited.abs_diff_eq(q, 1e-5) || limited.abs_diff_eq(-q, 1e-5));
    }
}
