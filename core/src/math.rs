//! Math type aliases and helper functions.
//!
//! Matrices are column-major (nalgebra convention). Source formats that
//! deliver row-major data convert at the import boundary.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
pub type Quat = nalgebra::Quaternion<f32>;

/// Tolerance used when comparing imported transform and key values.
pub const EPSILON: f32 = 1.0e-5;

/// Build a 4x4 TRS matrix from scale, rotation (quaternion), and translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: Quat,
    translation: Vec3,
) -> Mat4 {
    let r = nalgebra::UnitQuaternion::new_normalize(rotation);
    let m = r.to_rotation_matrix();
    let rm = m.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Split an affine matrix into translation, rotation and scale.
///
/// Scale is the length of each basis column. A negative determinant flips
/// the sign of the X scale so the remaining rotation stays proper.
pub fn decompose(m: &Mat4) -> (Vec3, Quat, Vec3) {
    let translation = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let mut basis = m.fixed_view::<3, 3>(0, 0).into_owned();
    let mut scale = Vec3::new(
        basis.column(0).norm(),
        basis.column(1).norm(),
        basis.column(2).norm(),
    );
    if basis.determinant() < 0.0 {
        scale.x = -scale.x;
    }
    for (i, s) in scale.iter().enumerate() {
        if s.abs() > f32::EPSILON {
            let mut col = basis.column_mut(i);
            col /= *s;
        }
    }
    let rotation = nalgebra::UnitQuaternion::from_matrix(&basis).into_inner();
    (translation, rotation, scale)
}

/// Camera-to-world transform for a camera at `eye` looking along `look`.
///
/// This is the inverse of the right-handed look-at view matrix.
pub fn inverse_look_at(eye: &Vec3, look: &Vec3, up: &Vec3) -> Mat4 {
    let eye_point = nalgebra::Point3::from(*eye);
    let target_point = nalgebra::Point3::from(*eye + *look);
    nalgebra::Isometry3::look_at_rh(&eye_point, &target_point, up)
        .inverse()
        .to_homogeneous()
}

/// Invert a matrix, falling back to identity for singular input.
pub fn inverse_or_identity(m: &Mat4) -> Mat4 {
    m.try_inverse().unwrap_or_else(|| {
        log::warn!("singular matrix encountered, substituting identity");
        Mat4::identity()
    })
}

/// Build a matrix from 16 column-major floats.
pub fn mat4_from_cols_array(a: &[f32; 16]) -> Mat4 {
    Mat4::from_column_slice(a)
}

/// Flatten a matrix into 16 column-major floats.
pub fn mat4_to_cols_array(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Create a quaternion from a `[x, y, z, w]` array.
pub fn quat_from_array(a: [f32; 4]) -> Quat {
    nalgebra::Quaternion::new(a[3], a[0], a[1], a[2])
}

/// Convert a quaternion to a `[x, y, z, w]` array.
pub fn quat_to_array(q: Quat) -> [f32; 4] {
    [q.coords.x, q.coords.y, q.coords.z, q.coords.w]
}

/// Component-wise comparison within `eps`.
pub fn slices_approx_eq(a: &[f32], b: &[f32], eps: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= eps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trs_roundtrip_through_decompose() {
        let rot = nalgebra::UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1).into_inner();
        let m = mat4_from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 4.0),
            rot,
            Vec3::new(1.0, -5.0, 0.5),
        );
        let (t, r, s) = decompose(&m);
        assert!((t - Vec3::new(1.0, -5.0, 0.5)).norm() < 1e-5);
        assert!((s - Vec3::new(2.0, 3.0, 4.0)).norm() < 1e-4);
        // q and -q describe the same rotation
        let dot = r.coords.dot(&rot.coords).abs();
        assert!((dot - 1.0).abs() < 1e-4);
    }

    #[test]
    fn inverse_look_at_places_camera_at_eye() {
        let eye = Vec3::new(0.0, 1.0, 5.0);
        let m = inverse_look_at(&eye, &Vec3::new(0.0, 0.0, -1.0), &Vec3::y());
        assert!((m[(0, 3)] - eye.x).abs() < 1e-6);
        assert!((m[(1, 3)] - eye.y).abs() < 1e-6);
        assert!((m[(2, 3)] - eye.z).abs() < 1e-6);
    }

    #[test]
    fn singular_inverse_is_identity() {
        let m = Mat4::zeros();
        assert_eq!(inverse_or_identity(&m), Mat4::identity());
    }

    #[test]
    fn cols_array_roundtrip() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let a = mat4_to_cols_array(&m);
        assert_eq!(a[12], 1.0);
        assert_eq!(mat4_from_cols_array(&a), m);
    }
}
