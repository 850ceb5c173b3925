//! Math utilities and types
//!
//! Geospatial scenes span planetary distances, so every type here is `f64`.

pub use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 4D vector type
pub type Vec4 = Vector4<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f64>;

/// Math constants
pub mod constants {
    /// Relative tolerance used when snapping computed split distances
    pub const EPSILON12: f64 = 1.0e-12;
}

/// Math utility functions
pub mod utils {
    use super::Vec3;

    /// True when every component is finite
    pub fn is_finite(v: &Vec3) -> bool {
        v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
    }

    /// Normalize a vector, returning `None` for zero-length or non-finite input
    pub fn try_normalize(v: &Vec3) -> Option<Vec3> {
        if !is_finite(v) {
            return None;
        }
        v.try_normalize(f64::EPSILON)
    }

    /// Any unit vector perpendicular to `v` (which must be non-zero)
    pub fn any_perpendicular(v: &Vec3) -> Vec3 {
        let axis = if v.x.abs() <= v.y.abs() && v.x.abs() <= v.z.abs() {
            Vec3::x()
        } else if v.y.abs() <= v.z.abs() {
            Vec3::y()
        } else {
            Vec3::z()
        };
        v.cross(&axis).normalize()
    }
}

/// Extension trait for Mat4 with projection constructors
///
/// All projections map eye space (looking down -Z) into OpenGL clip space
/// with depth in [-1, 1].
pub trait Mat4Ext {
    /// Create an off-center perspective projection
    fn perspective_off_center(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Mat4;

    /// Create an off-center perspective projection with the far plane at infinity
    fn infinite_perspective_off_center(left: f64, right: f64, bottom: f64, top: f64, near: f64) -> Mat4;

    /// Create an off-center orthographic projection
    fn orthographic_off_center(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective_off_center(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Mat4 {
        // P = [2n/(r-l)   0          (r+l)/(r-l)    0           ]
        //     [0          2n/(t-b)   (t+b)/(t-b)    0           ]
        //     [0          0          -(f+n)/(f-n)   -2fn/(f-n)  ]
        //     [0          0          -1             0           ]
        let mut result = Mat4::zeros();
        result[(0, 0)] = 2.0 * near / (right - left);
        result[(1, 1)] = 2.0 * near / (top - bottom);
        result[(0, 2)] = (right + left) / (right - left);
        result[(1, 2)] = (top + bottom) / (top - bottom);
        result[(2, 2)] = -(far + near) / (far - near);
        result[(2, 3)] = -2.0 * far * near / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn infinite_perspective_off_center(left: f64, right: f64, bottom: f64, top: f64, near: f64) -> Mat4 {
        // Limit of the finite projection as far -> infinity
        let mut result = Mat4::zeros();
        result[(0, 0)] = 2.0 * near / (right - left);
        result[(1, 1)] = 2.0 * near / (top - bottom);
        result[(0, 2)] = (right + left) / (right - left);
        result[(1, 2)] = (top + bottom) / (top - bottom);
        result[(2, 2)] = -1.0;
        result[(2, 3)] = -2.0 * near;
        result[(3, 2)] = -1.0;
        result
    }

    fn orthographic_off_center(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Mat4 {
        let a = 1.0 / (right - left);
        let b = 1.0 / (top - bottom);
        let c = 1.0 / (far - near);

        Mat4::new(
            2.0 * a, 0.0,     0.0,      -(right + left) * a,
            0.0,     2.0 * b, 0.0,      -(top + bottom) * b,
            0.0,     0.0,     -2.0 * c, -(far + near) * c,
            0.0,     0.0,     0.0,      1.0,
        )
    }
}
