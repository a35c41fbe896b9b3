pub mod rotation;
pub mod vector;

pub use rotation::Rotation;
pub use vector::Vector;

/// Geometric precision
pub const EPS: f64 = 1e-13;

/// Approximate comparison of floating point values.
pub trait IsClose {
    fn is_close(&self, other: Self) -> bool;
}

impl IsClose for f64 {
    fn is_close(&self, other: f64) -> bool {
        (self - other).abs() < EPS
    }
}
