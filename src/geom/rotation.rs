use crate::Vector;
use crate::geom::IsClose;
use anyhow::{Result, anyhow};
use ndarray as nd;

/// Calculate rotation matrix for a unit vector `u` and angle `phi`.
///
/// A rotation in 3D can be described with an axis and angle around that axis.
/// The axis is described with a unit vector `u` `(ux**2 + uy**2 + uz**2 == 1)`
/// and the angle `phi` (in radians).
///
/// Uses the Rodrigues form:
/// https://en.wikipedia.org/wiki/Rodrigues%27_rotation_formula
pub fn rotation_matrix(u: &Vector, phi: f64) -> Result<nd::Array2<f64>> {
    if !u.length().is_close(1.) {
        return Err(anyhow!("rotation_matrix() requires u to be a unit vector, got {u}"));
    }

    let w: nd::Array2<f64> = nd::arr2(&[[0., -u.dz, u.dy], [u.dz, 0., -u.dx], [-u.dy, u.dx, 0.]]);

    Ok(nd::Array::eye(3) + phi.sin() * &w + (2. * (phi / 2.).sin().powi(2)) * w.dot(&w))
}

/// Orientation of a detector relative to the global frame.
///
/// Built from three angles applied as extrinsic rotations around the global
/// X, Y and Z axes, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotation {
    matrix: nd::Array2<f64>,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation {
    pub fn identity() -> Self {
        Self {
            matrix: nd::Array::eye(3),
        }
    }

    /// Angles are in radians.
    pub fn from_xyz(angles: [f64; 3]) -> Result<Self> {
        let rx = rotation_matrix(&Vector::new(1., 0., 0.), angles[0])?;
        let ry = rotation_matrix(&Vector::new(0., 1., 0.), angles[1])?;
        let rz = rotation_matrix(&Vector::new(0., 0., 1.), angles[2])?;
        Ok(Self {
            matrix: rz.dot(&ry).dot(&rx),
        })
    }

    /// Rotates a vector from the local into the global frame.
    pub fn apply(&self, v: Vector) -> Vector {
        let r = self.matrix.dot(&nd::arr1(&v.to_array()));
        Vector::new(r[0], r[1], r[2])
    }

    /// Rotates a vector from the global into the local frame.
    pub fn apply_inverse(&self, v: Vector) -> Vector {
        let r = self.matrix.t().dot(&nd::arr1(&v.to_array()));
        Vector::new(r[0], r[1], r[2])
    }

    pub fn matrix(&self) -> nd::ArrayView2<'_, f64> {
        self.matrix.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rotation_matrix_requires_unit_axis() {
        assert!(rotation_matrix(&Vector::new(0., 2., 0.), 1.0).is_err());
    }

    #[test]
    fn test_rotate_around_y() {
        let rot = Rotation::from_xyz([0., PI / 2., 0.]).unwrap();
        let v = rot.apply(Vector::new(1., 0., 0.));
        assert!((v - Vector::new(0., 0., -1.)).length() < 1e-12);
    }

    #[test]
    fn test_inverse_undoes_rotation() {
        let rot = Rotation::from_xyz([0.3, -1.1, 2.0]).unwrap();
        let v = Vector::new(0.5, -2.0, 3.8);
        let back = rot.apply_inverse(rot.apply(v));
        assert!((back - v).length() < 1e-12);
    }

    #[test]
    fn test_identity_is_default() {
        let v = Vector::new(1., 2., 3.);
        assert_eq!(Rotation::default().apply(v), v);
    }
}
