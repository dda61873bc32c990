//! Homogeneous 4x4 transformation matrices.
//!
//! All angles are given in degrees. Matrices are column-major (nalgebra layout),
//! and are applied to column vectors: `m * v`.

use super::error::ProjectionError;
use approx::relative_eq;
use derive_builder::Builder;
use nalgebra::{Matrix4, Perspective3, Vector3};
use serde::{Deserialize, Serialize};

/// An axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation (identity)
    None,
    /// Rotation around the X axis
    Pitch,
    /// Rotation around the Y axis
    Yaw,
    /// Rotation around the Z axis
    Roll,
}

/// Parameters of a perspective projection.
#[derive(Debug, Clone, Copy, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    pattern = "owned",
    default,
    build_fn(validate = "Self::validate", error = "ProjectionError")
)]
pub struct ProjectionParams {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Width to height ratio of the viewport
    pub aspect_ratio: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            fov: 45.0,
            aspect_ratio: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl ProjectionParams {
    pub fn builder() -> ProjectionParamsBuilder {
        Default::default()
    }

    /// Checks that a perspective matrix can be built from the parameters.
    ///
    /// Planes, which are relatively equal, are rejected as coinciding.
    pub fn validate(&self) -> Result<(), ProjectionError> {
        let Self {
            fov,
            aspect_ratio,
            near,
            far,
        } = *self;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(ProjectionError::FieldOfView(fov));
        }
        if !(aspect_ratio > 0.0 && aspect_ratio.is_finite()) || relative_eq!(aspect_ratio, 0.0) {
            return Err(ProjectionError::AspectRatio(aspect_ratio));
        }
        if !(near > 0.0 && far > near && far.is_finite()) || relative_eq!(near, far) {
            return Err(ProjectionError::ClippingPlanes { near, far });
        }
        Ok(())
    }

    /// Builds a right-handed perspective matrix, which maps the view frustum
    /// into the OpenGL clip space.
    pub fn try_matrix(&self) -> Result<Matrix4<f32>, ProjectionError> {
        self.validate()?;
        Ok(self.matrix_unchecked())
    }

    /// Same as [`try_matrix`](Self::try_matrix), for parameters known to be valid.
    ///
    /// # Panics
    /// Panics if the parameters do not pass [`validate`](Self::validate).
    pub fn matrix(&self) -> Matrix4<f32> {
        if let Err(err) = self.validate() {
            panic!("Tried to build a projection matrix, but {}", err)
        }
        self.matrix_unchecked()
    }

    fn matrix_unchecked(&self) -> Matrix4<f32> {
        Perspective3::new(self.aspect_ratio, self.fov.to_radians(), self.near, self.far)
            .into_inner()
    }
}

impl ProjectionParamsBuilder {
    fn validate(&self) -> Result<(), ProjectionError> {
        let defaults = ProjectionParams::default();
        ProjectionParams {
            fov: self.fov.unwrap_or(defaults.fov),
            aspect_ratio: self.aspect_ratio.unwrap_or(defaults.aspect_ratio),
            near: self.near.unwrap_or(defaults.near),
            far: self.far.unwrap_or(defaults.far),
        }
        .validate()
    }
}

pub fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z))
}

/// An elementary rotation around one of the coordinate axes.
pub fn rotation(axis: Rotation, degrees: f32) -> Matrix4<f32> {
    let angle = degrees.to_radians();
    match axis {
        Rotation::None => Matrix4::identity(),
        Rotation::Pitch => Matrix4::from_axis_angle(&Vector3::x_axis(), angle),
        Rotation::Yaw => Matrix4::from_axis_angle(&Vector3::y_axis(), angle),
        Rotation::Roll => Matrix4::from_axis_angle(&Vector3::z_axis(), angle),
    }
}

/// Pitch is applied first, then yaw, then roll.
pub fn rotation_euler(pitch: f32, yaw: f32, roll: f32) -> Matrix4<f32> {
    rotation(Rotation::Roll, roll)
        * rotation(Rotation::Yaw, yaw)
        * rotation(Rotation::Pitch, pitch)
}

/// Shorthand for [`ProjectionParams::try_matrix`].
pub fn projection(
    fov: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
) -> Result<Matrix4<f32>, ProjectionError> {
    ProjectionParams {
        fov,
        aspect_ratio,
        near,
        far,
    }
    .try_matrix()
}
