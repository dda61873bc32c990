use crate::error::CameraError;
use approx::relative_eq;
use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use kernel::{
    math::transform::ProjectionParams,
    nalgebra::{Matrix4, Orthographic3, Point3, Vector2, Vector3},
};
use log::info;
use serde::{Deserialize, Serialize};

/// Placement of a camera in the world (the view matrix source).
///
/// `right` is derived from the other vectors, and is recomputed by the camera
/// on every update.
#[derive(Debug, Clone, Copy, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned", default)]
pub struct CameraInfo {
    pub position: Vector3<f32>,
    pub look_at: Vector3<f32>,
    pub up: Vector3<f32>,
    pub right: Vector3<f32>,
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            look_at: Vector3::new(0.0, 1.0, 0.0),
            up: Vector3::new(0.0, 0.0, 1.0),
            right: Vector3::new(1.0, 0.0, 0.0),
        }
    }
}

impl CameraInfo {
    pub fn builder() -> CameraInfoBuilder {
        Default::default()
    }
}

/// Lens of a camera (the projection matrix source).
///
/// For an orthographic projection, the view volume spans from `resolution_offset`
/// to `resolution`. For a perspective one, only the `resolution` ratio matters.
#[derive(Debug, Clone, Copy, PartialEq, Builder, Serialize, Deserialize)]
#[builder(
    pattern = "owned",
    default,
    build_fn(validate = "Self::validate", error = "CameraError")
)]
pub struct ProjectionInfo {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub resolution: Vector2<f32>,
    pub resolution_offset: Vector2<f32>,
}

impl Default for ProjectionInfo {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            resolution: Vector2::new(1.0, 1.0),
            resolution_offset: Vector2::new(0.0, 0.0),
        }
    }
}

impl ProjectionInfo {
    pub fn builder() -> ProjectionInfoBuilder {
        Default::default()
    }

    /// Checks that both projection types can be built from this lens.
    ///
    /// Bounds, which are relatively equal, are rejected as coinciding.
    pub fn validate(&self) -> Result<(), CameraError> {
        let Self {
            resolution,
            resolution_offset,
            ..
        } = *self;
        if !(resolution.x > 0.0 && resolution.y > 0.0) {
            return Err(CameraError::InvalidProjection(format!(
                "resolution {:?} must be positive",
                resolution
            )));
        }
        let exceeds = |res: f32, offset: f32| res > offset && !relative_eq!(res, offset);
        let exceeds_offset = exceeds(resolution.x, resolution_offset.x)
            && exceeds(resolution.y, resolution_offset.y);
        if !exceeds_offset {
            return Err(CameraError::InvalidProjection(format!(
                "resolution {:?} must exceed its offset {:?}",
                resolution, resolution_offset
            )));
        }
        self.perspective().validate()?;
        Ok(())
    }

    /// Gets the perspective parameters of this lens.
    pub fn perspective(&self) -> ProjectionParams {
        ProjectionParams {
            fov: self.fov,
            aspect_ratio: self.resolution.x / self.resolution.y,
            near: self.near,
            far: self.far,
        }
    }
}

impl ProjectionInfoBuilder {
    fn validate(&self) -> Result<(), CameraError> {
        let defaults = ProjectionInfo::default();
        ProjectionInfo {
            fov: self.fov.unwrap_or(defaults.fov),
            near: self.near.unwrap_or(defaults.near),
            far: self.far.unwrap_or(defaults.far),
            resolution: self.resolution.unwrap_or(defaults.resolution),
            resolution_offset: self.resolution_offset.unwrap_or(defaults.resolution_offset),
        }
        .validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// A camera in 3D space, which keeps its view and projection matrices
/// in sync with its parameters.
///
/// Every setter recomputes the affected matrix. Setters, which may produce
/// a degenerate camera, leave the camera untouched on error.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Camera {
    #[getset(get = "pub")]
    info: CameraInfo,

    #[getset(get = "pub")]
    projection: ProjectionInfo,

    #[getset(get_copy = "pub")]
    projection_type: ProjectionType,

    #[getset(get_copy = "pub")]
    view_matrix: Matrix4<f32>,

    #[getset(get_copy = "pub")]
    projection_matrix: Matrix4<f32>,
}

impl Camera {
    pub fn new(
        info: CameraInfo,
        projection: ProjectionInfo,
        projection_type: ProjectionType,
    ) -> Result<Self, CameraError> {
        projection.validate()?;
        let (view_matrix, info) = view_of(info)?;
        info!("Creating {:?} camera", projection_type);
        Ok(Self {
            info,
            projection,
            projection_type,
            view_matrix,
            projection_matrix: projection_of(&projection, projection_type),
        })
    }

    /// Gets the combined `projection * view` matrix.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix * self.view_matrix
    }

    pub fn set_camera_info(&mut self, info: CameraInfo) -> Result<(), CameraError> {
        let (view_matrix, info) = view_of(info)?;
        self.view_matrix = view_matrix;
        self.info = info;
        Ok(())
    }

    pub fn set_projection_info(&mut self, projection: ProjectionInfo) -> Result<(), CameraError> {
        projection.validate()?;
        self.projection = projection;
        self.projection_matrix = projection_of(&self.projection, self.projection_type);
        Ok(())
    }

    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.projection_matrix = projection_of(&self.projection, projection_type);
    }

    pub fn set_position(&mut self, position: Vector3<f32>) -> Result<(), CameraError> {
        self.set_camera_info(CameraInfo {
            position,
            ..self.info
        })
    }

    pub fn set_look_at(&mut self, look_at: Vector3<f32>) -> Result<(), CameraError> {
        self.set_camera_info(CameraInfo {
            look_at,
            ..self.info
        })
    }

    /// Sets the field of view in degrees (only affects perspective projection).
    pub fn set_fov(&mut self, fov: f32) -> Result<(), CameraError> {
        self.set_projection_info(ProjectionInfo {
            fov,
            ..self.projection
        })
    }

    pub fn add_to_position(&mut self, offset: Vector3<f32>) -> Result<(), CameraError> {
        self.set_position(self.info.position + offset)
    }

    pub fn add_to_look_at(&mut self, offset: Vector3<f32>) -> Result<(), CameraError> {
        self.set_look_at(self.info.look_at + offset)
    }
}

impl From<&Camera> for Matrix4<f32> {
    fn from(camera: &Camera) -> Self {
        camera.view_projection()
    }
}

impl From<Camera> for Matrix4<f32> {
    fn from(camera: Camera) -> Self {
        camera.view_projection()
    }
}

/// Computes the view matrix, and the `right` vector of the camera.
fn view_of(info: CameraInfo) -> Result<(Matrix4<f32>, CameraInfo), CameraError> {
    let CameraInfo {
        position,
        look_at,
        up,
        ..
    } = info;
    let direction = (look_at - position)
        .try_normalize(f32::EPSILON)
        .ok_or(CameraError::DegenerateView)?;
    let right = direction
        .cross(&up)
        .try_normalize(f32::EPSILON)
        .ok_or(CameraError::DegenerateView)?;
    let view = Matrix4::look_at_rh(&Point3::from(position), &Point3::from(look_at), &up);
    Ok((view, CameraInfo { right, ..info }))
}

fn projection_of(projection: &ProjectionInfo, projection_type: ProjectionType) -> Matrix4<f32> {
    match projection_type {
        ProjectionType::Perspective => projection.perspective().matrix(),
        ProjectionType::Orthographic => Orthographic3::new(
            projection.resolution_offset.x,
            projection.resolution.x,
            projection.resolution_offset.y,
            projection.resolution.y,
            projection.near,
            projection.far,
        )
        .into_inner(),
    }
}
