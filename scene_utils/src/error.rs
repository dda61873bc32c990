use derive_builder::UninitializedFieldError;
use kernel::math::error::ProjectionError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera looks at its own position, or along its up vector")]
    DegenerateView,
    #[error("Invalid projection: {0}")]
    InvalidProjection(String),
    #[error("Missing camera parameter {0:?}")]
    UninitializedField(&'static str),
}

impl From<UninitializedFieldError> for CameraError {
    fn from(err: UninitializedFieldError) -> Self {
        Self::UninitializedField(err.field_name())
    }
}

impl From<ProjectionError> for CameraError {
    fn from(err: ProjectionError) -> Self {
        Self::InvalidProjection(err.to_string())
    }
}
