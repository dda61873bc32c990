use derive_builder::UninitializedFieldError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("field of view must be within (0, 180) degrees, got {0}")]
    FieldOfView(f32),
    #[error("aspect ratio must be positive, got {0}")]
    AspectRatio(f32),
    #[error("clipping planes must satisfy 0 < near < far, got near = {near}, far = {far}")]
    ClippingPlanes { near: f32, far: f32 },
    #[error("Missing projection parameter {0:?}")]
    UninitializedField(&'static str),
}

impl From<UninitializedFieldError> for ProjectionError {
    fn from(err: UninitializedFieldError) -> Self {
        Self::UninitializedField(err.field_name())
    }
}
