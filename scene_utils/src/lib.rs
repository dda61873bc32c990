pub mod error;
pub mod components {
    pub mod camera;
}

pub mod prelude {
    pub use crate::components::camera::*;
    pub use crate::error::CameraError;
}
