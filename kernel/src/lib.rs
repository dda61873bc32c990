/* ---- PRELUDE ---- */
pub mod prelude {
    pub use crate::math::error::ProjectionError;
    pub use crate::math::transform::*;
    pub use crate::sync::*;
    pub use crate::util::noise::NoiseGenerator;
}

/* ---- REEXPORTS ---- */
pub extern crate approx;
pub extern crate derive_builder;
pub extern crate getset;
pub extern crate itertools;
pub extern crate log;
pub extern crate nalgebra;

/* ---- MODULES ---- */
pub mod sync;
pub mod math {
    pub mod error;
    pub mod transform;
}
pub mod util {
    pub mod noise;
}
