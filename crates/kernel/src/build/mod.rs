pub mod face;
pub mod solid;

pub use face::{FacePatch, Polygon3d, RingNest};
pub use solid::{BuildResult, SolidBuilder};
