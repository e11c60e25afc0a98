mod camera;
mod common;
mod index;
mod query;

pub use camera::{CameraTrack, PoseRow};
pub use common::{k_smallest, normalize};
pub use index::Traverse;
pub use query::consts;

#[cfg(test)]
pub(crate) mod fixtures;
