//! Pose-indexed place retrieval over recorded traverses.
//!
//! A [`Traverse`] aggregates the timestamp-aligned [`CameraTrack`]s of one
//! recorded pass and answers exact lookups, pose nearest neighbour, tolerance
//! and descriptor queries against it. The pose algebra lives in [`geometry`].

pub mod config;
pub mod error;
pub mod geometry;
pub mod num;
pub mod priors;
pub mod record;
pub mod traverse;

pub use config::RetrievalConfig;
pub use error::{Result, RetrievalError};
pub use geometry::SE3Poses;
pub use record::{FrameAttr, RetrievedRecord};
pub use traverse::{CameraTrack, PoseRow, Traverse};
