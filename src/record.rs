use crate::num::{Descriptor, Number, SE3Quat, Timestamp};

use serde::{Deserialize, Serialize};

/// Everything the index stores about one frame, as returned by
/// [`Traverse::query_attr`](crate::Traverse::query_attr).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameAttr {
    pub camera: String,
    pub timestamp: Timestamp,
    pub pose: SE3Quat,
    pub descriptor: Option<Descriptor>,
    pub flat_index: usize,
}

/// One frame returned by a traverse query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRecord {
    pub camera: String,
    pub timestamp: Timestamp,

    /// Euclidean distance between query and frame positions.
    pub t_err: Number,
    /// Geodesic rotation error in degrees.
    pub r_err: Number,

    /// Ranking distance, for queries that rank (pose metric or squared
    /// descriptor distance).
    pub distance: Option<Number>,

    pub pose: Option<SE3Quat>,
    pub descriptor: Option<Descriptor>,
    pub flat_index: Option<usize>,
}

impl RetrievedRecord {
    #[inline]
    pub fn key(&self) -> (&str, Timestamp) {
        (&self.camera, self.timestamp)
    }
}
