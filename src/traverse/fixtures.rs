//! Three cameras over five timestamps, 10 m apart along the northing axis.
//!
//! `left` looks north, `right` is 0.5 m east and turned 90 degrees, `rear`
//! is 0.5 m west and turned 180 degrees. Flat indices are `left` 0..5,
//! `right` 5..10, `rear` 10..15 and every frame carries the one-hot
//! descriptor of its flat index.

use std::f64::consts::PI;

use super::{CameraTrack, Traverse};
use crate::geometry::SE3Poses;
use crate::num::{Descriptor, Number, Timestamp};

pub const TIMESTAMPS: [Timestamp; 5] = [1000, 1001, 1002, 1003, 1004];
pub const NUM_FRAMES: usize = 15;

pub fn one_hot(index: usize) -> Descriptor {
    weighted_descriptor(&[(index, 1.0)])
}

pub fn weighted_descriptor(weights: &[(usize, Number)]) -> Descriptor {
    let mut descriptor = Descriptor::zeros(NUM_FRAMES);
    for &(i, w) in weights {
        descriptor[i] = w;
    }
    descriptor
}

fn track(name: &str, camera_index: usize, easting: Number, yaw: Number) -> CameraTrack {
    let rows = (0..TIMESTAMPS.len())
        .map(|i| [10.0 * i as Number, easting, 0.0, 0.0, 0.0, yaw])
        .collect::<Vec<_>>();
    let descriptors = (0..TIMESTAMPS.len())
        .map(|i| one_hot(camera_index * TIMESTAMPS.len() + i))
        .collect();
    CameraTrack::new(
        name,
        TIMESTAMPS.to_vec(),
        SE3Poses::from_xyzrpy(&rows),
        Some(descriptors),
    )
    .unwrap()
}

pub fn traverse() -> Traverse {
    Traverse::new(
        "overcast-reference",
        vec![
            track("left", 0, 0.0, 0.0),
            track("right", 1, 0.5, PI / 2.0),
            track("rear", 2, -0.5, PI),
        ],
    )
    .unwrap()
}
