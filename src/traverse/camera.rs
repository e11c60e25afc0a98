use std::collections::HashMap;

use super::common::normalize;
use crate::error::{RetrievalError, Result};
use crate::geometry::SE3Poses;
use crate::num::{Descriptor, Number, SE3Quat, Timestamp};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One row of an exported camera pose table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseRow {
    pub timestamp: Timestamp,
    pub northing: Number,
    pub easting: Number,
    pub down: Number,
    pub roll: Number,
    pub pitch: Number,
    pub yaw: Number,
}

impl PoseRow {
    #[inline]
    pub fn xyzrpy(&self) -> [Number; 6] {
        [
            self.northing,
            self.easting,
            self.down,
            self.roll,
            self.pitch,
            self.yaw,
        ]
    }
}

/// Timestamp-sorted poses (and optionally descriptors) of one camera.
#[derive(Clone, Debug)]
pub struct CameraTrack {
    name: String,
    timestamps: Vec<Timestamp>,
    poses: SE3Poses,
    descriptors: Option<Vec<Descriptor>>,
}

impl CameraTrack {
    /// Descriptors are scaled to unit norm on the way in.
    pub fn new(
        name: impl Into<String>,
        timestamps: Vec<Timestamp>,
        poses: SE3Poses,
        descriptors: Option<Vec<Descriptor>>,
    ) -> Result<Self> {
        let name = name.into();

        if poses.len() != timestamps.len() {
            return Err(RetrievalError::Shape {
                left: timestamps.len(),
                right: poses.len(),
            });
        }
        if let Some((_, &duplicate)) = timestamps
            .iter()
            .tuple_windows()
            .find(|(prev, next)| prev >= next)
        {
            return Err(RetrievalError::UnsortedTimestamps {
                camera: name,
                timestamp: duplicate,
            });
        }

        let descriptors = match descriptors {
            Some(descriptors) => {
                if descriptors.len() != timestamps.len() {
                    return Err(RetrievalError::Shape {
                        left: timestamps.len(),
                        right: descriptors.len(),
                    });
                }
                if let Some(first) = descriptors.first() {
                    let expected = first.len();
                    if let Some(bad) = descriptors.iter().find(|d| d.len() != expected) {
                        return Err(RetrievalError::DescriptorDimension {
                            expected,
                            got: bad.len(),
                        });
                    }
                }
                Some(descriptors.into_iter().map(normalize).collect())
            }
            None => None,
        };

        Ok(Self {
            name,
            timestamps,
            poses,
            descriptors,
        })
    }

    /// Builds a track from unordered pose table rows.
    pub fn from_rows(name: impl Into<String>, rows: &[PoseRow]) -> Result<Self> {
        let rows = rows
            .iter()
            .sorted_by_key(|row| row.timestamp)
            .collect_vec();
        let timestamps = rows.iter().map(|row| row.timestamp).collect();
        let poses = SE3Poses::from_xyzrpy(&rows.iter().map(|row| row.xyzrpy()).collect_vec());
        Self::new(name, timestamps, poses, None)
    }

    /// Attaches descriptors looked up by timestamp.
    pub fn with_descriptors(self, table: &HashMap<Timestamp, Descriptor>) -> Result<Self> {
        let descriptors = self
            .timestamps
            .iter()
            .map(|t| table.get(t).cloned().ok_or(RetrievalError::MissingDescriptors))
            .collect::<Result<Vec<_>>>()?;
        Self::new(self.name, self.timestamps, self.poses, Some(descriptors))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    #[inline]
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    #[inline]
    pub fn poses(&self) -> &SE3Poses {
        &self.poses
    }

    #[inline]
    pub fn descriptors(&self) -> Option<&[Descriptor]> {
        self.descriptors.as_deref()
    }

    pub fn descriptor_dim(&self) -> Option<usize> {
        self.descriptors.as_ref()?.first().map(|d| d.len())
    }

    /// Position of an exact timestamp match.
    #[inline]
    pub fn position(&self, timestamp: Timestamp) -> Option<usize> {
        self.timestamps.binary_search(&timestamp).ok()
    }

    pub fn pose_at(&self, timestamp: Timestamp) -> Option<&SE3Quat> {
        self.position(timestamp).and_then(|i| self.poses.get(i))
    }
}
