use std::collections::HashSet;

use super::camera::CameraTrack;
use crate::error::{RetrievalError, Result};
use crate::geometry::{self, SE3Poses};
use crate::num::{Descriptor, SE3Quat, Timestamp};
use crate::record::FrameAttr;

use log::debug;

/// One recorded pass of a route.
///
/// Every camera shares the reference timestamps, so frame `i` of camera `c`
/// lives at flat index `c * len() + i` in the aggregated arrays. Camera order
/// is the order given at construction.
#[derive(Clone, Debug)]
pub struct Traverse {
    name: String,
    timestamps: Vec<Timestamp>,
    cameras: Vec<CameraTrack>,

    // aggregated over all cameras, in flat index order
    pub(super) all_poses: SE3Poses,
    pub(super) all_descriptors: Option<Vec<Descriptor>>,
}

impl Traverse {
    pub fn new(name: impl Into<String>, cameras: Vec<CameraTrack>) -> Result<Self> {
        let name = name.into();

        let timestamps = match cameras.first() {
            Some(first) => first.timestamps().to_vec(),
            None => {
                return Err(RetrievalError::invalid(format!(
                    "traverse `{}` has no cameras",
                    name
                )))
            }
        };

        for camera in cameras.iter().skip(1) {
            if camera.timestamps() != timestamps.as_slice() {
                let first_mismatch = camera
                    .timestamps()
                    .iter()
                    .zip(&timestamps)
                    .find(|(a, b)| a != b)
                    .map(|(a, _)| *a);
                return Err(RetrievalError::InconsistentTimestamps {
                    camera: camera.name().to_string(),
                    len: camera.len(),
                    expected_len: timestamps.len(),
                    first_mismatch,
                });
            }
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = cameras.iter().map(CameraTrack::name).find(|c| !seen.insert(*c)) {
            return Err(RetrievalError::invalid(format!(
                "camera `{}` appears twice in traverse `{}`",
                duplicate, name
            )));
        }

        let all_poses = geometry::combine(cameras.iter().map(CameraTrack::poses));
        let all_descriptors = Self::aggregate_descriptors(&cameras)?;

        debug!(
            "built traverse `{}`: {} cameras x {} timestamps, descriptors: {}",
            name,
            cameras.len(),
            timestamps.len(),
            all_descriptors.is_some()
        );

        Ok(Self {
            name,
            timestamps,
            cameras,
            all_poses,
            all_descriptors,
        })
    }

    // Descriptors are only queryable when every camera carries them.
    fn aggregate_descriptors(cameras: &[CameraTrack]) -> Result<Option<Vec<Descriptor>>> {
        let per_camera = match cameras.iter().map(CameraTrack::descriptors).collect::<Option<Vec<_>>>() {
            Some(per_camera) => per_camera,
            None => return Ok(None),
        };

        let mut dims = cameras.iter().filter_map(CameraTrack::descriptor_dim);
        if let Some(expected) = dims.next() {
            if let Some(got) = dims.find(|&d| d != expected) {
                return Err(RetrievalError::DescriptorDimension { expected, got });
            }
        }

        Ok(Some(per_camera.into_iter().flatten().cloned().collect()))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of reference timestamps, shared by every camera.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of frames over all cameras.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.all_poses.len()
    }

    #[inline]
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    #[inline]
    pub fn cameras(&self) -> &[CameraTrack] {
        &self.cameras
    }

    pub fn camera(&self, name: &str) -> Option<&CameraTrack> {
        self.cameras.iter().find(|c| c.name() == name)
    }

    #[inline]
    pub fn has_descriptors(&self) -> bool {
        self.all_descriptors.is_some()
    }

    pub fn descriptor_dim(&self) -> Option<usize> {
        self.all_descriptors.as_ref()?.first().map(|d| d.len())
    }

    /// All poses in flat index order.
    #[inline]
    pub fn all_poses(&self) -> &SE3Poses {
        &self.all_poses
    }

    /// Camera name and timestamp of a flat index.
    pub fn locate(&self, flat_index: usize) -> Option<(&str, Timestamp)> {
        if flat_index >= self.num_frames() {
            return None;
        }
        Some(self.key(flat_index))
    }

    /// Panics when `flat_index` is out of range.
    #[inline]
    pub(super) fn key(&self, flat_index: usize) -> (&str, Timestamp) {
        let n = self.len();
        (self.cameras[flat_index / n].name(), self.timestamps[flat_index % n])
    }

    pub fn frame(&self, flat_index: usize) -> Option<FrameAttr> {
        let (camera, timestamp) = self.locate(flat_index)?;
        Some(FrameAttr {
            camera: camera.to_string(),
            timestamp,
            pose: *self.all_poses.get(flat_index)?,
            descriptor: self.descriptor(flat_index).cloned(),
            flat_index,
        })
    }

    #[inline]
    pub(super) fn descriptor(&self, flat_index: usize) -> Option<&Descriptor> {
        self.all_descriptors.as_ref()?.get(flat_index)
    }

    #[inline]
    pub(super) fn pose(&self, flat_index: usize) -> Option<&SE3Quat> {
        self.all_poses.get(flat_index)
    }

    /// Exact lookup of a camera frame; never falls back to a nearby timestamp.
    ///
    /// Returns `Ok(None)` when the camera has no frame at `timestamp`.
    pub fn query_attr(&self, camera: &str, timestamp: Timestamp) -> Result<Option<FrameAttr>> {
        let camera_index = self
            .cameras
            .iter()
            .position(|c| c.name() == camera)
            .ok_or_else(|| RetrievalError::UnknownCamera(camera.to_string()))?;

        Ok(self.cameras[camera_index]
            .position(timestamp)
            .and_then(|i| self.frame(camera_index * self.len() + i)))
    }
}
