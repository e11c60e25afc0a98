use std::ops::Range;

use super::rotation;
use crate::error::{RetrievalError, Result};
use crate::num::{Number, SE3Quat, Translation3, UnitQuaternion, Vector3};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A batch of rigid transforms.
///
/// A batch of length 1 broadcasts against a batch of any length in
/// [`compose`], [`divide`], [`metric`] and [`error`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SE3Poses {
    poses: Vec<SE3Quat>,
}

impl SE3Poses {
    #[inline]
    pub fn new(poses: Vec<SE3Quat>) -> Self {
        Self { poses }
    }

    #[inline]
    pub fn single(pose: SE3Quat) -> Self {
        Self { poses: vec![pose] }
    }

    #[inline]
    pub fn identity() -> Self {
        Self::single(SE3Quat::identity())
    }

    pub fn from_parts(translations: &[Vector3], rotations: &[UnitQuaternion]) -> Result<Self> {
        if translations.len() != rotations.len() {
            return Err(RetrievalError::Shape {
                left: translations.len(),
                right: rotations.len(),
            });
        }
        let poses = translations
            .iter()
            .zip(rotations)
            .map(|(t, r)| SE3Quat::from_parts(Translation3::from(*t), *r))
            .collect();
        Ok(Self { poses })
    }

    /// Builds a batch from `[northing, easting, down, roll, pitch, yaw]` rows.
    pub fn from_xyzrpy(rows: &[[Number; 6]]) -> Self {
        let poses = rows
            .iter()
            .map(|&[x, y, z, roll, pitch, yaw]| {
                SE3Quat::from_parts(
                    Translation3::new(x, y, z),
                    rotation::from_rpy(roll, pitch, yaw),
                )
            })
            .collect();
        Self { poses }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    #[inline]
    pub fn is_single(&self) -> bool {
        self.poses.len() == 1
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&SE3Quat> {
        self.poses.get(index)
    }

    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        self.poses.get(range).map(|poses| Self::new(poses.to_vec()))
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, SE3Quat> {
        self.poses.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[SE3Quat] {
        &self.poses
    }

    pub fn translations(&self) -> Vec<Vector3> {
        self.poses.iter().map(|p| p.translation.vector).collect()
    }

    pub fn rotations(&self) -> Vec<UnitQuaternion> {
        self.poses.iter().map(|p| p.rotation).collect()
    }

    /// Translational and rotational components, rotations as quaternions.
    pub fn components(&self) -> (Vec<Vector3>, Vec<UnitQuaternion>) {
        (self.translations(), self.rotations())
    }

    /// Tiles the whole batch `n` times.
    pub fn repeat(&self, n: usize) -> Self {
        let poses = std::iter::repeat(self.poses.iter())
            .take(n)
            .flatten()
            .cloned()
            .collect();
        Self { poses }
    }

    #[inline]
    pub fn inverse(&self) -> Self {
        invert(self)
    }
}

impl From<SE3Quat> for SE3Poses {
    #[inline]
    fn from(pose: SE3Quat) -> Self {
        Self::single(pose)
    }
}

impl From<Vec<SE3Quat>> for SE3Poses {
    #[inline]
    fn from(poses: Vec<SE3Quat>) -> Self {
        Self::new(poses)
    }
}

impl<'a> IntoIterator for &'a SE3Poses {
    type Item = &'a SE3Quat;
    type IntoIter = std::slice::Iter<'a, SE3Quat>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}

/// Length of the batch produced by pairing `left` with `right`.
pub fn broadcast_len(left: usize, right: usize) -> Result<usize> {
    match (left, right) {
        (l, r) if l == r => Ok(l),
        (1, r) => Ok(r),
        (l, 1) => Ok(l),
        (left, right) => Err(RetrievalError::Shape { left, right }),
    }
}

fn zip_broadcast<T, F>(a: &SE3Poses, b: &SE3Poses, mut f: F) -> Result<Vec<T>>
where
    F: FnMut(&SE3Quat, &SE3Quat) -> T,
{
    let len = broadcast_len(a.len(), b.len())?;
    let pick = |poses: &SE3Poses, i: usize| if poses.is_single() { 0 } else { i };
    Ok((0..len)
        .map(|i| f(&a.poses[pick(a, i)], &b.poses[pick(b, i)]))
        .collect())
}

/// `R = a.R * b.R`, `t = a.R * b.t + a.t`
pub fn compose(a: &SE3Poses, b: &SE3Poses) -> Result<SE3Poses> {
    zip_broadcast(a, b, |a, b| a * b).map(SE3Poses::new)
}

/// Pose of `b` expressed in the frame of `a`, i.e. `a^-1 * b`.
pub fn divide(a: &SE3Poses, b: &SE3Poses) -> Result<SE3Poses> {
    zip_broadcast(a, b, |a, b| a.inverse() * b).map(SE3Poses::new)
}

pub fn invert(a: &SE3Poses) -> SE3Poses {
    SE3Poses::new(a.poses.iter().map(SE3Quat::inverse).collect())
}

/// Translation error and rotation error in radians of `p2` relative to `p1`.
pub fn error(p1: &SE3Poses, p2: &SE3Poses) -> Result<(Vec<Number>, Vec<Number>)> {
    let errors = zip_broadcast(p1, p2, |a, b| {
        let rel = a.inverse() * b;
        (rel.translation.vector.norm(), rotation::angle(&rel.rotation))
    })?;
    Ok(errors.into_iter().unzip())
}

/// Metric on the cartesian product representation of SE(3):
/// `|t_rel| + weight * angle(R_rel)` for each pose pair.
pub fn metric(p1: &SE3Poses, p2: &SE3Poses, weight: Number) -> Result<Vec<Number>> {
    check_weight(weight)?;
    let (t_err, r_err) = error(p1, p2)?;
    weighted_distance(&t_err, &r_err, weight)
}

/// Combines precomputed translation and rotation errors as [`metric`] does.
pub fn weighted_distance(t_err: &[Number], r_err: &[Number], weight: Number) -> Result<Vec<Number>> {
    check_weight(weight)?;
    if t_err.len() != r_err.len() {
        return Err(RetrievalError::Shape {
            left: t_err.len(),
            right: r_err.len(),
        });
    }
    Ok(t_err
        .iter()
        .zip(r_err)
        .map(|(t, r)| t + weight * r)
        .collect())
}

fn check_weight(weight: Number) -> Result<()> {
    // also rejects NaN
    if !(weight >= 0.0) {
        return Err(RetrievalError::invalid(format!(
            "metric weight must be non-negative, got {}",
            weight
        )));
    }
    Ok(())
}

/// Concatenates pose batches, preserving order.
pub fn combine<'a, I>(batches: I) -> SE3Poses
where
    I: IntoIterator<Item = &'a SE3Poses>,
{
    let poses = batches
        .into_iter()
        .flat_map(|batch| batch.poses.iter().cloned())
        .collect_vec();
    SE3Poses::new(poses)
}
