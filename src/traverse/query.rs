use std::collections::HashSet;

use super::common::{k_smallest, normalize, unit_sq_distance};
use super::index::Traverse;
use crate::error::{RetrievalError, Result};
use crate::geometry::{self, rotation, SE3Poses};
use crate::num::{Descriptor, Number, SE3Quat};
use crate::record::{FrameAttr, RetrievedRecord};

use itertools::{izip, Itertools};
use log::{trace, warn};
use rand::{seq::index, Rng};

pub mod consts {
    /// Candidate pool size of imperfect nearest neighbour retrieval.
    pub const IMPERFECT_POOL: usize = 10;

    /// Number of pose neighbours treated as relevant when mining distractors.
    pub const RELEVANCE_COUNT: usize = 10;
}

impl Traverse {
    /// The `k` frames closest to `pose` under [`geometry::metric`], ascending
    /// by distance.
    pub fn knn(&self, pose: &SE3Quat, k: usize, alpha: Number) -> Result<Vec<RetrievedRecord>> {
        self.check_k(k)?;
        let errors = self.pose_errors(pose)?;
        let dist = geometry::weighted_distance(&errors.0, &errors.1, alpha)?;

        trace!("kNN k={} alpha={} over {} frames", k, alpha, dist.len());
        Ok(k_smallest(&dist, k)
            .into_iter()
            .map(|i| self.record(i, &errors, Some(dist[i])))
            .collect())
    }

    /// Degraded nearest neighbours: draws `k` frames uniformly without
    /// replacement from the `max(10, k)` nearest ones.
    ///
    /// Randomness comes only from `rng`. The result is not ordered.
    pub fn knn_imperfect<R>(
        &self,
        pose: &SE3Quat,
        k: usize,
        alpha: Number,
        rng: &mut R,
    ) -> Result<Vec<RetrievedRecord>>
    where
        R: Rng + ?Sized,
    {
        self.knn_sampled(pose, k, alpha, consts::IMPERFECT_POOL, rng)
    }

    /// Same as [`Traverse::knn_imperfect`] with an explicit pool size.
    pub fn knn_sampled<R>(
        &self,
        pose: &SE3Quat,
        k: usize,
        alpha: Number,
        pool: usize,
        rng: &mut R,
    ) -> Result<Vec<RetrievedRecord>>
    where
        R: Rng + ?Sized,
    {
        self.check_k(k)?;
        let mut candidates = self
            .knn(pose, pool.max(k).min(self.num_frames()), alpha)?
            .into_iter()
            .map(Some)
            .collect_vec();

        Ok(index::sample(rng, candidates.len(), k)
            .into_iter()
            .filter_map(|i| candidates[i].take())
            .collect())
    }

    /// Every frame with translation error below `t_max` and rotation error
    /// below `r_max_degrees`, in flat index order.
    pub fn query_tolerance(
        &self,
        pose: &SE3Quat,
        t_max: Number,
        r_max_degrees: Number,
    ) -> Result<Vec<RetrievedRecord>> {
        let errors = self.pose_errors(pose)?;
        let (t_err, r_err) = &errors;
        Ok(izip!(0.., t_err, r_err)
            .filter(|&(_, &t, &r)| t < t_max && rotation::to_degrees(r) < r_max_degrees)
            .map(|(i, _, _)| self.record(i, &errors, None))
            .collect())
    }

    /// Every frame whose metric distance to `pose` is below `radius`, in flat
    /// index order.
    pub fn query_radius(
        &self,
        pose: &SE3Quat,
        radius: Number,
        alpha: Number,
    ) -> Result<Vec<RetrievedRecord>> {
        let errors = self.pose_errors(pose)?;
        let dist = geometry::weighted_distance(&errors.0, &errors.1, alpha)?;
        Ok(dist
            .iter()
            .enumerate()
            .filter(|(_, &d)| d < radius)
            .map(|(i, &d)| self.record(i, &errors, Some(d)))
            .collect())
    }

    /// The `k` frames whose descriptors are closest to `descriptor`, ascending
    /// by squared descriptor distance. Pose errors are reported against
    /// `pose` but do not affect ranking.
    pub fn topk_descriptors(
        &self,
        descriptor: &Descriptor,
        pose: &SE3Quat,
        k: usize,
    ) -> Result<Vec<RetrievedRecord>> {
        self.check_k(k)?;
        let dist = self.descriptor_distances(descriptor)?;
        let errors = self.pose_errors(pose)?;

        trace!("descriptor top-k k={} over {} frames", k, dist.len());
        Ok(k_smallest(&dist, k)
            .into_iter()
            .map(|i| {
                let mut record = self.record(i, &errors, Some(dist[i]));
                record.descriptor = self.descriptor(i).cloned();
                record
            })
            .collect())
    }

    /// Hard negatives for `query`: descriptor neighbours that are not among the
    /// `relevance_count` pose neighbours.
    ///
    /// Returns fewer than `k` records when the candidate pool runs out.
    pub fn retrieve_distractors(
        &self,
        query: &FrameAttr,
        k: usize,
        relevance_count: usize,
        alpha: Number,
    ) -> Result<Vec<RetrievedRecord>> {
        if k == 0 {
            return Err(RetrievalError::invalid("k must be positive"));
        }
        let descriptor = query
            .descriptor
            .as_ref()
            .ok_or(RetrievalError::MissingDescriptors)?;

        let n = self.num_frames();
        let relevant = match relevance_count.min(n) {
            0 => HashSet::new(),
            r => self
                .knn(&query.pose, r, alpha)?
                .into_iter()
                .filter_map(|record| record.flat_index)
                .collect::<HashSet<_>>(),
        };

        let pool = relevance_count.saturating_add(k).min(n);
        if pool == 0 {
            return Ok(vec![]);
        }
        let distractors: Vec<_> = self
            .topk_descriptors(descriptor, &query.pose, pool)?
            .into_iter()
            .filter(|record| match record.flat_index {
                Some(i) => !relevant.contains(&i),
                None => false,
            })
            .take(k)
            .collect();

        if distractors.len() < k {
            warn!(
                "traverse `{}`: found {} of {} distractors for {}/{}",
                self.name(),
                distractors.len(),
                k,
                query.camera,
                query.timestamp
            );
        }
        Ok(distractors)
    }

    fn check_k(&self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(RetrievalError::invalid("k must be positive"));
        }
        if k > self.num_frames() {
            return Err(RetrievalError::OutOfRange {
                k,
                available: self.num_frames(),
            });
        }
        Ok(())
    }

    fn pose_errors(&self, pose: &SE3Quat) -> Result<(Vec<Number>, Vec<Number>)> {
        geometry::error(&SE3Poses::single(*pose), &self.all_poses)
    }

    fn descriptor_distances(&self, descriptor: &Descriptor) -> Result<Vec<Number>> {
        let all = self
            .all_descriptors
            .as_ref()
            .ok_or(RetrievalError::MissingDescriptors)?;
        if let Some(expected) = self.descriptor_dim() {
            if descriptor.len() != expected {
                return Err(RetrievalError::DescriptorDimension {
                    expected,
                    got: descriptor.len(),
                });
            }
        }
        let query = normalize(descriptor.clone());
        Ok(all.iter().map(|d| unit_sq_distance(d, &query)).collect())
    }

    fn record(
        &self,
        flat_index: usize,
        (t_err, r_err): &(Vec<Number>, Vec<Number>),
        distance: Option<Number>,
    ) -> RetrievedRecord {
        let (camera, timestamp) = self.key(flat_index);
        RetrievedRecord {
            camera: camera.to_string(),
            timestamp,
            t_err: t_err[flat_index],
            r_err: rotation::to_degrees(r_err[flat_index]),
            distance,
            pose: self.pose(flat_index).copied(),
            descriptor: None,
            flat_index: Some(flat_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traverse::fixtures::{self, weighted_descriptor, NUM_FRAMES};

    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn flat_indices(records: &[RetrievedRecord]) -> Vec<usize> {
        records.iter().filter_map(|r| r.flat_index).collect()
    }

    fn query_frame(traverse: &Traverse) -> FrameAttr {
        let mut query = traverse.query_attr("left", 1002).unwrap().unwrap();
        query.descriptor = Some(weighted_descriptor(&[
            (2, 5.0),
            (7, 4.0),
            (12, 3.0),
            (4, 2.0),
            (0, 1.0),
        ]));
        query
    }

    #[test]
    fn test_knn_exact_frame() {
        let traverse = fixtures::traverse();
        let query = traverse.query_attr("left", 1002).unwrap().unwrap();

        let retrieved = traverse.knn(&query.pose, 1, 5.0).unwrap();
        assert_eq!(retrieved.len(), 1);
        assert_eq!(retrieved[0].key(), ("left", 1002));
        assert_abs_diff_eq!(retrieved[0].t_err, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(retrieved[0].r_err, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_knn_sorted_by_metric() {
        let traverse = fixtures::traverse();
        let pose = traverse.query_attr("left", 1002).unwrap().unwrap().pose;

        let retrieved = traverse.knn(&pose, 3, 5.0).unwrap();
        assert_eq!(flat_indices(&retrieved), vec![2, 7, 1]);
        assert_abs_diff_eq!(retrieved[1].t_err, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(retrieved[1].r_err, 90.0, epsilon = 1e-9);

        let all = geometry::metric(&pose.into(), traverse.all_poses(), 5.0).unwrap();
        let min = all.iter().cloned().fold(Number::INFINITY, Number::min);
        assert_abs_diff_eq!(retrieved[0].distance.unwrap(), min);
        assert!(retrieved
            .windows(2)
            .all(|w| w[0].distance.unwrap() <= w[1].distance.unwrap()));
    }

    #[test]
    fn test_knn_alpha_zero_ignores_rotation() {
        let traverse = fixtures::traverse();
        let pose = traverse.query_attr("left", 1002).unwrap().unwrap().pose;
        let retrieved = traverse.knn(&pose, 3, 0.0).unwrap();
        assert_eq!(flat_indices(&retrieved), vec![2, 7, 12]);
    }

    #[test]
    fn test_knn_k_bounds() {
        let traverse = fixtures::traverse();
        let pose = SE3Quat::identity();
        assert_eq!(traverse.knn(&pose, NUM_FRAMES, 5.0).unwrap().len(), NUM_FRAMES);
        assert!(matches!(
            traverse.knn(&pose, NUM_FRAMES + 1, 5.0),
            Err(RetrievalError::OutOfRange { k: 16, available: 15 })
        ));
        assert!(matches!(
            traverse.knn(&pose, 0, 5.0),
            Err(RetrievalError::InvalidArgument(_))
        ));
        assert!(traverse.knn(&pose, 1, -5.0).is_err());
    }

    #[test]
    fn test_knn_imperfect_is_seeded_subset() {
        let traverse = fixtures::traverse();
        let pose = traverse.query_attr("left", 1002).unwrap().unwrap().pose;
        let pool: HashSet<_> = flat_indices(&traverse.knn(&pose, 10, 5.0).unwrap())
            .into_iter()
            .collect();

        let mut rng = StdRng::seed_from_u64(7);
        let first = traverse.knn_imperfect(&pose, 3, 5.0, &mut rng).unwrap();
        let picked = flat_indices(&first);
        assert_eq!(picked.len(), 3);
        assert_eq!(picked.iter().collect::<HashSet<_>>().len(), 3);
        assert!(picked.iter().all(|i| pool.contains(i)));

        let mut rng = StdRng::seed_from_u64(7);
        let second = traverse.knn_imperfect(&pose, 3, 5.0, &mut rng).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_knn_imperfect_pool_grows_with_k() {
        let traverse = fixtures::traverse();
        let mut rng = StdRng::seed_from_u64(1);
        let retrieved = traverse
            .knn_imperfect(&SE3Quat::identity(), 12, 5.0, &mut rng)
            .unwrap();
        assert_eq!(retrieved.len(), 12);
        assert!(traverse
            .knn_imperfect(&SE3Quat::identity(), 16, 5.0, &mut rng)
            .is_err());
    }

    #[test]
    fn test_knn_sampled_draws_from_custom_pool() {
        let traverse = fixtures::traverse();
        let pose = traverse.query_attr("right", 1001).unwrap().unwrap().pose;
        let pool: HashSet<_> = flat_indices(&traverse.knn(&pose, 4, 5.0).unwrap())
            .into_iter()
            .collect();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = flat_indices(&traverse.knn_sampled(&pose, 2, 5.0, 4, &mut rng).unwrap());
            assert_eq!(picked.len(), 2);
            assert_ne!(picked[0], picked[1]);
            assert!(picked.iter().all(|i| pool.contains(i)));
        }
    }

    #[test]
    fn test_query_tolerance() {
        let traverse = fixtures::traverse();
        let pose = traverse.query_attr("left", 1002).unwrap().unwrap().pose;

        let retrieved = traverse.query_tolerance(&pose, 11.0, 1.0).unwrap();
        assert_eq!(flat_indices(&retrieved), vec![1, 2, 3]);
        assert!(retrieved.iter().all(|r| r.distance.is_none()));

        let everything = traverse
            .query_tolerance(&pose, Number::INFINITY, Number::INFINITY)
            .unwrap();
        assert_eq!(everything.len(), NUM_FRAMES);
        assert!(traverse.query_tolerance(&pose, 0.0, 0.0).unwrap().is_empty());
        assert!(traverse.query_tolerance(&pose, -1.0, 180.0).unwrap().is_empty());
    }

    #[test]
    fn test_query_radius() {
        let traverse = fixtures::traverse();
        let pose = traverse.query_attr("left", 1002).unwrap().unwrap().pose;
        let retrieved = traverse.query_radius(&pose, 9.0, 5.0).unwrap();
        assert_eq!(flat_indices(&retrieved), vec![2, 7]);
    }

    #[test]
    fn test_topk_descriptors_ranks_by_similarity() {
        let traverse = fixtures::traverse();
        let query = query_frame(&traverse);
        let descriptor = weighted_descriptor(&[(12, 3.0), (4, 2.0), (0, 1.0)]);

        let retrieved = traverse.topk_descriptors(&descriptor, &query.pose, 3).unwrap();
        assert_eq!(flat_indices(&retrieved), vec![12, 4, 0]);

        let norm = (9.0 + 4.0 + 1.0 as Number).sqrt();
        assert_abs_diff_eq!(retrieved[0].distance.unwrap(), 2.0 - 6.0 / norm, epsilon = 1e-12);
        // pose errors are relative to the query pose
        assert_abs_diff_eq!(retrieved[0].r_err, 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(retrieved[2].t_err, 20.0, epsilon = 1e-9);
        assert!(retrieved[0].descriptor.is_some());
    }

    #[test]
    fn test_topk_descriptors_checks_dimension() {
        let traverse = fixtures::traverse();
        let descriptor = Descriptor::from_vec(vec![1.0, 0.0]);
        assert!(matches!(
            traverse.topk_descriptors(&descriptor, &SE3Quat::identity(), 1),
            Err(RetrievalError::DescriptorDimension { expected: 15, got: 2 })
        ));
    }

    #[test]
    fn test_distractors_skip_relevant_frames() {
        let traverse = fixtures::traverse();
        let query = query_frame(&traverse);

        let distractors = traverse.retrieve_distractors(&query, 2, 2, 5.0).unwrap();
        assert_eq!(flat_indices(&distractors), vec![12, 4]);

        let distractors = traverse.retrieve_distractors(&query, 5, 2, 5.0).unwrap();
        assert_eq!(flat_indices(&distractors), vec![12, 4, 0, 1, 3]);
    }

    #[test]
    fn test_distractors_underflow_is_soft() {
        let traverse = fixtures::traverse();
        let query = query_frame(&traverse);

        let distractors = traverse.retrieve_distractors(&query, 3, 13, 5.0).unwrap();
        assert_eq!(flat_indices(&distractors), vec![10, 14]);

        let distractors = traverse.retrieve_distractors(&query, 3, 15, 5.0).unwrap();
        assert!(distractors.is_empty());

        let distractors = traverse
            .retrieve_distractors(&query, 3, usize::MAX, 5.0)
            .unwrap();
        assert!(distractors.is_empty());
    }

    #[test]
    fn test_distractors_need_query_descriptor() {
        let traverse = fixtures::traverse();
        let mut query = query_frame(&traverse);
        query.descriptor = None;
        assert!(matches!(
            traverse.retrieve_distractors(&query, 1, 10, 5.0),
            Err(RetrievalError::MissingDescriptors)
        ));
    }
}
