//! Prior frames handed to the downstream localizer.

use std::collections::HashMap;

use crate::config::RetrievalConfig;
use crate::error::{RetrievalError, Result};
use crate::record::{FrameAttr, RetrievedRecord};
use crate::traverse::Traverse;

use log::{debug, warn};
use rand::Rng;

/// Selects the reference frames used as localization priors for `query`.
///
/// With `num_nearest > 0` this is the pose neighbours followed by the mined
/// distractors; otherwise the `num_distractors` best descriptor matches.
pub fn retrieve_priors<R>(
    reference: &Traverse,
    query: &FrameAttr,
    config: &RetrievalConfig,
    rng: &mut R,
) -> Result<Vec<RetrievedRecord>>
where
    R: Rng + ?Sized,
{
    config.validate()?;
    if reference.name() != config.reference_traverse {
        warn!(
            "retrieving from traverse `{}` but image keys use `{}`",
            reference.name(),
            config.reference_traverse
        );
    }

    if config.num_nearest == 0 {
        let descriptor = query
            .descriptor
            .as_ref()
            .ok_or(RetrievalError::MissingDescriptors)?;
        return reference.topk_descriptors(descriptor, &query.pose, config.num_distractors);
    }

    let distractors = if config.num_distractors > 0 {
        reference.retrieve_distractors(
            query,
            config.num_distractors,
            config.relevance_count,
            config.alpha,
        )?
    } else {
        vec![]
    };

    let mut priors = if config.imperfect {
        reference.knn_sampled(
            &query.pose,
            config.num_nearest,
            config.alpha,
            config.imperfect_pool,
            rng,
        )?
    } else {
        reference.knn(&query.pose, config.num_nearest, config.alpha)?
    };

    debug!(
        "{}/{}: {} nearest, {} distractors",
        query.camera,
        query.timestamp,
        priors.len(),
        distractors.len()
    );
    priors.extend(distractors);
    Ok(priors)
}

/// Database image name of a retrieved frame,
/// `<reference traverse>/<camera>/<timestamp>.<extension>`.
pub fn image_key(config: &RetrievalConfig, record: &RetrievedRecord) -> String {
    format!(
        "{}/{}/{}.{}",
        config.reference_traverse, record.camera, record.timestamp, config.image_extension
    )
}

/// Positions of the retrieved frames in the database name list.
///
/// Frames without a database entry are skipped.
pub fn retrieve_indices<S>(
    config: &RetrievalConfig,
    db_names: &[S],
    records: &[RetrievedRecord],
) -> Vec<usize>
where
    S: AsRef<str>,
{
    // first occurrence wins
    let mut positions = HashMap::with_capacity(db_names.len());
    for (i, name) in db_names.iter().enumerate() {
        positions.entry(name.as_ref()).or_insert(i);
    }

    records
        .iter()
        .filter_map(|record| {
            let key = image_key(config, record);
            let index = positions.get(key.as_str()).copied();
            if index.is_none() {
                warn!("no database entry for `{}`", key);
            }
            index
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traverse::fixtures::{self, weighted_descriptor};

    use rand::{rngs::StdRng, SeedableRng};

    fn query(traverse: &Traverse) -> FrameAttr {
        let mut query = traverse.query_attr("left", 1002).unwrap().unwrap();
        query.descriptor = Some(weighted_descriptor(&[(2, 5.0), (12, 3.0), (4, 2.0)]));
        query
    }

    #[test]
    fn test_nearest_then_distractors() {
        let traverse = fixtures::traverse();
        let config = RetrievalConfig {
            num_nearest: 2,
            num_distractors: 1,
            relevance_count: 2,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let priors = retrieve_priors(&traverse, &query(&traverse), &config, &mut rng).unwrap();
        let keys = priors.iter().map(RetrievedRecord::key).collect::<Vec<_>>();
        assert_eq!(keys, vec![("left", 1002), ("right", 1002), ("rear", 1002)]);
    }

    #[test]
    fn test_descriptor_only_retrieval() {
        let traverse = fixtures::traverse();
        let config = RetrievalConfig {
            num_nearest: 0,
            num_distractors: 2,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let priors = retrieve_priors(&traverse, &query(&traverse), &config, &mut rng).unwrap();
        let flat = priors.iter().filter_map(|r| r.flat_index).collect::<Vec<_>>();
        assert_eq!(flat, vec![2, 12]);
    }

    #[test]
    fn test_imperfect_priors_are_reproducible() {
        let traverse = fixtures::traverse();
        let config = RetrievalConfig {
            num_nearest: 3,
            num_distractors: 0,
            imperfect: true,
            ..Default::default()
        };
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            retrieve_priors(&traverse, &query(&traverse), &config, &mut rng).unwrap()
        };
        assert_eq!(run(3).len(), 3);
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn test_image_keys_and_indices() {
        let traverse = fixtures::traverse();
        let config = RetrievalConfig::default();
        let pose = traverse.query_attr("rear", 1001).unwrap().unwrap().pose;
        let records = traverse.knn(&pose, 2, config.alpha).unwrap();

        assert_eq!(image_key(&config, &records[0]), "overcast-reference/rear/1001.jpg");

        let db_names = vec![
            "overcast-reference/left/1000.jpg",
            "overcast-reference/rear/1001.jpg",
            "overcast-reference/rear/1001.jpg",
        ];
        assert_eq!(retrieve_indices(&config, &db_names, &records), vec![1]);
    }
}
