use crate::error::{RetrievalError, Result};
use crate::num::Number;
use crate::traverse::consts;

use serde::{Deserialize, Serialize};

/// Parameters of prior retrieval against a reference traverse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Name of the reference traverse the database images come from.
    pub reference_traverse: String,

    /// Weight of the rotation term of the pose metric.
    pub alpha: Number,

    /// Pose neighbours per query; 0 switches to descriptor retrieval.
    pub num_nearest: usize,
    pub num_distractors: usize,

    /// Pose neighbours excluded from distractor mining.
    pub relevance_count: usize,

    pub imperfect: bool,
    pub imperfect_pool: usize,

    pub image_extension: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            reference_traverse: "overcast-reference".to_string(),
            alpha: 5.0,
            num_nearest: 1,
            num_distractors: 1,
            relevance_count: consts::RELEVANCE_COUNT,
            imperfect: false,
            imperfect_pool: consts::IMPERFECT_POOL,
            image_extension: "jpg".to_string(),
        }
    }
}

impl RetrievalConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha >= 0.0) {
            return Err(RetrievalError::invalid(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        if self.imperfect && self.imperfect_pool == 0 {
            return Err(RetrievalError::invalid("imperfect_pool must be positive"));
        }
        if self.reference_traverse.is_empty() {
            return Err(RetrievalError::invalid("reference_traverse must be set"));
        }
        Ok(())
    }
}
