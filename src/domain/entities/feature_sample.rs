use crate::domain::values::close_reason::Outcome;
use crate::domain::values::features::FeatureVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the training dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSample {
    pub id: i64,
    pub ticker: String,
    /// Position the sample was recorded for, when known.
    pub position_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub features: FeatureVector,
    pub resultat: Option<Outcome>,
}

impl FeatureSample {
    pub fn is_labeled(&self) -> bool {
        self.resultat.is_some()
    }
}
