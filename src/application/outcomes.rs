use crate::domain::error::DomainError;
use crate::domain::ports::dataset_repository::DatasetRepository;
use crate::domain::ports::predictor::Predictor;
use crate::domain::values::close_reason::Outcome;
use crate::domain::values::features::FeatureVector;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Labeled samples required before a model is fitted.
pub const MIN_TRAINING_SAMPLES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainOutcome {
    /// Too few labeled samples; any existing model was left as is.
    Insufficient { labeled: usize, required: usize },
    Trained { samples: usize, wins: usize },
}

/// Records decision-time features, backfills realized outcomes and keeps the
/// predictor in sync with the labeled dataset.
pub struct OutcomeTracker {
    dataset: Arc<dyn DatasetRepository>,
    predictor: Arc<dyn Predictor>,
}

impl OutcomeTracker {
    pub fn new(dataset: Arc<dyn DatasetRepository>, predictor: Arc<dyn Predictor>) -> Self {
        Self { dataset, predictor }
    }

    pub fn record_features(
        &self,
        ticker: &str,
        position_id: Option<&str>,
        features: &FeatureVector,
    ) -> Result<i64, DomainError> {
        let id = self
            .dataset
            .append_sample(ticker, position_id, features, Utc::now())?;
        debug!(ticker, sample = id, "Features recorded");
        Ok(id)
    }

    /// Label the sample for a closed position and retrain.
    ///
    /// The sample bound to `position_id` wins; without one, the newest
    /// unlabeled sample for the ticker is used. Returns the labeled sample id,
    /// or `None` when there was nothing to label.
    pub fn record_outcome(
        &self,
        ticker: &str,
        position_id: Option<&str>,
        outcome: Outcome,
    ) -> Result<Option<i64>, DomainError> {
        let bound = match position_id {
            Some(id) => self.dataset.find_unlabeled_by_position(id)?,
            None => None,
        };
        let sample = match bound {
            Some(s) => Some(s),
            None => self.dataset.find_latest_unlabeled(ticker)?,
        };
        let Some(sample) = sample else {
            debug!(ticker, "No unlabeled sample to update");
            return Ok(None);
        };

        self.dataset.set_label(sample.id, outcome)?;
        info!(ticker, sample = sample.id, %outcome, "Outcome recorded");

        if let Err(e) = self.train() {
            warn!("Retraining failed: {e}");
        }
        Ok(Some(sample.id))
    }

    pub fn train(&self) -> Result<TrainOutcome, DomainError> {
        let labeled: Vec<(FeatureVector, Outcome)> = self
            .dataset
            .list_labeled()?
            .into_iter()
            .filter_map(|s| s.resultat.map(|o| (s.features, o)))
            .collect();

        if labeled.len() < MIN_TRAINING_SAMPLES {
            debug!(
                labeled = labeled.len(),
                required = MIN_TRAINING_SAMPLES,
                "Not enough data to train"
            );
            return Ok(TrainOutcome::Insufficient {
                labeled: labeled.len(),
                required: MIN_TRAINING_SAMPLES,
            });
        }

        self.predictor.fit(&labeled)?;
        let wins = labeled.iter().filter(|(_, o)| *o == Outcome::Win).count();
        info!(
            learner = self.predictor.name(),
            samples = labeled.len(),
            wins,
            "Predictor trained"
        );
        Ok(TrainOutcome::Trained {
            samples: labeled.len(),
            wins,
        })
    }

    pub fn predict(&self, features: &FeatureVector) -> Option<f64> {
        self.predictor.predict(features)
    }
}
