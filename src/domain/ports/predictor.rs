//! Learner port behind the outcome predictor.
//!
//! The orchestrator only sees [`Predictor`]. The bundled implementation is a
//! random forest refit from scratch on every call to [`Predictor::fit`]; an
//! online learner can be swapped in without touching the decision pipeline.

use crate::domain::error::DomainError;
use crate::domain::values::close_reason::Outcome;
use crate::domain::values::features::FeatureVector;

pub trait Predictor: Send + Sync {
    /// Learner name for logging.
    fn name(&self) -> &str;

    /// Fit on the full labeled set and replace the current model.
    fn fit(&self, samples: &[(FeatureVector, Outcome)]) -> Result<(), DomainError>;

    /// Probability of a win. `None` is "no opinion": no model yet, an
    /// unreadable model, or a feature-schema mismatch.
    fn predict(&self, features: &FeatureVector) -> Option<f64>;
}
