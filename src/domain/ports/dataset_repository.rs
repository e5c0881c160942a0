use crate::domain::entities::feature_sample::FeatureSample;
use crate::domain::error::DomainError;
use crate::domain::values::close_reason::Outcome;
use crate::domain::values::features::FeatureVector;
use chrono::{DateTime, Utc};

/// Append-only store of decision-time features and their realized labels.
pub trait DatasetRepository: Send + Sync {
    /// Append an unlabeled sample and return its id.
    fn append_sample(
        &self,
        ticker: &str,
        position_id: Option<&str>,
        features: &FeatureVector,
        recorded_at: DateTime<Utc>,
    ) -> Result<i64, DomainError>;

    /// Backfill the label of an unlabeled sample. Labeled rows are never rewritten.
    fn set_label(&self, sample_id: i64, outcome: Outcome) -> Result<(), DomainError>;

    /// Unlabeled sample bound to a position id.
    fn find_unlabeled_by_position(&self, position_id: &str) -> Result<Option<FeatureSample>, DomainError>;

    /// Most recent unlabeled sample for a ticker, scanning newest-first.
    fn find_latest_unlabeled(&self, ticker: &str) -> Result<Option<FeatureSample>, DomainError>;

    /// All samples in insertion order.
    fn list_samples(&self) -> Result<Vec<FeatureSample>, DomainError>;

    fn list_labeled(&self) -> Result<Vec<FeatureSample>, DomainError>;
}
