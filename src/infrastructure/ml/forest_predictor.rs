use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use super::random_forest::{ForestConfig, RandomForest};
use crate::domain::error::DomainError;
use crate::domain::ports::predictor::Predictor;
use crate::domain::values::close_reason::Outcome;
use crate::domain::values::features::FeatureVector;

/// Random forest persisted as a single JSON file.
///
/// A new model is written to a temporary sibling and renamed over the old
/// one, so readers see either the previous model or the new one.
pub struct ForestPredictor {
    path: PathBuf,
    config: ForestConfig,
    cache: RwLock<Option<RandomForest>>,
}

impl ForestPredictor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, ForestConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: ForestConfig) -> Self {
        Self {
            path: path.into(),
            config,
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RandomForest, DomainError> {
        if !self.path.exists() {
            return Err(DomainError::ModelUnavailable);
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| DomainError::PersistenceCorrupt(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| DomainError::PersistenceCorrupt(format!("{}: {e}", self.path.display())))
    }

    fn persist(&self, forest: &RandomForest) -> Result<(), DomainError> {
        let json = serde_json::to_string(forest).map_err(|e| DomainError::Parse(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        let io_err = |e: std::io::Error| DomainError::Io(format!("model write failed: {e}"));
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn score(forest: &RandomForest, features: &FeatureVector) -> Option<f64> {
        if forest.feature_names() != FeatureVector::names().as_slice() {
            debug!(
                stored = ?forest.feature_names(),
                "Model feature schema differs from current features"
            );
            return None;
        }
        match forest.predict_proba(&features.to_vec()) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!("Inference failed: {e}");
                None
            }
        }
    }
}

impl Predictor for ForestPredictor {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&self, samples: &[(FeatureVector, Outcome)]) -> Result<(), DomainError> {
        let x: Vec<Vec<f64>> = samples.iter().map(|(f, _)| f.to_vec()).collect();
        let y: Vec<u8> = samples.iter().map(|(_, o)| o.label()).collect();
        let forest = RandomForest::fit(self.config.clone(), FeatureVector::names(), &x, &y)?;
        self.persist(&forest)?;

        let mut cache = self
            .cache
            .write()
            .map_err(|e| DomainError::PersistenceCorrupt(format!("model cache poisoned: {e}")))?;
        *cache = Some(forest);
        info!(samples = samples.len(), path = %self.path.display(), "Model retrained");
        Ok(())
    }

    fn predict(&self, features: &FeatureVector) -> Option<f64> {
        if let Ok(cache) = self.cache.read() {
            if let Some(forest) = cache.as_ref() {
                return Self::score(forest, features);
            }
        }

        let forest = match self.load() {
            Ok(f) => f,
            Err(DomainError::ModelUnavailable) => return None,
            Err(e) => {
                warn!("Ignoring unreadable model: {e}");
                return None;
            }
        };
        let p = Self::score(&forest, features);
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(forest);
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(sentiment: f64) -> FeatureVector {
        FeatureVector {
            sentiment,
            auth_score: 0.6,
            rsi: 55.0,
            score_tech: 2.0,
            volatility: 0.05,
        }
    }

    fn samples() -> Vec<(FeatureVector, Outcome)> {
        (0..12)
            .map(|i| {
                if i % 2 == 0 {
                    (fv(0.5 + i as f64 * 0.01), Outcome::Win)
                } else {
                    (fv(-0.5 - i as f64 * 0.01), Outcome::Loss)
                }
            })
            .collect()
    }

    #[test]
    fn test_no_model_means_no_opinion() {
        let dir = tempfile::tempdir().unwrap();
        let p = ForestPredictor::new(dir.path().join("model.json"));
        assert_eq!(p.predict(&fv(0.5)), None);
    }

    #[test]
    fn test_fit_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let p = ForestPredictor::new(&path);
        p.fit(&samples()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let fresh = ForestPredictor::new(&path);
        let prob = fresh.predict(&fv(0.6)).unwrap();
        assert!((0.0..=1.0).contains(&prob));
        assert_eq!(Some(prob), p.predict(&fv(0.6)));
    }

    #[test]
    fn test_corrupt_model_is_no_opinion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "not a model").unwrap();
        let p = ForestPredictor::new(&path);
        assert_eq!(p.predict(&fv(0.5)), None);
    }

    #[test]
    fn test_schema_mismatch_is_no_opinion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let x = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        let old = RandomForest::fit(
            ForestConfig::default(),
            vec!["sentiment".into(), "rsi".into()],
            &x,
            &[1, 0],
        )
        .unwrap();
        fs::write(&path, serde_json::to_string(&old).unwrap()).unwrap();

        let p = ForestPredictor::new(&path);
        assert_eq!(p.predict(&fv(0.5)), None);
    }

    #[test]
    fn test_unwritable_model_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "file").unwrap();

        let p = ForestPredictor::new(blocker.join("model.json"));
        let err = p.fit(&samples()).unwrap_err();
        assert!(matches!(err, DomainError::Io(_)));
        assert_eq!(p.predict(&fv(0.5)), None);
    }
}
