use crate::domain::entities::feature_sample::FeatureSample;
use crate::domain::error::DomainError;
use crate::domain::ports::dataset_repository::DatasetRepository;
use crate::domain::values::close_reason::Outcome;
use crate::domain::values::features::FeatureVector;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::warn;

const COLUMNS: &str =
    "id, ticker, position_id, recorded_at, sentiment, auth_score, rsi, score_tech, volatility, resultat";

pub struct SqliteDatasetRepo {
    conn: Mutex<Connection>,
}

struct SampleRow {
    id: i64,
    ticker: String,
    position_id: Option<String>,
    recorded_at: String,
    features: FeatureVector,
    resultat: Option<i64>,
}

impl SqliteDatasetRepo {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn read_row(row: &rusqlite::Row) -> Result<SampleRow, rusqlite::Error> {
        Ok(SampleRow {
            id: row.get(0)?,
            ticker: row.get(1)?,
            position_id: row.get(2)?,
            recorded_at: row.get(3)?,
            features: FeatureVector {
                sentiment: row.get(4)?,
                auth_score: row.get(5)?,
                rsi: row.get(6)?,
                score_tech: row.get(7)?,
                volatility: row.get(8)?,
            },
            resultat: row.get(9)?,
        })
    }

    fn into_sample(row: SampleRow) -> Result<FeatureSample, DomainError> {
        let recorded_at = DateTime::parse_from_rfc3339(&row.recorded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DomainError::PersistenceCorrupt(format!("sample {}: {e}", row.id)))?;
        let resultat = match row.resultat {
            None => None,
            Some(v) => Some(Outcome::from_label(v).ok_or_else(|| {
                DomainError::PersistenceCorrupt(format!("sample {}: label {v}", row.id))
            })?),
        };
        Ok(FeatureSample {
            id: row.id,
            ticker: row.ticker,
            position_id: row.position_id,
            recorded_at,
            features: row.features,
            resultat,
        })
    }

    fn select(&self, where_clause: &str, param: Option<&str>) -> Result<Vec<FeatureSample>, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let sql = format!("SELECT {COLUMNS} FROM feature_samples {where_clause}");
        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<Result<SampleRow, rusqlite::Error>> = match param {
            Some(p) => stmt.query_map(params![p], Self::read_row)?.collect(),
            None => stmt.query_map([], Self::read_row)?.collect(),
        };
        Ok(rows
            .into_iter()
            .filter_map(|r| match r.map_err(DomainError::from).and_then(Self::into_sample) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("Skipping corrupt dataset row: {e}");
                    None
                }
            })
            .collect())
    }
}

impl DatasetRepository for SqliteDatasetRepo {
    fn append_sample(
        &self,
        ticker: &str,
        position_id: Option<&str>,
        features: &FeatureVector,
        recorded_at: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO feature_samples (ticker, position_id, recorded_at, sentiment, auth_score, rsi, score_tech, volatility)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                ticker.trim().to_uppercase(),
                position_id,
                recorded_at.to_rfc3339(),
                features.sentiment,
                features.auth_score,
                features.rsi,
                features.score_tech,
                features.volatility,
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to record features: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    fn set_label(&self, sample_id: i64, outcome: Outcome) -> Result<(), DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let rows = conn.execute(
            "UPDATE feature_samples SET resultat = ?1 WHERE id = ?2 AND resultat IS NULL",
            params![outcome.label() as i64, sample_id],
        )?;
        if rows == 0 {
            return Err(DomainError::NotFound(format!(
                "No unlabeled sample with id {sample_id}"
            )));
        }
        Ok(())
    }

    fn find_unlabeled_by_position(&self, position_id: &str) -> Result<Option<FeatureSample>, DomainError> {
        Ok(self
            .select(
                "WHERE position_id = ?1 AND resultat IS NULL ORDER BY id DESC LIMIT 1",
                Some(position_id),
            )?
            .into_iter()
            .next())
    }

    fn find_latest_unlabeled(&self, ticker: &str) -> Result<Option<FeatureSample>, DomainError> {
        let ticker = ticker.trim().to_uppercase();
        Ok(self
            .select(
                "WHERE ticker = ?1 AND resultat IS NULL ORDER BY id DESC LIMIT 1",
                Some(ticker.as_str()),
            )?
            .into_iter()
            .next())
    }

    fn list_samples(&self) -> Result<Vec<FeatureSample>, DomainError> {
        self.select("ORDER BY id", None)
    }

    fn list_labeled(&self) -> Result<Vec<FeatureSample>, DomainError> {
        self.select("WHERE resultat IS NOT NULL ORDER BY id", None)
    }
}
