pub mod file;
pub mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use lengua_algo::assessment::AssessmentOutcome;
use lengua_algo::srs::VocabularyEntry;
use lengua_algo::types::LearnerProfile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Learner profiles keyed by learner id. `load` returns a default profile
/// for learners the store has never seen.
pub trait ProfileStore: Send + Sync {
    fn load(&self, learner_id: &str) -> Result<LearnerProfile, StoreError>;
    fn save(&self, learner_id: &str, profile: &LearnerProfile) -> Result<(), StoreError>;
}

/// Vocabulary entries keyed by (learner id, normalized word).
pub trait VocabularyStore: Send + Sync {
    fn get(&self, learner_id: &str, word: &str) -> Result<Option<VocabularyEntry>, StoreError>;
    fn upsert(&self, learner_id: &str, entry: &VocabularyEntry) -> Result<(), StoreError>;
    fn delete(&self, learner_id: &str, word: &str) -> Result<bool, StoreError>;
    fn all(&self, learner_id: &str) -> Result<Vec<VocabularyEntry>, StoreError>;
    /// Saved entries due at or before `now`, oldest overdue first.
    fn due_before(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<VocabularyEntry>, StoreError>;
}

/// Receives each completed or skipped assessment exactly once. The core does
/// not retry a failed persist.
pub trait AssessmentResultSink: Send + Sync {
    fn persist(&self, learner_id: &str, outcome: &AssessmentOutcome) -> Result<(), StoreError>;
}
