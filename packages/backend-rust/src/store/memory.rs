use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use lengua_algo::assessment::AssessmentOutcome;
use lengua_algo::srs::{self, VocabularyEntry};
use lengua_algo::types::LearnerProfile;

use super::{AssessmentResultSink, ProfileStore, StoreError, VocabularyStore};

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, LearnerProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, learner_id: &str) -> Result<LearnerProfile, StoreError> {
        Ok(self
            .profiles
            .read()
            .get(learner_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, learner_id: &str, profile: &LearnerProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .insert(learner_id.to_string(), profile.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryVocabularyStore {
    entries: RwLock<HashMap<(String, String), VocabularyEntry>>,
}

impl MemoryVocabularyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VocabularyStore for MemoryVocabularyStore {
    fn get(&self, learner_id: &str, word: &str) -> Result<Option<VocabularyEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .get(&(learner_id.to_string(), word.to_string()))
            .cloned())
    }

    fn upsert(&self, learner_id: &str, entry: &VocabularyEntry) -> Result<(), StoreError> {
        self.entries.write().insert(
            (learner_id.to_string(), entry.word.clone()),
            entry.clone(),
        );
        Ok(())
    }

    fn delete(&self, learner_id: &str, word: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .write()
            .remove(&(learner_id.to_string(), word.to_string()))
            .is_some())
    }

    fn all(&self, learner_id: &str) -> Result<Vec<VocabularyEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|((learner, _), _)| learner == learner_id)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn due_before(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<VocabularyEntry>, StoreError> {
        let entries = self.all(learner_id)?;
        Ok(srs::due_for_review(&entries, now))
    }
}

/// Keeps the latest outcome per learner; tests read them back.
#[derive(Default)]
pub struct MemoryResultSink {
    results: RwLock<HashMap<String, AssessmentOutcome>>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, learner_id: &str) -> Option<AssessmentOutcome> {
        self.results.read().get(learner_id).cloned()
    }
}

impl AssessmentResultSink for MemoryResultSink {
    fn persist(&self, learner_id: &str, outcome: &AssessmentOutcome) -> Result<(), StoreError> {
        self.results
            .write()
            .insert(learner_id.to_string(), outcome.clone());
        Ok(())
    }
}
