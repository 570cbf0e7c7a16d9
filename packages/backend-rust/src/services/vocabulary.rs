use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use lengua_algo::srs::{self, ReviewQuality, VocabularyEntry, VocabularyStats};

use crate::store::{StoreError, VocabularyStore};

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("word not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub entry: VocabularyEntry,
    pub next_review_in_days: u32,
}

/// Tracks per-learner word retention. Clicking a word creates an unsaved
/// entry; saving it moves the word into the review queue; review outcomes
/// feed the SM-2 scheduler.
pub struct VocabularyService {
    store: Arc<dyn VocabularyStore>,
}

impl VocabularyService {
    pub fn new(store: Arc<dyn VocabularyStore>) -> Self {
        Self { store }
    }

    fn normalize(word: &str) -> String {
        word.trim().to_lowercase()
    }

    /// Registers a dictionary lookup. Repeated clicks only bump the counter.
    pub fn record_click(
        &self,
        learner_id: &str,
        word: &str,
        translation: &str,
        context: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<VocabularyEntry, VocabularyError> {
        let word = Self::normalize(word);
        let entry = match self.store.get(learner_id, &word)? {
            Some(mut entry) => {
                entry.click_count += 1;
                if entry.translation.is_empty() {
                    entry.translation = translation.to_string();
                }
                entry
            }
            None => VocabularyEntry::new(&word, translation, context, now),
        };
        self.store.upsert(learner_id, &entry)?;
        Ok(entry)
    }

    /// Promotes a clicked word into the active review queue.
    pub fn save_word(
        &self,
        learner_id: &str,
        word: &str,
    ) -> Result<VocabularyEntry, VocabularyError> {
        let word = Self::normalize(word);
        let mut entry = self
            .store
            .get(learner_id, &word)?
            .ok_or_else(|| VocabularyError::NotFound(word.clone()))?;
        entry.saved = true;
        entry.mastery_level = 0;
        self.store.upsert(learner_id, &entry)?;
        Ok(entry)
    }

    pub fn update_review(
        &self,
        learner_id: &str,
        word: &str,
        quality: ReviewQuality,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, VocabularyError> {
        let word = Self::normalize(word);
        let mut entry = self
            .store
            .get(learner_id, &word)?
            .ok_or_else(|| VocabularyError::NotFound(word.clone()))?;

        let next_review_in_days = entry.apply_review(quality, now);
        self.store.upsert(learner_id, &entry)?;

        tracing::debug!(
            learner = learner_id,
            word = %entry.word,
            interval = next_review_in_days,
            "review recorded"
        );

        Ok(ReviewOutcome {
            entry,
            next_review_in_days,
        })
    }

    pub fn due_for_review(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<VocabularyEntry>, VocabularyError> {
        Ok(self.store.due_before(learner_id, now)?)
    }

    pub fn stats(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<VocabularyStats, VocabularyError> {
        let entries = self.store.all(learner_id)?;
        Ok(srs::vocabulary_stats(&entries, now))
    }

    pub fn delete(&self, learner_id: &str, word: &str) -> Result<(), VocabularyError> {
        let word = Self::normalize(word);
        if self.store.delete(learner_id, &word)? {
            Ok(())
        } else {
            Err(VocabularyError::NotFound(word))
        }
    }
}
