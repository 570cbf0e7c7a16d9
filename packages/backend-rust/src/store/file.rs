use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

use lengua_algo::assessment::AssessmentOutcome;
use lengua_algo::srs::{self, VocabularyEntry};
use lengua_algo::types::LearnerProfile;

use super::{AssessmentResultSink, ProfileStore, StoreError, VocabularyStore};

const PROFILES_FILE: &str = "profiles.json";
const VOCABULARY_FILE: &str = "vocabulary.json";
const ASSESSMENTS_FILE: &str = "assessments.json";

/// JSON snapshot persistence under a data directory. State is held in memory
/// and flushed on every write; the snapshot is reloaded at startup.
pub struct JsonFileStore {
    dir: PathBuf,
    profiles: RwLock<HashMap<String, LearnerProfile>>,
    // learner id -> word -> entry
    vocabulary: RwLock<HashMap<String, HashMap<String, VocabularyEntry>>>,
    assessments: RwLock<HashMap<String, AssessmentOutcome>>,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            profiles: RwLock::new(load_json(&dir.join(PROFILES_FILE))?),
            vocabulary: RwLock::new(load_json(&dir.join(VOCABULARY_FILE))?),
            assessments: RwLock::new(load_json(&dir.join(ASSESSMENTS_FILE))?),
            dir,
        })
    }

    fn flush<T: Serialize>(&self, file: &str, data: &T) -> Result<(), StoreError> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(data)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&self, learner_id: &str) -> Result<LearnerProfile, StoreError> {
        Ok(self
            .profiles
            .read()
            .get(learner_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, learner_id: &str, profile: &LearnerProfile) -> Result<(), StoreError> {
        let snapshot = {
            let mut profiles = self.profiles.write();
            profiles.insert(learner_id.to_string(), profile.clone());
            profiles.clone()
        };
        self.flush(PROFILES_FILE, &snapshot)
    }
}

impl VocabularyStore for JsonFileStore {
    fn get(&self, learner_id: &str, word: &str) -> Result<Option<VocabularyEntry>, StoreError> {
        Ok(self
            .vocabulary
            .read()
            .get(learner_id)
            .and_then(|entries| entries.get(word))
            .cloned())
    }

    fn upsert(&self, learner_id: &str, entry: &VocabularyEntry) -> Result<(), StoreError> {
        let snapshot = {
            let mut vocabulary = self.vocabulary.write();
            vocabulary
                .entry(learner_id.to_string())
                .or_default()
                .insert(entry.word.clone(), entry.clone());
            vocabulary.clone()
        };
        self.flush(VOCABULARY_FILE, &snapshot)
    }

    fn delete(&self, learner_id: &str, word: &str) -> Result<bool, StoreError> {
        let (removed, snapshot) = {
            let mut vocabulary = self.vocabulary.write();
            let removed = vocabulary
                .get_mut(learner_id)
                .map(|entries| entries.remove(word).is_some())
                .unwrap_or(false);
            (removed, vocabulary.clone())
        };
        if removed {
            self.flush(VOCABULARY_FILE, &snapshot)?;
        }
        Ok(removed)
    }

    fn all(&self, learner_id: &str) -> Result<Vec<VocabularyEntry>, StoreError> {
        Ok(self
            .vocabulary
            .read()
            .get(learner_id)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
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

impl AssessmentResultSink for JsonFileStore {
    fn persist(&self, learner_id: &str, outcome: &AssessmentOutcome) -> Result<(), StoreError> {
        let snapshot = {
            let mut assessments = self.assessments.write();
            assessments.insert(learner_id.to_string(), outcome.clone());
            assessments.clone()
        };
        self.flush(ASSESSMENTS_FILE, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lengua_algo::types::CefrLevel;

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();

        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            let mut profile = LearnerProfile::default();
            profile.level = CefrLevel::B2;
            store.save("u1", &profile).unwrap();

            let mut entry = VocabularyEntry::new("perro", "dog", None, now);
            entry.saved = true;
            store.upsert("u1", &entry).unwrap();
        }

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load("u1").unwrap().level, CefrLevel::B2);
        let entry = reopened.get("u1", "perro").unwrap().unwrap();
        assert!(entry.saved);
        assert_eq!(entry.translation, "dog");
    }

    #[test]
    fn test_missing_files_mean_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.all("anyone").unwrap().is_empty());
    }
}
