use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::services::assessment::AssessmentService;
use crate::services::recommendation::RecommendationService;
use crate::services::vocabulary::VocabularyService;
use crate::sources::ContentSource;
use crate::store::file::JsonFileStore;
use crate::store::memory::{MemoryProfileStore, MemoryResultSink, MemoryVocabularyStore};
use crate::store::{AssessmentResultSink, ProfileStore, VocabularyStore};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    recommendation: Arc<RecommendationService>,
    assessment: Arc<AssessmentService>,
    vocabulary: Arc<VocabularyService>,
}

impl AppState {
    pub fn new(
        recommendation: Arc<RecommendationService>,
        assessment: Arc<AssessmentService>,
        vocabulary: Arc<VocabularyService>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            recommendation,
            assessment,
            vocabulary,
        }
    }

    /// Wires stores, sources and services from configuration. Falls back to
    /// in-memory stores when no data directory is configured or the snapshot
    /// cannot be opened.
    pub fn from_config(config: &Config) -> Self {
        let (profiles, vocabulary_store, sink): (
            Arc<dyn ProfileStore>,
            Arc<dyn VocabularyStore>,
            Arc<dyn AssessmentResultSink>,
        ) = match &config.data_dir {
            Some(dir) => match JsonFileStore::open(dir) {
                Ok(store) => {
                    let store = Arc::new(store);
                    (store.clone(), store.clone(), store)
                }
                Err(err) => {
                    tracing::warn!(error = %err, dir = %dir.display(), "snapshot store unavailable, using in-memory stores");
                    in_memory_stores()
                }
            },
            None => in_memory_stores(),
        };

        let sources = ContentSource::from_config(config);
        let recommendation = Arc::new(RecommendationService::new(
            sources,
            profiles,
            vocabulary_store.clone(),
            config.source_timeout,
        ));
        let assessment = Arc::new(AssessmentService::new(sink));
        let vocabulary = Arc::new(VocabularyService::new(vocabulary_store));

        Self::new(recommendation, assessment, vocabulary)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn recommendation(&self) -> Arc<RecommendationService> {
        Arc::clone(&self.recommendation)
    }

    pub fn assessment(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessment)
    }

    pub fn vocabulary(&self) -> Arc<VocabularyService> {
        Arc::clone(&self.vocabulary)
    }
}

fn in_memory_stores() -> (
    Arc<dyn ProfileStore>,
    Arc<dyn VocabularyStore>,
    Arc<dyn AssessmentResultSink>,
) {
    (
        Arc::new(MemoryProfileStore::new()),
        Arc::new(MemoryVocabularyStore::new()),
        Arc::new(MemoryResultSink::new()),
    )
}
