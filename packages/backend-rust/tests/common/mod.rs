use std::sync::Arc;
use std::time::Duration;

use lengua_algo::types::{CefrLevel, ContentCandidate, ContentType};
use lengua_backend_rust::create_app;
use lengua_backend_rust::services::assessment::AssessmentService;
use lengua_backend_rust::services::recommendation::RecommendationService;
use lengua_backend_rust::services::vocabulary::VocabularyService;
use lengua_backend_rust::sources::{ContentSource, StaticSource};
use lengua_backend_rust::state::AppState;
use lengua_backend_rust::store::memory::{
    MemoryProfileStore, MemoryResultSink, MemoryVocabularyStore,
};

pub fn sample_candidate(id: &str, content_type: ContentType, level: CefrLevel) -> ContentCandidate {
    ContentCandidate {
        id: id.to_string(),
        title: format!("Item {id}"),
        content_type,
        level,
        duration: 240.0,
        vocabulary: Vec::new(),
        tags: vec!["culture".to_string()],
        published_at: None,
        likes: None,
        views: None,
        quality: None,
    }
}

pub fn static_sources(per_type: usize, level: CefrLevel) -> Vec<ContentSource> {
    ContentType::ALL
        .iter()
        .map(|&content_type| {
            ContentSource::Static(StaticSource {
                kind: content_type,
                items: (0..per_type)
                    .map(|i| {
                        sample_candidate(
                            &format!("{}-{i}", content_type.as_str()),
                            content_type,
                            level,
                        )
                    })
                    .collect(),
            })
        })
        .collect()
}

pub fn create_test_app() -> axum::Router {
    let profiles = Arc::new(MemoryProfileStore::new());
    let vocabulary_store = Arc::new(MemoryVocabularyStore::new());
    let sink = Arc::new(MemoryResultSink::new());

    let recommendation = Arc::new(RecommendationService::new(
        static_sources(10, CefrLevel::A2),
        profiles,
        vocabulary_store.clone(),
        Duration::from_millis(500),
    ));
    let assessment = Arc::new(AssessmentService::new(sink));
    let vocabulary = Arc::new(VocabularyService::new(vocabulary_store));

    create_app(AppState::new(recommendation, assessment, vocabulary))
}
