use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use thiserror::Error;

use lengua_algo::feed;
use lengua_algo::srs::VocabularyEntry;
use lengua_algo::types::{CefrLevel, ContentCandidate, ContentType, FeedItem, LearnerProfile};

use crate::sources::{ContentSource, SourceError};
use crate::store::{ProfileStore, StoreError, VocabularyStore};

pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 100;

/// Nominal duration of an injected review flashcard.
const REVIEW_CARD_DURATION_SECS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub limit: Option<usize>,
    pub category: Option<String>,
    pub level: Option<CefrLevel>,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub fetched_candidates: usize,
    pub failed_sources: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionUpdate {
    pub liked: Option<bool>,
    pub saved: Option<bool>,
    pub completed: Option<bool>,
    pub content_type: Option<ContentType>,
}

/// Front door of the engine: turns the learner profile, the content sources
/// and the due-review queue into one ordered feed.
pub struct RecommendationService {
    sources: Vec<ContentSource>,
    profiles: Arc<dyn ProfileStore>,
    vocabulary: Arc<dyn VocabularyStore>,
    source_timeout: std::time::Duration,
}

impl RecommendationService {
    pub fn new(
        sources: Vec<ContentSource>,
        profiles: Arc<dyn ProfileStore>,
        vocabulary: Arc<dyn VocabularyStore>,
        source_timeout: std::time::Duration,
    ) -> Self {
        Self {
            sources,
            profiles,
            vocabulary,
            source_timeout,
        }
    }

    pub async fn generate_feed(
        &self,
        learner_id: &str,
        query: &FeedQuery,
    ) -> Result<FeedPage, RecommendationError> {
        let now = Utc::now();
        let limit = query
            .limit
            .unwrap_or(DEFAULT_FEED_LIMIT)
            .clamp(1, MAX_FEED_LIMIT);

        let mut profile = self.profiles.load(learner_id)?;
        if let Some(level) = query.level {
            profile.level = level;
        }

        let (mut candidates, failed_sources) = self.fetch_all_candidates().await;
        let fetched_candidates = candidates.len();

        if let Some(category) = &query.category {
            let category = category.to_lowercase();
            candidates.retain(|candidate| {
                candidate
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase() == category)
            });
        }

        let due_cards: Vec<ContentCandidate> = self
            .vocabulary
            .due_before(learner_id, now)?
            .into_iter()
            .map(review_card)
            .collect();

        let items = feed::assemble(candidates, &profile, due_cards, limit, now);

        tracing::debug!(
            learner = learner_id,
            fetched = fetched_candidates,
            failed_sources,
            feed_len = items.len(),
            "feed assembled"
        );

        Ok(FeedPage {
            items,
            fetched_candidates,
            failed_sources,
        })
    }

    /// Fans out one fetch per source under a shared per-fetch timeout. A
    /// failed or timed-out source contributes nothing; the feed is built
    /// from whatever succeeded.
    async fn fetch_all_candidates(&self) -> (Vec<ContentCandidate>, usize) {
        let fetches = self.sources.iter().map(|source| async {
            let kind = source.kind();
            let result = match tokio::time::timeout(self.source_timeout, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout(self.source_timeout)),
            };
            (kind, result)
        });

        let mut candidates = Vec::new();
        let mut failed = 0usize;
        for (kind, result) in join_all(fetches).await {
            match result {
                Ok(items) => candidates.extend(items),
                Err(err) => {
                    failed += 1;
                    tracing::warn!(source = kind.as_str(), error = %err, "content source failed");
                }
            }
        }
        (candidates, failed)
    }

    pub fn track_interaction(
        &self,
        learner_id: &str,
        content_id: &str,
        update: &InteractionUpdate,
    ) -> Result<LearnerProfile, RecommendationError> {
        let mut profile = self.profiles.load(learner_id)?;
        profile.record_interaction(
            content_id,
            update.content_type,
            update.liked,
            update.saved,
            update.completed,
            Utc::now(),
        );
        self.profiles.save(learner_id, &profile)?;
        Ok(profile)
    }

    pub fn track_watch_time(
        &self,
        learner_id: &str,
        content_id: &str,
        seconds: f64,
    ) -> Result<(), RecommendationError> {
        let mut profile = self.profiles.load(learner_id)?;
        profile.record_watch(content_id, seconds, Utc::now());
        self.profiles.save(learner_id, &profile)?;
        Ok(())
    }

    pub fn update_level(
        &self,
        learner_id: &str,
        level: CefrLevel,
    ) -> Result<(), RecommendationError> {
        let mut profile = self.profiles.load(learner_id)?;
        profile.level = level;
        self.profiles.save(learner_id, &profile)?;
        Ok(())
    }
}

/// Wraps a due vocabulary entry as a flashcard the feed can slot in.
fn review_card(entry: VocabularyEntry) -> ContentCandidate {
    ContentCandidate {
        id: format!("review:{}", entry.word),
        title: format!("{} ({})", entry.word, entry.translation),
        content_type: ContentType::Video,
        level: CefrLevel::A1,
        duration: REVIEW_CARD_DURATION_SECS,
        vocabulary: vec![entry.word],
        tags: vec!["review".to_string()],
        published_at: None,
        likes: None,
        views: None,
        quality: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::sources::StaticSource;
    use crate::store::memory::{MemoryProfileStore, MemoryVocabularyStore};

    fn candidate(id: &str, content_type: ContentType, level: CefrLevel) -> ContentCandidate {
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

    fn static_sources(per_type: usize) -> Vec<ContentSource> {
        ContentType::ALL
            .iter()
            .map(|&content_type| {
                ContentSource::Static(StaticSource {
                    kind: content_type,
                    items: (0..per_type)
                        .map(|i| {
                            candidate(
                                &format!("{}-{i}", content_type.as_str()),
                                content_type,
                                CefrLevel::A2,
                            )
                        })
                        .collect(),
                })
            })
            .collect()
    }

    fn service(per_type: usize) -> (RecommendationService, Arc<MemoryVocabularyStore>) {
        let vocabulary = Arc::new(MemoryVocabularyStore::new());
        let service = RecommendationService::new(
            static_sources(per_type),
            Arc::new(MemoryProfileStore::new()),
            vocabulary.clone(),
            Duration::from_millis(500),
        );
        (service, vocabulary)
    }

    #[tokio::test]
    async fn test_feed_generation_with_static_sources() {
        let (service, _) = service(10);
        let page = service
            .generate_feed("u1", &FeedQuery::default())
            .await
            .unwrap();

        assert!(!page.items.is_empty());
        assert_eq!(page.failed_sources, 0);
        assert_eq!(page.fetched_candidates, 40);
        assert!(page.items.len() <= DEFAULT_FEED_LIMIT + 4);
    }

    #[tokio::test]
    async fn test_feed_respects_category_filter() {
        let (service, _) = service(6);
        let page = service
            .generate_feed(
                "u1",
                &FeedQuery {
                    category: Some("sports".to_string()),
                    ..FeedQuery::default()
                },
            )
            .await
            .unwrap();
        // No candidate carries the sports tag.
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_feed_injects_due_reviews() {
        let (service, vocabulary) = service(10);
        let now = Utc::now();
        let mut entry = VocabularyEntry::new("hola", "hello", None, now);
        entry.saved = true;
        vocabulary.upsert("u1", &entry).unwrap();

        let page = service
            .generate_feed("u1", &FeedQuery::default())
            .await
            .unwrap();
        let reviews: Vec<&FeedItem> = page.items.iter().filter(|i| i.is_review).collect();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].candidate.id, "review:hola");
    }

    #[tokio::test]
    async fn test_empty_sources_yield_empty_feed() {
        let service = RecommendationService::new(
            Vec::new(),
            Arc::new(MemoryProfileStore::new()),
            Arc::new(MemoryVocabularyStore::new()),
            Duration::from_millis(500),
        );
        let page = service
            .generate_feed("u1", &FeedQuery::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.fetched_candidates, 0);
    }

    #[tokio::test]
    async fn test_level_override_changes_filtering() {
        let (service, _) = service(5);
        // All candidates are A2; a C1 learner is more than one step away.
        let page = service
            .generate_feed(
                "u1",
                &FeedQuery {
                    level: Some(CefrLevel::C1),
                    ..FeedQuery::default()
                },
            )
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_interaction_shifts_preferences() {
        let (service, _) = service(1);
        let profile = service
            .track_interaction(
                "u1",
                "podcast-0",
                &InteractionUpdate {
                    completed: Some(true),
                    content_type: Some(ContentType::Podcast),
                    ..InteractionUpdate::default()
                },
            )
            .unwrap();
        assert!(profile.type_preference(ContentType::Podcast) > 0.2);

        let reloaded = service.profiles.load("u1").unwrap();
        assert!(reloaded.interactions.contains_key("podcast-0"));
    }
}
