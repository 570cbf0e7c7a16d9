use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Preference weight assumed for a content type the learner has no data for.
pub const DEFAULT_TYPE_PREFERENCE: f64 = 0.25;

/// Preference bump applied when the learner completes a piece of content.
pub const COMPLETION_PREFERENCE_BUMP: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        Self::A1,
        Self::A2,
        Self::B1,
        Self::B2,
        Self::C1,
        Self::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            "C1" => Some(Self::C1),
            "C2" => Some(Self::C2),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|l| l == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn up(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn down(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Absolute distance on the CEFR ladder, used by the level filter.
    pub fn distance(&self, other: CefrLevel) -> usize {
        self.index().abs_diff(other.index())
    }
}

impl Default for CefrLevel {
    fn default() -> Self {
        Self::A2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Podcast,
    Article,
    Youtube,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        Self::Video,
        Self::Podcast,
        Self::Article,
        Self::Youtube,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Podcast => "podcast",
            Self::Article => "article",
            Self::Youtube => "youtube",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "video" => Some(Self::Video),
            "podcast" => Some(Self::Podcast),
            "article" => Some(Self::Article),
            "youtube" => Some(Self::Youtube),
            _ => None,
        }
    }
}

/// A piece of learnable content as delivered by a content source.
/// Immutable once ingested; the engine scores it per request but never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCandidate {
    pub id: String,
    pub title: String,
    pub content_type: ContentType,
    pub level: CefrLevel,
    /// Playback or estimated reading duration in seconds.
    pub duration: f64,
    #[serde(default)]
    pub vocabulary: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(
        default,
        rename = "publishedDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub liked: bool,
    pub saved: bool,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEvent {
    pub content_id: String,
    pub timestamp: DateTime<Utc>,
    pub seconds: f64,
}

/// Everything the engine knows about one learner. The profile is the only
/// mutable state the pipeline touches, and only through the explicit event
/// methods below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub level: CefrLevel,
    pub known_words: HashSet<String>,
    pub interests: Vec<String>,
    /// contentId -> cumulative seconds observed.
    pub watch_time: HashMap<String, f64>,
    pub watch_history: Vec<WatchEvent>,
    pub interactions: HashMap<String, InteractionRecord>,
    /// Weights sum to 1.0; renormalized after every update.
    pub content_type_preference: HashMap<ContentType, f64>,
}

impl Default for LearnerProfile {
    fn default() -> Self {
        let mut content_type_preference = HashMap::new();
        content_type_preference.insert(ContentType::Video, 0.4);
        content_type_preference.insert(ContentType::Podcast, 0.2);
        content_type_preference.insert(ContentType::Article, 0.3);
        content_type_preference.insert(ContentType::Youtube, 0.1);

        Self {
            level: CefrLevel::A2,
            known_words: HashSet::new(),
            interests: vec![
                "culture".to_string(),
                "news".to_string(),
                "entertainment".to_string(),
            ],
            watch_time: HashMap::new(),
            watch_history: Vec::new(),
            interactions: HashMap::new(),
            content_type_preference,
        }
    }
}

impl LearnerProfile {
    pub fn type_preference(&self, content_type: ContentType) -> f64 {
        self.content_type_preference
            .get(&content_type)
            .copied()
            .unwrap_or(DEFAULT_TYPE_PREFERENCE)
    }

    pub fn mark_word_known(&mut self, word: &str) {
        self.known_words.insert(word.trim().to_lowercase());
    }

    pub fn record_watch(&mut self, content_id: &str, seconds: f64, now: DateTime<Utc>) {
        let seconds = seconds.max(0.0);
        *self.watch_time.entry(content_id.to_string()).or_insert(0.0) += seconds;
        self.watch_history.push(WatchEvent {
            content_id: content_id.to_string(),
            timestamp: now,
            seconds,
        });
    }

    pub fn watched_within(&self, content_id: &str, window: Duration, now: DateTime<Utc>) -> bool {
        self.watch_history
            .iter()
            .any(|event| event.content_id == content_id && now - event.timestamp < window)
    }

    pub fn record_interaction(
        &mut self,
        content_id: &str,
        content_type: Option<ContentType>,
        liked: Option<bool>,
        saved: Option<bool>,
        completed: Option<bool>,
        now: DateTime<Utc>,
    ) {
        let record = self.interactions.entry(content_id.to_string()).or_default();
        if let Some(liked) = liked {
            record.liked = liked;
        }
        if let Some(saved) = saved {
            record.saved = saved;
        }
        let newly_completed = completed == Some(true) && !record.completed;
        if let Some(completed) = completed {
            record.completed = completed;
        }
        record.last_interaction = Some(now);

        if newly_completed {
            if let Some(content_type) = content_type {
                self.bump_type_preference(content_type);
            }
        }
    }

    fn bump_type_preference(&mut self, content_type: ContentType) {
        let entry = self
            .content_type_preference
            .entry(content_type)
            .or_insert(DEFAULT_TYPE_PREFERENCE);
        *entry = (*entry + COMPLETION_PREFERENCE_BUMP).min(1.0);
        self.normalize_type_preferences();
    }

    /// Keeps the preference weights a probability distribution.
    pub fn normalize_type_preferences(&mut self) {
        let sum: f64 = self.content_type_preference.values().sum();
        if sum <= 0.0 {
            return;
        }
        for weight in self.content_type_preference.values_mut() {
            *weight /= sum;
        }
    }
}

/// One entry of an assembled feed: a candidate plus its ranking score, or a
/// due spaced-repetition card flagged `is_review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    #[serde(flatten)]
    pub candidate: ContentCandidate,
    pub score: f64,
    #[serde(default)]
    pub is_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_label: Option<String>,
}

impl FeedItem {
    pub fn new(candidate: ContentCandidate, score: f64) -> Self {
        Self {
            candidate,
            score,
            is_review: false,
            review_label: None,
        }
    }

    pub fn review(candidate: ContentCandidate) -> Self {
        Self {
            candidate,
            score: 0.0,
            is_review: true,
            review_label: Some("Review".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cefr_ordering_and_distance() {
        assert!(CefrLevel::A1 < CefrLevel::C2);
        assert_eq!(CefrLevel::B1.distance(CefrLevel::B2), 1);
        assert_eq!(CefrLevel::A1.distance(CefrLevel::C1), 4);
        assert_eq!(CefrLevel::C2.up(), None);
        assert_eq!(CefrLevel::A1.down(), None);
        assert_eq!(CefrLevel::B1.up(), Some(CefrLevel::B2));
    }

    #[test]
    fn test_cefr_parse_roundtrip() {
        for level in CefrLevel::ALL {
            assert_eq!(CefrLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(CefrLevel::parse("b2"), Some(CefrLevel::B2));
        assert_eq!(CefrLevel::parse("D1"), None);
    }

    #[test]
    fn test_default_profile_preferences_sum_to_one() {
        let profile = LearnerProfile::default();
        let sum: f64 = profile.content_type_preference.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_completion_bumps_and_renormalizes() {
        let mut profile = LearnerProfile::default();
        let before = profile.type_preference(ContentType::Podcast);
        profile.record_interaction(
            "podcast-1",
            Some(ContentType::Podcast),
            None,
            None,
            Some(true),
            Utc::now(),
        );
        let after = profile.type_preference(ContentType::Podcast);
        assert!(after > before);
        let sum: f64 = profile.content_type_preference.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeat_completion_does_not_bump_twice() {
        let mut profile = LearnerProfile::default();
        profile.record_interaction(
            "v1",
            Some(ContentType::Video),
            None,
            None,
            Some(true),
            Utc::now(),
        );
        let after_first = profile.type_preference(ContentType::Video);
        profile.record_interaction(
            "v1",
            Some(ContentType::Video),
            None,
            None,
            Some(true),
            Utc::now(),
        );
        let after_second = profile.type_preference(ContentType::Video);
        assert!((after_first - after_second).abs() < 1e-12);
    }

    #[test]
    fn test_feed_item_wire_format() {
        let candidate = ContentCandidate {
            id: "v1".to_string(),
            title: "Saludos".to_string(),
            content_type: ContentType::Video,
            level: CefrLevel::B1,
            duration: 120.0,
            vocabulary: vec!["hola".to_string()],
            tags: vec!["culture".to_string()],
            published_at: None,
            likes: Some(10),
            views: Some(100),
            quality: None,
        };
        let item = FeedItem::review(candidate);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["id"], "v1");
        assert_eq!(json["contentType"], "video");
        assert_eq!(json["level"], "B1");
        assert_eq!(json["isReview"], true);
        assert_eq!(json["reviewLabel"], "Review");
        assert!(json.get("publishedDate").is_none());

        let back: FeedItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.candidate.id, "v1");
        assert!(back.is_review);
    }

    #[test]
    fn test_watched_within_window() {
        let now = Utc::now();
        let mut profile = LearnerProfile::default();
        profile.record_watch("v1", 42.0, now - Duration::hours(2));
        profile.record_watch("v2", 10.0, now - Duration::hours(30));

        assert!(profile.watched_within("v1", Duration::hours(24), now));
        assert!(!profile.watched_within("v2", Duration::hours(24), now));
        assert!(!profile.watched_within("v3", Duration::hours(24), now));
    }
}
