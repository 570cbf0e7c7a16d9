use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use lengua_algo::types::{CefrLevel, ContentCandidate, ContentType};

use crate::config::Config;

const READING_WORDS_PER_MINUTE: f64 = 200.0;
const DEFAULT_VIDEO_DURATION_SECS: f64 = 60.0;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// One provider of content candidates. The feed treats every source the same
/// way: fetch a candidate list, or fail and contribute nothing.
pub enum ContentSource {
    Http(HttpSource),
    Static(StaticSource),
}

impl ContentSource {
    pub fn kind(&self) -> ContentType {
        match self {
            Self::Http(source) => source.kind,
            Self::Static(source) => source.kind,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<ContentCandidate>, SourceError> {
        match self {
            Self::Http(source) => source.fetch().await,
            Self::Static(source) => Ok(source.items.clone()),
        }
    }

    /// Source set for a given configuration: videos and articles come from
    /// the content API when one is configured, podcasts and YouTube picks
    /// ship as built-in catalogs until their aggregators land.
    pub fn from_config(config: &Config) -> Vec<ContentSource> {
        let mut sources = Vec::new();

        if let Some(base) = &config.content_api_base {
            let client = reqwest::Client::builder()
                .timeout(config.source_timeout)
                .build()
                .unwrap_or_default();
            sources.push(ContentSource::Http(HttpSource {
                kind: ContentType::Video,
                base_url: base.clone(),
                client: client.clone(),
            }));
            sources.push(ContentSource::Http(HttpSource {
                kind: ContentType::Article,
                base_url: base.clone(),
                client,
            }));
        }

        sources.push(ContentSource::Static(StaticSource {
            kind: ContentType::Podcast,
            items: builtin_podcasts(),
        }));
        sources.push(ContentSource::Static(StaticSource {
            kind: ContentType::Youtube,
            items: builtin_youtube(),
        }));

        sources
    }
}

pub struct HttpSource {
    pub kind: ContentType,
    pub base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    async fn fetch(&self) -> Result<Vec<ContentCandidate>, SourceError> {
        let url = format!("{}/api/{}s.json", self.base_url, self.kind.as_str());
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::HttpStatus { status, body });
        }

        let payload: CandidatePayload = response.json().await?;
        Ok(payload
            .into_items()
            .into_iter()
            .map(|raw| raw.into_candidate(self.kind))
            .collect())
    }
}

pub struct StaticSource {
    pub kind: ContentType,
    pub items: Vec<ContentCandidate>,
}

/// Content endpoints respond either with a bare array or with the array
/// nested under a type-named key; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidatePayload {
    Bare(Vec<RawCandidate>),
    Wrapped {
        #[serde(alias = "videos", alias = "articles", alias = "items")]
        items: Vec<RawCandidate>,
    },
}

impl CandidatePayload {
    fn into_items(self) -> Vec<RawCandidate> {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped { items } => items,
        }
    }
}

/// Candidate as a source delivers it: loosely typed, many optional fields.
/// `into_candidate` applies the defaults the feed expects.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    vocabulary: Vec<String>,
    #[serde(default, alias = "topics")]
    tags: Vec<String>,
    #[serde(default, alias = "publishedDate")]
    published_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    views: Option<u64>,
    #[serde(default)]
    quality: Option<f64>,
}

impl RawCandidate {
    fn into_candidate(self, kind: ContentType) -> ContentCandidate {
        let level = self
            .level
            .as_deref()
            .and_then(CefrLevel::parse)
            .unwrap_or(match kind {
                ContentType::Video => CefrLevel::A1,
                _ => CefrLevel::B1,
            });

        let duration = self.duration.unwrap_or_else(|| match &self.content {
            Some(text) => estimate_reading_seconds(text),
            None => DEFAULT_VIDEO_DURATION_SECS,
        });

        ContentCandidate {
            id: self.id,
            title: self.title,
            content_type: kind,
            level,
            duration,
            vocabulary: self.vocabulary,
            tags: self.tags,
            published_at: self.published_at,
            likes: self.likes,
            views: self.views,
            quality: self.quality,
        }
    }
}

fn estimate_reading_seconds(content: &str) -> f64 {
    let words = content.split_whitespace().count() as f64;
    ((words / READING_WORDS_PER_MINUTE) * 60.0).ceil().max(1.0)
}

fn builtin_podcasts() -> Vec<ContentCandidate> {
    vec![
        ContentCandidate {
            id: "podcast-1".to_string(),
            title: "Español Podcast: Conversaciones Diarias".to_string(),
            content_type: ContentType::Podcast,
            level: CefrLevel::A2,
            duration: 900.0,
            vocabulary: Vec::new(),
            tags: vec![
                "conversation".to_string(),
                "daily life".to_string(),
                "culture".to_string(),
            ],
            published_at: None,
            likes: None,
            views: None,
            quality: None,
        },
        ContentCandidate {
            id: "podcast-2".to_string(),
            title: "Noticias en Español".to_string(),
            content_type: ContentType::Podcast,
            level: CefrLevel::B1,
            duration: 600.0,
            vocabulary: Vec::new(),
            tags: vec![
                "news".to_string(),
                "current events".to_string(),
                "politics".to_string(),
            ],
            published_at: None,
            likes: None,
            views: None,
            quality: None,
        },
    ]
}

fn builtin_youtube() -> Vec<ContentCandidate> {
    vec![ContentCandidate {
        id: "youtube-1".to_string(),
        title: "Aprende Español con Netflix".to_string(),
        content_type: ContentType::Youtube,
        level: CefrLevel::B1,
        duration: 600.0,
        vocabulary: Vec::new(),
        tags: vec![
            "netflix".to_string(),
            "learning tips".to_string(),
            "entertainment".to_string(),
        ],
        published_at: None,
        likes: None,
        views: None,
        quality: None,
    }]
}
