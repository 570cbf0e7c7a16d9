use chrono::{DateTime, Duration, Utc};

use crate::scoring::{self, unknown_ratio};
use crate::types::{ContentCandidate, ContentType, FeedItem, LearnerProfile};

/// Maximum CEFR distance between learner and content before it is dropped.
const MAX_LEVEL_DISTANCE: usize = 1;

/// Acceptable share of unknown vocabulary. Below the floor the item teaches
/// nothing new; above the ceiling it is frustrating.
const MIN_UNKNOWN_RATIO: f64 = 0.05;
const MAX_UNKNOWN_RATIO: f64 = 0.40;

const MIN_QUALITY: f64 = 0.5;

const RECENTLY_WATCHED_HOURS: i64 = 24;

/// Target share of each content type in an assembled feed.
pub const TYPE_RATIOS: [(ContentType, f64); 4] = [
    (ContentType::Video, 0.4),
    (ContentType::Podcast, 0.2),
    (ContentType::Article, 0.3),
    (ContentType::Youtube, 0.1),
];

/// A due review card is slotted in after every this many feed positions.
pub const REVIEW_INJECTION_INTERVAL: usize = 6;

/// Stage 1: drop candidates the learner should not see right now.
pub fn filter_candidates(
    candidates: Vec<ContentCandidate>,
    profile: &LearnerProfile,
    now: DateTime<Utc>,
) -> Vec<ContentCandidate> {
    candidates
        .into_iter()
        .filter(|candidate| {
            if candidate.level.distance(profile.level) > MAX_LEVEL_DISTANCE {
                return false;
            }
            if let Some(ratio) = unknown_ratio(candidate, profile) {
                if !(MIN_UNKNOWN_RATIO..=MAX_UNKNOWN_RATIO).contains(&ratio) {
                    return false;
                }
            }
            if profile.watched_within(
                &candidate.id,
                Duration::hours(RECENTLY_WATCHED_HOURS),
                now,
            ) {
                return false;
            }
            if matches!(candidate.quality, Some(quality) if quality < MIN_QUALITY) {
                return false;
            }
            true
        })
        .collect()
}

/// Stage 2: score every survivor and sort descending. The sort is stable so
/// equal scores keep their source order.
pub fn rank_candidates(
    candidates: Vec<ContentCandidate>,
    profile: &LearnerProfile,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = candidates
        .into_iter()
        .map(|candidate| {
            let score = scoring::score(&candidate, profile, now);
            FeedItem::new(candidate, score)
        })
        .collect();
    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    items
}

/// Stage 3: interleave content types toward [`TYPE_RATIOS`] while keeping
/// the rank order inside each type bucket.
///
/// The outer loop carries a bounded iteration budget; with badly imbalanced
/// pools the result may hold fewer than `limit` items.
pub fn diversify(ranked: Vec<FeedItem>, limit: usize) -> Vec<FeedItem> {
    let total = ranked.len();
    let mut pools: Vec<(ContentType, f64, Vec<FeedItem>)> = TYPE_RATIOS
        .iter()
        .map(|&(content_type, ratio)| (content_type, ratio, Vec::new()))
        .collect();
    for item in ranked {
        if let Some((_, _, pool)) = pools
            .iter_mut()
            .find(|(content_type, _, _)| *content_type == item.candidate.content_type)
        {
            pool.push(item);
        }
    }
    // Queues pop from the front, so reverse once here.
    for (_, _, pool) in pools.iter_mut() {
        pool.reverse();
    }

    let mut diverse: Vec<FeedItem> = Vec::with_capacity(limit.min(total));
    let mut rounds = 0usize;

    while diverse.len() < limit && rounds < total * 2 {
        let mut took_any = false;
        for (content_type, ratio, pool) in pools.iter_mut() {
            if diverse.len() >= limit {
                break;
            }
            let current_ratio = type_share(&diverse, *content_type);
            if (current_ratio < *ratio || diverse.len() < 4) && !pool.is_empty() {
                if let Some(item) = pool.pop() {
                    diverse.push(item);
                    took_any = true;
                }
            }
        }
        if !took_any {
            // Every type met its target share; take the best remaining item
            // so imbalanced pools still fill the feed.
            match pools.iter_mut().find(|(_, _, pool)| !pool.is_empty()) {
                Some((_, _, pool)) => {
                    if let Some(item) = pool.pop() {
                        diverse.push(item);
                    }
                }
                None => break,
            }
        }
        rounds += 1;
        if rounds > limit * 3 {
            break;
        }
    }

    diverse
}

fn type_share(diverse: &[FeedItem], content_type: ContentType) -> f64 {
    let taken = diverse
        .iter()
        .filter(|item| item.candidate.content_type == content_type)
        .count();
    taken as f64 / diverse.len().max(1) as f64
}

/// Stage 4: walk the assembled feed and append one due review card after
/// every sixth position while cards remain. Injected cards do not count
/// against the limit used for new content.
pub fn inject_reviews(feed: Vec<FeedItem>, reviews: Vec<ContentCandidate>) -> Vec<FeedItem> {
    if reviews.is_empty() {
        return feed;
    }

    let mut result = Vec::with_capacity(feed.len() + reviews.len());
    let mut reviews = reviews.into_iter();

    for (index, item) in feed.into_iter().enumerate() {
        result.push(item);
        if (index + 1) % REVIEW_INJECTION_INTERVAL == 0 {
            if let Some(card) = reviews.next() {
                result.push(FeedItem::review(card));
            }
        }
    }

    result
}

/// Full pipeline: filter, rank, diversify, then slot in due reviews.
/// An empty candidate pool yields an empty feed.
pub fn assemble(
    candidates: Vec<ContentCandidate>,
    profile: &LearnerProfile,
    due_reviews: Vec<ContentCandidate>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    let filtered = filter_candidates(candidates, profile, now);
    let ranked = rank_candidates(filtered, profile, now);
    let diverse = diversify(ranked, limit);
    inject_reviews(diverse, due_reviews)
}
