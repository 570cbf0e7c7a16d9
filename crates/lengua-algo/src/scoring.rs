use chrono::{DateTime, Duration, Utc};

use crate::types::{ContentCandidate, LearnerProfile};

/// Target share of unknown vocabulary: mostly known material plus a small
/// fraction of new words (comprehensible-input sweet spot).
pub const IDEAL_UNKNOWN_RATIO: f64 = 0.20;

/// Duration the feed optimizes toward, in seconds.
pub const IDEAL_DURATION_SECS: f64 = 300.0;

const RECENCY_WINDOW_DAYS: i64 = 7;

/// Share of the candidate's vocabulary the learner does not know yet.
/// `None` when the candidate carries no vocabulary data.
pub fn unknown_ratio(candidate: &ContentCandidate, profile: &LearnerProfile) -> Option<f64> {
    if candidate.vocabulary.is_empty() {
        return None;
    }
    let unknown = candidate
        .vocabulary
        .iter()
        .filter(|word| !profile.known_words.contains(word.as_str()))
        .count();
    Some(unknown as f64 / candidate.vocabulary.len() as f64)
}

fn type_preference_score(candidate: &ContentCandidate, profile: &LearnerProfile) -> f64 {
    profile.type_preference(candidate.content_type) * 100.0
}

fn level_match_bonus(candidate: &ContentCandidate, profile: &LearnerProfile) -> f64 {
    if candidate.level == profile.level {
        50.0
    } else {
        0.0
    }
}

fn interest_match(candidate: &ContentCandidate, profile: &LearnerProfile) -> f64 {
    if candidate.tags.is_empty() {
        return 0.5 * 30.0;
    }
    let matching = candidate
        .tags
        .iter()
        .filter(|tag| profile.interests.iter().any(|interest| interest == *tag))
        .count();
    let denominator = candidate.tags.len().max(profile.interests.len()).max(1);
    (matching as f64 / denominator as f64) * 30.0
}

fn vocabulary_fit(candidate: &ContentCandidate, profile: &LearnerProfile) -> f64 {
    match unknown_ratio(candidate, profile) {
        Some(ratio) => {
            let distance = (ratio - IDEAL_UNKNOWN_RATIO).abs();
            (1.0 - distance * 5.0).max(0.0) * 20.0
        }
        None => 0.5 * 20.0,
    }
}

fn recency_bonus(candidate: &ContentCandidate, now: DateTime<Utc>) -> f64 {
    match candidate.published_at {
        Some(published) if now - published < Duration::days(RECENCY_WINDOW_DAYS) => 15.0,
        _ => 0.0,
    }
}

fn duration_fit(candidate: &ContentCandidate) -> f64 {
    let distance = (candidate.duration - IDEAL_DURATION_SECS).abs();
    (1.0 - distance / 600.0).max(0.0) * 10.0
}

fn engagement_bonus(candidate: &ContentCandidate) -> f64 {
    match (candidate.likes, candidate.views) {
        (Some(likes), Some(views)) if views > 0 => {
            ((likes as f64 / views as f64) * 50.0).min(20.0)
        }
        _ => 0.0,
    }
}

/// Multi-factor ranking score for one candidate against one learner.
///
/// The components are summed, not averaged: the result is a ranking key, not
/// a bounded percentage, and high-signal items are meant to exceed 100.
pub fn score(candidate: &ContentCandidate, profile: &LearnerProfile, now: DateTime<Utc>) -> f64 {
    type_preference_score(candidate, profile)
        + level_match_bonus(candidate, profile)
        + interest_match(candidate, profile)
        + vocabulary_fit(candidate, profile)
        + recency_bonus(candidate, now)
        + duration_fit(candidate)
        + engagement_bonus(candidate)
}
