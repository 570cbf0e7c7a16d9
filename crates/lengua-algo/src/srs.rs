use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const INITIAL_EASE: f64 = 2.5;
pub const MIN_EASE: f64 = 1.3;

/// Fixed early intervals (days) for the first three successful repetitions.
/// From the fourth on, the interval grows by the ease factor.
const EARLY_INTERVALS: [u32; 3] = [1, 3, 7];

const MAX_INTERVAL_DAYS: f64 = 36_500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewQuality {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl ReviewQuality {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Again)
    }
}

/// The scheduling state an entry carries between reviews. Only
/// [`apply_review`] ever produces new values for `ease_factor` and
/// `interval_days`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SrsState {
    pub ease_factor: f64,
    pub interval_days: u32,
    /// Count of consecutive successful reviews.
    pub repetitions: u32,
}

impl Default for SrsState {
    fn default() -> Self {
        Self {
            ease_factor: INITIAL_EASE,
            interval_days: 0,
            repetitions: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SrsUpdate {
    pub state: SrsState,
    pub due_at: DateTime<Utc>,
    pub next_review_in_days: u32,
}

/// SM-2 variant over a four-grade quality scale.
///
/// A failed review (`Again`) resets the repetition streak and schedules a
/// short retry tomorrow. Successful reviews walk the 1 / 3 / 7 day ladder,
/// then multiply the previous interval by the ease factor.
pub fn apply_review(state: &SrsState, quality: ReviewQuality, now: DateTime<Utc>) -> SrsUpdate {
    let (repetitions, interval_days, ease_factor) = if quality.is_success() {
        let repetitions = state.repetitions + 1;
        let grade_gap = (4 - quality as i32) as f64;
        let ease_factor =
            (state.ease_factor + (0.1 - grade_gap * (0.08 + grade_gap * 0.02))).max(MIN_EASE);
        let interval_days = match repetitions {
            1..=3 => EARLY_INTERVALS[(repetitions - 1) as usize],
            _ => (state.interval_days as f64 * ease_factor)
                .round()
                .clamp(1.0, MAX_INTERVAL_DAYS) as u32,
        };
        (repetitions, interval_days, ease_factor)
    } else {
        (0, 1, (state.ease_factor - 0.2).max(MIN_EASE))
    };

    SrsUpdate {
        state: SrsState {
            ease_factor,
            interval_days,
            repetitions,
        },
        due_at: now + Duration::days(interval_days as i64),
        next_review_in_days: interval_days,
    }
}

/// Mastery bucket 0-5 derived from the successful-repetition streak.
pub fn mastery_level(repetitions: u32) -> u8 {
    repetitions.min(5) as u8
}

/// Per-learner, per-word retention record. Created on first word click in an
/// unsaved state; promoted to the review queue when explicitly saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub word: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(flatten)]
    pub srs: SrsState,
    pub due_at: DateTime<Utc>,
    pub mastery_level: u8,
    pub click_count: u32,
    pub saved: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl VocabularyEntry {
    pub fn new(word: &str, translation: &str, context: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            word: word.to_string(),
            translation: translation.to_string(),
            context,
            srs: SrsState::default(),
            due_at: now,
            mastery_level: 0,
            click_count: 1,
            saved: false,
            created_at: now,
            last_reviewed: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.saved && self.due_at <= now
    }

    /// Applies one review outcome and returns the next interval in days.
    pub fn apply_review(&mut self, quality: ReviewQuality, now: DateTime<Utc>) -> u32 {
        let update = apply_review(&self.srs, quality, now);
        self.srs = update.state;
        self.due_at = update.due_at;
        self.mastery_level = mastery_level(update.state.repetitions);
        self.last_reviewed = Some(now);
        update.next_review_in_days
    }
}

/// Saved entries whose review timestamp has passed, oldest overdue first so
/// the most neglected words surface at the front of the queue.
pub fn due_for_review(entries: &[VocabularyEntry], now: DateTime<Utc>) -> Vec<VocabularyEntry> {
    let mut due: Vec<VocabularyEntry> = entries
        .iter()
        .filter(|entry| entry.is_due(now))
        .cloned()
        .collect();
    due.sort_by_key(|entry| entry.due_at);
    due
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyStats {
    pub total_words: usize,
    pub saved_words: usize,
    pub due_count: usize,
    /// Histogram over mastery buckets 0-5.
    pub mastery_histogram: [usize; 6],
}

pub fn vocabulary_stats(entries: &[VocabularyEntry], now: DateTime<Utc>) -> VocabularyStats {
    let mut stats = VocabularyStats {
        total_words: entries.len(),
        ..VocabularyStats::default()
    };
    for entry in entries {
        if entry.saved {
            stats.saved_words += 1;
            stats.mastery_histogram[entry.mastery_level.min(5) as usize] += 1;
            if entry.is_due(now) {
                stats.due_count += 1;
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_entry(now: DateTime<Utc>) -> VocabularyEntry {
        let mut entry = VocabularyEntry::new("hola", "hello", None, now);
        entry.saved = true;
        entry
    }

    #[test]
    fn test_good_streak_interval_sequence() {
        let now = Utc::now();
        let mut entry = fresh_entry(now);

        let mut sequence = Vec::new();
        for _ in 0..4 {
            sequence.push(entry.apply_review(ReviewQuality::Good, now));
        }

        assert_eq!(&sequence[..3], &[1, 3, 7]);
        assert!(
            (14..=20).contains(&sequence[3]),
            "fourth interval was {}",
            sequence[3]
        );
    }

    #[test]
    fn test_failure_resets_streak() {
        let now = Utc::now();
        let mut entry = fresh_entry(now);
        for _ in 0..3 {
            entry.apply_review(ReviewQuality::Good, now);
        }
        assert_eq!(entry.srs.repetitions, 3);

        let next = entry.apply_review(ReviewQuality::Again, now);
        assert_eq!(next, 1);
        assert_eq!(entry.srs.repetitions, 0);
        assert_eq!(entry.srs.interval_days, 1);
        assert_eq!(entry.mastery_level, 0);
    }

    #[test]
    fn test_ease_factor_floor() {
        let now = Utc::now();
        let mut state = SrsState::default();
        for _ in 0..20 {
            state = apply_review(&state, ReviewQuality::Again, now).state;
        }
        assert!((state.ease_factor - MIN_EASE).abs() < 1e-9);

        // Hard reviews also erode ease but never below the floor.
        for _ in 0..20 {
            state = apply_review(&state, ReviewQuality::Hard, now).state;
        }
        assert!(state.ease_factor >= MIN_EASE);
    }

    #[test]
    fn test_easy_grows_faster_than_good() {
        let now = Utc::now();
        let mut good = SrsState::default();
        let mut easy = SrsState::default();
        for _ in 0..5 {
            good = apply_review(&good, ReviewQuality::Good, now).state;
            easy = apply_review(&easy, ReviewQuality::Easy, now).state;
        }
        assert!(easy.interval_days > good.interval_days);
        assert!(easy.ease_factor > good.ease_factor);
    }

    #[test]
    fn test_due_ordering_oldest_first() {
        let now = Utc::now();
        let mut a = fresh_entry(now);
        a.word = "uno".to_string();
        a.due_at = now - Duration::days(1);
        let mut b = fresh_entry(now);
        b.word = "dos".to_string();
        b.due_at = now - Duration::days(5);
        let mut c = fresh_entry(now);
        c.word = "tres".to_string();
        c.due_at = now + Duration::days(2);
        let mut unsaved = VocabularyEntry::new("cuatro", "four", None, now - Duration::days(9));
        unsaved.due_at = now - Duration::days(9);
        unsaved.saved = false;

        let due = due_for_review(&[a, b, c, unsaved], now);
        let words: Vec<&str> = due.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["dos", "uno"]);
    }

    #[test]
    fn test_mastery_level_caps_at_five() {
        assert_eq!(mastery_level(0), 0);
        assert_eq!(mastery_level(3), 3);
        assert_eq!(mastery_level(12), 5);
    }

    #[test]
    fn test_stats_histogram() {
        let now = Utc::now();
        let mut a = fresh_entry(now);
        a.apply_review(ReviewQuality::Good, now);
        let mut b = fresh_entry(now);
        b.word = "dos".to_string();
        b.due_at = now - Duration::days(1);
        let unsaved = VocabularyEntry::new("tres", "three", None, now);

        let stats = vocabulary_stats(&[a, b, unsaved], now);
        assert_eq!(stats.total_words, 3);
        assert_eq!(stats.saved_words, 2);
        assert_eq!(stats.due_count, 1);
        assert_eq!(stats.mastery_histogram[0], 1);
        assert_eq!(stats.mastery_histogram[1], 1);
    }
}
