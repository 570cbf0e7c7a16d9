use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CefrLevel;

pub const TOTAL_STEPS: u32 = 5;

/// Comprehension threshold a level average must reach to count as mastered
/// when estimating the final level.
const LEVEL_PASS_AVERAGE: f64 = 60.0;

/// A short probe video shown during onboarding to measure comprehension.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeVideo {
    pub id: &'static str,
    pub title: &'static str,
    pub level: CefrLevel,
    pub keywords: &'static [&'static str],
}

const A1_PROBES: [ProbeVideo; 3] = [
    ProbeVideo {
        id: "assess_a1_1",
        title: "Greetings",
        level: CefrLevel::A1,
        keywords: &["hola", "adiós", "buenos días"],
    },
    ProbeVideo {
        id: "assess_a1_2",
        title: "Numbers 1-10",
        level: CefrLevel::A1,
        keywords: &["uno", "dos", "tres"],
    },
    ProbeVideo {
        id: "assess_a1_3",
        title: "Colors",
        level: CefrLevel::A1,
        keywords: &["rojo", "azul", "verde"],
    },
];

const A2_PROBES: [ProbeVideo; 3] = [
    ProbeVideo {
        id: "assess_a2_1",
        title: "Daily routine",
        level: CefrLevel::A2,
        keywords: &["desayuno", "trabajo", "dormir"],
    },
    ProbeVideo {
        id: "assess_a2_2",
        title: "Family",
        level: CefrLevel::A2,
        keywords: &["padre", "madre", "hermano"],
    },
    ProbeVideo {
        id: "assess_a2_3",
        title: "Shopping",
        level: CefrLevel::A2,
        keywords: &["comprar", "precio", "tienda"],
    },
];

const B1_PROBES: [ProbeVideo; 3] = [
    ProbeVideo {
        id: "assess_b1_1",
        title: "Travel plans",
        level: CefrLevel::B1,
        keywords: &["viajar", "hotel", "reservar"],
    },
    ProbeVideo {
        id: "assess_b1_2",
        title: "Past experiences",
        level: CefrLevel::B1,
        keywords: &["pasado", "experiencia", "recuerdo"],
    },
    ProbeVideo {
        id: "assess_b1_3",
        title: "Opinions",
        level: CefrLevel::B1,
        keywords: &["creo que", "pienso", "opinión"],
    },
];

const B2_PROBES: [ProbeVideo; 3] = [
    ProbeVideo {
        id: "assess_b2_1",
        title: "Current events",
        level: CefrLevel::B2,
        keywords: &["noticias", "política", "economía"],
    },
    ProbeVideo {
        id: "assess_b2_2",
        title: "Environment",
        level: CefrLevel::B2,
        keywords: &["medio ambiente", "clima", "sostenible"],
    },
    ProbeVideo {
        id: "assess_b2_3",
        title: "Technology",
        level: CefrLevel::B2,
        keywords: &["tecnología", "internet", "innovación"],
    },
];

const C1_PROBES: [ProbeVideo; 3] = [
    ProbeVideo {
        id: "assess_c1_1",
        title: "Philosophy",
        level: CefrLevel::C1,
        keywords: &["filosófico", "concepto", "teoría"],
    },
    ProbeVideo {
        id: "assess_c1_2",
        title: "Literature",
        level: CefrLevel::C1,
        keywords: &["literario", "obra", "autor"],
    },
    ProbeVideo {
        id: "assess_c1_3",
        title: "Business",
        level: CefrLevel::C1,
        keywords: &["empresa", "estrategia", "mercado"],
    },
];

/// Probe catalog per level. There are no C2 probes; levels without a catalog
/// entry fall back to the A2 list (long-standing behavior callers rely on).
pub fn probe_catalog(level: CefrLevel) -> Option<&'static [ProbeVideo]> {
    match level {
        CefrLevel::A1 => Some(&A1_PROBES),
        CefrLevel::A2 => Some(&A2_PROBES),
        CefrLevel::B1 => Some(&B1_PROBES),
        CefrLevel::B2 => Some(&B2_PROBES),
        CefrLevel::C1 => Some(&C1_PROBES),
        CefrLevel::C2 => None,
    }
}

pub fn assessment_video(level: CefrLevel, index: usize) -> &'static ProbeVideo {
    let probes = probe_catalog(level).unwrap_or(&A2_PROBES);
    &probes[index % probes.len()]
}

/// Behavioral comprehension signals collected while the learner watched one
/// probe video. Missing counters default to zero; rates are clamped on use.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSignal {
    pub video_id: String,
    pub level: CefrLevel,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub watch_time: f64,
    #[serde(default)]
    pub video_duration: f64,
    #[serde(default)]
    pub word_clicks: u32,
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub rewatched: bool,
}

impl BehaviorSignal {
    pub fn word_click_rate(&self) -> f64 {
        if self.total_words == 0 {
            0.0
        } else {
            self.word_clicks as f64 / self.total_words as f64
        }
    }
}

/// Comprehension score 0-100 from behavioral signals: completion band (40),
/// word-click-rate band (30, lower is better), no-skip (20), rewatch (10).
pub fn comprehension_score(signal: &BehaviorSignal) -> u32 {
    let completion = signal.completion_rate.clamp(0.0, 1.0);
    let click_rate = signal.word_click_rate();

    let mut score = 0u32;

    if completion >= 0.90 {
        score += 40;
    } else if completion >= 0.70 {
        score += 30;
    } else if completion >= 0.50 {
        score += 15;
    }

    if click_rate <= 0.05 {
        score += 30;
    } else if click_rate <= 0.15 {
        score += 20;
    } else if click_rate <= 0.30 {
        score += 10;
    }

    if !signal.skipped {
        score += 20;
    }
    if signal.rewatched {
        score += 10;
    }

    score.min(100)
}

/// Next probe level from the comprehension at the current one. `None` means
/// the flow should finalize: the learner cleared the top of the ladder.
pub fn determine_next_level(current: CefrLevel, comprehension: u32) -> Option<CefrLevel> {
    if comprehension >= 80 {
        // Too easy: move up, or stop at the top of the ladder.
        current.up()
    } else if comprehension >= 60 {
        // Just right: confirm one level up when possible.
        current.up().or(Some(current))
    } else if comprehension >= 40 {
        // A bit hard: stay.
        Some(current)
    } else {
        // Too hard: move down, floor at A1.
        current.down().or(Some(current))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub video_id: String,
    pub level: CefrLevel,
    pub comprehension: u32,
    pub completion_rate: f64,
    pub word_click_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStep {
    pub title: String,
    pub description: String,
    pub action: String,
    pub priority: u8,
}

pub fn next_steps(level: CefrLevel) -> Vec<NextStep> {
    vec![
        NextStep {
            title: "Start watching videos".to_string(),
            description: format!("Watch videos at your {} level", level.as_str()),
            action: "browse_videos".to_string(),
            priority: 1,
        },
        NextStep {
            title: "Build your vocabulary".to_string(),
            description: "Save words as you watch".to_string(),
            action: "vocabulary".to_string(),
            priority: 2,
        },
        NextStep {
            title: "Practice with games".to_string(),
            description: "Reinforce learning with fun games".to_string(),
            action: "games".to_string(),
            priority: 3,
        },
        NextStep {
            title: "AI conversation partner".to_string(),
            description: "Practice speaking with AI".to_string(),
            action: "ai_chat".to_string(),
            priority: 4,
        },
    ]
}

fn recommendation(level: CefrLevel, confidence: u32) -> String {
    let level = level.as_str();
    if confidence >= 80 {
        format!("We're confident you're at {level} level! Start learning with videos matched to your ability.")
    } else if confidence >= 60 {
        format!("You're likely at {level} level. We'll fine-tune recommendations as you watch more videos.")
    } else {
        format!("You're around {level} level. We'll adjust content difficulty as we learn more about you.")
    }
}

/// Final outcome of a completed or skipped assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentOutcome {
    pub estimated_level: CefrLevel,
    pub confidence: u32,
    pub level_scores: BTreeMap<CefrLevel, Vec<u32>>,
    pub recommendation: String,
    pub next_steps: Vec<NextStep>,
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentProgress {
    pub current_step: u32,
    pub total_steps: u32,
    pub percentage: u32,
    pub current_level: CefrLevel,
}

/// What the caller should do after submitting one probe response.
#[derive(Debug, Clone)]
pub enum ResponseStep {
    Next(&'static ProbeVideo),
    Finished(AssessmentOutcome),
}

/// One onboarding assessment in flight. Starts at A2 (the most common level)
/// and walks the ladder up or down based on measured comprehension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSession {
    pub session_id: String,
    pub current_level: CefrLevel,
    pub current_step: u32,
    pub total_steps: u32,
    pub results: Vec<ProbeResult>,
    pub completed: bool,
}

impl AssessmentSession {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            current_level: CefrLevel::A2,
            current_step: 0,
            total_steps: TOTAL_STEPS,
            results: Vec::new(),
            completed: false,
        }
    }

    pub fn first_video(&self) -> &'static ProbeVideo {
        assessment_video(self.current_level, 0)
    }

    pub fn progress(&self) -> AssessmentProgress {
        AssessmentProgress {
            current_step: self.current_step,
            total_steps: self.total_steps,
            percentage: ((self.current_step as f64 / self.total_steps as f64) * 100.0).round()
                as u32,
            current_level: self.current_level,
        }
    }

    /// Records one probe response, then either advances to the next probe or
    /// finalizes the estimate.
    pub fn respond(&mut self, signal: &BehaviorSignal, now: DateTime<Utc>) -> ResponseStep {
        let comprehension = comprehension_score(signal);

        self.results.push(ProbeResult {
            video_id: signal.video_id.clone(),
            level: signal.level,
            comprehension,
            completion_rate: signal.completion_rate.clamp(0.0, 1.0),
            word_click_rate: signal.word_click_rate(),
            timestamp: now,
        });
        self.current_step += 1;

        let next_level = determine_next_level(signal.level, comprehension);

        match next_level {
            Some(level) if self.current_step < self.total_steps => {
                self.current_level = level;
                ResponseStep::Next(assessment_video(level, 0))
            }
            _ => ResponseStep::Finished(self.finish()),
        }
    }

    /// Estimated level = highest level whose average comprehension clears the
    /// pass mark, defaulting to A1. Confidence falls with score spread.
    pub fn finish(&mut self) -> AssessmentOutcome {
        self.completed = true;

        let mut level_scores: BTreeMap<CefrLevel, Vec<u32>> = BTreeMap::new();
        for result in &self.results {
            level_scores.entry(result.level).or_default().push(result.comprehension);
        }

        let mut estimated_level = CefrLevel::A1;
        for (level, scores) in &level_scores {
            let avg = scores.iter().sum::<u32>() as f64 / scores.len() as f64;
            if avg >= LEVEL_PASS_AVERAGE && level.index() > estimated_level.index() {
                estimated_level = *level;
            }
        }

        let confidence = confidence_from_spread(&self.results);

        AssessmentOutcome {
            estimated_level,
            confidence,
            level_scores,
            recommendation: recommendation(estimated_level, confidence),
            next_steps: next_steps(estimated_level),
            skipped: false,
        }
    }
}

fn confidence_from_spread(results: &[ProbeResult]) -> u32 {
    if results.is_empty() {
        return 0;
    }
    let scores: Vec<f64> = results.iter().map(|r| r.comprehension as f64).collect();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance =
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    (100.0 - variance.sqrt()).clamp(0.0, 100.0).round() as u32
}

/// Bypasses the probe flow entirely. Confidence is pinned at 50 to mark the
/// level as self-reported rather than measured.
pub fn skip_assessment(preferred_level: CefrLevel) -> AssessmentOutcome {
    AssessmentOutcome {
        estimated_level: preferred_level,
        confidence: 50,
        level_scores: BTreeMap::new(),
        recommendation: format!(
            "Starting with {} level. We'll adjust as you learn.",
            preferred_level.as_str()
        ),
        next_steps: next_steps(preferred_level),
        skipped: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(level: CefrLevel, completion: f64, clicks: u32, total: u32) -> BehaviorSignal {
        BehaviorSignal {
            video_id: format!("probe_{}", level.as_str()),
            level,
            completion_rate: completion,
            watch_time: completion * 60.0,
            video_duration: 60.0,
            word_clicks: clicks,
            total_words: total,
            skipped: false,
            rewatched: false,
        }
    }

    #[test]
    fn test_comprehension_bands() {
        // Full completion, barely any lookups, watched to the end.
        let strong = signal(CefrLevel::A2, 0.95, 2, 100);
        assert_eq!(comprehension_score(&strong), 90);

        // Struggled: bailed early and clicked a third of the words.
        let weak = BehaviorSignal {
            skipped: true,
            ..signal(CefrLevel::B2, 0.3, 35, 100)
        };
        assert_eq!(comprehension_score(&weak), 0);

        let rewatcher = BehaviorSignal {
            rewatched: true,
            ..signal(CefrLevel::A2, 0.95, 2, 100)
        };
        assert_eq!(comprehension_score(&rewatcher), 100);
    }

    #[test]
    fn test_comprehension_clamps_out_of_range_input() {
        let over = signal(CefrLevel::A2, 3.5, 0, 0);
        assert_eq!(comprehension_score(&over), 90);
    }

    #[test]
    fn test_next_level_policy() {
        assert_eq!(
            determine_next_level(CefrLevel::B1, 85),
            Some(CefrLevel::B2)
        );
        assert_eq!(
            determine_next_level(CefrLevel::B1, 30),
            Some(CefrLevel::A2)
        );
        assert_eq!(determine_next_level(CefrLevel::B1, 50), Some(CefrLevel::B1));
        assert_eq!(determine_next_level(CefrLevel::A1, 10), Some(CefrLevel::A1));
        assert_eq!(determine_next_level(CefrLevel::C2, 95), None);
    }

    #[test]
    fn test_level_is_non_decreasing_under_high_comprehension() {
        let mut session = AssessmentSession::new("s1".to_string());
        let mut previous = session.current_level;

        loop {
            let level = session.current_level;
            match session.respond(&signal(level, 0.95, 1, 100), Utc::now()) {
                ResponseStep::Next(video) => {
                    assert!(session.current_level.index() >= previous.index());
                    // Probes only exist up to C1.
                    assert!(video.level.index() <= CefrLevel::C1.index());
                    previous = session.current_level;
                }
                ResponseStep::Finished(outcome) => {
                    assert!(outcome.estimated_level.index() >= CefrLevel::A2.index());
                    break;
                }
            }
        }
        assert!(session.completed);
        assert!(session.current_step <= TOTAL_STEPS);
    }

    #[test]
    fn test_estimate_requires_passing_average() {
        let mut session = AssessmentSession::new("s2".to_string());
        // Comfortable at A2, lost at B1: the estimate must stay below B1.
        session.respond(&signal(CefrLevel::A2, 0.95, 2, 100), Utc::now());
        let step = session.respond(
            &BehaviorSignal {
                skipped: true,
                ..signal(CefrLevel::B1, 0.2, 40, 100)
            },
            Utc::now(),
        );
        if let ResponseStep::Finished(outcome) = step {
            assert!(outcome.estimated_level.index() < CefrLevel::B1.index());
        } else {
            // Drop back to A2, fail again to force finalization paths.
            let outcome = session.finish();
            assert!(outcome.estimated_level.index() < CefrLevel::B1.index());
        }
    }

    #[test]
    fn test_confidence_full_for_consistent_scores() {
        let mut session = AssessmentSession::new("s3".to_string());
        for _ in 0..TOTAL_STEPS {
            let level = session.current_level;
            if let ResponseStep::Finished(outcome) =
                session.respond(&signal(level, 0.95, 2, 100), Utc::now())
            {
                assert_eq!(outcome.confidence, 100);
                return;
            }
        }
        let outcome = session.finish();
        assert_eq!(outcome.confidence, 100);
    }

    #[test]
    fn test_c2_probe_request_falls_back_to_a2() {
        let video = assessment_video(CefrLevel::C2, 0);
        assert_eq!(video.level, CefrLevel::A2);
        // Index wraps instead of panicking.
        let wrapped = assessment_video(CefrLevel::B1, 7);
        assert_eq!(wrapped.id, assessment_video(CefrLevel::B1, 1).id);
    }

    #[test]
    fn test_skip_has_fixed_confidence() {
        let outcome = skip_assessment(CefrLevel::B2);
        assert!(outcome.skipped);
        assert_eq!(outcome.estimated_level, CefrLevel::B2);
        assert_eq!(outcome.confidence, 50);
        assert_eq!(outcome.next_steps.len(), 4);
    }

    #[test]
    fn test_progress_percentage() {
        let mut session = AssessmentSession::new("s4".to_string());
        assert_eq!(session.progress().percentage, 0);
        session.respond(&signal(CefrLevel::A2, 0.8, 5, 100), Utc::now());
        assert_eq!(session.progress().percentage, 20);
    }
}
