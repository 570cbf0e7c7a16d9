use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;

use lengua_algo::assessment::{
    skip_assessment, AssessmentOutcome, AssessmentProgress, AssessmentSession, BehaviorSignal,
    ProbeVideo, ResponseStep,
};
use lengua_algo::types::CefrLevel;

use crate::store::AssessmentResultSink;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("assessment session not found: {0}")]
    SessionNotFound(String),
    #[error("assessment session already completed: {0}")]
    AlreadyCompleted(String),
}

#[derive(Debug, Clone)]
pub struct StartedAssessment {
    pub session_id: String,
    pub current_level: CefrLevel,
    pub current_step: u32,
    pub total_steps: u32,
    pub next_video: &'static ProbeVideo,
}

#[derive(Debug, Clone)]
pub enum RespondResult {
    Next {
        session_id: String,
        current_level: CefrLevel,
        current_step: u32,
        total_steps: u32,
        next_video: &'static ProbeVideo,
    },
    Completed {
        session_id: String,
        outcome: AssessmentOutcome,
    },
}

/// Owns the in-flight onboarding sessions. A completed session is handed to
/// the result sink once and kept only as its final outcome for retrieval.
pub struct AssessmentService {
    sessions: RwLock<HashMap<String, AssessmentSession>>,
    outcomes: RwLock<HashMap<String, AssessmentOutcome>>,
    sink: Arc<dyn AssessmentResultSink>,
}

impl AssessmentService {
    pub fn new(sink: Arc<dyn AssessmentResultSink>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            outcomes: RwLock::new(HashMap::new()),
            sink,
        }
    }

    pub fn start(&self) -> StartedAssessment {
        let session_id = format!("assess_{}", uuid::Uuid::new_v4());
        let session = AssessmentSession::new(session_id.clone());
        let started = StartedAssessment {
            session_id: session_id.clone(),
            current_level: session.current_level,
            current_step: session.current_step,
            total_steps: session.total_steps,
            next_video: session.first_video(),
        };
        self.sessions.write().insert(session_id, session);
        started
    }

    pub fn respond(
        &self,
        learner_id: &str,
        session_id: &str,
        signal: &BehaviorSignal,
    ) -> Result<RespondResult, AssessmentError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| AssessmentError::SessionNotFound(session_id.to_string()))?;
        if session.completed {
            return Err(AssessmentError::AlreadyCompleted(session_id.to_string()));
        }

        match session.respond(signal, Utc::now()) {
            ResponseStep::Next(next_video) => Ok(RespondResult::Next {
                session_id: session_id.to_string(),
                current_level: session.current_level,
                current_step: session.current_step,
                total_steps: session.total_steps,
                next_video,
            }),
            ResponseStep::Finished(outcome) => {
                sessions.remove(session_id);
                drop(sessions);
                self.finalize(learner_id, session_id, outcome.clone());
                Ok(RespondResult::Completed {
                    session_id: session_id.to_string(),
                    outcome,
                })
            }
        }
    }

    pub fn progress(&self, session_id: &str) -> Result<AssessmentProgress, AssessmentError> {
        self.sessions
            .read()
            .get(session_id)
            .map(|session| session.progress())
            .ok_or_else(|| AssessmentError::SessionNotFound(session_id.to_string()))
    }

    pub fn skip(&self, learner_id: &str, preferred_level: CefrLevel) -> AssessmentOutcome {
        let session_id = format!("assess_{}", uuid::Uuid::new_v4());
        let outcome = skip_assessment(preferred_level);
        self.finalize(learner_id, &session_id, outcome.clone());
        outcome
    }

    pub fn results(&self, session_id: &str) -> Result<AssessmentOutcome, AssessmentError> {
        self.outcomes
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| AssessmentError::SessionNotFound(session_id.to_string()))
    }

    /// Persists a final outcome once; a failed persist is logged, not
    /// retried, and the computed outcome stands.
    fn finalize(&self, learner_id: &str, session_id: &str, outcome: AssessmentOutcome) {
        if let Err(err) = self.sink.persist(learner_id, &outcome) {
            tracing::warn!(
                learner = learner_id,
                session = session_id,
                error = %err,
                "failed to persist assessment result"
            );
        }
        self.outcomes
            .write()
            .insert(session_id.to_string(), outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryResultSink;

    fn signal(level: CefrLevel, completion_rate: f64) -> BehaviorSignal {
        BehaviorSignal {
            video_id: format!("probe_{}", level.as_str()),
            level,
            completion_rate,
            watch_time: completion_rate * 60.0,
            video_duration: 60.0,
            word_clicks: 2,
            total_words: 100,
            skipped: false,
            rewatched: false,
        }
    }

    #[test]
    fn test_start_then_walk_to_completion() {
        let sink = Arc::new(MemoryResultSink::new());
        let service = AssessmentService::new(sink.clone());

        let started = service.start();
        assert_eq!(started.current_level, CefrLevel::A2);
        assert_eq!(started.current_step, 0);
        assert_eq!(started.next_video.level, CefrLevel::A2);

        let mut session_id = started.session_id;
        let mut level = started.current_level;
        loop {
            match service
                .respond("u1", &session_id, &signal(level, 0.95))
                .unwrap()
            {
                RespondResult::Next {
                    session_id: id,
                    current_level,
                    ..
                } => {
                    session_id = id;
                    level = current_level;
                }
                RespondResult::Completed { outcome, .. } => {
                    assert!(outcome.estimated_level >= CefrLevel::A2);
                    break;
                }
            }
        }

        // Completed sessions disappear from the in-flight registry but keep
        // their outcome readable and persisted.
        assert!(matches!(
            service.progress(&session_id),
            Err(AssessmentError::SessionNotFound(_))
        ));
        assert!(service.results(&session_id).is_ok());
        assert!(sink.get("u1").is_some());
    }

    #[test]
    fn test_respond_unknown_session() {
        let service = AssessmentService::new(Arc::new(MemoryResultSink::new()));
        let err = service
            .respond("u1", "missing", &signal(CefrLevel::A2, 0.9))
            .unwrap_err();
        assert!(matches!(err, AssessmentError::SessionNotFound(_)));
    }

    #[test]
    fn test_skip_persists_self_reported_level() {
        let sink = Arc::new(MemoryResultSink::new());
        let service = AssessmentService::new(sink.clone());

        let outcome = service.skip("u2", CefrLevel::B1);
        assert!(outcome.skipped);
        assert_eq!(outcome.confidence, 50);

        let persisted = sink.get("u2").unwrap();
        assert_eq!(persisted.estimated_level, CefrLevel::B1);
    }
}
