//! Attempt Routes
//!
//! Starting an attempt starts its proctoring session. Submission is judged
//! against the session: while it is still watching the candidate the answers
//! are on time; once it has timed out or disqualified the candidate they are
//! recorded but flagged late.

use std::time::Duration;

use alerting::EvidenceRecord;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use proctoring::{OutcomeHandle, SessionOutcome, SessionRequest};
use serde::{Deserialize, Serialize};
use storage::AttemptRecord;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::exams::{admit, JoinRequest, QuestionView};
use crate::{scoring, AppState, ServiceError, SharedState};

/// How long submission waits for a cancelled session to report
const SESSION_STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct AttemptStarted {
    pub attempt_id: Uuid,
    pub exam_id: u64,
    pub duration_minutes: u32,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub struct AttemptStatus {
    #[serde(flatten)]
    pub attempt: AttemptRecord,
    pub session_alive: bool,
    pub session_outcome: Option<SessionOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub user: String,
    /// Selected option text per question, in question order
    #[serde(default)]
    pub responses: Vec<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub score: f64,
    pub late: bool,
    pub outcome: Option<SessionOutcome>,
    pub evidence_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EvidenceResponse {
    pub data: Vec<EvidenceRecord>,
    pub count: usize,
}

/// Only a session that ended on its own makes a submission late
fn is_late(outcome: Option<&SessionOutcome>) -> bool {
    matches!(
        outcome,
        Some(SessionOutcome::TimedOut) | Some(SessionOutcome::Disqualified)
    )
}

/// Index what the attempt's session has saved so far and return the stored
/// attempt. A session that has ended with no frame work left is dropped,
/// keeping only its outcome until submission.
fn sync_session(state: &mut AppState, id: Uuid) -> Result<AttemptRecord, ServiceError> {
    if let Some(handle) = state.sessions.get(&id) {
        let evidence = handle.evidence();
        let finished = if handle.is_settled() {
            handle.try_outcome()
        } else {
            None
        };
        state.repository.append_evidence(id, evidence)?;

        if let Some(outcome) = finished {
            state.sessions.remove(&id);
            if !state.repository.get_attempt(id)?.attempted {
                state.ended.insert(id, outcome);
            }
            debug!(attempt = %id, "Finished proctoring session pruned");
        }
    }
    Ok(state.repository.get_attempt(id)?)
}

/// Begin an attempt and start proctoring it
pub async fn begin_attempt(
    State(state): State<SharedState>,
    Path(exam_id): Path<u64>,
    Json(body): Json<JoinRequest>,
) -> Result<(StatusCode, Json<AttemptStarted>), ServiceError> {
    let mut state = state.write().await;
    let exam = admit(&state, exam_id, &body)?;

    let attempt = AttemptRecord::new(body.user.clone(), exam.id, Utc::now());
    let attempt_id = state.repository.insert_attempt(attempt)?;

    let handle = state.proctor.start(SessionRequest {
        subject: body.user.clone(),
        exam: exam.id.to_string(),
        duration: Duration::from_secs(u64::from(exam.duration_minutes) * 60),
    });
    state.sessions.insert(attempt_id, handle);
    info!(attempt = %attempt_id, exam = exam.id, user = %body.user, "Attempt started");

    Ok((
        StatusCode::CREATED,
        Json(AttemptStarted {
            attempt_id,
            exam_id: exam.id,
            duration_minutes: exam.duration_minutes,
            questions: exam.questions.iter().map(QuestionView::from).collect(),
        }),
    ))
}

/// Attempt record with its session's liveness
pub async fn get_attempt(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttemptStatus>, ServiceError> {
    let mut state = state.write().await;
    let attempt = sync_session(&mut state, id)?;

    Ok(Json(AttemptStatus {
        session_alive: state.sessions.get(&id).map_or(false, OutcomeHandle::is_alive),
        session_outcome: state.session_outcome(id),
        attempt,
    }))
}

/// Evidence images captured during an attempt
pub async fn get_evidence(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvidenceResponse>, ServiceError> {
    let mut state = state.write().await;
    let data = sync_session(&mut state, id)?.evidence;
    Ok(Json(EvidenceResponse {
        count: data.len(),
        data,
    }))
}

/// Score the answers, stop proctoring and record the attempt
pub async fn submit_attempt(
    State(shared): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ServiceError> {
    let (exam, handle, ended_before_submit) = {
        let state = shared.read().await;
        let attempt = state.repository.get_attempt(id)?;
        if attempt.user != body.user {
            return Err(ServiceError::Forbidden("Attempt belongs to another user".to_string()));
        }
        if attempt.attempted {
            return Err(ServiceError::Conflict("Exam already attempted".to_string()));
        }
        let exam = state.repository.get_exam(attempt.exam_id)?;
        // Judged before cancelling so our own cancel cannot make it late
        (exam, state.sessions.get(&id).cloned(), state.session_outcome(id))
    };
    let late = is_late(ended_before_submit.as_ref());

    let (outcome, evidence, settled) = match &handle {
        Some(handle) => {
            handle.cancel();
            let stopping = async {
                let report = handle.wait().await;
                handle.settled().await;
                report
            };
            let outcome = match tokio::time::timeout(SESSION_STOP_GRACE, stopping).await {
                Ok(report) => Some(report.outcome),
                Err(_) => {
                    warn!(attempt = %id, "Proctoring session did not stop in time");
                    handle.try_outcome()
                }
            };
            (outcome, handle.evidence(), handle.is_settled())
        }
        // Already pruned; its evidence is indexed
        None => {
            if ended_before_submit.is_none() {
                warn!(attempt = %id, "No proctoring session for attempt");
            }
            (ended_before_submit, Vec::new(), true)
        }
    };

    let score = scoring::score(&exam.questions, &body.responses, exam.marks, exam.negative_percent);

    let mut state = shared.write().await;
    // A frame still in flight keeps the handle so later reads index its
    // evidence
    if settled {
        state.sessions.remove(&id);
    }
    state.ended.remove(&id);
    let evidence_count = state.repository.append_evidence(id, evidence)?;

    let mut already_submitted = false;
    state.repository.update_attempt(id, |attempt| {
        if attempt.attempted {
            already_submitted = true;
            return;
        }
        attempt.attempted = true;
        attempt.submitted_at = Some(Utc::now());
        attempt.responses = body.responses;
        attempt.marks = Some(score);
        attempt.late = late;
        attempt.outcome = outcome.as_ref().map(|o| o.label().to_string());
    })?;
    if already_submitted {
        return Err(ServiceError::Conflict("Exam already attempted".to_string()));
    }

    metrics::counter!("exam_submissions_total", "late" => if late { "true" } else { "false" })
        .increment(1);
    info!(attempt = %id, score, late, outcome = ?outcome, "Attempt submitted");

    let message = if late { "submitted late" } else { "exam submitted" };
    Ok(Json(SubmitResponse {
        message: message.to_string(),
        score,
        late,
        outcome,
        evidence_count,
    }))
}
