//! Result Routes

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ServiceError, SharedState};

/// One submitted attempt with its exam details
#[derive(Debug, Serialize)]
pub struct ResultRow {
    pub exam_id: u64,
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub marks: f64,
    pub out_of: u32,
    pub late: bool,
    pub outcome: Option<String>,
    pub evidence_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub data: Vec<ResultRow>,
    pub count: usize,
}

/// A user's submitted attempts, most recent first
pub async fn get_results(
    State(state): State<SharedState>,
    Path(user): Path<String>,
) -> Result<Json<ResultsResponse>, ServiceError> {
    let state = state.read().await;

    let mut data = Vec::new();
    for attempt in state.repository.attempts_for_user(&user)? {
        if !attempt.attempted {
            continue;
        }
        let exam = state.repository.get_exam(attempt.exam_id)?;
        data.push(ResultRow {
            exam_id: exam.id,
            topic: exam.topic,
            start_time: exam.start_time,
            duration_minutes: exam.duration_minutes,
            marks: attempt.marks.unwrap_or_default(),
            out_of: exam.marks,
            late: attempt.late,
            outcome: attempt.outcome,
            evidence_count: attempt.evidence.len(),
        });
    }

    Ok(Json(ResultsResponse {
        count: data.len(),
        data,
    }))
}
