//! Exam Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::{ExamRecord, Question};
use tracing::info;

use crate::questions::parse_questions;
use crate::{ServiceError, SharedState};

/// Body of `POST /api/v1/exams`
#[derive(Debug, Deserialize)]
pub struct CreateExamRequest {
    pub topic: String,
    pub creator: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub marks: u32,
    #[serde(default)]
    pub negative_percent: u32,
    pub exam_code: String,
    /// Question sheet as CSV text
    pub questions_csv: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedExam {
    pub id: u64,
    pub question_count: usize,
}

/// Exam as listed to candidates: no code, no answers
#[derive(Debug, Serialize)]
pub struct ExamSummary {
    pub id: u64,
    pub topic: String,
    pub creator: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub marks: u32,
    pub negative_percent: u32,
    pub question_count: usize,
}

impl From<&ExamRecord> for ExamSummary {
    fn from(exam: &ExamRecord) -> Self {
        Self {
            id: exam.id,
            topic: exam.topic.clone(),
            creator: exam.creator.clone(),
            start_time: exam.start_time,
            duration_minutes: exam.duration_minutes,
            marks: exam.marks,
            negative_percent: exam.negative_percent,
            question_count: exam.questions.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExamListResponse {
    pub data: Vec<ExamSummary>,
    pub count: usize,
}

/// Question as shown during an attempt
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub prompt: String,
    pub options: [String; 4],
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            index: question.index,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
        }
    }
}

/// Body of the join and attempt routes
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub user: String,
    pub exam_code: String,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub exam: ExamSummary,
}

/// Create an exam from a question sheet
pub async fn create_exam(
    State(state): State<SharedState>,
    Json(body): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<CreatedExam>), ServiceError> {
    if body.start_time < Utc::now() {
        return Err(ServiceError::Validation("Cannot create exam in the past".to_string()));
    }
    if body.duration_minutes == 0 {
        return Err(ServiceError::Validation("Exam duration must be positive".to_string()));
    }
    if body.negative_percent > 100 {
        return Err(ServiceError::Validation(
            "Negative marking cannot exceed 100 percent".to_string(),
        ));
    }
    let questions = parse_questions(&body.questions_csv)?;
    let question_count = questions.len();

    let exam = ExamRecord {
        id: 0,
        topic: body.topic,
        creator: body.creator,
        start_time: body.start_time,
        duration_minutes: body.duration_minutes,
        marks: body.marks,
        negative_percent: body.negative_percent,
        exam_code: body.exam_code,
        questions,
    };

    let state = state.read().await;
    let id = state.repository.insert_exam(exam)?;
    info!(exam = id, question_count, "Exam created");

    Ok((StatusCode::CREATED, Json(CreatedExam { id, question_count })))
}

/// Exams that have not finished yet, earliest first
pub async fn list_exams(
    State(state): State<SharedState>,
) -> Result<Json<ExamListResponse>, ServiceError> {
    let state = state.read().await;
    let data: Vec<ExamSummary> = state
        .repository
        .upcoming_exams(Utc::now())?
        .iter()
        .map(ExamSummary::from)
        .collect();

    Ok(Json(ExamListResponse {
        count: data.len(),
        data,
    }))
}

/// Load an exam and check the candidate may enter it
pub(crate) fn admit(
    state: &crate::AppState,
    exam_id: u64,
    request: &JoinRequest,
) -> Result<ExamRecord, ServiceError> {
    let exam = state
        .repository
        .get_exam(exam_id)
        .map_err(|_| ServiceError::NotFound(format!("Exam {} not found", exam_id)))?;

    if state.repository.find_attempt(&request.user, exam_id)?.is_some() {
        return Err(ServiceError::Conflict("Exam already attempted".to_string()));
    }
    if exam.exam_code != request.exam_code {
        return Err(ServiceError::Forbidden("Exam code incorrect".to_string()));
    }
    Ok(exam)
}

/// Check the exam code without starting an attempt
pub async fn join_exam(
    State(state): State<SharedState>,
    Path(exam_id): Path<u64>,
    Json(body): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ServiceError> {
    let state = state.read().await;
    let exam = admit(&state, exam_id, &body)?;
    Ok(Json(JoinResponse {
        exam: ExamSummary::from(&exam),
    }))
}
