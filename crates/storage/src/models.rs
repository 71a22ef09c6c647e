//! Stored records

use alerting::EvidenceRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Position in the exam (0-based)
    pub index: usize,
    pub prompt: String,
    pub options: [String; 4],
    /// Correct option text
    pub answer: String,
}

/// Scheduled exam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamRecord {
    /// Assigned on insert
    pub id: u64,
    pub topic: String,
    pub creator: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    /// Total marks across all questions
    pub marks: u32,
    /// Percentage of a question's marks deducted for a wrong answer
    pub negative_percent: u32,
    /// Code candidates present to join
    pub exam_code: String,
    pub questions: Vec<Question>,
}

impl ExamRecord {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.ends_at() > now
    }
}

/// One user's attempt at one exam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub user: String,
    pub exam_id: u64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    /// Answers were submitted
    pub attempted: bool,
    /// Selected option per question, `None` when skipped
    pub responses: Vec<Option<String>>,
    pub marks: Option<f64>,
    /// Submitted after the proctoring session had ended
    pub late: bool,
    /// Proctoring outcome label once the session ended
    pub outcome: Option<String>,
    pub evidence: Vec<EvidenceRecord>,
}

impl AttemptRecord {
    pub fn new(user: impl Into<String>, exam_id: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.into(),
            exam_id,
            started_at,
            submitted_at: None,
            attempted: false,
            responses: Vec::new(),
            marks: None,
            late: false,
            outcome: None,
            evidence: Vec::new(),
        }
    }
}
