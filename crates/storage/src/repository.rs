//! Repository Implementation

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use alerting::EvidenceRecord;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{AttemptRecord, ExamRecord, StorageError};

/// Repository for data access (in-memory)
pub struct Repository {
    exams: Mutex<Vec<ExamRecord>>,
    attempts: Mutex<HashMap<Uuid, AttemptRecord>>,
    next_exam_id: Mutex<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            exams: Mutex::new(Vec::new()),
            attempts: Mutex::new(HashMap::new()),
            next_exam_id: Mutex::new(1),
        }
    }

    /// Insert an exam, assigning its id
    pub fn insert_exam(&self, mut exam: ExamRecord) -> Result<u64, StorageError> {
        let mut exams = lock(&self.exams)?;
        let mut id = lock(&self.next_exam_id)?;

        exam.id = *id;
        *id += 1;

        let returned_id = exam.id;
        exams.push(exam);
        debug!("Inserted exam with ID {}", returned_id);
        Ok(returned_id)
    }

    pub fn get_exam(&self, id: u64) -> Result<ExamRecord, StorageError> {
        lock(&self.exams)?
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    /// Exams not yet over at `now`, earliest start first
    pub fn upcoming_exams(&self, now: DateTime<Utc>) -> Result<Vec<ExamRecord>, StorageError> {
        let mut upcoming: Vec<_> = lock(&self.exams)?
            .iter()
            .filter(|e| e.is_upcoming(now))
            .cloned()
            .collect();
        upcoming.sort_by_key(|e| e.start_time);
        Ok(upcoming)
    }

    /// Insert an attempt. A user gets one attempt per exam.
    pub fn insert_attempt(&self, attempt: AttemptRecord) -> Result<Uuid, StorageError> {
        let mut attempts = lock(&self.attempts)?;
        if attempts
            .values()
            .any(|a| a.user == attempt.user && a.exam_id == attempt.exam_id)
        {
            return Err(StorageError::Conflict(format!(
                "{} already has an attempt at exam {}",
                attempt.user, attempt.exam_id
            )));
        }
        let id = attempt.id;
        attempts.insert(id, attempt);
        debug!("Inserted attempt {}", id);
        Ok(id)
    }

    pub fn get_attempt(&self, id: Uuid) -> Result<AttemptRecord, StorageError> {
        lock(&self.attempts)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    pub fn find_attempt(
        &self,
        user: &str,
        exam_id: u64,
    ) -> Result<Option<AttemptRecord>, StorageError> {
        Ok(lock(&self.attempts)?
            .values()
            .find(|a| a.user == user && a.exam_id == exam_id)
            .cloned())
    }

    /// Apply `f` to a stored attempt and return the updated copy
    pub fn update_attempt<F>(&self, id: Uuid, f: F) -> Result<AttemptRecord, StorageError>
    where
        F: FnOnce(&mut AttemptRecord),
    {
        let mut attempts = lock(&self.attempts)?;
        let attempt = attempts.get_mut(&id).ok_or(StorageError::NotFound)?;
        f(attempt);
        Ok(attempt.clone())
    }

    /// Index evidence images against an attempt
    pub fn append_evidence(
        &self,
        id: Uuid,
        records: impl IntoIterator<Item = EvidenceRecord>,
    ) -> Result<usize, StorageError> {
        let mut attempts = lock(&self.attempts)?;
        let attempt = attempts.get_mut(&id).ok_or(StorageError::NotFound)?;
        for record in records {
            if !attempt.evidence.iter().any(|r| r.path == record.path) {
                attempt.evidence.push(record);
            }
        }
        Ok(attempt.evidence.len())
    }

    /// A user's attempts, most recent first
    pub fn attempts_for_user(&self, user: &str) -> Result<Vec<AttemptRecord>, StorageError> {
        let mut found: Vec<_> = lock(&self.attempts)?
            .values()
            .filter(|a| a.user == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(found)
    }

    pub fn exam_count(&self) -> usize {
        self.exams.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
