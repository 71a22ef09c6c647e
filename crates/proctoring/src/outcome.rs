//! Session outcome mailbox

use std::sync::Arc;

use alerting::EvidenceRecord;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::feed::{LiveFrame, SessionFeed};

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Cancelled by the caller (normal submission)
    Completed,
    /// Exam duration elapsed
    TimedOut,
    /// Warning threshold reached
    Disqualified,
    Error(String),
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::TimedOut => "timed_out",
            SessionOutcome::Disqualified => "disqualified",
            SessionOutcome::Error(_) => "error",
        }
    }
}

/// Final session summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Frames fully processed
    pub frames: u64,
    /// Warnings counted
    pub warnings: u32,
    pub evidence: Vec<EvidenceRecord>,
}

impl SessionReport {
    pub fn new(outcome: SessionOutcome) -> Self {
        Self {
            outcome,
            frames: 0,
            warnings: 0,
            evidence: Vec::new(),
        }
    }
}

/// Single-producer side of the mailbox.
///
/// Delivers exactly one report: either the one passed to `deliver`, or an
/// error report if dropped undelivered (e.g. the session task panicked).
pub(crate) struct OutcomeSender {
    tx: Option<watch::Sender<Option<SessionReport>>>,
}

impl OutcomeSender {
    pub(crate) fn deliver(mut self, report: SessionReport) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(report));
        }
    }
}

impl Drop for OutcomeSender {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            error!("Proctoring session ended without an outcome");
            tx.send_replace(Some(SessionReport::new(SessionOutcome::Error(
                "session aborted".to_string(),
            ))));
        }
    }
}

/// Caller side: liveness, outcome and cancellation of one session, plus
/// what it has published so far
#[derive(Clone)]
pub struct OutcomeHandle {
    rx: watch::Receiver<Option<SessionReport>>,
    cancel: CancellationToken,
    feed: Arc<SessionFeed>,
}

impl OutcomeHandle {
    pub(crate) fn channel(
        cancel: CancellationToken,
        feed: Arc<SessionFeed>,
    ) -> (OutcomeSender, OutcomeHandle) {
        let (tx, rx) = watch::channel(None);
        (OutcomeSender { tx: Some(tx) }, OutcomeHandle { rx, cancel, feed })
    }

    /// True until the session has reported its outcome. Never blocks.
    pub fn is_alive(&self) -> bool {
        self.rx.borrow().is_none()
    }

    /// Outcome if the session has ended. Never blocks.
    pub fn try_outcome(&self) -> Option<SessionOutcome> {
        (*self.rx.borrow()).as_ref().map(|r| r.outcome.clone())
    }

    /// Full report if the session has ended. Never blocks.
    pub fn report(&self) -> Option<SessionReport> {
        (*self.rx.borrow()).clone()
    }

    /// Wait for the session to end
    pub async fn wait(&self) -> SessionReport {
        let mut rx = self.rx.clone();
        let delivered = rx.wait_for(Option::is_some).await;
        let report = match delivered {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        };
        report.unwrap_or_else(|| {
            SessionReport::new(SessionOutcome::Error(
                "session dropped its outcome channel".to_string(),
            ))
        })
    }

    /// Ask the session to stop. It ends with `Completed` unless it already
    /// ended.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Every snapshot saved so far, including any written by a frame that
    /// was still in flight when the session ended
    pub fn evidence(&self) -> Vec<EvidenceRecord> {
        self.feed.evidence()
    }

    /// True once no frame work remains, so `evidence` is final
    pub fn is_settled(&self) -> bool {
        self.feed.is_settled()
    }

    /// Wait until no frame work remains
    pub async fn settled(&self) {
        self.feed.settled().await
    }

    /// Most recent annotated frame, if any was rendered
    pub fn latest_frame(&self) -> Option<LiveFrame> {
        self.feed.latest_frame()
    }

    /// Follow annotated frames as they are rendered
    pub fn frames(&self) -> watch::Receiver<Option<LiveFrame>> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(cancel: CancellationToken) -> (OutcomeSender, OutcomeHandle) {
        OutcomeHandle::channel(cancel, Arc::new(SessionFeed::new()))
    }

    #[test]
    fn test_alive_until_delivered() {
        let (tx, handle) = mailbox(CancellationToken::new());
        assert!(handle.is_alive());
        assert_eq!(handle.try_outcome(), None);

        tx.deliver(SessionReport::new(SessionOutcome::TimedOut));
        assert!(!handle.is_alive());
        assert_eq!(handle.try_outcome(), Some(SessionOutcome::TimedOut));
    }

    #[test]
    fn test_drop_without_delivery_is_error() {
        let (tx, handle) = mailbox(CancellationToken::new());
        drop(tx);
        assert!(matches!(handle.try_outcome(), Some(SessionOutcome::Error(_))));
    }

    #[tokio::test]
    async fn test_wait_resolves() {
        let (tx, handle) = mailbox(CancellationToken::new());
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.wait().await });
        tx.deliver(SessionReport::new(SessionOutcome::Disqualified));
        assert_eq!(task.await.unwrap().outcome, SessionOutcome::Disqualified);
    }

    #[test]
    fn test_cancel_propagates() {
        let token = CancellationToken::new();
        let (_tx, handle) = mailbox(token.clone());
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_evidence_outlives_report() {
        let feed = Arc::new(SessionFeed::new());
        let guard = feed.settle_guard();
        let (tx, handle) = OutcomeHandle::channel(CancellationToken::new(), Arc::clone(&feed));
        tx.deliver(SessionReport::new(SessionOutcome::Completed));
        assert!(!handle.is_settled());

        feed.push_evidence(&[EvidenceRecord {
            subject: "alice".to_string(),
            exam: "exam-1".to_string(),
            index: 1,
            warning_count: 5,
            frame_sequence: 4,
            path: "exam-1/alice_1.png".into(),
            captured_at: chrono::Utc::now(),
        }]);
        drop(guard);

        assert!(handle.is_settled());
        assert_eq!(handle.evidence().len(), 1);
        assert!(handle.report().unwrap().evidence.is_empty());
    }

    #[test]
    fn test_outcome_json() {
        let json = serde_json::to_value(SessionOutcome::Error("eio".to_string())).unwrap();
        assert_eq!(json["outcome"], "error");
        assert_eq!(json["reason"], "eio");
    }
}
