//! What a session publishes while it runs
//!
//! The feed outlives the session task: a frame still in flight when the
//! session ended keeps writing here until its blocking step returns.

use std::sync::{Arc, Mutex, PoisonError};

use alerting::EvidenceRecord;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

const LIVE_JPEG_QUALITY: u8 = 80;

/// Latest annotated frame, JPEG encoded
#[derive(Debug, Clone)]
pub struct LiveFrame {
    pub sequence: u32,
    pub jpeg: Arc<[u8]>,
}

pub(crate) struct SessionFeed {
    evidence: Mutex<Vec<EvidenceRecord>>,
    frames: watch::Sender<Option<LiveFrame>>,
    settled: CancellationToken,
}

impl SessionFeed {
    pub(crate) fn new() -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            evidence: Mutex::new(Vec::new()),
            frames,
            settled: CancellationToken::new(),
        }
    }

    pub(crate) fn push_evidence(&self, records: &[EvidenceRecord]) {
        if records.is_empty() {
            return;
        }
        self.evidence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(records);
    }

    pub(crate) fn evidence(&self) -> Vec<EvidenceRecord> {
        self.evidence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Encode and publish an annotated frame. Encoding failures only skip
    /// the frame.
    pub(crate) fn publish_frame(&self, sequence: u32, image: &RgbImage) {
        let mut jpeg = Vec::new();
        let encoded = JpegEncoder::new_with_quality(&mut jpeg, LIVE_JPEG_QUALITY).encode_image(image);
        match encoded {
            Ok(()) => {
                self.frames.send_replace(Some(LiveFrame {
                    sequence,
                    jpeg: jpeg.into(),
                }));
            }
            Err(e) => debug!(sequence, "Live frame not encoded: {}", e),
        }
    }

    pub(crate) fn latest_frame(&self) -> Option<LiveFrame> {
        (*self.frames.borrow()).clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<LiveFrame>> {
        self.frames.subscribe()
    }

    /// Marks the feed settled when dropped. Held by whoever owns the
    /// session's frame work.
    pub(crate) fn settle_guard(&self) -> DropGuard {
        self.settled.clone().drop_guard()
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settled.is_cancelled()
    }

    pub(crate) async fn settled(&self) {
        self.settled.cancelled().await
    }
}
