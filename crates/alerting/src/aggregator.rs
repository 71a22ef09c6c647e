//! Warning aggregation

use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{Alarm, AlarmKind, EvidenceRecord, EvidenceStore};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Save evidence every N warnings (default: 5)
    pub snapshot_interval: u32,
    /// Warnings before disqualification (default: 10)
    pub threshold: u32,
    /// Count frames with more than one face
    pub flag_extra_faces: bool,
    /// Count frames where the subject looks left or right
    pub flag_off_screen_gaze: bool,
    /// Audible alert per warning
    pub alarm: AlarmKind,
    /// Tone alarm pitch (Hz)
    pub tone_hz: f32,
    /// Tone alarm length (ms)
    pub tone_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: 5,
            threshold: 10,
            flag_extra_faces: false,
            flag_off_screen_gaze: false,
            alarm: AlarmKind::Bell,
            tone_hz: 2500.0,
            tone_ms: 100,
        }
    }
}

impl AlertConfig {
    /// Every signal counts and the threshold is lower
    pub fn strict() -> Self {
        Self {
            snapshot_interval: 3,
            threshold: 6,
            flag_extra_faces: true,
            flag_off_screen_gaze: true,
            ..Default::default()
        }
    }

    /// Prohibited items only, higher threshold
    pub fn lenient() -> Self {
        Self {
            snapshot_interval: 5,
            threshold: 20,
            ..Default::default()
        }
    }
}

/// Anomaly signals observed in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSignals {
    pub prohibited_item: bool,
    pub extra_faces: bool,
    pub off_screen_gaze: bool,
}

impl FrameSignals {
    /// Whether the frame counts as a warning under `config`
    pub fn is_anomalous(&self, config: &AlertConfig) -> bool {
        self.prohibited_item
            || (config.flag_extra_faces && self.extra_faces)
            || (config.flag_off_screen_gaze && self.off_screen_gaze)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningState {
    Monitoring,
    Warned,
    /// Terminal
    Disqualified,
}

/// What one frame did to the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameVerdict {
    /// The frame incremented the count
    pub counted: bool,
    /// Count after this frame
    pub count: u32,
    /// Evidence index due for this frame (`count / interval`)
    pub snapshot: Option<u32>,
    /// This frame reached the threshold
    pub disqualified: bool,
}

/// Warning count with snapshot cadence and disqualification threshold
#[derive(Debug, Clone)]
pub struct WarningCounter {
    count: u32,
    threshold: u32,
    interval: u32,
    state: WarningState,
}

impl WarningCounter {
    /// Zero threshold or interval is treated as one
    pub fn new(threshold: u32, interval: u32) -> Self {
        Self {
            count: 0,
            threshold: threshold.max(1),
            interval: interval.max(1),
            state: WarningState::Monitoring,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn state(&self) -> WarningState {
        self.state
    }

    pub fn is_disqualified(&self) -> bool {
        self.state == WarningState::Disqualified
    }

    pub fn observe(&mut self, anomalous: bool) -> FrameVerdict {
        if !anomalous || self.is_disqualified() {
            return FrameVerdict {
                counted: false,
                count: self.count,
                snapshot: None,
                disqualified: false,
            };
        }

        self.count += 1;
        let snapshot = (self.count % self.interval == 0).then_some(self.count / self.interval);
        let disqualified = self.count == self.threshold;
        self.state = if disqualified {
            WarningState::Disqualified
        } else {
            WarningState::Warned
        };

        FrameVerdict {
            counted: true,
            count: self.count,
            snapshot,
            disqualified,
        }
    }
}

/// Per-session warning aggregator.
///
/// Owns the counter and performs the side effects of each verdict: the
/// audible alert, the evidence snapshot and the disqualification log.
pub struct WarningAggregator {
    counter: WarningCounter,
    alarm: Arc<dyn Alarm>,
    store: EvidenceStore,
    subject: String,
    exam: String,
    evidence: Vec<EvidenceRecord>,
}

impl WarningAggregator {
    pub fn new(
        config: &AlertConfig,
        alarm: Arc<dyn Alarm>,
        store: EvidenceStore,
        subject: impl Into<String>,
        exam: impl Into<String>,
    ) -> Self {
        Self {
            counter: WarningCounter::new(config.threshold, config.snapshot_interval),
            alarm,
            store,
            subject: subject.into(),
            exam: exam.into(),
            evidence: Vec::new(),
        }
    }

    pub fn count(&self) -> u32 {
        self.counter.count()
    }

    pub fn state(&self) -> WarningState {
        self.counter.state()
    }

    pub fn is_disqualified(&self) -> bool {
        self.counter.is_disqualified()
    }

    /// Evidence written so far
    pub fn evidence(&self) -> &[EvidenceRecord] {
        &self.evidence
    }

    /// Feed one frame. `render` produces the annotated frame and is only
    /// called when a snapshot is due.
    pub fn record_frame<F>(&mut self, anomalous: bool, sequence: u32, render: F) -> FrameVerdict
    where
        F: FnOnce() -> RgbImage,
    {
        let verdict = self.counter.observe(anomalous);
        if !verdict.counted {
            return verdict;
        }

        warn!(
            subject = %self.subject,
            exam = %self.exam,
            count = verdict.count,
            "Proctoring warning"
        );
        self.alarm.sound();

        if let Some(index) = verdict.snapshot {
            let image = render();
            match self.store.save(&self.exam, &self.subject, index, verdict.count, sequence, &image) {
                Ok(record) => {
                    info!("Saved evidence to {}", record.path.display());
                    self.evidence.push(record);
                }
                Err(e) => error!("Evidence not saved: {}", e),
            }
        }

        if verdict.disqualified {
            warn!(subject = %self.subject, exam = %self.exam, "Disqualified");
        } else {
            debug!(state = ?self.counter.state(), "Warning recorded");
        }
        verdict
    }
}
