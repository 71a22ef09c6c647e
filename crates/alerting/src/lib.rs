//! Alerting System
//!
//! Turns per-frame anomaly signals into escalating consequences:
//! warning counts, audible alerts, evidence snapshots and disqualification.

mod aggregator;
mod alarm;
mod evidence;

pub use aggregator::{
    AlertConfig, FrameSignals, FrameVerdict, WarningAggregator, WarningCounter, WarningState,
};
pub use alarm::{Alarm, AlarmKind, SilentAlarm, TerminalBell};
#[cfg(feature = "audio")]
pub use alarm::ToneAlarm;
pub use evidence::{EvidenceRecord, EvidenceStore};

use std::path::PathBuf;
use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Evidence write failed: {0}")]
    EvidenceWrite(String),

    #[error("Evidence already exists: {0}")]
    EvidenceExists(PathBuf),

    #[error("Audio output unavailable: {0}")]
    Audio(String),
}
