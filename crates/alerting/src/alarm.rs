//! Audible alerts

use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Audible alert sink.
///
/// `sound` must not block the proctoring loop for longer than a short beep.
pub trait Alarm: Send + Sync {
    fn sound(&self);
}

/// Which alarm a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    Silent,
    /// ASCII BEL on stderr
    #[default]
    Bell,
    /// Sine tone on the default audio output (`audio` feature)
    Tone,
}

impl AlarmKind {
    /// Instantiate the alarm. A tone alarm that cannot reach an audio
    /// device falls back to the terminal bell.
    pub fn build(self, tone_hz: f32, tone_ms: u64) -> Arc<dyn Alarm> {
        match self {
            AlarmKind::Silent => Arc::new(SilentAlarm),
            AlarmKind::Bell => Arc::new(TerminalBell),
            AlarmKind::Tone => tone_or_bell(tone_hz, tone_ms),
        }
    }
}

#[cfg(feature = "audio")]
fn tone_or_bell(tone_hz: f32, tone_ms: u64) -> Arc<dyn Alarm> {
    match ToneAlarm::new(tone_hz, tone_ms) {
        Ok(alarm) => Arc::new(alarm),
        Err(e) => {
            warn!("Tone alarm unavailable ({}). Using terminal bell.", e);
            Arc::new(TerminalBell)
        }
    }
}

#[cfg(not(feature = "audio"))]
fn tone_or_bell(_tone_hz: f32, _tone_ms: u64) -> Arc<dyn Alarm> {
    warn!("Built without audio support. Using terminal bell.");
    Arc::new(TerminalBell)
}

pub struct SilentAlarm;

impl Alarm for SilentAlarm {
    fn sound(&self) {
        debug!("Alarm (silent)");
    }
}

pub struct TerminalBell;

impl Alarm for TerminalBell {
    fn sound(&self) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

#[cfg(feature = "audio")]
pub use tone::ToneAlarm;

#[cfg(feature = "audio")]
mod tone {
    use std::sync::mpsc::{self, Sender};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use rodio::source::{SineWave, Source};
    use rodio::{OutputStream, Sink};
    use tracing::{error, warn};

    use super::Alarm;
    use crate::AlertError;

    /// Sine beep played on a dedicated audio thread.
    ///
    /// rodio output streams are not `Send`, so the stream lives on its own
    /// thread and beeps are requested over a channel.
    pub struct ToneAlarm {
        tx: Mutex<Sender<()>>,
    }

    impl ToneAlarm {
        pub fn new(frequency_hz: f32, duration_ms: u64) -> Result<Self, AlertError> {
            let (tx, rx) = mpsc::channel::<()>();
            let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
            let length = Duration::from_millis(duration_ms);

            thread::Builder::new()
                .name("alarm-tone".to_string())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(pair) => pair,
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!("output stream: {}", e)));
                            return;
                        }
                    };
                    let sink = match Sink::try_new(&handle) {
                        Ok(sink) => sink,
                        Err(e) => {
                            let _ = ready_tx.send(Err(format!("sink: {}", e)));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));

                    while rx.recv().is_ok() {
                        // Drop queued requests so beeps do not pile up
                        while rx.try_recv().is_ok() {}
                        sink.append(SineWave::new(frequency_hz).take_duration(length).amplify(0.25));
                    }
                })
                .map_err(|e| AlertError::Audio(e.to_string()))?;

            match ready_rx.recv() {
                Ok(Ok(())) => Ok(Self { tx: Mutex::new(tx) }),
                Ok(Err(e)) => Err(AlertError::Audio(e)),
                Err(e) => Err(AlertError::Audio(e.to_string())),
            }
        }
    }

    impl Alarm for ToneAlarm {
        fn sound(&self) {
            match self.tx.lock() {
                Ok(tx) => {
                    if tx.send(()).is_err() {
                        warn!("Alarm thread has stopped");
                    }
                }
                Err(e) => error!("Alarm lock poisoned: {}", e),
            }
        }
    }
}
