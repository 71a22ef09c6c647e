//! Proctoring session loop

use std::sync::Arc;
use std::time::Duration;

use alerting::{Alarm, EvidenceStore, FrameSignals, FrameVerdict, WarningAggregator};
use camera_capture::CameraGuard;
use face_gaze::GazeEstimator;
use object_detection::annotate_detections;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::feed::SessionFeed;
use crate::outcome::OutcomeSender;
use crate::{
    DetectorBundle, FrameSourceFactory, OutcomeHandle, ProctoringConfig, SessionError,
    SessionOutcome, SessionReport,
};

/// What to proctor
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Candidate identity, used in evidence names
    pub subject: String,
    /// Exam identifier, used as the evidence directory
    pub exam: String,
    pub duration: Duration,
}

/// Starts proctoring sessions with shared detectors
pub struct Proctor {
    bundle: Arc<DetectorBundle>,
    factory: Arc<dyn FrameSourceFactory>,
    alarm: Arc<dyn Alarm>,
    store: EvidenceStore,
    config: ProctoringConfig,
}

impl Proctor {
    pub fn new(
        bundle: Arc<DetectorBundle>,
        factory: Arc<dyn FrameSourceFactory>,
        alarm: Arc<dyn Alarm>,
        config: ProctoringConfig,
    ) -> Self {
        Self {
            bundle,
            factory,
            alarm,
            store: EvidenceStore::new(config.evidence_root.clone()),
            config,
        }
    }

    /// Load detectors and build the configured source factory and alarm
    pub fn from_config(config: ProctoringConfig) -> Result<Self, SessionError> {
        let bundle = Arc::new(DetectorBundle::from_config(&config)?);
        let factory = Arc::new(crate::ConfiguredSourceFactory::new(
            config.source.clone(),
            config.camera.clone(),
        ));
        let alarm = config.alerts.alarm.build(config.alerts.tone_hz, config.alerts.tone_ms);
        Ok(Self::new(bundle, factory, alarm, config))
    }

    pub fn config(&self) -> &ProctoringConfig {
        &self.config
    }

    /// Spawn a session on the current tokio runtime
    pub fn start(&self, request: SessionRequest) -> OutcomeHandle {
        let cancel = CancellationToken::new();
        let feed = Arc::new(SessionFeed::new());
        let (sender, handle) = OutcomeHandle::channel(cancel.clone(), Arc::clone(&feed));

        let span = info_span!("proctoring", subject = %request.subject, exam = %request.exam);
        let session = Session {
            bundle: Arc::clone(&self.bundle),
            factory: Arc::clone(&self.factory),
            alarm: Arc::clone(&self.alarm),
            store: self.store.clone(),
            config: self.config.clone(),
            request,
            feed,
        };

        tokio::spawn(session.run(cancel, sender).instrument(span));
        handle
    }
}

struct Session {
    bundle: Arc<DetectorBundle>,
    factory: Arc<dyn FrameSourceFactory>,
    alarm: Arc<dyn Alarm>,
    store: EvidenceStore,
    config: ProctoringConfig,
    request: SessionRequest,
    feed: Arc<SessionFeed>,
}

/// Per-frame state moved onto the blocking pool for each frame.
///
/// Dropping it releases the camera and settles the feed, which may happen
/// after the session has reported if a frame was in flight.
struct FrameWorker {
    camera: CameraGuard,
    gaze: GazeEstimator,
    aggregator: WarningAggregator,
    bundle: Arc<DetectorBundle>,
    flag_rules: alerting::AlertConfig,
    feed: Arc<SessionFeed>,
    live_view: bool,
    _settle: DropGuard,
}

impl FrameWorker {
    /// Read, analyse and score one frame
    fn step(&mut self) -> Result<FrameVerdict, SessionError> {
        let frame = self.camera.next_frame()?;

        let scan = self.bundle.locator.scan(&frame)?;
        let located = scan.located(self.bundle.locator.mode());
        let gaze = self.gaze.refresh(&frame, scan.primary.as_ref());
        let detections = self.bundle.objects.detect(&frame)?;

        let signals = FrameSignals {
            prohibited_item: self.bundle.objects.any_prohibited(&detections),
            extra_faces: located.len() > 1,
            off_screen_gaze: gaze.direction.is_off_screen(),
        };
        let anomalous = signals.is_anomalous(&self.flag_rules);
        if anomalous {
            debug!(?signals, direction = ?gaze.direction, "Anomalous frame");
        }

        let before = self.aggregator.evidence().len();
        let gaze_overlay = &self.gaze;
        let objects = &self.bundle.objects;
        let annotated = || {
            let mut image = frame.to_rgb_image();
            annotate_detections(&mut image, objects, &detections);
            gaze_overlay.annotate(&mut image);
            image
        };
        let verdict = self.aggregator.record_frame(anomalous, frame.sequence, &annotated);

        // Published before returning so a frame abandoned mid-step still
        // reaches the handle
        self.feed.push_evidence(&self.aggregator.evidence()[before..]);
        if self.live_view {
            self.feed.publish_frame(frame.sequence, &annotated());
        }
        Ok(verdict)
    }
}

/// Session bookkeeping kept on the async side so it survives a cancelled
/// frame
#[derive(Default)]
struct Tally {
    frames: u64,
    warnings: u32,
}

impl Tally {
    fn report(self, outcome: SessionOutcome) -> SessionReport {
        SessionReport {
            outcome,
            frames: self.frames,
            warnings: self.warnings,
            evidence: Vec::new(),
        }
    }
}

impl Session {
    async fn run(self, cancel: CancellationToken, sender: OutcomeSender) {
        metrics::gauge!("proctoring_sessions_active").increment(1.0);
        info!(duration_s = self.request.duration.as_secs(), "Proctoring session started");

        let mut report = self.proctor(&cancel).await;
        report.evidence = self.feed.evidence();

        metrics::gauge!("proctoring_sessions_active").decrement(1.0);
        metrics::counter!("proctoring_outcomes_total", "outcome" => report.outcome.label())
            .increment(1);
        match &report.outcome {
            SessionOutcome::Error(reason) => error!(reason = %reason, "Proctoring session failed"),
            outcome => info!(
                outcome = outcome.label(),
                frames = report.frames,
                warnings = report.warnings,
                "Proctoring session ended"
            ),
        }
        sender.deliver(report);
    }

    async fn proctor(&self, cancel: &CancellationToken) -> SessionReport {
        let mut tally = Tally::default();
        let deadline = Instant::now() + self.request.duration;
        let settle = self.feed.settle_guard();

        let camera = match self.acquire_camera(cancel).await {
            Ok(Some(camera)) => camera,
            Ok(None) => return tally.report(SessionOutcome::Completed),
            Err(e) => return tally.report(SessionOutcome::Error(e.to_string())),
        };

        let mut worker = Some(FrameWorker {
            camera,
            gaze: self.bundle.gaze_estimator(),
            aggregator: WarningAggregator::new(
                &self.config.alerts,
                Arc::clone(&self.alarm),
                self.store.clone(),
                self.request.subject.clone(),
                self.request.exam.clone(),
            ),
            bundle: Arc::clone(&self.bundle),
            flag_rules: self.config.alerts.clone(),
            feed: Arc::clone(&self.feed),
            live_view: self.config.live_view,
            _settle: settle,
        });

        let mut ticker = time::interval(self.config.frame_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failed_reads = 0u32;

        loop {
            if cancel.is_cancelled() {
                return tally.report(SessionOutcome::Completed);
            }
            if Instant::now() >= deadline {
                return tally.report(SessionOutcome::TimedOut);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return tally.report(SessionOutcome::Completed),
                _ = time::sleep_until(deadline) => return tally.report(SessionOutcome::TimedOut),
                _ = ticker.tick() => {}
            }

            let Some(mut current) = worker.take() else {
                return tally.report(SessionOutcome::Error("frame worker lost".to_string()));
            };
            let work = tokio::task::spawn_blocking(move || {
                let result = current.step();
                (current, result)
            });

            // Cancellation and the deadline both win over an in-flight frame.
            // The abandoned worker finishes on the blocking pool, publishes
            // what it saved, then releases the camera.
            let (returned, result) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return tally.report(SessionOutcome::Completed),
                _ = time::sleep_until(deadline) => return tally.report(SessionOutcome::TimedOut),
                joined = work => match joined {
                    Ok(pair) => pair,
                    Err(e) => {
                        return tally.report(SessionOutcome::Error(
                            SessionError::Worker(e.to_string()).to_string(),
                        ))
                    }
                },
            };
            worker = Some(returned);

            match result {
                Ok(verdict) => {
                    failed_reads = 0;
                    tally.frames += 1;
                    metrics::counter!("proctoring_frames_total").increment(1);
                    if verdict.counted {
                        tally.warnings = verdict.count;
                        metrics::counter!("proctoring_warnings_total").increment(1);
                    }
                    if verdict.disqualified {
                        return tally.report(SessionOutcome::Disqualified);
                    }
                }
                Err(e) if e.is_transient() && failed_reads + 1 < self.config.max_read_attempts => {
                    failed_reads += 1;
                    let backoff = self.config.retry_backoff(failed_reads);
                    warn!(attempt = failed_reads, ?backoff, "Frame read failed, retrying: {}", e);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return tally.report(SessionOutcome::Completed),
                        _ = time::sleep(backoff) => {}
                    }
                }
                Err(e) => return tally.report(SessionOutcome::Error(e.to_string())),
            }
        }
    }

    /// Create and open this session's camera. `Ok(None)` when cancelled first.
    async fn acquire_camera(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<CameraGuard>, SessionError> {
        let factory = Arc::clone(&self.factory);
        let subject = self.request.subject.clone();
        let camera_config = self.config.camera.clone();
        let opening = tokio::task::spawn_blocking(move || {
            let source = factory.create(&subject)?;
            CameraGuard::acquire(source, &camera_config)
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            joined = opening => match joined {
                Ok(Ok(camera)) => Ok(Some(camera)),
                Ok(Err(e)) => Err(SessionError::Camera(e)),
                Err(e) => Err(SessionError::Worker(e.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertConfig, SilentAlarm};
    use camera_capture::{BoundingBox, CameraConfig, CameraError, FrameSource, SyntheticSource, VideoFrame};
    use face_gaze::{
        FaceCandidate, FaceLocator, FaceMode, FaceModel, FixedFaceModel, GazeError,
        ProportionalEyeDetector,
    };
    use object_detection::{
        DetectionError, DetectorConfig, EmptyObjectModel, LabelMap, ObjectDetector, ObjectModel,
        RawDetection,
    };
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn phone(frame: &VideoFrame) -> Result<Vec<RawDetection>, DetectionError> {
        Ok(vec![RawDetection {
            class_id: 77,
            confidence: 0.9,
            bbox: BoundingBox::new(0, 0, frame.width / 4, frame.height / 4)
                .ok_or_else(|| DetectionError::Inference("frame too small".into()))?,
        }])
    }

    /// Reports a cell phone in every frame
    struct PhoneModel;

    impl ObjectModel for PhoneModel {
        fn name(&self) -> &'static str {
            "phone"
        }

        fn detect(&self, frame: &VideoFrame) -> Result<Vec<RawDetection>, DetectionError> {
            phone(frame)
        }
    }

    /// Blocks inside inference on call `stall_on` until released
    struct GateModel {
        calls: AtomicU32,
        stall_on: u32,
        reports_phone: bool,
        entered: Arc<Notify>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ObjectModel for GateModel {
        fn name(&self) -> &'static str {
            "gate"
        }

        fn detect(&self, frame: &VideoFrame) -> Result<Vec<RawDetection>, DetectionError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.stall_on {
                self.entered.notify_one();
                if let Ok(rx) = self.release.lock() {
                    let _ = rx.recv();
                }
            }
            if self.reports_phone {
                phone(frame)
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn gate(stall_on: u32, reports_phone: bool) -> (Arc<GateModel>, Arc<Notify>, mpsc::Sender<()>) {
        let entered = Arc::new(Notify::new());
        let (release_tx, release_rx) = mpsc::channel();
        let model = GateModel {
            calls: AtomicU32::new(0),
            stall_on,
            reports_phone,
            entered: Arc::clone(&entered),
            release: Mutex::new(release_rx),
        };
        (Arc::new(model), entered, release_tx)
    }

    /// Two people in view
    struct TwoFaces;

    impl FaceModel for TwoFaces {
        fn name(&self) -> &'static str {
            "two"
        }

        fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceCandidate>, GazeError> {
            Ok([(4, 30, 0.9), (40, 24, 0.8)]
                .into_iter()
                .filter_map(|(x, h, confidence)| {
                    BoundingBox::new(x, 4, 16, h).map(|bbox| FaceCandidate { bbox, confidence })
                })
                .collect())
        }
    }

    fn bundle_with(locator: FaceLocator, model: Arc<dyn ObjectModel>) -> Arc<DetectorBundle> {
        Arc::new(DetectorBundle::new(
            locator,
            Arc::new(ProportionalEyeDetector::new(12.0)),
            ObjectDetector::new(model, LabelMap::coco(), &DetectorConfig::default()),
            Default::default(),
        ))
    }

    fn bundle(model: Arc<dyn ObjectModel>) -> Arc<DetectorBundle> {
        bundle_with(FaceLocator::new(Arc::new(FixedFaceModel), FaceMode::Largest), model)
    }

    fn config(evidence_root: &std::path::Path) -> ProctoringConfig {
        ProctoringConfig {
            camera: CameraConfig {
                width: 64,
                height: 48,
                fps: 15,
                ..Default::default()
            },
            alerts: AlertConfig {
                snapshot_interval: 5,
                threshold: 10,
                ..Default::default()
            },
            evidence_root: evidence_root.to_path_buf(),
            ..Default::default()
        }
    }

    fn proctor_with<F>(bundle: Arc<DetectorBundle>, config: ProctoringConfig, source: F) -> Proctor
    where
        F: Fn() -> SyntheticSource + Send + Sync + 'static,
    {
        let factory = move |_subject: &str| -> Result<Box<dyn FrameSource>, CameraError> {
            Ok(Box::new(source()))
        };
        Proctor::new(bundle, Arc::new(factory), Arc::new(SilentAlarm), config)
    }

    fn proctor<F>(model: Arc<dyn ObjectModel>, root: &std::path::Path, source: F) -> Proctor
    where
        F: Fn() -> SyntheticSource + Send + Sync + 'static,
    {
        proctor_with(bundle(model), config(root), source)
    }

    fn request(minutes: u64) -> SessionRequest {
        SessionRequest {
            subject: "alice".to_string(),
            exam: "exam-1".to_string(),
            duration: Duration::from_secs(minutes * 60),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_session_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let source = SyntheticSource::blank();
        let released = source.release_flag();
        let slot = Mutex::new(Some(source));
        let proctor = proctor(Arc::new(EmptyObjectModel), dir.path(), move || {
            slot.lock().unwrap().take().unwrap_or_else(SyntheticSource::blank)
        });

        let started = Instant::now();
        let handle = proctor.start(request(1));
        assert!(handle.is_alive());

        let report = handle.wait().await;
        assert_eq!(report.outcome, SessionOutcome::TimedOut);
        assert_eq!(report.warnings, 0);
        assert!(report.frames > 0);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(!handle.is_alive());
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ten_prohibited_frames_disqualify() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(PhoneModel), dir.path(), SyntheticSource::blank);

        let report = proctor.start(request(30)).wait().await;
        assert_eq!(report.outcome, SessionOutcome::Disqualified);
        assert_eq!(report.warnings, 10);
        assert_eq!(report.frames, 10);
        assert_eq!(report.evidence.len(), 2);
        assert!(dir.path().join("exam-1").join("alice_1.png").exists());
        assert!(dir.path().join("exam-1").join("alice_2.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_deadline_completes() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(EmptyObjectModel), dir.path(), SyntheticSource::blank);

        let handle = proctor.start(request(30));
        time::sleep(Duration::from_secs(5)).await;
        assert!(handle.is_alive());
        handle.cancel();

        let report = handle.wait().await;
        assert_eq!(report.outcome, SessionOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_frame_completes() {
        let dir = tempfile::tempdir().unwrap();
        let (model, entered, release_tx) = gate(1, false);
        let proctor = proctor(model, dir.path(), SyntheticSource::blank);

        let handle = proctor.start(request(30));
        entered.notified().await;
        handle.cancel();

        let report = handle.wait().await;
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.frames, 0);
        release_tx.send(()).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_device_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(EmptyObjectModel), dir.path(), SyntheticSource::unavailable);

        let report = proctor.start(request(1)).wait().await;
        match report.outcome {
            SessionOutcome::Error(reason) => assert!(reason.contains("unavailable"), "{}", reason),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_read_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(EmptyObjectModel), dir.path(), || {
            SyntheticSource::blank().failing_after(3)
        });

        let report = proctor.start(request(1)).wait().await;
        assert!(matches!(report.outcome, SessionOutcome::Error(_)));
        assert_eq!(report.frames, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_reads_retried() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(EmptyObjectModel), dir.path(), || {
            SyntheticSource::blank().with_transient_failures(2)
        });

        let report = proctor.start(request(1)).wait().await;
        assert_eq!(report.outcome, SessionOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(EmptyObjectModel), dir.path(), || {
            SyntheticSource::blank().with_transient_failures(3)
        });

        let report = proctor.start(request(1)).wait().await;
        assert!(matches!(report.outcome, SessionOutcome::Error(_)));
        assert_eq!(report.frames, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(PhoneModel), dir.path(), SyntheticSource::blank);

        let first = proctor.start(request(30));
        let second = proctor.start(SessionRequest {
            subject: "bob".to_string(),
            ..request(30)
        });

        assert_eq!(first.wait().await.warnings, 10);
        assert_eq!(second.wait().await.warnings, 10);
        assert!(dir.path().join("exam-1").join("bob_2.png").exists());
    }

    // Real time: a blocked frame on the blocking pool keeps the paused
    // clock from advancing
    #[tokio::test]
    async fn test_deadline_beats_stalled_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (model, entered, release_tx) = gate(1, false);
        let proctor = proctor(model, dir.path(), SyntheticSource::blank);

        let handle = proctor.start(SessionRequest {
            duration: Duration::from_secs(1),
            ..request(0)
        });
        entered.notified().await;

        let report = time::timeout(Duration::from_secs(4), handle.wait())
            .await
            .expect("session outlived its deadline");
        assert_eq!(report.outcome, SessionOutcome::TimedOut);
        assert_eq!(report.frames, 0);
        release_tx.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_abandoned_frame_evidence_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        // phones on every frame; the fifth, which earns the first snapshot,
        // is still in inference when the session is cancelled
        let (model, entered, release_tx) = gate(5, true);
        let proctor = proctor(model, dir.path(), SyntheticSource::blank);

        let handle = proctor.start(request(30));
        entered.notified().await;
        handle.cancel();

        let report = handle.wait().await;
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.frames, 4);
        assert!(report.evidence.is_empty());
        assert!(!handle.is_settled());

        release_tx.send(()).unwrap();
        time::timeout(Duration::from_secs(5), handle.settled()).await.unwrap();

        let mut on_disk: Vec<PathBuf> = std::fs::read_dir(dir.path().join("exam-1"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        on_disk.sort();
        let kept: Vec<PathBuf> = handle.evidence().into_iter().map(|r| r.path).collect();
        assert_eq!(on_disk, vec![dir.path().join("exam-1").join("alice_1.png")]);
        assert_eq!(kept, on_disk);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_lists_saved_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(PhoneModel), dir.path(), SyntheticSource::blank);

        let handle = proctor.start(request(30));
        let report = handle.wait().await;
        assert_eq!(report.evidence, handle.evidence());
        assert!(handle.is_settled());
    }

    #[tokio::test]
    async fn test_live_frame_published() {
        let dir = tempfile::tempdir().unwrap();
        let proctor = proctor(Arc::new(PhoneModel), dir.path(), SyntheticSource::blank);

        let handle = proctor.start(request(30));
        let mut frames = handle.frames();
        let published = time::timeout(Duration::from_secs(5), frames.wait_for(Option::is_some))
            .await
            .unwrap()
            .map(|slot| (*slot).clone())
            .unwrap();
        handle.cancel();

        let frame = published.unwrap();
        let decoded = image::load_from_memory(&frame.jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
        assert!(handle.latest_frame().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_view_off_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.live_view = false;
        let proctor = proctor_with(bundle(Arc::new(PhoneModel)), config, SyntheticSource::blank);

        let handle = proctor.start(request(30));
        assert_eq!(handle.wait().await.outcome, SessionOutcome::Disqualified);
        assert!(handle.latest_frame().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extra_faces_follow_locator_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.alerts.flag_extra_faces = true;

        let every_face = FaceLocator::new(Arc::new(TwoFaces), FaceMode::All);
        let proctor = proctor_with(
            bundle_with(every_face, Arc::new(EmptyObjectModel)),
            config.clone(),
            SyntheticSource::blank,
        );
        let report = proctor.start(request(30)).wait().await;
        assert_eq!(report.outcome, SessionOutcome::Disqualified);
        assert_eq!(report.warnings, 10);

        let largest_only = FaceLocator::new(Arc::new(TwoFaces), FaceMode::Largest);
        let proctor = proctor_with(
            bundle_with(largest_only, Arc::new(EmptyObjectModel)),
            config,
            SyntheticSource::blank,
        );
        let report = proctor.start(request(1)).wait().await;
        assert_eq!(report.outcome, SessionOutcome::TimedOut);
        assert_eq!(report.warnings, 0);
    }
}
