//! Capture session controller — the try-on state machine.
//!
//! All operations run on the caller's thread. `analyze()` spawns a Tokio
//! timer task which posts an [`AnalysisTicket`] back when the scan delay
//! elapses; the ticket is applied on the caller's thread through
//! [`Controller::next_completion`] or [`Controller::complete_analysis`].

use crate::session::{CaptureSession, Stage};
use crate::snapshot::{RankedEntry, SessionSnapshot};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tryon_core::{ranker, Catalog, CatalogError, FaceShape, Frame, ShapeDetector};
use tryon_hw::{CaptureError, MediaCaptureProvider, Stream};

/// Mutating entry points, named in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Analyze,
    Stop,
    SelectFrame,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Start => "start",
            Operation::Analyze => "analyze",
            Operation::Stop => "stop",
            Operation::SelectFrame => "select_frame",
        })
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(#[from] CaptureError),
    #[error("frame {0} is not in the catalog")]
    InvalidFrameSelection(String),
    #[error("{operation} is not valid while {stage}")]
    InvalidTransition { operation: Operation, stage: Stage },
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("analysis needs a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Marker for one scheduled analysis, tagged with the session generation
/// that launched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket {
    generation: u64,
}

impl AnalysisTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of delivering an analysis ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The session moved to `Result` with this shape.
    Applied(FaceShape),
    /// The session was stopped or restarted since the ticket was issued.
    Discarded,
}

/// Owns the capture session and enforces the try-on state machine.
pub struct Controller<P: MediaCaptureProvider, D: ShapeDetector> {
    provider: P,
    detector: D,
    catalog: Catalog,
    default_frame: usize,
    analysis_delay: Duration,
    session: CaptureSession,
    completion_tx: mpsc::UnboundedSender<AnalysisTicket>,
    completion_rx: mpsc::UnboundedReceiver<AnalysisTicket>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<P: MediaCaptureProvider, D: ShapeDetector> Controller<P, D> {
    /// Build an idle controller. `default_frame` must be a catalog id.
    pub fn new(
        provider: P,
        detector: D,
        catalog: Catalog,
        default_frame: &str,
        analysis_delay: Duration,
    ) -> Result<Self, SessionError> {
        let default_frame = catalog
            .frames()
            .iter()
            .position(|f| f.id == default_frame)
            .ok_or_else(|| CatalogError::UnknownFrame(default_frame.to_string()))?;

        let session = CaptureSession::new(default_frame);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let initial = build_snapshot(&catalog, &session);
        let (snapshot_tx, _) = watch::channel(initial);

        tracing::debug!(
            frames = catalog.len(),
            default_frame = %catalog.frames()[default_frame].id,
            delay_ms = analysis_delay.as_millis() as u64,
            "controller ready"
        );

        Ok(Self {
            provider,
            detector,
            catalog,
            default_frame,
            analysis_delay,
            session,
            completion_tx,
            completion_rx,
            snapshot_tx,
        })
    }

    /// Acquire a camera stream and enter `CameraActive`.
    ///
    /// Valid from `Idle`, and from `Result` where it restarts: the old
    /// stream is released before the new one is requested, so a failed
    /// restart leaves the session idle with nothing held.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.session.stage {
            Stage::Idle => {}
            Stage::Result => {
                tracing::info!("restarting capture session");
                self.reset();
            }
            stage => return Err(reject(Operation::Start, stage)),
        }

        self.session.next_generation();
        match self.provider.acquire() {
            Ok(stream) => {
                tracing::info!(stream = stream.id, device = %stream.device, "camera active");
                self.session.stream = Some(stream);
                self.session.stage = Stage::CameraActive;
                self.publish();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera unavailable; staying idle");
                self.publish();
                Err(SessionError::CaptureUnavailable(e))
            }
        }
    }

    /// Begin the face scan. Valid only from `CameraActive`.
    ///
    /// Fails with `NoRuntime`, leaving the session untouched, when called
    /// outside a Tokio runtime.
    pub fn analyze(&mut self) -> Result<AnalysisTicket, SessionError> {
        if self.session.stage != Stage::CameraActive {
            return Err(reject(Operation::Analyze, self.session.stage));
        }
        let runtime = tokio::runtime::Handle::try_current()?;

        let ticket = AnalysisTicket {
            generation: self.session.next_generation(),
        };
        self.session.stage = Stage::Analyzing;

        let tx = self.completion_tx.clone();
        let delay = self.analysis_delay;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the controller was dropped.
            let _ = tx.send(ticket);
        });

        tracing::info!(generation = ticket.generation, "analysis started");
        self.publish();
        Ok(ticket)
    }

    /// Release the stream and return to `Idle`. A no-op when already idle.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if self.session.stage == Stage::Idle {
            tracing::debug!("stop while idle ignored");
            return Ok(());
        }

        tracing::info!(stage = %self.session.stage, "stopping capture session");
        self.reset();
        self.publish();
        Ok(())
    }

    /// Highlight a different frame. Valid only in `Result`.
    pub fn select_frame(&mut self, id: &str) -> Result<(), SessionError> {
        if self.session.stage != Stage::Result {
            return Err(reject(Operation::SelectFrame, self.session.stage));
        }

        let idx = self
            .catalog
            .frames()
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| SessionError::InvalidFrameSelection(id.to_string()))?;

        self.session.selected_frame = idx;
        tracing::debug!(frame = id, "frame selected");
        self.publish();
        Ok(())
    }

    /// Apply a finished analysis if it still belongs to the current session.
    pub fn complete_analysis(&mut self, ticket: AnalysisTicket) -> Completion {
        if self.session.stage != Stage::Analyzing || ticket.generation != self.session.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.session.generation,
                stage = %self.session.stage,
                "discarding stale analysis result"
            );
            return Completion::Discarded;
        }

        let shape = self.detector.detect();
        self.session.detected_shape = Some(shape);
        if let Some(frame) = ranker::best_match(self.catalog.frames(), shape) {
            if let Some(idx) = self.catalog.frames().iter().position(|f| f.id == frame.id) {
                self.session.selected_frame = idx;
            }
        }
        self.session.stage = Stage::Result;

        tracing::info!(
            %shape,
            frame = %self.selected_frame().id,
            "analysis complete"
        );
        self.publish();
        Completion::Applied(shape)
    }

    /// Wait for the next analysis timer and apply it.
    ///
    /// Stale timers are consumed and reported as `Discarded`. Returns `None`
    /// only if the completion channel has closed.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        let ticket = self.completion_rx.recv().await?;
        Some(self.complete_analysis(ticket))
    }

    pub fn stage(&self) -> Stage {
        self.session.stage
    }

    pub fn detected_shape(&self) -> Option<FaceShape> {
        self.session.detected_shape
    }

    pub fn selected_frame(&self) -> &Frame {
        &self.catalog.frames()[self.session.selected_frame]
    }

    /// Catalog in display order for the current detection.
    pub fn ranked_catalog(&self) -> Vec<&Frame> {
        ranker::rank(self.catalog.frames(), self.session.detected_shape)
    }

    /// The live stream, for rendering only.
    pub fn stream(&self) -> Option<&Stream> {
        self.session.stream.as_ref()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        build_snapshot(&self.catalog, &self.session)
    }

    /// Receive a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn reset(&mut self) {
        if let Some(stream) = self.session.reset(self.default_frame) {
            tracing::debug!(stream = stream.id, "releasing stream");
            self.provider.release(stream);
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

impl<P: MediaCaptureProvider, D: ShapeDetector> Drop for Controller<P, D> {
    fn drop(&mut self) {
        if let Some(stream) = self.session.stream.take() {
            tracing::debug!(stream = stream.id, "controller dropped; releasing stream");
            self.provider.release(stream);
        }
    }
}

fn reject(operation: Operation, stage: Stage) -> SessionError {
    tracing::debug!(%operation, %stage, "rejected operation");
    SessionError::InvalidTransition { operation, stage }
}

fn build_snapshot(catalog: &Catalog, session: &CaptureSession) -> SessionSnapshot {
    let selected = &catalog.frames()[session.selected_frame];
    let frames = ranker::rank(catalog.frames(), session.detected_shape)
        .into_iter()
        .map(|frame| RankedEntry {
            recommended: ranker::is_recommended(frame, session.detected_shape),
            selected: frame.id == selected.id,
            frame: frame.clone(),
        })
        .collect();

    SessionSnapshot {
        stage: session.stage,
        detected_shape: session.detected_shape,
        selected_frame: selected.id.clone(),
        frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;
    use tryon_core::{Category, FixedShapeDetector};
    use tryon_hw::PixelFormat;

    const DELAY: Duration = Duration::from_millis(2800);

    #[derive(Default)]
    struct Ledger {
        next_id: u64,
        acquired: usize,
        released: usize,
        redundant_releases: usize,
        live: HashSet<u64>,
        fail: bool,
    }

    /// Provider that records every acquire and release.
    #[derive(Clone, Default)]
    struct FakeProvider {
        ledger: Rc<RefCell<Ledger>>,
    }

    impl FakeProvider {
        fn set_failing(&self, fail: bool) {
            self.ledger.borrow_mut().fail = fail;
        }

        fn assert_balanced(&self) {
            let ledger = self.ledger.borrow();
            assert_eq!(ledger.acquired, ledger.released, "acquire/release mismatch");
            assert!(ledger.live.is_empty(), "streams still live: {:?}", ledger.live);
            assert_eq!(ledger.redundant_releases, 0);
        }
    }

    impl MediaCaptureProvider for FakeProvider {
        fn acquire(&mut self) -> Result<Stream, CaptureError> {
            let mut ledger = self.ledger.borrow_mut();
            if ledger.fail {
                return Err(CaptureError::Unavailable("permission denied".into()));
            }
            ledger.next_id += 1;
            let id = ledger.next_id;
            ledger.acquired += 1;
            ledger.live.insert(id);
            Ok(Stream {
                id,
                device: "fake".into(),
                width: 640,
                height: 480,
                pixel_format: PixelFormat::Yuyv,
            })
        }

        fn release(&mut self, stream: Stream) {
            let mut ledger = self.ledger.borrow_mut();
            if ledger.live.remove(&stream.id) {
                ledger.released += 1;
            } else {
                ledger.redundant_releases += 1;
            }
        }
    }

    fn frame(id: &str, shapes: &[FaceShape]) -> Frame {
        Frame {
            id: id.into(),
            name: id.to_uppercase(),
            brand: "Test".into(),
            price: 100_000,
            category: Category::Ophthalmic,
            image: format!("{id}.jpg"),
            recommended_for: shapes.iter().copied().collect(),
        }
    }

    fn small_catalog() -> Catalog {
        Catalog::new(vec![
            frame("f1", &[FaceShape::Round]),
            frame("f2", &[FaceShape::Oval]),
            frame("f3", &[FaceShape::Round, FaceShape::Square]),
        ])
        .unwrap()
    }

    fn controller(
        shape: FaceShape,
    ) -> (Controller<FakeProvider, FixedShapeDetector>, FakeProvider) {
        let provider = FakeProvider::default();
        let controller = Controller::new(
            provider.clone(),
            FixedShapeDetector(shape),
            small_catalog(),
            "f2",
            DELAY,
        )
        .unwrap();
        (controller, provider)
    }

    fn assert_invariants<P: MediaCaptureProvider, D: ShapeDetector>(c: &Controller<P, D>) {
        assert_eq!(c.stream().is_some(), c.stage().holds_stream());
        assert_eq!(c.detected_shape().is_some(), c.stage() == Stage::Result);
        assert!(c.catalog().get(&c.selected_frame().id).is_some());
    }

    fn ids(frames: &[&Frame]) -> Vec<String> {
        frames.iter().map(|f| f.id.clone()).collect()
    }

    #[test]
    fn test_unknown_default_frame() {
        let result = Controller::new(
            FakeProvider::default(),
            FixedShapeDetector(FaceShape::Oval),
            small_catalog(),
            "missing",
            DELAY,
        );
        assert!(matches!(
            result,
            Err(SessionError::Catalog(CatalogError::UnknownFrame(id))) if id == "missing"
        ));
    }

    #[test]
    fn test_initial_state() {
        let (c, _) = controller(FaceShape::Round);
        assert_eq!(c.stage(), Stage::Idle);
        assert!(c.stream().is_none());
        assert!(c.detected_shape().is_none());
        assert_eq!(c.selected_frame().id, "f2");
        assert_eq!(ids(&c.ranked_catalog()), vec!["f1", "f2", "f3"]);
        assert_invariants(&c);
    }

    #[test]
    fn test_start_failure_stays_idle() {
        let (mut c, provider) = controller(FaceShape::Round);
        provider.set_failing(true);

        let err = c.start().unwrap_err();
        assert!(matches!(err, SessionError::CaptureUnavailable(CaptureError::Unavailable(_))));
        assert_eq!(c.stage(), Stage::Idle);
        assert!(c.stream().is_none());
        assert!(c.detected_shape().is_none());
        assert_invariants(&c);
        provider.assert_balanced();

        // Caller retries explicitly once the device is back
        provider.set_failing(false);
        c.start().unwrap();
        assert_eq!(c.stage(), Stage::CameraActive);
    }

    #[test]
    fn test_idle_rejects_analyze_and_select() {
        let (mut c, _) = controller(FaceShape::Round);
        assert!(matches!(
            c.analyze(),
            Err(SessionError::InvalidTransition { operation: Operation::Analyze, stage: Stage::Idle })
        ));
        assert!(matches!(
            c.select_frame("f1"),
            Err(SessionError::InvalidTransition { operation: Operation::SelectFrame, stage: Stage::Idle })
        ));
        c.stop().unwrap();
        assert_eq!(c.stage(), Stage::Idle);
        assert_eq!(c.selected_frame().id, "f2");
    }

    #[test]
    fn test_camera_active_rejects_start_and_select() {
        let (mut c, provider) = controller(FaceShape::Round);
        c.start().unwrap();

        assert!(matches!(
            c.start(),
            Err(SessionError::InvalidTransition { operation: Operation::Start, stage: Stage::CameraActive })
        ));
        assert!(matches!(
            c.select_frame("f1"),
            Err(SessionError::InvalidTransition { operation: Operation::SelectFrame, .. })
        ));
        assert_eq!(provider.ledger.borrow().acquired, 1);

        c.stop().unwrap();
        assert_invariants(&c);
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_flow_round() {
        let (mut c, provider) = controller(FaceShape::Round);
        c.start().unwrap();
        let ticket = c.analyze().unwrap();
        assert_eq!(c.stage(), Stage::Analyzing);
        assert_invariants(&c);

        assert_eq!(c.next_completion().await, Some(Completion::Applied(FaceShape::Round)));
        assert_eq!(ticket.generation(), c.session().generation());
        assert_eq!(c.stage(), Stage::Result);
        assert_eq!(c.detected_shape(), Some(FaceShape::Round));
        assert_eq!(c.selected_frame().id, "f1");
        assert_eq!(ids(&c.ranked_catalog()), vec!["f1", "f3", "f2"]);
        assert_invariants(&c);

        c.stop().unwrap();
        assert_eq!(c.stage(), Stage::Idle);
        assert!(c.detected_shape().is_none());
        assert_eq!(c.selected_frame().id, "f2");
        assert_eq!(ids(&c.ranked_catalog()), vec!["f1", "f2", "f3"]);
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_matching_frame_keeps_selection() {
        let (mut c, _) = controller(FaceShape::Heart);
        c.start().unwrap();
        c.analyze().unwrap();
        assert_eq!(c.next_completion().await, Some(Completion::Applied(FaceShape::Heart)));
        assert_eq!(c.stage(), Stage::Result);
        assert_eq!(c.selected_frame().id, "f2");
        assert_eq!(ids(&c.ranked_catalog()), vec!["f1", "f2", "f3"]);
    }

    #[test]
    fn test_analyze_outside_runtime_leaves_session_untouched() {
        let (mut c, provider) = controller(FaceShape::Round);
        c.start().unwrap();
        let generation = c.session().generation();

        let err = c.analyze().unwrap_err();
        assert!(matches!(err, SessionError::NoRuntime(_)), "got {err:?}");
        assert_eq!(c.stage(), Stage::CameraActive);
        assert_eq!(c.session().generation(), generation);
        assert_invariants(&c);

        c.stop().unwrap();
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_rejects_analyze() {
        let (mut c, _) = controller(FaceShape::Round);
        c.start().unwrap();
        c.analyze().unwrap();
        c.next_completion().await;
        c.select_frame("f3").unwrap();
        let generation = c.session().generation();

        assert!(matches!(
            c.analyze(),
            Err(SessionError::InvalidTransition { operation: Operation::Analyze, stage: Stage::Result })
        ));
        assert_eq!(c.stage(), Stage::Result);
        assert_eq!(c.detected_shape(), Some(FaceShape::Round));
        assert_eq!(c.selected_frame().id, "f3");
        assert_eq!(c.session().generation(), generation);
        assert_invariants(&c);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyzing_accepts_only_stop() {
        let (mut c, _) = controller(FaceShape::Oval);
        c.start().unwrap();
        c.analyze().unwrap();

        assert!(matches!(
            c.analyze(),
            Err(SessionError::InvalidTransition { operation: Operation::Analyze, stage: Stage::Analyzing })
        ));
        assert!(matches!(
            c.start(),
            Err(SessionError::InvalidTransition { operation: Operation::Start, stage: Stage::Analyzing })
        ));
        assert!(matches!(
            c.select_frame("f1"),
            Err(SessionError::InvalidTransition { operation: Operation::SelectFrame, .. })
        ));
        assert_eq!(c.stage(), Stage::Analyzing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_analysis_discards_result() {
        let (mut c, provider) = controller(FaceShape::Round);
        c.start().unwrap();
        c.analyze().unwrap();
        c.stop().unwrap();

        // The original timer still fires
        assert_eq!(c.next_completion().await, Some(Completion::Discarded));
        assert_eq!(c.stage(), Stage::Idle);
        assert!(c.detected_shape().is_none());
        assert_eq!(c.selected_frame().id, "f2");
        assert_invariants(&c);
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticket_ignored_after_new_session() {
        let (mut c, provider) = controller(FaceShape::Square);
        c.start().unwrap();
        let stale = c.analyze().unwrap();
        c.stop().unwrap();
        c.start().unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let fresh = c.analyze().unwrap();
        assert_ne!(stale, fresh);

        // Stale timer lands first, while the new analysis is still running
        assert_eq!(c.next_completion().await, Some(Completion::Discarded));
        assert_eq!(c.stage(), Stage::Analyzing);
        assert!(c.detected_shape().is_none());

        assert_eq!(c.next_completion().await, Some(Completion::Applied(FaceShape::Square)));
        assert_eq!(c.stage(), Stage::Result);
        assert_eq!(c.selected_frame().id, "f3");

        c.stop().unwrap();
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_replayed_after_result_is_discarded() {
        let (mut c, _) = controller(FaceShape::Round);
        c.start().unwrap();
        let ticket = c.analyze().unwrap();
        assert_eq!(c.next_completion().await, Some(Completion::Applied(FaceShape::Round)));
        c.select_frame("f3").unwrap();

        assert_eq!(c.complete_analysis(ticket), Completion::Discarded);
        assert_eq!(c.selected_frame().id, "f3");
        assert_eq!(c.stage(), Stage::Result);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_frame_in_result() {
        let (mut c, _) = controller(FaceShape::Round);
        c.start().unwrap();
        c.analyze().unwrap();
        c.next_completion().await;

        c.select_frame("f2").unwrap();
        assert_eq!(c.selected_frame().id, "f2");
        assert_eq!(c.stage(), Stage::Result);

        let err = c.select_frame("nope").unwrap_err();
        assert!(matches!(err, SessionError::InvalidFrameSelection(id) if id == "nope"));
        assert_eq!(c.selected_frame().id, "f2");
        assert_invariants(&c);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_result_supersedes_stream() {
        let (mut c, provider) = controller(FaceShape::Round);
        c.start().unwrap();
        let first = c.stream().unwrap().id;
        c.analyze().unwrap();
        c.next_completion().await;

        c.start().unwrap();
        assert_eq!(c.stage(), Stage::CameraActive);
        assert_ne!(c.stream().unwrap().id, first);
        assert!(c.detected_shape().is_none());
        assert_eq!(c.selected_frame().id, "f2");
        {
            let ledger = provider.ledger.borrow();
            assert_eq!(ledger.acquired, 2);
            assert_eq!(ledger.released, 1);
        }

        c.stop().unwrap();
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_restart_releases_old_stream() {
        let (mut c, provider) = controller(FaceShape::Oval);
        c.start().unwrap();
        c.analyze().unwrap();
        c.next_completion().await;

        provider.set_failing(true);
        assert!(matches!(c.start(), Err(SessionError::CaptureUnavailable(_))));
        assert_eq!(c.stage(), Stage::Idle);
        assert!(c.stream().is_none());
        assert!(c.detected_shape().is_none());
        assert_invariants(&c);
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_balance_over_mixed_sequence() {
        let (mut c, provider) = controller(FaceShape::Heart);
        for round in 0..5 {
            provider.set_failing(round == 2);
            let _ = c.start();
            if c.stage() == Stage::CameraActive {
                c.analyze().unwrap();
                if round % 2 == 0 {
                    c.stop().unwrap();
                }
                c.next_completion().await;
                let _ = c.start();
            }
            c.stop().unwrap();
            c.stop().unwrap();
            assert_invariants(&c);
        }
        provider.assert_balanced();
    }

    #[test]
    fn test_drop_releases_stream() {
        let (mut c, provider) = controller(FaceShape::Round);
        c.start().unwrap();
        drop(c);
        provider.assert_balanced();
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_each_transition() {
        let (mut c, _) = controller(FaceShape::Round);
        let mut rx = c.subscribe();
        assert_eq!(rx.borrow().stage, Stage::Idle);

        c.start().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().stage, Stage::CameraActive);

        c.analyze().unwrap();
        c.next_completion().await;
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.stage, Stage::Result);
        assert_eq!(snap.detected_shape, Some(FaceShape::Round));
        assert_eq!(snap.selected_frame, "f1");
        let flags: Vec<(&str, bool, bool)> = snap
            .frames
            .iter()
            .map(|e| (e.frame.id.as_str(), e.recommended, e.selected))
            .collect();
        assert_eq!(
            flags,
            vec![("f1", true, true), ("f3", true, false), ("f2", false, false)]
        );
        assert_eq!(snap.selected().map(|e| e.frame.id.as_str()), Some("f1"));
    }

    #[test]
    fn test_snapshot_serializes_for_renderers() {
        let (c, _) = controller(FaceShape::Round);
        let json = serde_json::to_value(c.snapshot()).unwrap();
        assert_eq!(json["stage"], "idle");
        assert_eq!(json["detected_shape"], serde_json::Value::Null);
        assert_eq!(json["selected_frame"], "f2");
        assert_eq!(json["frames"].as_array().map(|a| a.len()), Some(3));
    }
}
