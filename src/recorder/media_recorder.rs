//! Chunked media recorder
//!
//! Records a [`MediaStream`] by collecting its bytes and handing them out as
//! fragments every timeslice. State changes happen synchronously in the
//! calling method; events are emitted by a worker task in command order.

use super::state::{RecorderOptions, RecorderState, RecordingClock};
use crate::capture::{CaptureError, CaptureMessage, MediaStream, TrackInfo};
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// MIME type used when the options do not name one
pub const DEFAULT_MIME_TYPE: &str = "video/webm";

/// Container types the recorder accepts
const SUPPORTED_MIME_TYPES: &[&str] = &["video/webm", "audio/webm", "video/x-matroska"];

/// Errors reported by the recorder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RecorderError {
    /// Legacy DOMException code
    pub fn code(&self) -> u16 {
        match self {
            RecorderError::InvalidState(_) => 11,
            RecorderError::NotSupported(_) => 9,
            RecorderError::Security(_) => 18,
            RecorderError::Encoding(_) | RecorderError::Unknown(_) => 0,
        }
    }

    /// DOMException name
    pub fn name(&self) -> &'static str {
        match self {
            RecorderError::InvalidState(_) => "InvalidStateError",
            RecorderError::NotSupported(_) => "NotSupportedError",
            RecorderError::Security(_) => "SecurityError",
            RecorderError::Encoding(_) => "EncodingError",
            RecorderError::Unknown(_) => "UnknownError",
        }
    }

    /// Message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            RecorderError::InvalidState(m)
            | RecorderError::NotSupported(m)
            | RecorderError::Security(m)
            | RecorderError::Encoding(m)
            | RecorderError::Unknown(m) => m,
        }
    }
}

impl From<CaptureError> for RecorderError {
    /// Recorder error raised when the capture source fails mid-recording
    fn from(error: CaptureError) -> Self {
        let message = error.message().to_string();
        match error {
            CaptureError::NotAllowed(_) => RecorderError::Security(message),
            CaptureError::NotReadable(_) => RecorderError::Encoding(message),
            _ => RecorderError::Unknown(message),
        }
    }
}

/// Result type for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Events emitted by the recorder
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// A fragment of recorded data
    DataAvailable {
        data: Bytes,
        /// Recorded milliseconds at the first byte of the fragment
        timecode: f64,
    },
    /// Recording finished, every fragment has been delivered
    Stop,
    /// Recording failed; no stop event follows
    Error(RecorderError),
    Start { state: RecorderState },
    Pause { state: RecorderState },
    Resume { state: RecorderState },
}

/// Receiving end of a recorder's events
#[derive(Debug)]
pub struct RecorderEvents {
    rx: mpsc::UnboundedReceiver<RecorderEvent>,
}

impl RecorderEvents {
    /// Wait for the next event. `None` once the recorder is gone.
    pub async fn recv(&mut self) -> Option<RecorderEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RecorderEvent> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug)]
enum Command {
    Start {
        timeslice: Option<Duration>,
        generation: u64,
    },
    Pause,
    Resume,
    Stop,
}

/// State shared by a recorder and its worker
///
/// `generation` counts started recordings. The worker only ends the recording
/// it is running, never one started after it.
#[derive(Debug, Default)]
struct SharedState {
    state: RecorderState,
    generation: u64,
}

impl SharedState {
    /// Enter `Recording` for a new recording and return its generation
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.state = RecorderState::Recording;
        self.generation
    }

    /// Go inactive if `generation` is still the current recording
    fn end(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.state = RecorderState::Inactive;
        true
    }
}

/// Recorder bound to one capture stream
pub struct MediaRecorder {
    state: Arc<RwLock<SharedState>>,
    stream_ended: Arc<AtomicBool>,
    stream_id: String,
    tracks: Vec<TrackInfo>,
    mime_type: String,
    options: RecorderOptions,
    commands: mpsc::UnboundedSender<Command>,
}

impl MediaRecorder {
    /// Whether the recorder can produce `mime_type`
    ///
    /// Parameters such as `;codecs=vp9` are accepted as long as the base type
    /// is supported. The empty string means "recorder's choice".
    pub fn is_type_supported(mime_type: &str) -> bool {
        let base = mime_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        base.is_empty() || SUPPORTED_MIME_TYPES.contains(&base.as_str())
    }

    /// Create a recorder for `stream`
    ///
    /// Must be called inside a tokio runtime; the worker task is spawned here.
    pub fn new(
        stream: MediaStream,
        options: RecorderOptions,
    ) -> RecorderResult<(Self, RecorderEvents)> {
        let mime_type = match options.mime_type.as_deref().map(str::trim) {
            Some(requested) if !requested.is_empty() => {
                if !Self::is_type_supported(requested) {
                    return Err(RecorderError::NotSupported(format!(
                        "MIME type '{requested}' is not supported"
                    )));
                }
                requested.to_string()
            }
            _ => DEFAULT_MIME_TYPE.to_string(),
        };

        let state = Arc::new(RwLock::new(SharedState::default()));
        let stream_ended = Arc::new(AtomicBool::new(false));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let stream_id = stream.id().to_string();
        let tracks = stream.tracks().to_vec();

        let worker = Worker {
            stream: Some(stream),
            commands: command_rx,
            events: event_tx,
            state: state.clone(),
            stream_ended: stream_ended.clone(),
            phase: RecorderState::Inactive,
            generation: 0,
            pending: Vec::new(),
            pending_timecode: None,
            ticker: None,
            clock: RecordingClock::default(),
            origin: Instant::now(),
        };
        tokio::spawn(worker.run());

        tracing::debug!("Recorder created for stream {} ({})", stream_id, mime_type);

        Ok((
            Self {
                state,
                stream_ended,
                stream_id,
                tracks,
                mime_type,
                options,
                commands: command_tx,
            },
            RecorderEvents { rx: event_rx },
        ))
    }

    /// Current state
    pub fn state(&self) -> RecorderState {
        self.state.read().state
    }

    /// MIME type the recorder produces
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Options the recorder was created with
    pub fn options(&self) -> &RecorderOptions {
        &self.options
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    /// Begin recording. With a timeslice, a fragment is emitted every interval.
    pub fn start(&self, timeslice: Option<Duration>) -> RecorderResult<()> {
        if self.stream_ended.load(Ordering::SeqCst) {
            return Err(RecorderError::InvalidState(
                "the capture stream has ended".to_string(),
            ));
        }

        let mut shared = self.state.write();
        if shared.state != RecorderState::Inactive {
            return Err(RecorderError::InvalidState(format!(
                "cannot start while {}",
                shared.state
            )));
        }
        let generation = shared.begin();
        self.send(Command::Start {
            timeslice,
            generation,
        })
    }

    pub fn pause(&self) -> RecorderResult<()> {
        let mut shared = self.state.write();
        match shared.state {
            RecorderState::Inactive => Err(RecorderError::InvalidState(
                "cannot pause while inactive".to_string(),
            )),
            RecorderState::Paused => Ok(()),
            RecorderState::Recording => {
                shared.state = RecorderState::Paused;
                self.send(Command::Pause)
            }
        }
    }

    pub fn resume(&self) -> RecorderResult<()> {
        let mut shared = self.state.write();
        match shared.state {
            RecorderState::Inactive => Err(RecorderError::InvalidState(
                "cannot resume while inactive".to_string(),
            )),
            RecorderState::Recording => Ok(()),
            RecorderState::Paused => {
                shared.state = RecorderState::Recording;
                self.send(Command::Resume)
            }
        }
    }

    /// Stop recording. The stop event follows the last fragment.
    pub fn stop(&self) -> RecorderResult<()> {
        let mut shared = self.state.write();
        if shared.state == RecorderState::Inactive {
            return Ok(());
        }
        shared.state = RecorderState::Inactive;
        self.send(Command::Stop)
    }

    fn send(&self, command: Command) -> RecorderResult<()> {
        self.commands
            .send(command)
            .map_err(|_| RecorderError::Unknown("recorder worker has exited".to_string()))
    }
}

impl std::fmt::Debug for MediaRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaRecorder")
            .field("stream_id", &self.stream_id)
            .field("state", &self.state())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

async fn next_capture(stream: &mut Option<MediaStream>) -> Option<CaptureMessage> {
    match stream {
        Some(stream) => stream.next_message().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

struct Worker {
    stream: Option<MediaStream>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<RecorderEvent>,
    state: Arc<RwLock<SharedState>>,
    stream_ended: Arc<AtomicBool>,
    /// State as seen by the worker, which may trail the shared state
    phase: RecorderState,
    /// Recording the worker is running or last ran
    generation: u64,
    pending: Vec<u8>,
    pending_timecode: Option<f64>,
    ticker: Option<Interval>,
    clock: RecordingClock,
    origin: Instant,
}

impl Worker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                message = next_capture(&mut self.stream) => self.handle_capture(message),
                _ = next_tick(&mut self.ticker) => self.flush(),
            }
        }
        tracing::debug!("Recorder worker exited");
    }

    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn emit(&self, event: RecorderEvent) {
        let _ = self.events.send(event);
    }

    fn handle_command(&mut self, command: Command) {
        self.drain_capture();
        match command {
            Command::Start {
                timeslice,
                generation,
            } => {
                self.generation = generation;
                if self.stream.is_none() {
                    // Accepted before the worker saw the stream end
                    self.fail(RecorderError::InvalidState(
                        "the capture stream has ended".to_string(),
                    ));
                    return;
                }
                self.phase = RecorderState::Recording;
                self.pending.clear();
                self.pending_timecode = None;
                self.clock.start(self.now_ms());
                self.ticker = timeslice.map(|period| {
                    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker
                });
                tracing::info!("Recording started (timeslice: {:?})", timeslice);
                self.emit(RecorderEvent::Start { state: self.phase });
            }
            Command::Pause => {
                if self.phase != RecorderState::Recording {
                    return;
                }
                self.phase = RecorderState::Paused;
                self.clock.pause(self.now_ms());
                tracing::info!("Recording paused");
                self.emit(RecorderEvent::Pause { state: self.phase });
            }
            Command::Resume => {
                if self.phase != RecorderState::Paused {
                    return;
                }
                self.phase = RecorderState::Recording;
                self.clock.resume(self.now_ms());
                tracing::info!("Recording resumed");
                self.emit(RecorderEvent::Resume { state: self.phase });
            }
            Command::Stop => {
                if self.phase.is_active() {
                    self.finish();
                }
            }
        }
    }

    /// Take in chunks that were captured before the current command was issued
    fn drain_capture(&mut self) {
        while let Some(message) = self.stream.as_mut().and_then(|s| s.try_next_message()) {
            self.handle_capture(Some(message));
        }
    }

    fn handle_capture(&mut self, message: Option<CaptureMessage>) {
        match message {
            Some(CaptureMessage::Chunk(chunk)) => {
                if self.phase != RecorderState::Recording {
                    return;
                }
                if self.pending_timecode.is_none() {
                    self.pending_timecode = Some(self.clock.recorded_ms(self.now_ms()));
                }
                self.pending.extend_from_slice(&chunk.data);
            }
            Some(CaptureMessage::Failed(error)) => {
                tracing::error!("Capture source failed: {}", error);
                self.end_stream();
                if self.phase.is_active() {
                    self.fail(error.into());
                }
            }
            None => {
                tracing::info!("Capture stream ended");
                self.end_stream();
                if self.phase.is_active() {
                    self.state.write().end(self.generation);
                    self.finish();
                }
            }
        }
    }

    fn end_stream(&mut self) {
        self.stream_ended.store(true, Ordering::SeqCst);
        self.stream = None;
    }

    /// Emit pending bytes as one fragment
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let data = Bytes::from(std::mem::take(&mut self.pending));
        let timecode = self.pending_timecode.take().unwrap_or(0.0);
        tracing::debug!("Fragment ready: {} bytes at {:.0}ms", data.len(), timecode);
        self.emit(RecorderEvent::DataAvailable { data, timecode });
    }

    /// Deliver the last fragment and the stop event
    fn finish(&mut self) {
        self.flush();
        self.phase = RecorderState::Inactive;
        self.ticker = None;
        self.clock.pause(self.now_ms());
        tracing::info!(
            "Recording stopped after {:.0}ms",
            self.clock.recorded_ms(self.now_ms())
        );
        self.emit(RecorderEvent::Stop);
    }

    fn fail(&mut self, error: RecorderError) {
        self.phase = RecorderState::Inactive;
        self.pending.clear();
        self.pending_timecode = None;
        self.ticker = None;
        self.state.write().end(self.generation);
        tracing::warn!("Recording failed: {}", error);
        self.emit(RecorderEvent::Error(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        LoopbackDevices, LoopbackFeed, MediaConstraints, MediaDevices, TrackKind,
    };

    async fn recorder_with_feed(
        options: RecorderOptions,
    ) -> (MediaRecorder, RecorderEvents, LoopbackFeed) {
        let devices = LoopbackDevices::new();
        let stream = devices
            .get_user_media(MediaConstraints::AUDIO_VIDEO)
            .await
            .unwrap();
        let feed = devices.take_feed().unwrap();
        let (recorder, events) = MediaRecorder::new(stream, options).unwrap();
        (recorder, events, feed)
    }

    #[test]
    fn test_is_type_supported() {
        assert!(MediaRecorder::is_type_supported(""));
        assert!(MediaRecorder::is_type_supported("video/webm"));
        assert!(MediaRecorder::is_type_supported("video/webm;codecs=vp9,opus"));
        assert!(MediaRecorder::is_type_supported("Audio/WebM"));
        assert!(!MediaRecorder::is_type_supported("video/mp4"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RecorderError::InvalidState("x".into()).code(), 11);
        assert_eq!(RecorderError::NotSupported("x".into()).code(), 9);
        assert_eq!(RecorderError::Security("x".into()).code(), 18);
        assert_eq!(RecorderError::Unknown("boom".into()).message(), "boom");
        assert_eq!(RecorderError::Unknown("boom".into()).name(), "UnknownError");
    }

    #[tokio::test]
    async fn test_unsupported_mime_type_is_rejected() {
        let devices = LoopbackDevices::new();
        let stream = devices
            .get_user_media(MediaConstraints::AUDIO_VIDEO)
            .await
            .unwrap();

        let result = MediaRecorder::new(stream, RecorderOptions::with_mime_type("video/mp4"));
        assert!(matches!(result, Err(RecorderError::NotSupported(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragments_follow_timeslice() {
        let (recorder, mut events, feed) = recorder_with_feed(RecorderOptions::default()).await;
        assert_eq!(recorder.mime_type(), DEFAULT_MIME_TYPE);

        recorder.start(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(recorder.state(), RecorderState::Recording);
        assert_eq!(
            events.recv().await,
            Some(RecorderEvent::Start {
                state: RecorderState::Recording
            })
        );

        feed.push(TrackKind::Video, vec![1u8; 1000]);
        match events.recv().await {
            Some(RecorderEvent::DataAvailable { data, timecode }) => {
                assert_eq!(data.len(), 1000);
                assert_eq!(timecode, 0.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        feed.push(TrackKind::Audio, vec![2u8; 2000]);
        recorder.stop().unwrap();
        assert_eq!(recorder.state(), RecorderState::Inactive);

        match events.recv().await {
            Some(RecorderEvent::DataAvailable { data, timecode }) => {
                assert_eq!(data.len(), 2000);
                assert_eq!(timecode, 1000.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(events.recv().await, Some(RecorderEvent::Stop));
    }

    #[tokio::test]
    async fn test_state_machine_rejects_invalid_transitions() {
        let (recorder, mut events, _feed) = recorder_with_feed(RecorderOptions::default()).await;

        assert!(matches!(recorder.pause(), Err(RecorderError::InvalidState(_))));
        assert!(matches!(recorder.resume(), Err(RecorderError::InvalidState(_))));
        assert!(recorder.stop().is_ok());

        recorder.start(None).unwrap();
        assert!(matches!(recorder.start(None), Err(RecorderError::InvalidState(_))));

        recorder.pause().unwrap();
        recorder.pause().unwrap();
        recorder.resume().unwrap();
        recorder.resume().unwrap();
        recorder.stop().unwrap();

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            let done = event == RecorderEvent::Stop;
            seen.push(event);
            if done {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                RecorderEvent::Start {
                    state: RecorderState::Recording
                },
                RecorderEvent::Pause {
                    state: RecorderState::Paused
                },
                RecorderEvent::Resume {
                    state: RecorderState::Recording
                },
                RecorderEvent::Stop,
            ]
        );
    }

    #[tokio::test]
    async fn test_chunks_while_paused_are_dropped() {
        let (recorder, mut events, feed) = recorder_with_feed(RecorderOptions::default()).await;

        recorder.start(None).unwrap();
        assert!(matches!(events.recv().await, Some(RecorderEvent::Start { .. })));

        feed.push(TrackKind::Video, vec![1u8; 10]);
        recorder.pause().unwrap();
        assert!(matches!(events.recv().await, Some(RecorderEvent::Pause { .. })));

        feed.push(TrackKind::Video, vec![2u8; 500]);
        recorder.resume().unwrap();
        assert!(matches!(events.recv().await, Some(RecorderEvent::Resume { .. })));

        feed.push(TrackKind::Video, vec![3u8; 5]);
        recorder.stop().unwrap();

        let mut total = 0;
        while let Some(event) = events.recv().await {
            match event {
                RecorderEvent::DataAvailable { data, .. } => total += data.len(),
                RecorderEvent::Stop => break,
                _ => {}
            }
        }
        assert_eq!(total, 15);
    }

    #[tokio::test]
    async fn test_source_failure_reports_error_without_stop() {
        let (recorder, mut events, feed) = recorder_with_feed(RecorderOptions::default()).await;

        recorder.start(Some(Duration::from_secs(1))).unwrap();
        assert!(matches!(events.recv().await, Some(RecorderEvent::Start { .. })));

        feed.push(TrackKind::Video, vec![0u8; 64]);
        feed.fail("camera unplugged");

        match events.recv().await {
            Some(RecorderEvent::Error(error)) => {
                assert_eq!(error.message(), "camera unplugged");
                assert_eq!(error.code(), 0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(recorder.state(), RecorderState::Inactive);

        // Nothing else, not even a stop, is emitted for the failed session
        recorder.stop().unwrap();
        drop(recorder);
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_stream_end_stops_recording() {
        let (recorder, mut events, feed) = recorder_with_feed(RecorderOptions::default()).await;

        recorder.start(None).unwrap();
        assert!(matches!(events.recv().await, Some(RecorderEvent::Start { .. })));

        feed.push(TrackKind::Audio, vec![9u8; 32]);
        feed.end();

        match events.recv().await {
            Some(RecorderEvent::DataAvailable { data, .. }) => assert_eq!(data.len(), 32),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(events.recv().await, Some(RecorderEvent::Stop));
        assert_eq!(recorder.state(), RecorderState::Inactive);
        assert!(matches!(recorder.start(None), Err(RecorderError::InvalidState(_))));
    }

    #[test]
    fn test_worker_only_ends_its_own_recording() {
        let mut shared = SharedState::default();

        let first = shared.begin();
        // Host stops and starts again before the worker saw the stream end
        shared.state = RecorderState::Inactive;
        let second = shared.begin();

        assert!(!shared.end(first));
        assert_eq!(shared.state, RecorderState::Recording);

        assert!(shared.end(second));
        assert_eq!(shared.state, RecorderState::Inactive);
    }

    #[test]
    fn test_capture_failures_map_to_recorder_errors() {
        let error = RecorderError::from(CaptureError::NotAllowed("revoked".into()));
        assert_eq!(error, RecorderError::Security("revoked".into()));
        assert_eq!(error.code(), 18);

        let error = RecorderError::from(CaptureError::NotReadable("bad frame".into()));
        assert_eq!(error.name(), "EncodingError");
        assert_eq!(error.message(), "bad frame");

        let error = RecorderError::from(CaptureError::Aborted("unplugged".into()));
        assert_eq!(error, RecorderError::Unknown("unplugged".into()));
    }

    #[tokio::test]
    async fn test_revoked_permission_reports_security_error() {
        let (recorder, mut events, feed) = recorder_with_feed(RecorderOptions::default()).await;

        recorder.start(None).unwrap();
        assert!(matches!(events.recv().await, Some(RecorderEvent::Start { .. })));

        feed.fail_with(CaptureError::NotAllowed("permission revoked".into()));
        assert_eq!(
            events.recv().await,
            Some(RecorderEvent::Error(RecorderError::Security(
                "permission revoked".into()
            )))
        );
        assert_eq!(recorder.state(), RecorderState::Inactive);
    }
}
