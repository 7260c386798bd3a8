//! Recording
//!
//! - [`MediaRecorder`] turns a capture stream into timed fragments and events
//! - [`EventRelay`] buffers fragments and reports events to the host
//! - [`CaptureRelay`] wires capture, surface, recorder and relay together

pub mod blob;
pub mod buffer;
pub mod media_recorder;
pub mod relay;
pub mod session;
pub mod state;

pub use blob::{Blob, ObjectUrlStore};
pub use buffer::FragmentBuffer;
pub use media_recorder::{
    MediaRecorder, RecorderError, RecorderEvent, RecorderEvents, RecorderResult, DEFAULT_MIME_TYPE,
};
pub use relay::{EventRelay, RECORDING_MIME_TYPE};
pub use session::{CaptureRelay, RecorderSession, FRAGMENT_INTERVAL};
pub use state::{RecorderOptions, RecorderState, RecordingClock, RecordingSegment};
