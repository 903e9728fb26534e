//! Controller event intake

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureFailure, CaptureHandle};
use crate::devices::Device;
use crate::permission::PollFailure;
use crate::platform::{MediaStream, PlatformError};

/// User intent submitted by the UI collaborator.
///
/// Commands that are illegal in the current state are logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionCommand {
    /// Request a screen-share preview (valid in Initial.Idle)
    ShowScreenPreview,
    /// Patch the selected audio input; never triggers a task
    ChangeSelectedAudioInputId { id: String },
    /// Patch the selected video input; never triggers a task
    ChangeSelectedVideoInputId { id: String },
    /// Begin recording the previewed screen share
    StartRecording,
    /// Stop recording and release every stream
    StopRecording,
}

/// Completion of a background acquisition task.
///
/// Outcomes travel through the same queue as commands; an envelope carries
/// the generation of the state that spawned the task so stale completions
/// can be discarded.
pub(crate) enum TaskOutcome {
    /// Setup's single-attempt permission probe finished
    SetupFinished(Result<Vec<Device>, PollFailure>),
    /// The Error-state poller obtained a grant
    PermissionRestored(Result<Vec<Device>, PollFailure>),
    /// Display-capture request finished
    CaptureReady(Result<CaptureHandle, CaptureFailure>),
    /// Webcam/microphone acquisition for recording finished
    WebcamReady(Result<MediaStream, PlatformError>),
    /// The screen share's video track ended
    ScreenShareEnded,
}

impl TaskOutcome {
    /// Stop any live stream the outcome carries.
    ///
    /// Called whenever an outcome is discarded instead of handled (stale
    /// generation, actor already gone) so an acquired capture never outlives
    /// the state that asked for it.
    pub(crate) fn release(self) {
        match self {
            Self::CaptureReady(Ok(handle)) => handle.release(),
            Self::WebcamReady(Ok(stream)) => stream.stop_all(),
            _ => {}
        }
    }
}

pub(crate) struct Envelope {
    pub generation: u64,
    pub outcome: TaskOutcome,
}

pub(crate) enum Msg {
    Command(SessionCommand),
    Task(Envelope),
    Shutdown,
}
