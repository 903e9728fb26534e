//! Session context and its UI-facing snapshot
//!
//! The context is a tagged union with one variant per state, replaced whole
//! on every transition, so an observer always sees data consistent with
//! exactly one state. Resource handles stay inside the context; the snapshot
//! mirrors it without them and is what the UI renders against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::CaptureHandle;
use crate::devices::DeviceCatalog;
use crate::platform::{MediaStream, Recorder};
use crate::relay::SessionId;
use crate::utils::error::ErrorInfo;

/// Preview-related substate while in `Initial`
pub(crate) enum Preview {
    /// No preview; `denied` holds the outcome of the last failed request
    Idle { denied: Option<ErrorInfo> },
    /// Display-capture request in flight
    Requesting,
    /// Live screen-share preview
    Previewing { handle: CaptureHandle },
    /// Recording accepted; webcam acquisition in flight
    Starting { handle: CaptureHandle },
}

/// Everything owned while actively recording
pub(crate) struct RecordingContext {
    pub screen: CaptureHandle,
    pub webcam: Option<MediaStream>,
    pub recorders: Vec<Box<dyn Recorder>>,
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
}

/// The controller's single piece of mutable state
pub(crate) enum SessionContext {
    Setup,
    Initial {
        catalog: DeviceCatalog,
        preview: Preview,
    },
    Recording(RecordingContext),
    Finished {
        session_id: SessionId,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
    Error {
        error: ErrorInfo,
        /// Catalog from before the permission loss; selections in it survive
        /// the recovery re-enumeration
        catalog: DeviceCatalog,
    },
}

impl SessionContext {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        match self {
            Self::Setup => SessionSnapshot::Setup,
            Self::Initial { catalog, preview } => SessionSnapshot::Initial {
                catalog: catalog.clone(),
                preview: match preview {
                    Preview::Idle { denied } => PreviewSnapshot::Idle {
                        denied: denied.clone(),
                    },
                    Preview::Requesting => PreviewSnapshot::Requesting,
                    Preview::Previewing { handle } => PreviewSnapshot::Active {
                        stream_id: handle.stream().id().to_string(),
                    },
                    Preview::Starting { handle } => PreviewSnapshot::Starting {
                        stream_id: handle.stream().id().to_string(),
                    },
                },
            },
            Self::Recording(rec) => SessionSnapshot::Recording {
                session_id: rec.session_id,
                started_at: rec.started_at,
                webcam: rec.webcam.is_some(),
            },
            Self::Finished {
                session_id,
                started_at,
                ended_at,
            } => SessionSnapshot::Finished {
                session_id: *session_id,
                started_at: *started_at,
                ended_at: *ended_at,
            },
            Self::Error { error, .. } => SessionSnapshot::Error {
                error: error.clone(),
            },
        }
    }
}

/// Read-only view of the session published after every processed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionSnapshot {
    Setup,
    Initial {
        catalog: DeviceCatalog,
        preview: PreviewSnapshot,
    },
    Recording {
        session_id: SessionId,
        started_at: DateTime<Utc>,
        webcam: bool,
    },
    Finished {
        session_id: SessionId,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
    Error {
        error: ErrorInfo,
    },
}

/// Preview substate as the UI sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum PreviewSnapshot {
    Idle { denied: Option<ErrorInfo> },
    Requesting,
    Active { stream_id: String },
    Starting { stream_id: String },
}

impl SessionSnapshot {
    /// Short name for logs and observers
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Initial { preview, .. } => match preview {
                PreviewSnapshot::Idle { .. } => "initial.idle",
                PreviewSnapshot::Requesting => "initial.requestingPreview",
                PreviewSnapshot::Active { .. } => "initial.previewing",
                PreviewSnapshot::Starting { .. } => "initial.starting",
            },
            Self::Recording { .. } => "recording",
            Self::Finished { .. } => "finished",
            Self::Error { .. } => "error",
        }
    }

    pub fn catalog(&self) -> Option<&DeviceCatalog> {
        match self {
            Self::Initial { catalog, .. } => Some(catalog),
            _ => None,
        }
    }
}
