//! Screencast session controller
//!
//! Client-side state machine for a screen/webcam recording session: device
//! discovery, permission acquisition with retry, screen-capture preview, and
//! the recording lifecycle. Platform capabilities (media acquisition,
//! recorder binding, chunk persistence) are consumed through traits; the UI
//! collaborator observes snapshots and submits commands.

pub mod capture;
pub mod config;
pub mod devices;
pub mod permission;
pub mod platform;
pub mod relay;
pub mod session;
pub mod utils;

pub use capture::{CaptureFailure, CaptureHandle, CaptureProvider};
pub use config::SessionConfig;
pub use devices::{Device, DeviceCatalog, DeviceKind};
pub use permission::{PermissionPoller, PollFailure};
pub use platform::{
    EndedSignal, MediaPlatform, MediaStream, MediaTrack, PlatformError, Recorder, RecorderBinder,
    TrackKind,
};
pub use relay::{ChunkSink, FileChunkSink, SessionId};
pub use session::{
    PreviewSnapshot, SessionCommand, SessionController, SessionObserver, SessionSnapshot,
    TracingObserver,
};
pub use utils::error::{ErrorInfo, ErrorKind, SessionError, SessionResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for binaries embedding the controller.
///
/// Respects `RUST_LOG`; defaults to debug output for this crate only.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screencast_session=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
