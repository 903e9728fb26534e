//! Capability trait definitions
//!
//! Platform-agnostic traits for device enumeration, media acquisition, and
//! recorder binding.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::devices::Device;
use crate::platform::stream::MediaStream;
use crate::relay::{ChunkSink, SessionId};

/// Failure from a platform capability call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("cancelled by user")]
    Cancelled,

    #[error("no matching device: {0}")]
    NoDevice(String),

    #[error("platform failure: {0}")]
    Other(String),
}

/// Media acquisition and device discovery capabilities.
///
/// All calls may suspend indefinitely (permission prompts, pending share
/// dialogs); the controller runs them as cancellable background tasks.
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    /// List every media device currently visible to the platform.
    async fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformError>;

    /// Request a microphone/webcam stream, prompting the user if needed.
    async fn request_user_media(
        &self,
        audio: bool,
        video: bool,
    ) -> Result<MediaStream, PlatformError>;

    /// Request a display-capture (screen share) stream.
    async fn request_display_media(
        &self,
        video: bool,
        audio: bool,
    ) -> Result<MediaStream, PlatformError>;
}

/// A recorder bound to one stream for the duration of a recording
#[async_trait]
pub trait Recorder: Send {
    /// Begin producing chunks into the sink the recorder was bound with.
    fn start(&mut self);

    /// Stop recording and flush. Must be called before the stream's tracks
    /// are released.
    async fn stop(&mut self) -> Result<(), PlatformError>;
}

/// Factory turning an acquired stream into a running recorder.
///
/// The crate ships no concrete encoder; platform bindings (and test fakes)
/// provide one.
pub trait RecorderBinder: Send + Sync {
    fn bind(
        &self,
        stream: &MediaStream,
        session: SessionId,
        sink: Arc<dyn ChunkSink>,
    ) -> Box<dyn Recorder>;
}
