//! Screen-share stream acquisition
//!
//! Wraps the platform's display-media call and packages the result as a
//! handle owning the stream plus its end-of-life signal.

use std::sync::Arc;

use thiserror::Error;

use crate::platform::{EndedSignal, MediaPlatform, MediaStream, PlatformError};

/// Display capture could not be acquired
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureFailure {
    /// The user dismissed the picker or the platform refused access
    #[error("display capture denied: {0}")]
    Denied(#[source] PlatformError),

    /// The platform granted a stream without a video track
    #[error("display capture stream has no video track")]
    NoVideoTrack,
}

/// An acquired screen-capture stream and its ended notification.
///
/// The handle is owned exclusively by the session state that requested it and
/// must be released before that state is left (unless ownership moves with
/// the transition, as it does into Recording).
#[derive(Debug)]
pub struct CaptureHandle {
    stream: MediaStream,
    ended: EndedSignal,
}

impl CaptureHandle {
    pub(crate) fn new(stream: MediaStream) -> Result<Self, CaptureFailure> {
        let ended = stream
            .first_video_track()
            .ok_or(CaptureFailure::NoVideoTrack)?
            .on_ended();
        Ok(Self { stream, ended })
    }

    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }

    /// Signal tracking the stream's first video track. Fires exactly once,
    /// whether the user stopped sharing natively or the tracks were stopped
    /// through `release`.
    pub fn ended(&self) -> EndedSignal {
        self.ended.clone()
    }

    /// Stop every track in the stream. Idempotent.
    pub fn release(&self) {
        self.stream.stop_all();
    }
}

/// Requests display-capture streams on demand
pub struct CaptureProvider {
    platform: Arc<dyn MediaPlatform>,
}

impl CaptureProvider {
    pub fn new(platform: Arc<dyn MediaPlatform>) -> Self {
        Self { platform }
    }

    /// Request a video-only screen share.
    ///
    /// Cancellation and denial are indistinguishable to callers; both are
    /// `Denied`. The picker may suspend indefinitely, so callers run this as
    /// a cancellable task.
    pub async fn request(&self) -> Result<CaptureHandle, CaptureFailure> {
        let stream = self
            .platform
            .request_display_media(true, false)
            .await
            .map_err(CaptureFailure::Denied)?;
        tracing::debug!(stream = stream.id(), "display capture acquired");
        CaptureHandle::new(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::Device;
    use crate::platform::{MediaTrack, TrackKind};
    use async_trait::async_trait;
    use std::time::Duration;

    struct DisplayFake {
        outcome: Result<Vec<MediaTrack>, PlatformError>,
    }

    #[async_trait]
    impl MediaPlatform for DisplayFake {
        async fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformError> {
            Ok(vec![])
        }

        async fn request_user_media(
            &self,
            _audio: bool,
            _video: bool,
        ) -> Result<MediaStream, PlatformError> {
            unimplemented!("not used by the provider")
        }

        async fn request_display_media(
            &self,
            video: bool,
            audio: bool,
        ) -> Result<MediaStream, PlatformError> {
            assert!(video && !audio, "provider must request video-only capture");
            self.outcome
                .clone()
                .map(|tracks| MediaStream::new("display", tracks))
        }
    }

    fn provider(outcome: Result<Vec<MediaTrack>, PlatformError>) -> CaptureProvider {
        CaptureProvider::new(Arc::new(DisplayFake { outcome }))
    }

    #[tokio::test]
    async fn test_request_yields_handle_with_ended_signal() {
        let track = MediaTrack::new("screen-0", TrackKind::Video);
        let handle = provider(Ok(vec![track.clone()])).request().await.unwrap();

        let waiter = tokio::spawn(handle.ended().wait());
        track.stop();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("ended signal never fired")
            .unwrap();
    }

    #[tokio::test]
    async fn test_denial_and_cancellation_map_to_denied() {
        for cause in [
            PlatformError::PermissionDenied("screen".into()),
            PlatformError::Cancelled,
        ] {
            let failure = provider(Err(cause.clone())).request().await.unwrap_err();
            assert_eq!(failure, CaptureFailure::Denied(cause));
        }
    }

    #[tokio::test]
    async fn test_stream_without_video_track_is_a_failure() {
        let audio_only = vec![MediaTrack::new("a", TrackKind::Audio)];
        let failure = provider(Ok(audio_only)).request().await.unwrap_err();
        assert_eq!(failure, CaptureFailure::NoVideoTrack);
    }

    #[tokio::test]
    async fn test_release_ends_the_stream() {
        let track = MediaTrack::new("screen-0", TrackKind::Video);
        let handle = provider(Ok(vec![track])).request().await.unwrap();

        handle.release();
        handle.release(); // idempotent
        assert!(handle.stream().is_fully_ended());
        assert!(handle.ended().is_ended());
    }
}
