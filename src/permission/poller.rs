//! Permission polling
//!
//! Acquiring user media is the only way to surface the permission prompt, so
//! the poller requests a combined audio+video stream, drops it immediately on
//! grant, and enumerates devices while access is known to be good.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::devices::Device;
use crate::platform::{MediaPlatform, PlatformError};

/// Polling gave up before a grant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("permission not granted after {attempts} attempt(s): {cause}")]
pub struct PollFailure {
    pub attempts: u32,
    #[source]
    pub cause: PlatformError,
}

/// Repeatedly attempts to acquire user-media permission.
///
/// One poller instance is tied to one platform and interval; each `poll`
/// call is an independent bounded or unbounded run.
pub struct PermissionPoller {
    platform: Arc<dyn MediaPlatform>,
    interval: Duration,
}

impl PermissionPoller {
    pub fn new(platform: Arc<dyn MediaPlatform>, interval: Duration) -> Self {
        Self { platform, interval }
    }

    /// Poll until granted or `max_attempts` is exhausted (`None` = unbounded).
    ///
    /// Each attempt requests combined audio+video access; on grant the probe
    /// stream's tracks are stopped before anything else happens, so no open
    /// stream ever survives between attempts. An enumeration failure after a
    /// grant counts as a failed attempt.
    pub async fn poll(&self, max_attempts: Option<u32>) -> Result<Vec<Device>, PollFailure> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let cause = match self.attempt().await {
                Ok(devices) => return Ok(devices),
                Err(cause) => cause,
            };
            tracing::debug!(attempt = attempts, %cause, "permission attempt failed");

            if let Some(max) = max_attempts {
                if attempts >= max {
                    return Err(PollFailure { attempts, cause });
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    async fn attempt(&self) -> Result<Vec<Device>, PlatformError> {
        let probe = self.platform.request_user_media(true, true).await?;
        // The probe exists only to surface the prompt; never keep it open.
        probe.stop_all();
        self.platform.enumerate_devices().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceKind;
    use crate::platform::{MediaStream, MediaTrack, TrackKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Scripted platform: pops one user-media outcome per attempt and keeps
    /// a clone of every probe stream it handed out.
    struct ScriptedPlatform {
        outcomes: Mutex<VecDeque<Result<(), PlatformError>>>,
        probes: Mutex<Vec<MediaStream>>,
        devices: Vec<Device>,
    }

    impl ScriptedPlatform {
        fn new(outcomes: Vec<Result<(), PlatformError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                probes: Mutex::new(Vec::new()),
                devices: vec![Device::new("mic-1", DeviceKind::AudioInput, "Mic")],
            }
        }
    }

    #[async_trait]
    impl MediaPlatform for ScriptedPlatform {
        async fn enumerate_devices(&self) -> Result<Vec<Device>, PlatformError> {
            Ok(self.devices.clone())
        }

        async fn request_user_media(
            &self,
            _audio: bool,
            _video: bool,
        ) -> Result<MediaStream, PlatformError> {
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or(Err(PlatformError::Other("script exhausted".into())))?;
            let stream = MediaStream::new(
                "probe",
                vec![
                    MediaTrack::new("a", TrackKind::Audio),
                    MediaTrack::new("v", TrackKind::Video),
                ],
            );
            self.probes.lock().push(stream.clone());
            Ok(stream)
        }

        async fn request_display_media(
            &self,
            _video: bool,
            _audio: bool,
        ) -> Result<MediaStream, PlatformError> {
            unimplemented!("not used by the poller")
        }
    }

    fn poller(platform: Arc<ScriptedPlatform>) -> PermissionPoller {
        PermissionPoller::new(platform, Duration::from_millis(250))
    }

    #[tokio::test]
    async fn test_grant_releases_probe_and_enumerates() {
        let platform = Arc::new(ScriptedPlatform::new(vec![Ok(())]));
        let devices = poller(platform.clone()).poll(Some(1)).await.unwrap();

        assert_eq!(devices.len(), 1);
        let probes = platform.probes.lock();
        assert_eq!(probes.len(), 1);
        assert!(probes[0].is_fully_ended(), "probe stream left open");
    }

    #[tokio::test]
    async fn test_single_attempt_denial_carries_cause() {
        let denial = PlatformError::PermissionDenied("camera".into());
        let platform = Arc::new(ScriptedPlatform::new(vec![Err(denial.clone())]));

        let failure = poller(platform).poll(Some(1)).await.unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.cause, denial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_attempts_report_last_cause() {
        let platform = Arc::new(ScriptedPlatform::new(vec![
            Err(PlatformError::PermissionDenied("first".into())),
            Err(PlatformError::PermissionDenied("second".into())),
            Err(PlatformError::PermissionDenied("third".into())),
        ]));

        let failure = poller(platform).poll(Some(3)).await.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.cause, PlatformError::PermissionDenied("third".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_poll_survives_denials() {
        let platform = Arc::new(ScriptedPlatform::new(vec![
            Err(PlatformError::PermissionDenied("not yet".into())),
            Err(PlatformError::PermissionDenied("still no".into())),
            Ok(()),
        ]));

        let devices = poller(platform.clone()).poll(None).await.unwrap();
        assert_eq!(devices.len(), 1);
        // Probe from the granting attempt is released too
        assert!(platform.probes.lock().iter().all(|s| s.is_fully_ended()));
    }
}
