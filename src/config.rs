//! Controller configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for one controller instance.
///
/// Defaults match the shipped behavior: a single permission attempt during
/// Setup, one-second retry cadence in the Error state, screen-only recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Permission attempts during Setup before giving up (minimum 1)
    pub setup_attempts: u32,

    /// Delay between permission attempts, also the Error-state poll cadence
    pub retry_interval_ms: u64,

    /// Acquire a webcam/microphone stream when recording starts
    pub capture_webcam: bool,

    /// Capacity of the controller's event queue
    pub command_queue_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            setup_attempts: 1,
            retry_interval_ms: 1000,
            capture_webcam: false,
            command_queue_depth: 32,
        }
    }
}

impl SessionConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"captureWebcam": true}"#).unwrap();
        assert!(config.capture_webcam);
        assert_eq!(config.setup_attempts, 1);
        assert_eq!(config.retry_interval(), Duration::from_millis(1000));
    }
}
