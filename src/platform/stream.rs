//! Media stream and track resources
//!
//! Streams are handed out by a `MediaPlatform` implementation. Tracks share
//! state across clones, so stopping any clone ends the track everywhere and
//! wakes every ended-signal subscriber.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Track media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// One media track inside a stream.
///
/// A track is live until stopped (by the owner or the platform); once ended
/// it never becomes live again. `stop` is idempotent.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    ended: Arc<watch::Sender<bool>>,
}

impl MediaTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            id: id.into(),
            kind,
            ended: Arc::new(ended),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// End the track. Safe to call repeatedly; subscribers fire once.
    pub fn stop(&self) {
        self.ended.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.borrow()
    }

    /// Subscribe to this track's end of life.
    pub fn on_ended(&self) -> EndedSignal {
        EndedSignal {
            rx: self.ended.subscribe(),
        }
    }
}

/// One-shot notification that a track has ended.
///
/// Resolves immediately when the track already ended; waiting again on a
/// fresh subscription after the fact yields no second event, just the same
/// resolved status.
#[derive(Debug, Clone)]
pub struct EndedSignal {
    rx: watch::Receiver<bool>,
}

impl EndedSignal {
    /// Wait until the track ends. A dropped track counts as ended.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|ended| *ended).await;
    }

    pub fn is_ended(&self) -> bool {
        *self.rx.borrow()
    }
}

/// A set of tracks acquired together from one capability call.
///
/// Clones share track state; `stop_all` through any clone releases the
/// underlying capture everywhere.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn first_video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    /// Stop every track. Mandatory before abandoning the stream, otherwise a
    /// live camera/microphone/share indicator leaks.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    pub fn is_fully_ended(&self) -> bool {
        self.tracks.iter().all(|t| t.is_ended())
    }
}
