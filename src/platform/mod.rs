//! Platform capability abstraction
//!
//! The controller never talks to a concrete capture backend directly; it goes
//! through these traits so any platform binding (or a test fake) can be
//! plugged in.

pub mod stream;
pub mod traits;

pub use stream::{EndedSignal, MediaStream, MediaTrack, TrackKind};
pub use traits::{MediaPlatform, PlatformError, Recorder, RecorderBinder};
