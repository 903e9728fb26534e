//! Session state machine
//!
//! The controller sequences Setup → Initial (Idle / RequestingPreview /
//! Previewing) → Recording → Finished, with a recoverable Error branch. It
//! owns the session context, drives acquisition tasks, and guarantees stream
//! release on every exit path.

pub mod context;
pub mod controller;
pub mod events;
pub mod observer;

pub use context::{PreviewSnapshot, SessionSnapshot};
pub use controller::SessionController;
pub use events::SessionCommand;
pub use observer::{SessionObserver, TracingObserver};
