//! Shared utilities

pub mod error;

pub use error::{ErrorInfo, ErrorKind, SessionError, SessionResult};
