//! Display capture acquisition

pub mod provider;

pub use provider::{CaptureFailure, CaptureHandle, CaptureProvider};
