//! User-media permission acquisition

pub mod poller;

pub use poller::{PermissionPoller, PollFailure};
