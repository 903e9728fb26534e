//! Transition observation hooks
//!
//! The core has no ambient side effects of its own; anything that wants to
//! react to transitions or failures (logging, UI bridges, metrics) is
//! injected through this interface.

use crate::session::context::SessionSnapshot;
use crate::utils::error::ErrorInfo;

/// Hooks invoked by the controller as it processes events.
///
/// Called synchronously inside event processing; implementations must not
/// block.
pub trait SessionObserver: Send + Sync {
    fn on_transition(&self, _prev: &SessionSnapshot, _next: &SessionSnapshot) {}

    fn on_error(&self, _error: &ErrorInfo) {}
}

/// Default observer: structured logs through `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_transition(&self, prev: &SessionSnapshot, next: &SessionSnapshot) {
        tracing::info!(from = prev.state_name(), to = next.state_name(), "session transition");
    }

    fn on_error(&self, error: &ErrorInfo) {
        tracing::warn!(kind = ?error.kind, cause = %error.cause, "session error");
    }
}
