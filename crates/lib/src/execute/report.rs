//! Diagnostics sink for the runner.
//!
//! Unwind and clean failures never change what [`Runner::apply`] returns;
//! they are only reported here. The default sink forwards to `tracing`.
//!
//! [`Runner::apply`]: crate::execute::Runner::apply

use tracing::{debug, error, info, warn};

use crate::state::StateError;

/// Receives progress and non-fatal failures from a transaction.
///
/// `op` is the operation's description.
pub trait Reporter: Send + Sync {
  fn applied(&self, op: &str);
  fn rolled_back(&self, op: &str);
  fn rollback_failed(&self, op: &str, err: &StateError);
  fn cleaned(&self, op: &str);
  fn clean_failed(&self, op: &str, err: &StateError);
}

/// Process-wide default: structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
  fn applied(&self, op: &str) {
    info!(op = %op, "applied");
  }

  fn rolled_back(&self, op: &str) {
    info!(op = %op, "rolled back");
  }

  fn rollback_failed(&self, op: &str, err: &StateError) {
    error!(op = %op, error = %err, "rollback failed");
  }

  fn cleaned(&self, op: &str) {
    debug!(op = %op, "cleaned");
  }

  fn clean_failed(&self, op: &str, err: &StateError) {
    warn!(op = %op, error = %err, "clean failed");
  }
}
