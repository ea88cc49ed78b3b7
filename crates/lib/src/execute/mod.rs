//! Transaction execution.
//!
//! This module provides the entry point for applying an ordered list of
//! operations as one unit. It handles:
//! - Strictly sequential application in the given order
//! - Reverse-order unwind of applied operations on the first failure
//! - Reverse-order clean of every handle once all operations succeeded
//! - Best-effort reporting of unwind and clean failures
//!
//! # Submodules
//!
//! - [`cmd`] - process execution adapter used by command-style operations
//! - [`report`] - the diagnostics sink

pub mod cmd;
pub mod report;

use std::sync::Arc;

use tracing::{error, info};

use crate::state::{Operation, Reversal, StateError};

pub use cmd::{CommandSpec, run_command};
pub use report::{Reporter, TracingReporter};

/// Applies operations as a transaction.
///
/// Operations run one at a time; later ones may rely on what earlier ones
/// put on disk. There is no locking, retry, timeout or cancellation.
#[derive(Clone)]
pub struct Runner {
  reporter: Arc<dyn Reporter>,
}

impl Default for Runner {
  fn default() -> Self {
    Self::with_reporter(Arc::new(TracingReporter))
  }
}

impl std::fmt::Debug for Runner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Runner").finish_non_exhaustive()
  }
}

impl Runner {
  /// A runner reporting through `tracing`.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_reporter(reporter: Arc<dyn Reporter>) -> Self {
    Self { reporter }
  }

  /// Apply `ops` in order.
  ///
  /// On the first failure the operations applied so far are rolled back,
  /// most recent first, and that failure is returned. Operations after the
  /// failing one are never attempted. Rollback errors do not stop the
  /// unwind and are only reported.
  ///
  /// When every operation succeeds each handle is cleaned, most recent
  /// first. Clean errors are reported and do not affect the result.
  pub fn apply(&self, ops: &[Box<dyn Operation>]) -> Result<(), StateError> {
    info!(count = ops.len(), "starting transaction");

    let mut applied: Vec<(String, Box<dyn Reversal>)> = Vec::with_capacity(ops.len());

    for op in ops {
      let desc = op.to_string();
      match op.apply() {
        Ok(handle) => {
          self.reporter.applied(&desc);
          applied.push((desc, handle));
        }
        Err(err) => {
          error!(op = %desc, error = %err, "operation failed");
          self.unwind(applied);
          return Err(err);
        }
      }
    }

    self.clean(applied);
    info!(count = ops.len(), "transaction complete");
    Ok(())
  }

  fn unwind(&self, applied: Vec<(String, Box<dyn Reversal>)>) {
    if applied.is_empty() {
      return;
    }

    info!(count = applied.len(), "rolling back applied operations");

    for (desc, handle) in applied.into_iter().rev() {
      match handle.rollback() {
        Ok(()) => self.reporter.rolled_back(&desc),
        Err(err) => self.reporter.rollback_failed(&desc, &err),
      }
    }

    info!("rollback complete");
  }

  fn clean(&self, applied: Vec<(String, Box<dyn Reversal>)>) {
    for (desc, handle) in applied.into_iter().rev() {
      match handle.clean() {
        Ok(()) => self.reporter.cleaned(&desc),
        Err(err) => self.reporter.clean_failed(&desc, &err),
      }
    }
  }
}

/// Apply `ops` with a default [`Runner`].
pub fn apply_all(ops: &[Box<dyn Operation>]) -> Result<(), StateError> {
  Runner::default().apply(ops)
}
