//! Operations and their reversal handles.
//!
//! An [`Operation`] is one declarative change to the system. Applying it
//! either fails with no visible effect or returns a [`Reversal`] that knows
//! how to undo exactly what was done.
//!
//! # Reversal lifecycle
//!
//! A handle is finalized exactly once, by one of:
//! - `rollback()` - a later operation in the transaction failed; undo the effect
//! - `clean()` - the whole transaction succeeded; drop any backup material
//!
//! Both take `self: Box<Self>`, so a cleaned handle cannot be rolled back.
//!
//! # Submodules
//!
//! - [`file`] - write a file with backup and restore
//! - [`dir`] - ensure a directory exists
//! - [`symlink`] - point a symlink at a target
//! - [`exec`] - run commands, including validate-then-reload composites

pub mod dir;
pub mod exec;
pub mod file;
pub mod symlink;
mod types;

pub use dir::MakeDir;
pub use exec::{Exec, ServiceReload};
pub use file::WriteFile;
pub use symlink::Symlink;
pub use types::*;

use std::fmt;

/// One unit of change.
///
/// `Display` is the audit description logged by the runner.
pub trait Operation: fmt::Display {
  /// Perform the change.
  ///
  /// On error nothing visible may be left behind; an operation that cannot
  /// guarantee this must fail rather than return a handle it cannot honor.
  fn apply(&self) -> Result<Box<dyn Reversal>, StateError>;
}

/// Undo or finalize an applied operation.
pub trait Reversal {
  /// Restore the state that existed before the operation was applied.
  fn rollback(self: Box<Self>) -> Result<(), StateError>;

  /// Discard backup material once the transaction has succeeded.
  fn clean(self: Box<Self>) -> Result<(), StateError>;

  /// True for handles that do nothing on rollback or clean.
  fn is_noop(&self) -> bool {
    false
  }
}

/// Handle for an operation that found nothing to change.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Noop {
  pub fn boxed() -> Box<dyn Reversal> {
    Box::new(Noop)
  }
}

impl Reversal for Noop {
  fn rollback(self: Box<Self>) -> Result<(), StateError> {
    Ok(())
  }

  fn clean(self: Box<Self>) -> Result<(), StateError> {
    Ok(())
  }

  fn is_noop(&self) -> bool {
    true
  }
}

/// Formats a mode as three octal digits, the way descriptions show it.
pub(crate) struct Mode(pub u32);

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:3o}", self.0 & 0o7777)
  }
}
