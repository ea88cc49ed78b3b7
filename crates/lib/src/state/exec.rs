//! Command-style operations.
//!
//! A command has no generic inverse, so these return a no-op handle unless
//! the caller supplies an explicit undo command.

use std::fmt;

use tracing::debug;

use crate::execute::cmd::{CommandSpec, run_command};
use crate::state::{Noop, Operation, Reversal, StateError};

/// Run a command, optionally paired with a command that reverses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exec {
  pub command: CommandSpec,
  /// Run on rollback. Without it rollback does nothing.
  pub undo: Option<CommandSpec>,
}

impl Exec {
  pub fn new(command: CommandSpec) -> Self {
    Self { command, undo: None }
  }

  pub fn with_undo(mut self, undo: CommandSpec) -> Self {
    self.undo = Some(undo);
    self
  }
}

impl Operation for Exec {
  fn apply(&self) -> Result<Box<dyn Reversal>, StateError> {
    run_command(&self.command)?;
    match &self.undo {
      Some(undo) => Ok(Box::new(ExecRevert { undo: undo.clone() })),
      None => Ok(Noop::boxed()),
    }
  }
}

impl fmt::Display for Exec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Exec({})", self.command)
  }
}

#[derive(Debug)]
struct ExecRevert {
  undo: CommandSpec,
}

impl Reversal for ExecRevert {
  fn rollback(self: Box<Self>) -> Result<(), StateError> {
    debug!(undo = %self.undo, "running undo command");
    run_command(&self.undo)
  }

  fn clean(self: Box<Self>) -> Result<(), StateError> {
    Ok(())
  }
}

/// Validate a service's configuration, then reload it.
///
/// The reload is never attempted when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReload {
  pub service: String,
  pub validate: CommandSpec,
  pub reload: CommandSpec,
}

impl ServiceReload {
  pub fn new(service: impl Into<String>, validate: CommandSpec, reload: CommandSpec) -> Self {
    Self {
      service: service.into(),
      validate,
      reload,
    }
  }

  /// `nginx -t` followed by `nginx -s reload`.
  pub fn nginx() -> Self {
    Self::new(
      "nginx",
      CommandSpec::split("nginx -t"),
      CommandSpec::split("nginx -s reload"),
    )
  }
}

impl Operation for ServiceReload {
  fn apply(&self) -> Result<Box<dyn Reversal>, StateError> {
    run_command(&self.validate)?;
    run_command(&self.reload)?;
    Ok(Noop::boxed())
  }
}

impl fmt::Display for ServiceReload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ServiceReload({})", self.service)
  }
}
