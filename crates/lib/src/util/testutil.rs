//! Test utilities for statetx-lib.
//!
//! Scripted operations that record what the runner does to them, a
//! reporter that keeps events in memory, and cross-platform shell helpers.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::execute::Reporter;
use crate::state::{Operation, Reversal, StateError};

/// Ordered record of calls shared between scripted operations.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
  pub fn push(&self, entry: String) {
    self.0.lock().unwrap().push(entry);
  }

  pub fn entries(&self) -> Vec<String> {
    self.0.lock().unwrap().clone()
  }
}

/// Operation whose outcome is decided up front.
pub struct ScriptedOp {
  name: String,
  fails: bool,
  rollback_fails: bool,
  clean_fails: bool,
  log: EventLog,
}

impl ScriptedOp {
  pub fn ok(name: &str, log: &EventLog) -> Self {
    Self {
      name: name.to_string(),
      fails: false,
      rollback_fails: false,
      clean_fails: false,
      log: log.clone(),
    }
  }

  pub fn failing(name: &str, log: &EventLog) -> Self {
    Self {
      fails: true,
      ..Self::ok(name, log)
    }
  }

  pub fn rollback_fails(mut self) -> Self {
    self.rollback_fails = true;
    self
  }

  pub fn clean_fails(mut self) -> Self {
    self.clean_fails = true;
    self
  }

  fn error(&self, what: &str) -> StateError {
    StateError::CmdFailed {
      cmd: self.name.clone(),
      code: Some(1),
      stderr: format!("scripted {what}"),
    }
  }
}

impl Operation for ScriptedOp {
  fn apply(&self) -> Result<Box<dyn Reversal>, StateError> {
    self.log.push(format!("apply:{}", self.name));
    if self.fails {
      return Err(self.error("failure"));
    }
    Ok(Box::new(ScriptedRevert {
      name: self.name.clone(),
      rollback_err: self.rollback_fails.then(|| self.error("rollback failure")),
      clean_err: self.clean_fails.then(|| self.error("clean failure")),
      log: self.log.clone(),
    }))
  }
}

impl fmt::Display for ScriptedOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Scripted({})", self.name)
  }
}

struct ScriptedRevert {
  name: String,
  rollback_err: Option<StateError>,
  clean_err: Option<StateError>,
  log: EventLog,
}

impl Reversal for ScriptedRevert {
  fn rollback(self: Box<Self>) -> Result<(), StateError> {
    self.log.push(format!("rollback:{}", self.name));
    match self.rollback_err {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn clean(self: Box<Self>) -> Result<(), StateError> {
    self.log.push(format!("clean:{}", self.name));
    match self.clean_err {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }
}

/// Reporter that records `kind:name` for each event, where `name` is the
/// text inside `Scripted(...)` when present.
#[derive(Debug, Default)]
pub struct MemoryReporter {
  events: Mutex<Vec<String>>,
}

impl MemoryReporter {
  pub fn events(&self) -> Vec<String> {
    self.events.lock().unwrap().clone()
  }

  fn record(&self, kind: &str, op: &str) {
    let name = op
      .strip_prefix("Scripted(")
      .and_then(|rest| rest.strip_suffix(')'))
      .unwrap_or(op);
    self.events.lock().unwrap().push(format!("{kind}:{name}"));
  }
}

impl Reporter for MemoryReporter {
  fn applied(&self, op: &str) {
    self.record("applied", op);
  }

  fn rolled_back(&self, op: &str) {
    self.record("rolled_back", op);
  }

  fn rollback_failed(&self, op: &str, _err: &StateError) {
    self.record("rollback_failed", op);
  }

  fn cleaned(&self, op: &str) {
    self.record("cleaned", op);
  }

  fn clean_failed(&self, op: &str, _err: &StateError) {
    self.record("clean_failed", op);
  }
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}
