//! Error type shared by operations, reversal handles and the runner.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while applying or reversing an operation.
///
/// The variants fall into the three groups the runner cares about:
/// precondition errors (the operation refused to touch anything),
/// apply errors (the effect itself failed) and, when returned from a
/// reversal handle, unwind errors. See [`StateError::is_precondition`].
#[derive(Debug, Error)]
pub enum StateError {
  /// The path exists but is not a directory.
  #[error("{} exists and is not a directory", .0.display())]
  NotADirectory(PathBuf),

  /// The link path exists but is not a symlink.
  #[error("{} is not a symlink", .0.display())]
  NotASymlink(PathBuf),

  /// A file write targeted a directory.
  #[error("{} is a directory", .0.display())]
  IsADirectory(PathBuf),

  /// A filesystem call failed.
  #[error("failed to {action} {}: {source}", path.display())]
  Io {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Copying the original file aside failed.
  #[error("failed to back up {}: {source}", path.display())]
  Backup {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The command could not be started.
  #[error("failed to run {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: io::Error,
  },

  /// The command ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}: {stderr}")]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  /// An argument vector with no program in it.
  #[error("empty command")]
  EmptyCommand,
}

impl StateError {
  pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
    StateError::Io {
      action,
      path: path.into(),
      source,
    }
  }

  /// True when the operation refused to run because the system was not in
  /// a shape it can act on. Nothing was changed in that case.
  pub fn is_precondition(&self) -> bool {
    matches!(
      self,
      StateError::NotADirectory(_) | StateError::NotASymlink(_) | StateError::IsADirectory(_)
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn precondition_classification() {
    assert!(StateError::NotASymlink(PathBuf::from("/a")).is_precondition());
    assert!(StateError::NotADirectory(PathBuf::from("/a")).is_precondition());
    assert!(StateError::IsADirectory(PathBuf::from("/a")).is_precondition());
    assert!(!StateError::EmptyCommand.is_precondition());
    assert!(
      !StateError::CmdFailed {
        cmd: "false".to_string(),
        code: Some(1),
        stderr: String::new(),
      }
      .is_precondition()
    );
  }

  #[test]
  fn io_error_message_names_path_and_action() {
    let err = StateError::io(
      "remove",
      "/etc/motd",
      io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    );
    assert_eq!(err.to_string(), "failed to remove /etc/motd: denied");
  }

  #[test]
  fn cmd_failed_message_carries_stderr() {
    let err = StateError::CmdFailed {
      cmd: "nginx -t".to_string(),
      code: Some(1),
      stderr: "syntax error".to_string(),
    };
    assert_eq!(
      err.to_string(),
      "command failed with exit code Some(1): nginx -t: syntax error"
    );
  }
}
