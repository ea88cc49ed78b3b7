use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A transaction described as JSON.
///
/// ```json
/// {
///   "shell": "/bin/bash",
///   "steps": [
///     { "type": "make_dir", "path": "/srv/app", "mode": "755" },
///     { "type": "write_file", "path": "/srv/app/app.conf", "content": "port = 80\n" },
///     { "type": "symlink", "target": "/srv/app", "link": "/srv/current" },
///     { "type": "reload", "service": "nginx" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
  /// Shell used for `exec` steps given as `cmd`.
  #[serde(default)]
  pub shell: Option<String>,
  pub steps: Vec<StepDef>,
}

/// One step of a plan; maps onto one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDef {
  WriteFile {
    path: PathBuf,
    content: String,
    #[serde(default)]
    mode: Option<String>,
  },
  MakeDir {
    path: PathBuf,
    #[serde(default)]
    mode: Option<String>,
  },
  Symlink {
    target: PathBuf,
    link: PathBuf,
  },
  /// Either `cmd` (run by the shell) or `argv`, not both.
  Exec {
    #[serde(default)]
    cmd: Option<String>,
    #[serde(default)]
    argv: Option<Vec<String>>,
    #[serde(default)]
    undo: Option<String>,
  },
  /// `validate` and `reload` are split on whitespace. With only
  /// `service: "nginx"` the nginx preset is used.
  Reload {
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    validate: Option<String>,
    #[serde(default)]
    reload: Option<String>,
  },
}

/// Errors that can occur while loading a plan.
#[derive(Debug, Error)]
pub enum PlanError {
  /// Failed to read the plan file.
  #[error("failed to read plan {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to parse plan JSON.
  #[error("failed to parse plan: {0}")]
  Parse(#[from] serde_json::Error),

  /// A mode that is not an octal permission value.
  #[error("step {step}: invalid mode {mode:?}")]
  InvalidMode { step: usize, mode: String },

  /// A step that cannot be turned into an operation.
  #[error("step {step}: {reason}")]
  InvalidStep { step: usize, reason: String },
}
