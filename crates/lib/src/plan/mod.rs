//! Plan files: transactions described as JSON.
//!
//! A plan is parsed into [`StepDef`]s and then into boxed operations, in
//! file order, ready for [`crate::execute::Runner::apply`].

mod types;

pub use types::*;

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::execute::CommandSpec;
use crate::state::{Exec, MakeDir, Operation, ServiceReload, Symlink, WriteFile};

impl PlanFile {
  pub fn load(path: &Path) -> Result<Self, PlanError> {
    let content = fs::read_to_string(path).map_err(|source| PlanError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let plan = Self::from_json(&content)?;
    debug!(path = %path.display(), steps = plan.steps.len(), "plan loaded");
    Ok(plan)
  }

  pub fn from_json(content: &str) -> Result<Self, PlanError> {
    Ok(serde_json::from_str(content)?)
  }

  /// Build the operations, in step order.
  ///
  /// Steps are numbered from 1 in errors.
  pub fn into_operations(self) -> Result<Vec<Box<dyn Operation>>, PlanError> {
    let shell = self.shell;
    self
      .steps
      .into_iter()
      .enumerate()
      .map(|(idx, step)| step.into_operation(idx + 1, shell.as_deref()))
      .collect()
  }
}

impl StepDef {
  fn into_operation(self, step: usize, shell: Option<&str>) -> Result<Box<dyn Operation>, PlanError> {
    let shell_cmd = |script: String| match shell {
      Some(shell) => CommandSpec::shell_with(script, shell),
      None => CommandSpec::shell(script),
    };

    match self {
      StepDef::WriteFile { path, content, mode } => {
        let mut op = WriteFile::new(path, content);
        op.mode = parse_mode(step, mode)?;
        Ok(Box::new(op))
      }
      StepDef::MakeDir { path, mode } => {
        let mut op = MakeDir::new(path);
        op.mode = parse_mode(step, mode)?;
        Ok(Box::new(op))
      }
      StepDef::Symlink { target, link } => Ok(Box::new(Symlink::new(target, link))),
      StepDef::Exec { cmd, argv, undo } => {
        let command = match (cmd, argv) {
          (Some(cmd), None) => shell_cmd(cmd),
          (None, Some(argv)) if !argv.is_empty() => CommandSpec::Argv(argv),
          (None, _) => return Err(invalid(step, "exec needs `cmd` or a non-empty `argv`")),
          (Some(_), Some(_)) => return Err(invalid(step, "exec takes `cmd` or `argv`, not both")),
        };
        let mut op = Exec::new(command);
        op.undo = undo.map(shell_cmd);
        Ok(Box::new(op))
      }
      StepDef::Reload {
        service,
        validate,
        reload,
      } => match (service, validate, reload) {
        (_, Some(validate), Some(reload)) if validate.trim().is_empty() || reload.trim().is_empty() => {
          Err(invalid(step, "reload `validate` and `reload` must not be empty"))
        }
        (service, Some(validate), Some(reload)) => Ok(Box::new(ServiceReload::new(
          service.unwrap_or_else(|| "service".to_string()),
          CommandSpec::split(&validate),
          CommandSpec::split(&reload),
        ))),
        (Some(service), None, None) if service == "nginx" => Ok(Box::new(ServiceReload::nginx())),
        _ => Err(invalid(step, "reload needs both `validate` and `reload`")),
      },
    }
  }
}

fn invalid(step: usize, reason: &str) -> PlanError {
  PlanError::InvalidStep {
    step,
    reason: reason.to_string(),
  }
}

/// Parse an octal mode such as `644`, `0755` or `0o600`.
fn parse_mode(step: usize, mode: Option<String>) -> Result<Option<u32>, PlanError> {
  let Some(mode) = mode else {
    return Ok(None);
  };
  let digits = mode.strip_prefix("0o").unwrap_or(&mode);
  match u32::from_str_radix(digits, 8) {
    Ok(value) if !digits.is_empty() && value <= 0o7777 => Ok(Some(value)),
    _ => Err(PlanError::InvalidMode { step, mode }),
  }
}
