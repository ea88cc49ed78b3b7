//! Process execution adapter.
//!
//! Runs an external command with standard output streamed straight to ours
//! and standard error captured, so a failure can carry the diagnostic text.

use std::fmt;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::state::StateError;

/// A command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
  /// Program followed by its arguments, passed as-is.
  Argv(Vec<String>),
  /// A script handed to a shell.
  Shell { script: String, shell: Option<String> },
}

impl CommandSpec {
  pub fn argv<I, S>(args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    CommandSpec::Argv(args.into_iter().map(Into::into).collect())
  }

  /// Run `script` with the default shell.
  pub fn shell(script: impl Into<String>) -> Self {
    CommandSpec::Shell {
      script: script.into(),
      shell: None,
    }
  }

  pub fn shell_with(script: impl Into<String>, shell: impl Into<String>) -> Self {
    CommandSpec::Shell {
      script: script.into(),
      shell: Some(shell.into()),
    }
  }

  /// Split `line` on whitespace into an argument vector.
  ///
  /// No quoting or escaping is understood; use [`CommandSpec::shell`] for
  /// anything that needs it.
  pub fn split(line: &str) -> Self {
    CommandSpec::Argv(line.split_whitespace().map(str::to_string).collect())
  }

  fn to_command(&self) -> Result<Command, StateError> {
    match self {
      CommandSpec::Argv(args) => {
        let (program, rest) = args.split_first().ok_or(StateError::EmptyCommand)?;
        let mut command = Command::new(program);
        command.args(rest);
        Ok(command)
      }
      CommandSpec::Shell { script, shell } => {
        let (shell_cmd, shell_args) = get_shell(shell.as_deref());
        let mut command = Command::new(shell_cmd);
        command.args(shell_args).arg(script);
        Ok(command)
      }
    }
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CommandSpec::Argv(args) => write!(f, "{}", args.join(" ")),
      CommandSpec::Shell { script, .. } => write!(f, "{}", script.trim()),
    }
  }
}

/// Run a command to completion.
///
/// Stdout is inherited, stderr is captured. A zero exit status with output
/// on stderr still succeeds; the text is printed as information. A launch
/// failure or non-zero exit returns an error holding the captured stderr.
pub fn run_command(spec: &CommandSpec) -> Result<(), StateError> {
  let cmd = spec.to_string();
  info!(cmd = %cmd, "executing command");

  let mut command = spec.to_command()?;
  command
    .stdin(Stdio::null())
    .stdout(Stdio::inherit())
    .stderr(Stdio::piped());

  let output = command.output().map_err(|source| StateError::Spawn {
    cmd: cmd.clone(),
    source,
  })?;

  let stderr = String::from_utf8_lossy(&output.stderr);

  if !output.status.success() {
    return Err(StateError::CmdFailed {
      cmd,
      code: output.status.code(),
      stderr: stderr.trim().to_string(),
    });
  }

  if !stderr.is_empty() {
    debug!(cmd = %cmd, stderr = %stderr, "command stderr");
    println!("{}", stderr.trim_end());
  }

  Ok(())
}

/// Get the shell command and arguments for the current platform.
///
/// An explicit shell wins and gets the flag its family expects; otherwise
/// `/bin/sh -c` on Unix and PowerShell on Windows. `$SHELL` is not consulted,
/// since interactive shells may source profile files.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::shell_cmd;
  use tempfile::TempDir;

  #[test]
  fn split_tokenizes_on_whitespace() {
    assert_eq!(
      CommandSpec::split("nginx  -s reload"),
      CommandSpec::argv(["nginx", "-s", "reload"])
    );
  }

  #[test]
  fn empty_argv_is_rejected() {
    let err = run_command(&CommandSpec::split("   ")).unwrap_err();
    assert!(matches!(err, StateError::EmptyCommand));
  }

  #[test]
  fn successful_command() {
    let (program, args) = shell_cmd("exit 0");
    let mut argv = vec![program.to_string()];
    argv.extend(args);
    run_command(&CommandSpec::Argv(argv)).unwrap();
  }

  #[test]
  fn shell_command_has_side_effects() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("marker");

    #[cfg(unix)]
    let script = format!("echo hi > '{}'", marker.display());
    #[cfg(windows)]
    let script = format!("Set-Content -Path '{}' -Value hi", marker.display());

    run_command(&CommandSpec::shell(script)).unwrap();
    assert!(marker.exists());
  }

  #[cfg(unix)]
  #[test]
  fn failure_carries_exit_code_and_stderr() {
    let err = run_command(&CommandSpec::shell("echo broken config >&2; exit 3")).unwrap_err();
    match err {
      StateError::CmdFailed { code, stderr, .. } => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "broken config");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[cfg(unix)]
  #[test]
  fn stderr_on_success_is_not_an_error() {
    run_command(&CommandSpec::shell("echo warning >&2")).unwrap();
  }

  #[test]
  fn missing_program_is_a_spawn_error() {
    let err = run_command(&CommandSpec::argv(["/definitely/not/a/program"])).unwrap_err();
    assert!(matches!(err, StateError::Spawn { .. }));
  }

  #[test]
  fn display_joins_argv() {
    assert_eq!(CommandSpec::split("nginx -t").to_string(), "nginx -t");
    assert_eq!(CommandSpec::shell("  systemctl reload nginx \n").to_string(), "systemctl reload nginx");
  }

  #[test]
  fn get_shell_with_override() {
    let (shell, args) = get_shell(Some("/usr/bin/bash"));
    assert_eq!(shell, "/usr/bin/bash");
    assert_eq!(args, vec!["-c"]);
  }

  #[test]
  fn get_shell_with_pwsh_override() {
    let (shell, args) = get_shell(Some("pwsh"));
    assert_eq!(shell, "pwsh");
    assert_eq!(args, vec!["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"]);
  }

  #[test]
  fn get_shell_with_cmd_override() {
    let (shell, args) = get_shell(Some("cmd.exe"));
    assert_eq!(shell, "cmd.exe");
    assert_eq!(args, vec!["/C"]);
  }

  #[cfg(unix)]
  #[test]
  fn get_shell_default() {
    let (shell, args) = get_shell(None);
    assert_eq!(shell, "/bin/sh");
    assert_eq!(args, vec!["-c"]);
  }
}
