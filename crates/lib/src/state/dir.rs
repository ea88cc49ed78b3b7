//! MakeDir: ensure a directory exists.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use crate::consts::DEFAULT_DIR_MODE;
use crate::state::{Mode, Noop, Operation, Reversal, StateError};

/// Ensure `path` is a directory, creating missing ancestors.
///
/// An existing directory is left alone and yields a no-op handle. Rollback
/// of a created directory removes only the leaf; ancestors created on the
/// way stay behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeDir {
  pub path: PathBuf,
  /// Permission bits for created directories. Defaults to `0o755`.
  pub mode: Option<u32>,
}

impl MakeDir {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      mode: None,
    }
  }

  pub fn with_mode(mut self, mode: u32) -> Self {
    self.mode = Some(mode);
    self
  }

  pub fn mode(&self) -> u32 {
    self.mode.unwrap_or(DEFAULT_DIR_MODE)
  }
}

impl Operation for MakeDir {
  fn apply(&self) -> Result<Box<dyn Reversal>, StateError> {
    match fs::metadata(&self.path) {
      Ok(metadata) if metadata.is_dir() => {
        debug!(path = %self.path.display(), "directory already exists");
        return Ok(Noop::boxed());
      }
      Ok(_) => return Err(StateError::NotADirectory(self.path.clone())),
      Err(err) if err.kind() == io::ErrorKind::NotFound => {}
      Err(err) => return Err(StateError::io("stat", &self.path, err)),
    }

    create_dir_all(&self.path, self.mode()).map_err(|e| StateError::io("create directory", &self.path, e))?;
    debug!(path = %self.path.display(), "directory created");

    Ok(Box::new(MakeDirRevert {
      path: self.path.clone(),
    }))
  }
}

impl fmt::Display for MakeDir {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "MakeDir({}, {})", self.path.display(), Mode(self.mode()))
  }
}

#[cfg(unix)]
fn create_dir_all(path: &std::path::Path, mode: u32) -> io::Result<()> {
  use std::os::unix::fs::DirBuilderExt;
  fs::DirBuilder::new().recursive(true).mode(mode).create(path)
}

#[cfg(not(unix))]
fn create_dir_all(path: &std::path::Path, _mode: u32) -> io::Result<()> {
  fs::DirBuilder::new().recursive(true).create(path)
}

#[derive(Debug)]
struct MakeDirRevert {
  path: PathBuf,
}

impl Reversal for MakeDirRevert {
  fn rollback(self: Box<Self>) -> Result<(), StateError> {
    fs::remove_dir(&self.path).map_err(|e| StateError::io("remove directory", &self.path, e))
  }

  fn clean(self: Box<Self>) -> Result<(), StateError> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn creates_and_rolls_back_directory() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("d");

    let handle = MakeDir::new(&path).apply().unwrap();
    assert!(!handle.is_noop());
    assert!(path.is_dir());

    handle.rollback().unwrap();
    assert!(!path.exists());
  }

  #[test]
  fn existing_directory_is_a_noop() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("d");
    let op = MakeDir::new(&path).with_mode(0o755);

    let first = op.apply().unwrap();
    let second = op.apply().unwrap();
    assert!(second.is_noop());

    second.rollback().unwrap();
    assert!(path.is_dir());
    first.clean().unwrap();
    assert!(path.is_dir());
  }

  #[cfg(unix)]
  #[test]
  fn noop_rollback_keeps_original_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let root = TempDir::new().unwrap();
    let path = root.path().join("d");
    fs::create_dir(&path).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o700)).unwrap();

    MakeDir::new(&path).with_mode(0o755).apply().unwrap().rollback().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o700);
  }

  #[test]
  fn file_in_the_way_is_refused() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("f");
    fs::write(&path, "x").unwrap();

    let err = MakeDir::new(&path).apply().err().unwrap();
    assert!(matches!(err, StateError::NotADirectory(_)));
    assert!(err.is_precondition());
    assert!(path.is_file());
  }

  #[test]
  fn rollback_removes_only_the_leaf() {
    let root = TempDir::new().unwrap();
    let parent = root.path().join("a").join("b");
    let leaf = parent.join("c");

    let handle = MakeDir::new(&leaf).apply().unwrap();
    assert!(leaf.is_dir());

    handle.rollback().unwrap();
    assert!(!leaf.exists());
    assert!(parent.is_dir());
  }

  #[cfg(unix)]
  #[test]
  fn invalid_path_fails() {
    let err = MakeDir::new("/nonexistent/../bad\0path").apply().err().unwrap();
    assert!(matches!(err, StateError::Io { .. }));
  }

  #[test]
  fn description_shows_path_and_mode() {
    assert_eq!(MakeDir::new("/srv/www").to_string(), "MakeDir(/srv/www, 755)");
    assert_eq!(
      MakeDir::new("/srv/private").with_mode(0o700).to_string(),
      "MakeDir(/srv/private, 700)"
    );
  }
}
