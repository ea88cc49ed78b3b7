//! WriteFile: replace a file's content, keeping a backup for rollback.
//!
//! Before anything is written the current content (if any) is copied to a
//! uniquely named backup file. The new body is staged next to the target and
//! renamed over it, so a failed write leaves the old content in place.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::{debug, warn};

use crate::consts::{BACKUP_PREFIX, DEFAULT_FILE_MODE, STAGING_PREFIX};
use crate::platform::paths::backup_dir;
use crate::state::{Mode, Operation, Reversal, StateError};

/// Ensure `path` holds exactly `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFile {
  pub path: PathBuf,
  pub content: Vec<u8>,
  /// Permission bits of the written file. Defaults to `0o644`.
  pub mode: Option<u32>,
  /// Where the backup of the previous content goes. Defaults to
  /// [`backup_dir`].
  pub backup_dir: Option<PathBuf>,
}

impl WriteFile {
  pub fn new(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
    Self {
      path: path.into(),
      content: content.into(),
      mode: None,
      backup_dir: None,
    }
  }

  pub fn with_mode(mut self, mode: u32) -> Self {
    self.mode = Some(mode);
    self
  }

  pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.backup_dir = Some(dir.into());
    self
  }

  pub fn mode(&self) -> u32 {
    self.mode.unwrap_or(DEFAULT_FILE_MODE)
  }
}

impl Operation for WriteFile {
  fn apply(&self) -> Result<Box<dyn Reversal>, StateError> {
    let target = resolve_target(&self.path)?;
    let backup_dir = self.backup_dir.clone().unwrap_or_else(backup_dir);

    let revert = WriteFileRevert::capture(&target, &backup_dir)?;
    let written = write_staged(&target, &self.content, self.mode(), revert.owner);
    finish(revert, written)
  }
}

impl fmt::Display for WriteFile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "WriteFile({}, {})", self.path.display(), Mode(self.mode()))
  }
}

/// Hand out the handle, or drop the backup if the write itself failed.
fn finish(revert: WriteFileRevert, written: Result<(), StateError>) -> Result<Box<dyn Reversal>, StateError> {
  match written {
    Ok(()) => Ok(Box::new(revert)),
    Err(err) => {
      if let Err(clean_err) = Box::new(revert).clean() {
        warn!(error = %clean_err, "failed to discard backup after write failure");
      }
      Err(err)
    }
  }
}

/// Symlink hops followed before giving up, matching Linux's `ELOOP` limit.
const MAX_LINK_HOPS: usize = 40;

/// Follow symlinks at `path` so the write lands on the file they name.
///
/// Each link in a chain is read in turn, so a dangling chain resolves to
/// its final missing path and no intermediate link is ever replaced.
fn resolve_target(path: &Path) -> Result<PathBuf, StateError> {
  let mut current = path.to_path_buf();

  for _ in 0..MAX_LINK_HOPS {
    match fs::symlink_metadata(&current) {
      Ok(metadata) if metadata.file_type().is_symlink() => {}
      Ok(_) => return Ok(current),
      Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(current),
      Err(err) => return Err(StateError::io("stat", &current, err)),
    }

    let dest = fs::read_link(&current).map_err(|e| StateError::io("read link", &current, e))?;
    current = match current.parent() {
      Some(parent) if dest.is_relative() => parent.join(dest),
      _ => dest,
    };
  }

  Err(StateError::io(
    "resolve",
    path,
    io::Error::other("too many levels of symbolic links"),
  ))
}

/// Write `content` to a sibling staging file, then rename it over `path`.
///
/// The staged file takes `owner` before the rename, so replacing a file
/// keeps its uid and gid.
fn write_staged(path: &Path, content: &[u8], mode: u32, owner: Option<Owner>) -> Result<(), StateError> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };

  let mut staged = Builder::new()
    .prefix(STAGING_PREFIX)
    .tempfile_in(dir)
    .map_err(|e| StateError::io("create staging file for", path, e))?;

  staged
    .write_all(content)
    .map_err(|e| StateError::io("write", path, e))?;
  if let Some(owner) = owner {
    owner
      .apply_to(staged.as_file())
      .map_err(|e| StateError::io("preserve ownership of", path, e))?;
  }
  set_mode(staged.as_file(), mode).map_err(|e| StateError::io("set permissions on", path, e))?;
  staged
    .as_file()
    .sync_all()
    .map_err(|e| StateError::io("sync", path, e))?;

  staged
    .persist(path)
    .map_err(|e| StateError::io("replace", path, e.error))?;

  debug!(path = %path.display(), bytes = content.len(), "file written");
  Ok(())
}

#[cfg(unix)]
fn set_mode(file: &File, mode: u32) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: u32) -> io::Result<()> {
  Ok(())
}

/// uid and gid of the file being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Owner {
  uid: u32,
  gid: u32,
}

impl Owner {
  #[cfg(unix)]
  fn of(metadata: &fs::Metadata) -> Option<Self> {
    use std::os::unix::fs::MetadataExt;
    Some(Self {
      uid: metadata.uid(),
      gid: metadata.gid(),
    })
  }

  #[cfg(not(unix))]
  fn of(_metadata: &fs::Metadata) -> Option<Self> {
    None
  }

  /// Chown `file` unless it already has this owner, so unprivileged
  /// writes to one's own files never need `CAP_CHOWN`.
  #[cfg(unix)]
  fn apply_to(self, file: &File) -> io::Result<()> {
    use std::os::unix::fs::{MetadataExt, fchown};
    let current = file.metadata()?;
    if current.uid() == self.uid && current.gid() == self.gid {
      return Ok(());
    }
    fchown(file, Some(self.uid), Some(self.gid))
  }

  #[cfg(not(unix))]
  fn apply_to(self, _file: &File) -> io::Result<()> {
    Ok(())
  }
}

/// Reversal for [`WriteFile`].
///
/// `backup == None` means no file existed before: rollback deletes the
/// target and there is nothing to clean. The backup carries the original
/// owner and mode, so renaming it back restores both.
#[derive(Debug)]
struct WriteFileRevert {
  path: PathBuf,
  backup: Option<PathBuf>,
  owner: Option<Owner>,
}

impl WriteFileRevert {
  fn capture(path: &Path, backup_dir: &Path) -> Result<Self, StateError> {
    let metadata = match fs::metadata(path) {
      Ok(metadata) => metadata,
      Err(err) if err.kind() == io::ErrorKind::NotFound => {
        return Ok(Self {
          path: path.to_path_buf(),
          backup: None,
          owner: None,
        });
      }
      Err(err) => return Err(StateError::io("stat", path, err)),
    };

    if metadata.is_dir() {
      return Err(StateError::IsADirectory(path.to_path_buf()));
    }

    let backup_err = |source: io::Error| StateError::Backup {
      path: path.to_path_buf(),
      source,
    };

    let mut original = File::open(path).map_err(|e| StateError::io("open", path, e))?;
    let mut backup = Builder::new()
      .prefix(BACKUP_PREFIX)
      .tempfile_in(backup_dir)
      .map_err(backup_err)?;

    io::copy(&mut original, backup.as_file_mut()).map_err(backup_err)?;
    let owner = Owner::of(&metadata);
    if let Some(owner) = owner {
      owner.apply_to(backup.as_file()).map_err(backup_err)?;
    }
    backup
      .as_file()
      .set_permissions(metadata.permissions())
      .map_err(backup_err)?;
    backup.as_file().sync_all().map_err(backup_err)?;

    let (_, backup_path) = backup.keep().map_err(|e| backup_err(e.error))?;
    debug!(path = %path.display(), backup = %backup_path.display(), "original file backed up");

    Ok(Self {
      path: path.to_path_buf(),
      backup: Some(backup_path),
      owner,
    })
  }
}

impl Reversal for WriteFileRevert {
  fn rollback(self: Box<Self>) -> Result<(), StateError> {
    match &self.backup {
      None => match fs::remove_file(&self.path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StateError::io("remove", &self.path, err)),
      },
      Some(backup) => restore(backup, &self.path),
    }
  }

  fn clean(self: Box<Self>) -> Result<(), StateError> {
    match &self.backup {
      None => Ok(()),
      Some(backup) => fs::remove_file(backup).map_err(|e| StateError::io("remove backup", backup, e)),
    }
  }
}

/// Move the backup back over `path`, copying when they sit on different filesystems.
fn restore(backup: &Path, path: &Path) -> Result<(), StateError> {
  match fs::rename(backup, path) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
      fs::copy(backup, path).map_err(|e| StateError::io("restore", path, e))?;
      fs::remove_file(backup).map_err(|e| StateError::io("remove backup", backup, e))
    }
    Err(err) => Err(StateError::io("restore", path, err)),
  }
}
