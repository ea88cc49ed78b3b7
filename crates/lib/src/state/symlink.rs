//! Symlink: point a link at a target.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::state::{Noop, Operation, Reversal, StateError};

/// Ensure `link` is a symlink pointing at `target`.
///
/// A missing `target` is not an error: there is nothing to link to yet, so
/// the operation does nothing. A regular file or directory at `link` is
/// never replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symlink {
  pub target: PathBuf,
  pub link: PathBuf,
}

impl Symlink {
  pub fn new(target: impl Into<PathBuf>, link: impl Into<PathBuf>) -> Self {
    Self {
      target: target.into(),
      link: link.into(),
    }
  }
}

impl Operation for Symlink {
  fn apply(&self) -> Result<Box<dyn Reversal>, StateError> {
    match fs::metadata(&self.target) {
      Ok(_) => {}
      Err(err) if err.kind() == io::ErrorKind::NotFound => {
        debug!(target = %self.target.display(), "link target does not exist, nothing to do");
        return Ok(Noop::boxed());
      }
      Err(err) => return Err(StateError::io("stat", &self.target, err)),
    }

    let previous = match fs::symlink_metadata(&self.link) {
      Ok(metadata) if metadata.file_type().is_symlink() => {
        Some(fs::read_link(&self.link).map_err(|e| StateError::io("read old target of link", &self.link, e))?)
      }
      Ok(_) => return Err(StateError::NotASymlink(self.link.clone())),
      Err(err) if err.kind() == io::ErrorKind::NotFound => None,
      Err(err) => return Err(StateError::io("stat", &self.link, err)),
    };

    if previous.as_deref() == Some(self.target.as_path()) {
      debug!(link = %self.link.display(), "link already points at target");
      return Ok(Noop::boxed());
    }

    if let Some(old) = &previous {
      swap_link(&self.link, old, || make_link(&self.target, &self.link))?;
    } else {
      make_link(&self.target, &self.link).map_err(|e| StateError::io("create symlink", &self.link, e))?;
    }

    debug!(link = %self.link.display(), target = %self.target.display(), old = ?previous, "link updated");
    Ok(Box::new(SymlinkRevert {
      link: self.link.clone(),
      previous,
    }))
  }
}

impl fmt::Display for Symlink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Symlink({}, {})", self.target.display(), self.link.display())
  }
}

/// `previous == None` means no link existed before apply.
#[derive(Debug)]
struct SymlinkRevert {
  link: PathBuf,
  previous: Option<PathBuf>,
}

impl Reversal for SymlinkRevert {
  fn rollback(self: Box<Self>) -> Result<(), StateError> {
    match fs::symlink_metadata(&self.link) {
      Ok(metadata) if metadata.file_type().is_symlink() => {
        remove_link(&self.link).map_err(|e| StateError::io("remove link", &self.link, e))?;
      }
      // Something other than our link took its place; leave it be.
      Ok(_) => return Err(StateError::NotASymlink(self.link.clone())),
      Err(err) if err.kind() == io::ErrorKind::NotFound => {}
      Err(err) => return Err(StateError::io("stat", &self.link, err)),
    }

    match &self.previous {
      Some(old) => make_link(old, &self.link).map_err(|e| StateError::io("restore link", &self.link, e)),
      None => Ok(()),
    }
  }

  fn clean(self: Box<Self>) -> Result<(), StateError> {
    Ok(())
  }
}

/// Remove the link at `link`, which points at `old`, and run `create`.
/// If `create` fails the old link is put back.
fn swap_link(link: &Path, old: &Path, create: impl FnOnce() -> io::Result<()>) -> Result<(), StateError> {
  remove_link(link).map_err(|e| StateError::io("remove link", link, e))?;
  if let Err(err) = create() {
    if let Err(restore_err) = make_link(old, link) {
      warn!(link = %link.display(), error = %restore_err, "failed to put back old link");
    }
    return Err(StateError::io("create symlink", link, err));
  }
  Ok(())
}

#[cfg(unix)]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
  let resolved = match link.parent() {
    Some(parent) if target.is_relative() => parent.join(target),
    _ => target.to_path_buf(),
  };
  if resolved.is_dir() {
    std::os::windows::fs::symlink_dir(target, link)
  } else {
    std::os::windows::fs::symlink_file(target, link)
  }
}

#[cfg(unix)]
fn remove_link(link: &Path) -> io::Result<()> {
  fs::remove_file(link)
}

#[cfg(windows)]
fn remove_link(link: &Path) -> io::Result<()> {
  // Directory symlinks are removed with remove_dir on Windows.
  fs::remove_file(link).or_else(|_| fs::remove_dir(link))
}
