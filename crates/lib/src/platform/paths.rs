use std::path::PathBuf;

use crate::consts::BACKUP_DIR_ENV;

/// Returns the directory file backups are written to.
///
/// `STX_BACKUP_DIR` wins when set and non-empty; otherwise the system
/// temp directory is used.
pub fn backup_dir() -> PathBuf {
  match std::env::var_os(BACKUP_DIR_ENV) {
    Some(dir) if !dir.is_empty() => PathBuf::from(dir),
    _ => std::env::temp_dir(),
  }
}
