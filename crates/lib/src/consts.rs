/// Mode used by `WriteFile` when none is given.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode used by `MakeDir` when none is given.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Prefix of backup files taken before a file is overwritten.
pub const BACKUP_PREFIX: &str = "stx-backup-";

/// Prefix of the staging file a new file body is written to before the rename.
pub const STAGING_PREFIX: &str = ".stx-staged-";

/// Overrides the directory backups are written to.
pub const BACKUP_DIR_ENV: &str = "STX_BACKUP_DIR";
