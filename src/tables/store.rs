//! Safe replacement of table files on disk
//!
//! A table file is never rewritten in place. New content goes to a sibling
//! `.tmp` file that is renamed over the target only once it is complete,
//! and the previous edition is first copied to a timestamped backup
//! (`<backup dir>/<file name>.<YYYY-MM-DD_HHMMSS>.bak`).

use crate::error::{RestatementError, Result};
use chrono::Local;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default directory for table backups
pub const DEFAULT_BACKUP_DIR: &str = "backups";

const BACKUP_EXTENSION: &str = "bak";

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `path` through a temporary sibling file. On any error the target
/// keeps its previous content and the temporary file is removed.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = tmp_path(path);
    let written = File::create(&tmp)
        .map_err(RestatementError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            Ok(())
        });

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(&tmp, path)?;
            let _ = fs::remove_file(&tmp);
            Ok(())
        }
    }
}

/// Copy `path` into `backup_dir` under a timestamped name.
/// Returns `None` when there is nothing to back up yet.
pub fn backup_file(path: &Path, backup_dir: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::create_dir_all(backup_dir)?;

    let stamp = Local::now().format("%Y-%m-%d_%H%M%S");
    let dest = backup_dir.join(format!("{}.{}.{}", file_name(path), stamp, BACKUP_EXTENSION));
    fs::copy(path, &dest)?;
    log::info!("backed up {} to {}", path.display(), dest.display());
    Ok(Some(dest))
}

/// Most recent backup of `path` in `backup_dir`, if any
pub fn latest_backup(path: &Path, backup_dir: &Path) -> Result<Option<PathBuf>> {
    if !backup_dir.is_dir() {
        return Ok(None);
    }

    let prefix = format!("{}.", file_name(path));
    let suffix = format!(".{}", BACKUP_EXTENSION);
    let mut latest: Option<(String, PathBuf)> = None;

    for entry in fs::read_dir(backup_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) || !name.ends_with(&suffix) {
            continue;
        }
        // Timestamps sort lexically
        if latest.as_ref().map_or(true, |(best, _)| name > *best) {
            latest = Some((name, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// Copy a backup over its target
pub fn restore_backup(backup: &Path, target: &Path) -> Result<()> {
    fs::copy(backup, target)?;
    log::info!("restored {} from {}", target.display(), backup.display());
    Ok(())
}

/// Back up `path`, then replace it atomically. If the write fails and a
/// backup was taken, the backup is copied back before the error returns.
pub fn replace_with_backup<F>(path: &Path, backup_dir: &Path, write: F) -> Result<Option<PathBuf>>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let backup = backup_file(path, backup_dir)?;

    if let Err(e) = write_atomic(path, write) {
        if let Some(saved) = &backup {
            if let Err(restore_err) = restore_backup(saved, path) {
                log::error!("could not restore {}: {}", path.display(), restore_err);
            }
        }
        return Err(e);
    }

    Ok(backup)
}
