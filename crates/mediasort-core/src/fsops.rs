use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};

/// Folder listing with every name lowercased, for case-insensitive
/// membership checks. An unreadable folder lists as empty.
pub fn folder_names_lower(path: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(path) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_lowercase())
        .collect()
}

pub fn is_file_in_folder(file: &str, path: &Path) -> bool {
    let lower = file.to_lowercase();
    folder_names_lower(path).iter().any(|name| *name == lower)
}

/// Create `path/folder_name` if missing; an existing folder is
/// reused untouched.
pub fn make_folder(path: &Path, folder_name: &str) -> Result<PathBuf> {
    let target = path.join(folder_name);
    fs::create_dir_all(&target)
        .with_context(|| format!("can't create {}", target.display()))?;
    Ok(target)
}

/// Move one file into `dest_dir`, falling back to copy-and-remove
/// when rename fails (cross-device moves).
pub fn move_file(src: &Path, dest_dir: &Path) -> Result<()> {
    let file_name = src.file_name().context("source path has no file name")?;
    let dest = dest_dir.join(file_name);
    if fs::rename(src, &dest).is_ok() {
        return Ok(());
    }
    fs::copy(src, &dest)
        .with_context(|| format!("can't copy {} to {}", src.display(), dest.display()))?;
    fs::remove_file(src).with_context(|| format!("can't remove {}", src.display()))?;
    Ok(())
}

/// What a group move actually did: skipped names count as neither
/// moved nor failed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved_any: bool,
    pub failures: u64,
}

/// Move a file group, skipping members whose name already exists at
/// the target (case-insensitive).
pub fn move_files(files: &[String], path: &Path, new_path: &Path) -> MoveOutcome {
    let existing = folder_names_lower(new_path);
    let mut outcome = MoveOutcome::default();
    for file in files {
        if existing.contains(&file.to_lowercase()) {
            continue;
        }
        match move_file(&path.join(file), new_path) {
            Ok(()) => outcome.moved_any = true,
            Err(e) => {
                error!("can't move {file} to {}: {e}", new_path.display());
                outcome.failures += 1;
            }
        }
    }
    outcome
}

/// Remove a folder only when it is empty; false when it stays.
pub fn remove_empty_folder(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                info!("not removing {}: still has entries", path.display());
                return false;
            }
            match fs::remove_dir(path) {
                Ok(()) => true,
                Err(e) => {
                    error!("can't remove {}: {e}", path.display());
                    false
                }
            }
        }
        Err(e) => {
            error!("can't list {}: {e}", path.display());
            false
        }
    }
}
