use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::dedup;
use crate::fsops;
use crate::lang;
use crate::meta::Resolver;
use crate::place;
use crate::record::MediaRecord;
use crate::{SortOptions, SortReport};

/// Organize every supported file under the source root into the
/// result tree, then clean up folders that became empty.
///
/// The only fatal condition is a source root whose path text matches
/// the excluded-language list; everything else is logged per file and
/// the run continues.
pub fn sort_files(options: &SortOptions, token: Option<&CancellationToken>) -> Result<SortReport> {
    let source_root = options
        .source
        .canonicalize()
        .with_context(|| format!("source folder {} not accessible", options.source.display()))?;
    std::fs::create_dir_all(&options.result)
        .with_context(|| format!("can't create result folder {}", options.result.display()))?;
    let result_root = options.result.canonicalize()?;

    if lang::path_has_excluded(&source_root.to_string_lossy(), &options.excluded_langs) {
        bail!(
            "source path {} contains text in an excluded language",
            source_root.display()
        );
    }

    let (folders, files) = collect_files(&source_root, &options.media_extensions);
    info!("{} files found under {}", files.len(), source_root.display());

    let resolver = Resolver::new(options.clone());

    // Metadata resolution only reads the tree; run it across the
    // worker pool. Placement, duplicate checks and moves share the
    // destination folders and stay sequential.
    let records: Vec<MediaRecord> = files.par_iter().map(|f| resolver.resolve(f)).collect();

    let mut report = SortReport {
        files_found: files.len() as u64,
        ..SortReport::default()
    };

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} moving files")
            .unwrap(),
    );

    for (file_path, record) in files.iter().zip(records.into_iter()) {
        if let Some(token) = token {
            token.check()?;
        }
        pb.inc(1);

        let Some(parent) = file_path.parent() else {
            continue;
        };
        let Some(file_name) = file_path.file_name().and_then(|n| n.to_str()) else {
            error!("skipping {}: non-unicode file name", file_path.display());
            continue;
        };

        let group = sidecar_group(file_name, parent, options);

        let dest = match place::plan_destination(&record, &result_root, options) {
            Ok(dest) => dest,
            Err(e) => {
                error!("can't plan destination for {}: {e}", file_path.display());
                continue;
            }
        };

        let (final_dest, skip) =
            dedup::resolve_duplicate(&dest, file_name, Some(&record), &resolver);
        if skip {
            info!(
                "DUPLICATE: {} ({group:?}) already in {}",
                parent.display(),
                final_dest.display()
            );
            report.duplicates += 1;
            continue;
        }

        let outcome = fsops::move_files(&group, parent, &final_dest);
        report.move_failures += outcome.failures;
        if outcome.moved_any {
            info!(
                "moved: {} ({group:?}) -> {}",
                parent.display(),
                final_dest.display()
            );
            report.moved += 1;
        }
    }
    pb.finish_and_clear();

    // Deepest folders first, so parents are emptied by the time they
    // are attempted.
    let mut folders: Vec<PathBuf> = folders;
    folders.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()));

    let pb = ProgressBar::new(folders.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} removing folders")
            .unwrap(),
    );
    for folder in &folders {
        pb.inc(1);
        if !fsops::remove_empty_folder(folder) {
            report
                .unremoved_folders
                .push(folder.display().to_string());
        }
    }
    pb.finish_and_clear();

    Ok(report)
}

/// Post-order walk: children are listed before their parent, and the
/// parent is recorded for the cleanup pass. Files are filtered by the
/// supported extension list, case-insensitively.
fn collect_files(root: &Path, extensions: &[String]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut folders = Vec::new();
    let mut files = Vec::new();
    walk(root, root, extensions, &mut folders, &mut files);
    (folders, files)
}

fn walk(
    dir: &Path,
    root: &Path,
    extensions: &[String],
    folders: &mut Vec<PathBuf>,
    files: &mut Vec<PathBuf>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        error!("can't list {}", dir.display());
        return;
    };
    let mut here = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, root, extensions, folders, files);
        } else {
            here.push(path);
        }
    }
    if dir != root {
        folders.push(dir.to_path_buf());
    }
    for path in here {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let lower = name.to_lowercase();
            if extensions.iter().any(|ext| lower.ends_with(ext.as_str())) {
                files.push(path);
            }
        }
    }
}

/// The primary file plus any sidecar sharing its stem in the same
/// folder. Sidecar names must match a directory entry exactly; the
/// configured extension list carries both case variants.
fn sidecar_group(file_name: &str, folder: &Path, options: &SortOptions) -> Vec<String> {
    let mut group = vec![file_name.to_string()];
    if !options.find_sidecars {
        return group;
    }
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let Ok(entries) = std::fs::read_dir(folder) else {
        return group;
    };
    let present: HashSet<String> = entries
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    for ext in &options.sidecar_extensions {
        let candidate = format!("{stem}{ext}");
        if present.contains(&candidate) && !group.contains(&candidate) {
            group.push(candidate);
        }
    }
    group
}
