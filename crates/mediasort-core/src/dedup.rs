use std::path::{Path, PathBuf};

use log::error;

use crate::fsops;
use crate::meta::Resolver;
use crate::record::MediaRecord;

/// Decide what to do when `file_name` may already exist in `dest`.
///
/// Returns the final destination folder and whether the file must be
/// skipped. A true duplicate (same metadata across the fixed
/// comparison set) is skipped; a name collision with different
/// metadata is redirected into a subfolder named after the file's
/// stem, unless that subfolder already holds the name too.
pub fn resolve_duplicate(
    dest: &Path,
    file_name: &str,
    record: Option<&MediaRecord>,
    resolver: &Resolver,
) -> (PathBuf, bool) {
    let Some(record) = record else {
        return (dest.to_path_buf(), true);
    };

    if !fsops::is_file_in_folder(file_name, dest) {
        return (dest.to_path_buf(), false);
    }

    let existing = resolver.resolve(&dest.join(file_name));
    if record.is_same_as(&existing) {
        return (dest.to_path_buf(), true);
    }

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    match fsops::make_folder(dest, stem) {
        Ok(sub) => {
            let skip = fsops::is_file_in_folder(file_name, &sub);
            (sub, skip)
        }
        Err(e) => {
            error!(
                "can't create collision folder for {file_name} under {}: {e}",
                dest.display()
            );
            (dest.to_path_buf(), true)
        }
    }
}
