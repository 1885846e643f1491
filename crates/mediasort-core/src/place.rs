use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Datelike, Local, TimeZone};
use log::info;

use crate::fsops;
use crate::record::MediaRecord;
use crate::SortOptions;

/// Decide and create the destination folder for a record.
///
/// Screenshots win over everything else; dated files descend into
/// `<year>/<month>/<day>` (local calendar, unpadded segments); the
/// rest land in the no-metadata bucket. Existing folders are reused.
pub fn plan_destination(
    record: &MediaRecord,
    result_root: &Path,
    options: &SortOptions,
) -> Result<PathBuf> {
    if record.is_screenshot {
        return fsops::make_folder(result_root, &options.screenshots_folder);
    }

    if let Some(stamp) = record.capture_time {
        match Local.timestamp_opt(stamp, 0).earliest() {
            Some(local) => {
                let mut path = result_root.to_path_buf();
                for segment in [
                    local.year().to_string(),
                    local.month().to_string(),
                    local.day().to_string(),
                ] {
                    path = fsops::make_folder(&path, &segment)?;
                }
                return Ok(path);
            }
            None => {
                info!(
                    "can't break {} down to a calendar date for {}",
                    stamp,
                    record.file_path.display()
                );
                return Ok(result_root.to_path_buf());
            }
        }
    }

    fsops::make_folder(result_root, &options.no_metadata_folder)
}
