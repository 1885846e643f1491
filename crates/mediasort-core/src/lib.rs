pub mod cancel;
pub mod dedup;
pub mod fsops;
pub mod lang;
pub mod meta;
pub mod pipeline;
pub mod place;
pub mod record;
pub mod timestamp;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use cancel::{CancellationToken, CancelledError};
pub use pipeline::sort_files;
pub use record::{FileKind, MediaRecord};

fn default_true() -> bool {
    true
}

fn default_media_extensions() -> Vec<String> {
    [
        ".jpg", ".png", ".gif", ".bmp", ".tiff", ".psd", ".dng", ".mov", ".avi", ".mp4", ".mp3",
        ".m4a",
    ]
    .map(String::from)
    .to_vec()
}

fn default_sidecar_extensions() -> Vec<String> {
    [".AAE", ".aae", ".THM", ".thm"].map(String::from).to_vec()
}

fn default_excluded_langs() -> Vec<String> {
    ["rus", "ukr", "bel", "bul", "srp", "mkd"]
        .map(String::from)
        .to_vec()
}

fn default_screenshots_folder() -> String {
    "screenshots".to_string()
}

fn default_no_metadata_folder() -> String {
    "no_metadata".to_string()
}

/// Everything a run needs, passed explicitly instead of living in
/// process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortOptions {
    /// Folder to organize.
    #[serde(default)]
    pub source: PathBuf,
    /// Root of the sorted tree.
    #[serde(default)]
    pub result: PathBuf,
    /// Keep files without usable metadata in their own bucket instead
    /// of falling back to filesystem times.
    #[serde(default = "default_true")]
    pub group_no_metadata: bool,
    /// Move sidecar files (.AAE, .THM) together with their primary.
    #[serde(default = "default_true")]
    pub find_sidecars: bool,
    #[serde(default = "default_media_extensions")]
    pub media_extensions: Vec<String>,
    #[serde(default = "default_sidecar_extensions")]
    pub sidecar_extensions: Vec<String>,
    /// Languages whose presence in path text disables the readers
    /// that mishandle them; a source root in one of these is refused.
    #[serde(default = "default_excluded_langs")]
    pub excluded_langs: Vec<String>,
    #[serde(default = "default_screenshots_folder")]
    pub screenshots_folder: String,
    #[serde(default = "default_no_metadata_folder")]
    pub no_metadata_folder: String,
}

impl SortOptions {
    pub fn new(source: PathBuf, result: PathBuf) -> Self {
        Self {
            source,
            result,
            group_no_metadata: true,
            find_sidecars: true,
            media_extensions: default_media_extensions(),
            sidecar_extensions: default_sidecar_extensions(),
            excluded_langs: default_excluded_langs(),
            screenshots_folder: default_screenshots_folder(),
            no_metadata_folder: default_no_metadata_folder(),
        }
    }
}

/// End-of-run summary. Per-file failures are logged as they happen;
/// folders that could not be removed are reported here instead of
/// failing the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortReport {
    pub files_found: u64,
    pub moved: u64,
    pub duplicates: u64,
    #[serde(default)]
    pub move_failures: u64,
    #[serde(default)]
    pub unremoved_folders: Vec<String>,
}
