pub mod exif;
pub mod media_props;
pub mod xmp;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use log::error;

use crate::record::{FileKind, MediaRecord, TextField};
use crate::timestamp;
use crate::{lang, SortOptions};

/// Photo files at or below this size are placeholders or corrupt;
/// no reader is consulted for them.
const MIN_PHOTO_SIZE: u64 = 15;

/// One raw field as decoded by a metadata source. Values stay as
/// text; the resolver decides how they merge into the record.
#[derive(Debug, Clone)]
pub enum SourceField {
    Date(String),
    UserComment(String),
    Make(String),
    Model(String),
    Width(String),
    Height(String),
    LensModel(String),
}

/// File state a photo source may inspect to decide whether to run.
#[derive(Clone, Copy)]
pub struct SourceGate<'a> {
    pub ext: &'a str,
    pub has_capture_time: bool,
    pub path_excluded: bool,
}

/// A single best-effort metadata source. Every implementation is
/// independently failable; a read error means "no data from here".
pub trait MetaSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn applies(&self, gate: &SourceGate) -> bool;
    fn read(&self, path: &Path) -> Result<Vec<SourceField>>;
}

/// Runs the fixed source chain against one file and accumulates the
/// results into a [`MediaRecord`].
pub struct Resolver {
    options: SortOptions,
    photo_sources: Vec<Box<dyn MetaSource>>,
}

impl Resolver {
    pub fn new(options: SortOptions) -> Self {
        Self {
            photo_sources: vec![
                Box::new(exif::ContainerExif),
                Box::new(xmp::XmpPacket),
                Box::new(exif::ScanExif),
                Box::new(exif::SegmentExif),
            ],
            options,
        }
    }

    /// Resolve one file. Never fails: every reader error is logged
    /// and resolution continues with the remaining sources.
    pub fn resolve(&self, path: &Path) -> MediaRecord {
        let mut record = MediaRecord::new(path);

        match std::fs::metadata(path) {
            Ok(meta) => record.byte_size = meta.len(),
            Err(e) => error!("can't stat {}: {e}", path.display()),
        }

        match record.kind {
            FileKind::Photo if record.byte_size > MIN_PHOTO_SIZE => {
                let path_excluded = lang::path_has_excluded(
                    &path.to_string_lossy(),
                    &self.options.excluded_langs,
                );
                for source in &self.photo_sources {
                    let gate = SourceGate {
                        ext: &record.file_ext,
                        has_capture_time: record.capture_time.is_some(),
                        path_excluded,
                    };
                    if !source.applies(&gate) {
                        continue;
                    }
                    match source.read(path) {
                        Ok(fields) => apply_fields(&mut record, &fields),
                        Err(e) => {
                            error!("{}: can't read {}: {e}", source.name(), path.display())
                        }
                    }
                }
            }
            FileKind::Video | FileKind::Audio => {
                match media_props::read_encoded_date(path) {
                    Ok(Some(raw)) => record.set_capture(timestamp::normalize(Some(&raw))),
                    Ok(None) => {}
                    Err(e) => error!("media-props: can't read {}: {e}", path.display()),
                }
            }
            _ => {}
        }

        if !self.options.group_no_metadata {
            apply_fs_times(&mut record);
        }

        record
    }
}

fn apply_fields(record: &mut MediaRecord, fields: &[SourceField]) {
    for field in fields {
        match field {
            SourceField::Date(raw) => record.set_capture(timestamp::normalize(Some(raw))),
            SourceField::UserComment(text) => {
                if text.to_lowercase().contains("screenshot") {
                    record.mark_screenshot(true);
                }
            }
            SourceField::Make(v) => record.set_text(TextField::Brand, v.clone()),
            SourceField::Model(v) => record.set_text(TextField::Model, v.clone()),
            SourceField::Width(v) => record.set_text(TextField::Width, v.clone()),
            SourceField::Height(v) => record.set_text(TextField::Height, v.clone()),
            SourceField::LensModel(v) => record.set_text(TextField::Lens, v.clone()),
        }
    }
}

/// Filesystem fallback when undated files are not grouped separately.
/// Both times go through the same earliest-wins merge.
fn apply_fs_times(record: &mut MediaRecord) {
    match std::fs::metadata(&record.file_path) {
        Ok(meta) => {
            if let Ok(t) = meta.modified() {
                record.set_capture(epoch_secs(t));
            }
            if let Ok(t) = meta.created() {
                record.set_capture(epoch_secs(t));
            }
        }
        Err(e) => error!("can't read times of {}: {e}", record.file_path.display()),
    }
}

fn epoch_secs(t: SystemTime) -> Option<i64> {
    t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xmp_gate_skips_excluded_paths_and_gif() {
        let source = xmp::XmpPacket;
        let open = SourceGate {
            ext: ".jpg",
            has_capture_time: false,
            path_excluded: false,
        };
        assert!(source.applies(&open));
        assert!(!source.applies(&SourceGate {
            path_excluded: true,
            ..open
        }));
        assert!(!source.applies(&SourceGate {
            ext: ".gif",
            has_capture_time: false,
            path_excluded: false,
        }));
        assert!(!source.applies(&SourceGate {
            has_capture_time: true,
            ..open
        }));
    }

    #[test]
    fn scan_gate_skips_png() {
        let source = exif::ScanExif;
        assert!(!source.applies(&SourceGate {
            ext: ".png",
            has_capture_time: false,
            path_excluded: false,
        }));
        assert!(source.applies(&SourceGate {
            ext: ".bmp",
            has_capture_time: false,
            path_excluded: false,
        }));
    }

    #[test]
    fn segment_gate_only_jpg_and_tiff() {
        let source = exif::SegmentExif;
        for (ext, expected) in [(".jpg", true), (".tiff", true), (".png", false)] {
            assert_eq!(
                source.applies(&SourceGate {
                    ext,
                    has_capture_time: false,
                    path_excluded: false,
                }),
                expected,
                "ext {ext}"
            );
        }
    }

    #[test]
    fn container_source_always_applies() {
        let source = exif::ContainerExif;
        assert!(source.applies(&SourceGate {
            ext: ".gif",
            has_capture_time: true,
            path_excluded: true,
        }));
    }
}
