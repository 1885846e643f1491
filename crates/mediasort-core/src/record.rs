use std::path::{Path, PathBuf};

use log::warn;

/// Broad media category derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Photo,
    Video,
    Audio,
    Other,
}

/// Map a lowercase dotted extension to its kind. Unknown extensions
/// are Other, which also covers supported-but-opaque formats such as
/// `.dng`.
pub fn kind_for_ext(ext: &str) -> FileKind {
    match ext {
        ".jpg" | ".png" | ".gif" | ".bmp" | ".psd" | ".tiff" => FileKind::Photo,
        ".mp4" | ".mov" | ".avi" => FileKind::Video,
        ".mp3" | ".m4a" => FileKind::Audio,
        _ => FileKind::Other,
    }
}

/// Free-text metadata fields covered by the first-write-wins rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Brand,
    Model,
    Lens,
    Width,
    Height,
}

impl TextField {
    fn name(self) -> &'static str {
        match self {
            TextField::Brand => "brand",
            TextField::Model => "model",
            TextField::Lens => "lens",
            TextField::Width => "width",
            TextField::Height => "height",
        }
    }
}

/// The authoritative metadata for one source file, accumulated across
/// all readers during resolution and frozen afterwards.
///
/// Dimensions are kept as decoded text rather than re-parsed numbers;
/// the source formats disagree on representation and the values are
/// only ever compared for equality.
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub file_path: PathBuf,
    pub file_ext: String,
    pub kind: FileKind,
    pub capture_time: Option<i64>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub byte_size: u64,
    pub is_screenshot: bool,
}

/// Earliest-wins merge for capture times: a candidate replaces the
/// current value iff it is positive and strictly earlier. Idempotent.
pub fn merge_capture(current: Option<i64>, candidate: i64) -> Option<i64> {
    if candidate > 0 && current.map_or(true, |cur| candidate < cur) {
        Some(candidate)
    } else {
        current
    }
}

impl MediaRecord {
    pub fn new(path: &Path) -> Self {
        let file_ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let kind = kind_for_ext(&file_ext);
        Self {
            file_path: path.to_path_buf(),
            file_ext,
            kind,
            capture_time: None,
            width: None,
            height: None,
            brand: None,
            model: None,
            lens: None,
            byte_size: 0,
            is_screenshot: false,
        }
    }

    /// Feed a capture-time candidate through the earliest-wins rule.
    pub fn set_capture(&mut self, candidate: Option<i64>) {
        if let Some(v) = candidate {
            self.capture_time = merge_capture(self.capture_time, v);
        }
    }

    /// Sticky screenshot flag: once true, never cleared.
    pub fn mark_screenshot(&mut self, value: bool) {
        if !self.is_screenshot {
            self.is_screenshot = value;
        }
    }

    /// First write wins; a later disagreeing write is logged and
    /// discarded, never applied.
    pub fn set_text(&mut self, field: TextField, value: String) {
        let path = self.file_path.clone();
        let slot = self.text_slot(field);
        match slot {
            Some(existing) if *existing != value => {
                warn!(
                    "{}: keeping {} {existing:?}, ignoring conflicting {value:?}",
                    path.display(),
                    field.name()
                );
            }
            Some(_) => {}
            None => *slot = Some(value),
        }
    }

    fn text_slot(&mut self, field: TextField) -> &mut Option<String> {
        match field {
            TextField::Brand => &mut self.brand,
            TextField::Model => &mut self.model,
            TextField::Lens => &mut self.lens,
            TextField::Width => &mut self.width,
            TextField::Height => &mut self.height,
        }
    }

    /// Duplicate comparison over the fixed field set.
    pub fn is_same_as(&self, other: &MediaRecord) -> bool {
        self.kind == other.kind
            && self.capture_time == other.capture_time
            && self.file_ext == other.file_ext
            && self.height == other.height
            && self.width == other.width
            && self.brand == other.brand
            && self.model == other.model
            && self.lens == other.lens
            && self.byte_size == other.byte_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> MediaRecord {
        MediaRecord::new(Path::new(name))
    }

    #[test]
    fn extension_and_kind_derivation() {
        let r = record("/tmp/IMG_0001.JPG");
        assert_eq!(r.file_ext, ".jpg");
        assert_eq!(r.kind, FileKind::Photo);
        assert_eq!(record("/tmp/clip.MOV").kind, FileKind::Video);
        assert_eq!(record("/tmp/track.m4a").kind, FileKind::Audio);
        assert_eq!(record("/tmp/raw.dng").kind, FileKind::Other);
        assert_eq!(record("/tmp/noext").file_ext, "");
    }

    #[test]
    fn merge_capture_keeps_earliest() {
        assert_eq!(merge_capture(None, 100), Some(100));
        assert_eq!(merge_capture(Some(100), 200), Some(100));
        assert_eq!(merge_capture(Some(200), 100), Some(100));
        assert_eq!(merge_capture(Some(100), 0), Some(100));
        assert_eq!(merge_capture(Some(100), -5), Some(100));
        assert_eq!(merge_capture(None, 0), None);
    }

    #[test]
    fn merge_capture_is_idempotent() {
        let once = merge_capture(None, 1_368_720_283);
        let twice = merge_capture(once, 1_368_720_283);
        assert_eq!(once, twice);
    }

    #[test]
    fn screenshot_flag_is_sticky() {
        let mut r = record("a.jpg");
        r.mark_screenshot(true);
        r.mark_screenshot(false);
        assert!(r.is_screenshot);
    }

    #[test]
    fn text_fields_keep_first_write() {
        let mut r = record("a.jpg");
        r.set_text(TextField::Brand, "Canon".into());
        r.set_text(TextField::Brand, "Nikon".into());
        assert_eq!(r.brand.as_deref(), Some("Canon"));
        // Re-writing the same value is a no-op.
        r.set_text(TextField::Brand, "Canon".into());
        assert_eq!(r.brand.as_deref(), Some("Canon"));
    }

    #[test]
    fn same_as_requires_every_field() {
        let mut a = record("a.jpg");
        a.capture_time = Some(1_368_720_283);
        a.byte_size = 1024;
        a.brand = Some("Canon".into());
        let mut b = a.clone();
        assert!(a.is_same_as(&b));

        b.byte_size = 1025;
        assert!(!a.is_same_as(&b));
        b.byte_size = 1024;
        b.capture_time = None;
        assert!(!a.is_same_as(&b));
        b.capture_time = Some(1_368_720_283);
        b.brand = Some("Nikon".into());
        assert!(!a.is_same_as(&b));
    }
}
