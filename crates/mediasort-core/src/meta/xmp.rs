use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use super::{MetaSource, SourceField, SourceGate};

static XMP_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)\b(?P<tag>exif:DateTimeOriginal|exif:DateTimeDigitized|tiff:DateTime|exif:UserComment|tiff:Make|tiff:Model|exif:PixelXDimension|exif:PixelYDimension|exifEX:LensModel|aux:Lens)\s*(?:=\s*"(?P<attr>[^"]*)"|>(?P<elem>[^<]*)<)"#,
    )
    .unwrap()
});

/// Secondary reader: pulls properties out of an embedded XMP packet.
/// Skipped for paths in an excluded script, a known limitation of its
/// path handling, and for GIF, which never carries a usable packet.
pub struct XmpPacket;

impl MetaSource for XmpPacket {
    fn name(&self) -> &'static str {
        "xmp"
    }

    fn applies(&self, gate: &SourceGate) -> bool {
        !gate.has_capture_time && gate.ext != ".gif" && !gate.path_excluded
    }

    fn read(&self, path: &Path) -> Result<Vec<SourceField>> {
        let bytes = fs::read(path)?;
        Ok(scan_packet(&bytes))
    }
}

/// Locate the `<x:xmpmeta>` element and map its recognized
/// properties, in either attribute or element form.
fn scan_packet(bytes: &[u8]) -> Vec<SourceField> {
    let Some(start) = find(bytes, b"<x:xmpmeta") else {
        return Vec::new();
    };
    let end = find(&bytes[start..], b"</x:xmpmeta>")
        .map(|rel| start + rel + b"</x:xmpmeta>".len())
        .unwrap_or(bytes.len());
    let text = String::from_utf8_lossy(&bytes[start..end]);

    let mut out = Vec::new();
    for caps in XMP_TAG.captures_iter(&text) {
        let value = caps
            .name("attr")
            .or_else(|| caps.name("elem"))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if value.is_empty() {
            continue;
        }
        match &caps["tag"] {
            "exif:DateTimeOriginal" | "exif:DateTimeDigitized" | "tiff:DateTime" => {
                out.push(SourceField::Date(value))
            }
            "exif:UserComment" => out.push(SourceField::UserComment(value)),
            "tiff:Make" => out.push(SourceField::Make(value)),
            "tiff:Model" => out.push(SourceField::Model(value)),
            "exif:PixelXDimension" => out.push(SourceField::Width(value)),
            "exif:PixelYDimension" => out.push(SourceField::Height(value)),
            "exifEX:LensModel" | "aux:Lens" => out.push(SourceField::LensModel(value)),
            _ => {}
        }
    }
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = r#"junk<x:xmpmeta xmlns:x="adobe:ns:meta/">
        <rdf:Description
            exif:DateTimeOriginal="2013-05-16T19:04:43"
            tiff:Make="Apple"
            exif:PixelXDimension="3264">
          <tiff:Model>iPhone 5</tiff:Model>
          <exif:UserComment>Screenshot</exif:UserComment>
        </rdf:Description></x:xmpmeta>trailing"#;

    #[test]
    fn reads_attribute_and_element_forms() {
        let fields = scan_packet(PACKET.as_bytes());
        assert!(fields
            .iter()
            .any(|f| matches!(f, SourceField::Date(d) if d == "2013-05-16T19:04:43")));
        assert!(fields
            .iter()
            .any(|f| matches!(f, SourceField::Make(m) if m == "Apple")));
        assert!(fields
            .iter()
            .any(|f| matches!(f, SourceField::Model(m) if m == "iPhone 5")));
        assert!(fields
            .iter()
            .any(|f| matches!(f, SourceField::Width(w) if w == "3264")));
        assert!(fields
            .iter()
            .any(|f| matches!(f, SourceField::UserComment(c) if c == "Screenshot")));
    }

    #[test]
    fn no_packet_means_no_fields() {
        assert!(scan_packet(b"plain bytes without any packet").is_empty());
    }
}
