use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::Result;
use exif::{In, Reader, Tag};

use super::{MetaSource, SourceField, SourceGate};

/// Map the primary-IFD fields of a parsed EXIF block to source
/// fields. Thumbnail-IFD entries are skipped.
fn collect_fields(data: &exif::Exif) -> Vec<SourceField> {
    let mut out = Vec::new();
    for field in data.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        let value = field.display_value().to_string();
        match field.tag {
            Tag::DateTime | Tag::DateTimeOriginal | Tag::DateTimeDigitized => {
                out.push(SourceField::Date(value))
            }
            Tag::UserComment => out.push(SourceField::UserComment(value)),
            Tag::Make => out.push(SourceField::Make(value)),
            Tag::Model => out.push(SourceField::Model(value)),
            Tag::PixelXDimension => out.push(SourceField::Width(value)),
            Tag::PixelYDimension => out.push(SourceField::Height(value)),
            Tag::LensModel => out.push(SourceField::LensModel(value)),
            _ => {}
        }
    }
    out
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// The richest reader: container-aware EXIF parsing. Runs
/// unconditionally for every photo.
pub struct ContainerExif;

impl MetaSource for ContainerExif {
    fn name(&self) -> &'static str {
        "exif"
    }

    fn applies(&self, _gate: &SourceGate) -> bool {
        true
    }

    fn read(&self, path: &Path) -> Result<Vec<SourceField>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let data = Reader::new().read_from_container(&mut reader)?;
        Ok(collect_fields(&data))
    }
}

/// Fallback that scans the raw bytes for an embedded `Exif\0\0`
/// marker and parses the TIFF structure behind it. Finds blocks the
/// container reader misses in nonstandard files. PNG keeps its EXIF
/// in a dedicated chunk, so the scan is skipped there.
pub struct ScanExif;

impl MetaSource for ScanExif {
    fn name(&self) -> &'static str {
        "exif-scan"
    }

    fn applies(&self, gate: &SourceGate) -> bool {
        !gate.has_capture_time && gate.ext != ".png"
    }

    fn read(&self, path: &Path) -> Result<Vec<SourceField>> {
        let bytes = fs::read(path)?;
        let Some(pos) = find_subsequence(&bytes, b"Exif\x00\x00") else {
            return Ok(Vec::new());
        };
        let data = Reader::new().read_raw(bytes[pos + 6..].to_vec())?;
        Ok(collect_fields(&data))
    }
}

/// Last-resort reader for the two formats whose layout is simple
/// enough to walk directly: JPEG APP1 segments and bare TIFF.
pub struct SegmentExif;

impl MetaSource for SegmentExif {
    fn name(&self) -> &'static str {
        "exif-segment"
    }

    fn applies(&self, gate: &SourceGate) -> bool {
        !gate.has_capture_time && (gate.ext == ".jpg" || gate.ext == ".tiff")
    }

    fn read(&self, path: &Path) -> Result<Vec<SourceField>> {
        let bytes = fs::read(path)?;
        let raw = if bytes.starts_with(&[0xFF, 0xD8]) {
            jpeg_app1(&bytes)
        } else if bytes.starts_with(b"II*\x00") || bytes.starts_with(b"MM\x00*") {
            Some(bytes.clone())
        } else {
            None
        };
        match raw {
            Some(tiff) => {
                let data = Reader::new().read_raw(tiff)?;
                Ok(collect_fields(&data))
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Walk JPEG markers up to SOS and return the TIFF payload of the
/// first Exif APP1 segment.
fn jpeg_app1(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        if marker == 0xD9 || marker == 0xDA {
            return None;
        }
        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        if len < 2 || i + 2 + len > bytes.len() {
            return None;
        }
        let segment = &bytes[i + 4..i + 2 + len];
        if marker == 0xE1 && segment.starts_with(b"Exif\x00\x00") {
            return Some(segment[6..].to_vec());
        }
        i += 2 + len;
    }
    None
}
