use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::Result;
use chrono::DateTime;

/// ISO-BMFF timestamps count seconds from 1904-01-01 UTC.
const MP4_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Read the movie-header creation time of an MP4/MOV/M4A file and
/// return it as a `YYYY-MM-DD HH:MM:SS` string, the shape the
/// timestamp normalizer accepts. Non-BMFF containers and files
/// without a usable time yield `Ok(None)`.
pub fn read_encoded_date(path: &Path) -> Result<Option<String>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    let Some((moov_start, moov_end)) = find_box(&mut file, 0, len, b"moov")? else {
        return Ok(None);
    };
    let Some((mvhd_start, _)) = find_box(&mut file, moov_start, moov_end, b"mvhd")? else {
        return Ok(None);
    };

    file.seek(SeekFrom::Start(mvhd_start))?;
    let mut version_flags = [0u8; 4];
    file.read_exact(&mut version_flags)?;
    let creation = if version_flags[0] == 1 {
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf)?;
        u64::from_be_bytes(buf) as i64
    } else {
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf)?;
        u32::from_be_bytes(buf) as i64
    };

    let epoch = creation - MP4_EPOCH_OFFSET;
    if epoch <= 0 {
        return Ok(None);
    }
    Ok(DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()))
}

/// Scan sibling boxes in `[pos, end)` for `fourcc`, returning the
/// content range. Malformed sizes end the scan instead of erroring.
fn find_box(
    file: &mut File,
    mut pos: u64,
    end: u64,
    fourcc: &[u8; 4],
) -> Result<Option<(u64, u64)>> {
    while pos + 8 <= end {
        file.seek(SeekFrom::Start(pos))?;
        let mut head = [0u8; 8];
        file.read_exact(&mut head)?;
        let mut size = u32::from_be_bytes([head[0], head[1], head[2], head[3]]) as u64;
        let mut content = pos + 8;

        if size == 1 {
            let mut large = [0u8; 8];
            file.read_exact(&mut large)?;
            size = u64::from_be_bytes(large);
            content = pos + 16;
            if size < 16 {
                return Ok(None);
            }
        } else if size == 0 {
            size = end - pos;
        } else if size < 8 {
            return Ok(None);
        }

        // Sizes come straight from the file; a hostile largesize can
        // overflow the offset arithmetic.
        let Some(next) = pos.checked_add(size) else {
            return Ok(None);
        };
        if next > end {
            return Ok(None);
        }
        if &head[4..8] == fourcc {
            return Ok(Some((content, next)));
        }
        pos = next;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    fn boxed(fourcc: &[u8; 4], content: &[u8]) -> Vec<u8> {
        let mut out = ((content.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(fourcc);
        out.extend_from_slice(content);
        out
    }

    fn write_minimal_mp4(path: &Path, creation_epoch: i64) {
        let creation = (creation_epoch + MP4_EPOCH_OFFSET) as u32;
        let mut mvhd = vec![0u8; 4]; // version 0, flags 0
        mvhd.extend_from_slice(&creation.to_be_bytes());
        mvhd.extend_from_slice(&[0u8; 12]); // modification, timescale, duration
        let moov = boxed(b"moov", &boxed(b"mvhd", &mvhd));
        let ftyp = boxed(b"ftyp", b"isom\x00\x00\x02\x00isomiso2");

        let mut file = File::create(path).unwrap();
        file.write_all(&ftyp).unwrap();
        file.write_all(&moov).unwrap();
    }

    #[test]
    fn reads_mvhd_creation_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let epoch = Utc
            .with_ymd_and_hms(2013, 5, 16, 19, 4, 43)
            .unwrap()
            .timestamp();
        write_minimal_mp4(&path, epoch);

        assert_eq!(
            read_encoded_date(&path).unwrap().as_deref(),
            Some("2013-05-16 19:04:43")
        );
    }

    #[test]
    fn zero_creation_time_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_minimal_mp4(&path, -MP4_EPOCH_OFFSET);
        assert_eq!(read_encoded_date(&path).unwrap(), None);
    }

    #[test]
    fn overflowing_largesize_ends_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let mut bytes = boxed(b"ftyp", b"isom\x00\x00\x02\x00isomiso2");
        // 64-bit box whose declared size would wrap the file offset.
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(b"mdat");
        bytes.extend_from_slice(&0xFFFF_FFFF_FFFF_FFF0u64.to_be_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert_eq!(read_encoded_date(&path).unwrap(), None);
    }

    #[test]
    fn non_bmff_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        std::fs::write(&path, b"RIFF....AVI LIST not a bmff container").unwrap();
        assert_eq!(read_encoded_date(&path).unwrap(), None);
    }
}
