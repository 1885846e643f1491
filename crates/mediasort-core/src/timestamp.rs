use std::sync::LazyLock;

use anyhow::Context;
use chrono::{Local, NaiveDate, TimeZone};
use log::error;
use regex::Regex;

/// Oldest epoch value accepted as a capture time (end of 1979 in the
/// reference timezone). Anything below is noise from cameras with an
/// unset clock.
pub const EPOCH_FLOOR: i64 = 315_522_000;

static SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}[-:]?.\d[-:]?.\d[ T]?.{0,2}:.{0,2}:.{0,2}").unwrap());
static DASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-.\d-.\d[ T]?.{0,2}:.{0,2}:.{0,2}").unwrap());
static COLON_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}:.\d:.\d[ T]?.{0,2}:.{0,2}:.{0,2}").unwrap());

/// Parse a loosely formatted date-time string into epoch seconds.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` and `YYYY:MM:DD HH:MM:SS`, with an
/// optional `T` separator and space-padded 1-2 digit fields. Any
/// trailing timezone suffix is ignored entirely; the value is taken
/// as local wall-clock time, so inputs differing only by offset
/// normalize identically.
///
/// Out-of-range fields are clamped rather than rejected: month and
/// day fall back to 1, hour caps at 23, minute and second cap at 59.
/// A blank (all-space) hour or minute means 0, a blank second means 1.
/// Years up to and including 1980 and results below [`EPOCH_FLOOR`]
/// yield `None`, as does any parse failure.
pub fn normalize(raw: Option<&str>) -> Option<i64> {
    let value = raw?;
    if !SHAPE.is_match(value) {
        return None;
    }
    let splitter = if DASH_DATE.is_match(value) {
        '-'
    } else if COLON_DATE.is_match(value) {
        ':'
    } else {
        return None;
    };

    match to_epoch(value, splitter) {
        Ok(stamp) => stamp.filter(|&s| s >= EPOCH_FLOOR),
        Err(e) => {
            error!("can't convert {value:?} to a timestamp: {e}");
            None
        }
    }
}

fn to_epoch(value: &str, splitter: char) -> anyhow::Result<Option<i64>> {
    // Fixed character positions, tolerant of short input: chars 0..10
    // are the date, 11..19 the time, the rest a timezone suffix.
    let chars: Vec<char> = value.chars().collect();
    let date_part: String = chars.iter().take(10).collect();
    let time_part: String = chars.iter().skip(11).take(8).collect();

    let mut date_fields = date_part.split(splitter);
    let year: i64 = date_fields
        .next()
        .context("missing year")?
        .trim()
        .parse()
        .context("bad year")?;
    if year <= 1980 {
        return Ok(None);
    }
    let mut month: i64 = date_fields
        .next()
        .context("missing month")?
        .trim()
        .parse()
        .context("bad month")?;
    if !(1..=12).contains(&month) {
        month = 1;
    }
    let mut day: i64 = date_fields
        .next()
        .context("missing day")?
        .trim()
        .parse()
        .context("bad day")?;
    if !(1..=31).contains(&day) {
        day = 1;
    }

    let mut time_fields = time_part.split(':');
    let hour = clock_field(time_fields.next().context("missing hours")?, 0, 23)?;
    let minute = clock_field(time_fields.next().context("missing minutes")?, 0, 59)?;
    let second = clock_field(time_fields.next().context("missing seconds")?, 1, 59)?;

    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .with_context(|| format!("invalid calendar date {year}-{month}-{day}"))?;
    let naive = date
        .and_hms_opt(hour, minute, second)
        .with_context(|| format!("invalid time {hour}:{minute}:{second}"))?;

    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp()))
}

/// Clamp a single clock field. Blank means whitespace-only but
/// non-empty, matching the legacy isspace check; an empty field is a
/// parse failure.
fn clock_field(text: &str, blank_default: u32, max: i64) -> anyhow::Result<u32> {
    if !text.is_empty() && text.chars().all(char::is_whitespace) {
        return Ok(blank_default);
    }
    let n: i64 = text.trim().parse().context("bad clock field")?;
    if n > max {
        Ok(max as u32)
    } else if n < 0 {
        Ok(1)
    } else {
        Ok(n as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    /// Expected values are computed against the local timezone, the
    /// same conversion the normalizer applies.
    fn local_epoch(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .earliest()
            .unwrap()
            .timestamp()
    }

    #[test]
    fn parses_both_delimiter_families() {
        assert_eq!(
            normalize(Some("2013-09-21 15:33:42")),
            Some(local_epoch(2013, 9, 21, 15, 33, 42))
        );
        assert_eq!(
            normalize(Some("2013:05:16 19:04:43")),
            Some(local_epoch(2013, 5, 16, 19, 4, 43))
        );
        assert_eq!(
            normalize(Some("2009-08-23 19:48:00")),
            Some(local_epoch(2009, 8, 23, 19, 48, 0))
        );
    }

    #[test]
    fn timezone_suffix_is_ignored() {
        assert_eq!(
            normalize(Some("2013-05-16 19:04:43+03:00")),
            normalize(Some("2013-05-16 19:04:43"))
        );
        assert_eq!(
            normalize(Some("2013:05:16 19:04:43+03:00")),
            Some(local_epoch(2013, 5, 16, 19, 4, 43))
        );
        assert_eq!(
            normalize(Some("2013-09-21 15:33:42+00:00")),
            Some(local_epoch(2013, 9, 21, 15, 33, 42))
        );
    }

    #[test]
    fn accepts_space_padded_fields_and_t_separator() {
        let expected = Some(local_epoch(2013, 5, 16, 19, 4, 43));
        assert_eq!(normalize(Some("2013- 5-16 19: 4:43")), expected);
        assert_eq!(normalize(Some("2013: 5:16 19: 4:43")), expected);
        assert_eq!(normalize(Some("2013- 5-16T19: 4:43")), expected);
        assert_eq!(normalize(Some("2013: 5:16T19: 4:43")), expected);
    }

    #[test]
    fn clamps_out_of_range_seconds() {
        assert_eq!(
            normalize(Some("2016-06-05T21:06:76")),
            Some(local_epoch(2016, 6, 5, 21, 6, 59))
        );
    }

    #[test]
    fn blank_second_defaults_to_one() {
        assert_eq!(
            normalize(Some("2015:11:21 10:16: 2")),
            Some(local_epoch(2015, 11, 21, 10, 16, 2))
        );
        assert_eq!(
            normalize(Some("2015:11:21 10:16: ")),
            Some(local_epoch(2015, 11, 21, 10, 16, 1))
        );
    }

    #[test]
    fn clamps_month_and_day_to_one() {
        assert_eq!(
            normalize(Some("2013-13-40 10:00:00")),
            Some(local_epoch(2013, 1, 1, 10, 0, 0))
        );
    }

    #[test]
    fn rejects_years_at_or_before_1980() {
        assert_eq!(normalize(Some("1949-11-21 10:16:02")), None);
        assert_eq!(normalize(Some("1949-11-21 10:16:02+00:00")), None);
        assert_eq!(normalize(Some("1899-12-29 21:00:00")), None);
        assert_eq!(normalize(Some("1980-06-15 12:00:00")), None);
        assert_eq!(normalize(Some("0000-00-00 00:00:00")), None);
        assert_eq!(normalize(Some("0000-00-00 00:00:00+00:00")), None);
    }

    #[test]
    fn rejects_malformed_input_without_panicking() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
        assert_eq!(normalize(Some("malformed")), None);
        assert_eq!(normalize(Some("20130516190443")), None);
        assert_eq!(normalize(Some("2013/05/16 19:04:43")), None);
    }

    #[test]
    fn pure_for_identical_input() {
        let a = normalize(Some("2013:05:16 19:04:43"));
        let b = normalize(Some("2013:05:16 19:04:43"));
        assert_eq!(a, b);
    }
}
