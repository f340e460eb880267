//! Date parsing and formatting.
//!
//! Text dates are read after replacing every `-` with `/`, so `2024-03-05`
//! and `2024/3/5 08:30` are both accepted. Text without an offset is taken
//! as UTC; the returned [`OffsetDateTime`] always carries the UTC offset.
//!
//! [`format`] understands these tokens, everything else is copied:
//!
//! | token       | meaning                                |
//! |-------------|----------------------------------------|
//! | `yyyy` `yy` | year, or its last *n* digits           |
//! | `MM` `M`    | month, padded / unpadded               |
//! | `dd` `d`    | day of month                           |
//! | `HH` `H`    | hour, 0-23                             |
//! | `hh` `h`    | hour modulo 12 (midnight and noon = 0) |
//! | `mm` `m`    | minute                                 |
//! | `ss` `s`    | second                                 |
//! | `W`         | weekday name from [`DateConfig`]       |

use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::config::DateConfig;
use crate::errors::UtilError;
use crate::lang::Value;
use crate::number::pad_start_zero;

const MS_PER_DAY: i64 = 86_400_000;

/// Anything [`parse`] accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateSource<'a> {
    DateTime(OffsetDateTime),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Text(&'a str),
}

impl From<OffsetDateTime> for DateSource<'_> {
    fn from(dt: OffsetDateTime) -> Self { DateSource::DateTime(dt) }
}

impl From<i64> for DateSource<'_> {
    fn from(ms: i64) -> Self { DateSource::Timestamp(ms) }
}

impl<'a> From<&'a str> for DateSource<'a> {
    fn from(s: &'a str) -> Self { DateSource::Text(s) }
}

impl<'a> DateSource<'a> {
    /// Picks a source out of a dynamic value: dates, numbers and strings.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Date(dt) => Some(DateSource::DateTime(**dt)),
            Value::Number(n) if n.is_finite() => Some(DateSource::Timestamp(*n as i64)),
            Value::String(s) => Some(DateSource::Text(s)),
            _ => None,
        }
    }
}

fn invalid(source: &str) -> UtilError {
    UtilError::InvalidDate(source.to_string())
}

fn number<T: std::str::FromStr>(part: &str, source: &str) -> Result<T, UtilError> {
    part.trim().parse().map_err(|_| invalid(source))
}

fn parse_text(source: &str) -> Result<OffsetDateTime, UtilError> {
    let normalized = source.trim().replace('-', "/");
    let normalized = normalized.trim_end_matches(['Z', 'z']);

    let (date_part, time_part) = match normalized.split_once([' ', 'T']) {
        Some((d, t)) => (d, Some(t.trim())),
        None => (normalized, None),
    };

    let fields: Vec<&str> = date_part.split('/').collect();
    let [year, month, day] = fields[..] else {
        return Err(invalid(source));
    };
    let month: u8 = number(month, source)?;
    let date = Date::from_calendar_date(
        number(year, source)?,
        Month::try_from(month).map_err(|_| invalid(source))?,
        number(day, source)?,
    )
    .map_err(|_| invalid(source))?;

    let time = match time_part {
        None | Some("") => Time::MIDNIGHT,
        Some(t) => {
            let fields: Vec<&str> = t.split(':').collect();
            let (hour, minute, second) = match fields[..] {
                [h, m] => (h, m, "0"),
                [h, m, s] => (h, m, s),
                _ => return Err(invalid(source)),
            };
            let (second, milli) = second.split_once('.').unwrap_or((second, "0"));
            let milli = format!("{:0<3}", milli);
            Time::from_hms_milli(
                number(hour, source)?,
                number(minute, source)?,
                number(second, source)?,
                number(milli.get(..3).ok_or_else(|| invalid(source))?, source)?,
            )
            .map_err(|_| invalid(source))?
        }
    };

    Ok(PrimitiveDateTime::new(date, time).assume_utc())
}

/// Resolves `source` to a point in time.
pub fn parse<'a>(source: impl Into<DateSource<'a>>) -> Result<OffsetDateTime, UtilError> {
    match source.into() {
        DateSource::DateTime(dt) => Ok(dt),
        DateSource::Timestamp(ms) => {
            OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
                .map_err(|_| UtilError::TimestampOutOfRange(ms))
        }
        DateSource::Text(s) => parse_text(s).inspect_err(|e| log::debug!("date::parse: {e}")),
    }
}

fn numeric(value: u8, run: usize) -> String {
    if run == 1 { value.to_string() } else { pad_start_zero(value, 2) }
}

/// Formats `source` according to `pattern` using the default labels.
pub fn format<'a>(source: impl Into<DateSource<'a>>, pattern: &str) -> Result<String, UtilError> {
    format_with(&DateConfig::default(), source, pattern)
}

/// Formats `source` according to `pattern` with labels from `config`.
pub fn format_with<'a>(
    config: &DateConfig,
    source: impl Into<DateSource<'a>>,
    pattern: &str,
) -> Result<String, UtilError> {
    let dt = parse(source)?;
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();

        match c {
            'y' => {
                let year = dt.year().to_string();
                let keep = run.min(year.len());
                out.push_str(&year[year.len() - keep..]);
            }
            'M' => out.push_str(&numeric(dt.month() as u8, run)),
            'd' => out.push_str(&numeric(dt.day(), run)),
            'H' => out.push_str(&numeric(dt.hour(), run)),
            'h' => out.push_str(&numeric(dt.hour() % 12, run)),
            'm' => out.push_str(&numeric(dt.minute(), run)),
            's' => out.push_str(&numeric(dt.second(), run)),
            'W' => {
                let name = &config.weekday_names[dt.weekday().number_days_from_sunday() as usize];
                for _ in 0..run {
                    out.push_str(name);
                }
            }
            _ => out.extend(std::iter::repeat(c).take(run)),
        }

        i += run;
    }

    Ok(out)
}

/// Renders a duration such as `1天02时03分04秒` with the default labels.
pub fn to_time(duration_ms: i64) -> String {
    to_time_with(&DateConfig::default(), duration_ms)
}

/// Renders a duration in days, hours, minutes and seconds.
///
/// Leading units that are zero are left out; seconds are always shown.
/// Hours, minutes and seconds are padded to two digits.
pub fn to_time_with(config: &DateConfig, duration_ms: i64) -> String {
    let [day_unit, hour_unit, minute_unit, second_unit] = &config.duration_units;

    let total = duration_ms.max(0) / 1000;
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}{day_unit}"));
    }
    if days > 0 || hours > 0 {
        out.push_str(&format!("{}{hour_unit}", pad_start_zero(hours, 2)));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        out.push_str(&format!("{}{minute_unit}", pad_start_zero(minutes, 2)));
    }
    out.push_str(&format!("{}{second_unit}", pad_start_zero(seconds, 2)));
    out
}

/// Whole days to milliseconds; the fraction is dropped, not rounded.
///
/// Saturates at `i64::MIN`/`i64::MAX`. NaN counts as zero days.
pub fn to_milliseconds(days: f64) -> i64 {
    (days.trunc() as i64).saturating_mul(MS_PER_DAY)
}

/// `Thu, 01 Jan 1970 00:00:00 GMT`, the form used in cookie `expires`.
pub fn to_utc_string(dt: OffsetDateTime) -> Result<String, UtilError> {
    dt.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .map_err(|e| UtilError::InvalidDate(e.to_string()))
}

/// Inverse of [`to_utc_string`].
pub fn parse_utc_string(s: &str) -> Result<OffsetDateTime, UtilError> {
    PrimitiveDateTime::parse(
        s.trim(),
        format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ),
    )
    .map(PrimitiveDateTime::assume_utc)
    .map_err(|_| invalid(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parse_accepts_dashes_and_slashes() {
        let a = parse("1970-01-01 00:00:00").unwrap();
        assert_eq!(a, OffsetDateTime::UNIX_EPOCH);

        let b = parse("2024/3/5 8:30").unwrap();
        assert_eq!(b, datetime!(2024-03-05 08:30 UTC));

        let c = parse("2024-03-05T08:30:15.250Z").unwrap();
        assert_eq!(c, datetime!(2024-03-05 08:30:15.25 UTC));

        assert_eq!(parse("2024-03-05").unwrap(), datetime!(2024-03-05 0:00 UTC));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse("not a date"), Err(UtilError::InvalidDate(_))));
        assert!(parse("2024-13-01").is_err());
        assert!(parse("2024-02-30").is_err());
        assert!(parse("2024-02-03 25:00").is_err());
    }

    #[test]
    fn parse_timestamps_and_datetimes() {
        assert_eq!(parse(0i64).unwrap(), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(parse(86_400_000i64).unwrap(), datetime!(1970-01-02 0:00 UTC));
        let dt = datetime!(2001-02-03 04:05:06 UTC);
        assert_eq!(parse(dt).unwrap(), dt);
        assert!(matches!(parse(i64::MAX), Err(UtilError::TimestampOutOfRange(_))));
    }

    #[test]
    fn format_tokens() {
        let dt = datetime!(2024-03-05 08:07:09 UTC);
        assert_eq!(format(dt, "yyyy-MM-dd HH:mm:ss").unwrap(), "2024-03-05 08:07:09");
        assert_eq!(format(dt, "yy/M/d H:m:s").unwrap(), "24/3/5 8:7:9");
        // 2024-03-05 is a Tuesday
        assert_eq!(format(dt, "周W").unwrap(), "周二");
        assert_eq!(format("1970-01-01 00:00:00", "yyyy-MM-dd").unwrap(), "1970-01-01");
    }

    #[test]
    fn twelve_hour_clock_keeps_zero() {
        assert_eq!(format(datetime!(2024-01-01 0:05 UTC), "hh:mm").unwrap(), "00:05");
        assert_eq!(format(datetime!(2024-01-01 12:00 UTC), "h").unwrap(), "0");
        assert_eq!(format(datetime!(2024-01-01 15:00 UTC), "h").unwrap(), "3");
    }

    #[test]
    fn format_with_custom_weekdays() {
        let cfg = crate::config::UtilConfig::builder()
            .weekday_names(["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"])
            .build()
            .unwrap();
        let out = format_with(&cfg.date, datetime!(2024-03-10 0:00 UTC), "W, dd").unwrap();
        assert_eq!(out, "Sun, 10");
    }

    #[test]
    fn format_from_value() {
        let v = Value::from(datetime!(2020-01-02 0:00 UTC));
        let src = DateSource::from_value(&v).unwrap();
        assert_eq!(format(src, "yyyyMMdd").unwrap(), "20200102");

        let text = Value::from("2020-1-2");
        assert_eq!(format(DateSource::from_value(&text).unwrap(), "M/d").unwrap(), "1/2");
        assert!(DateSource::from_value(&Value::Null).is_none());
    }

    #[test]
    fn durations() {
        assert_eq!(to_time(0), "00秒");
        assert_eq!(to_time(45_000), "45秒");
        assert_eq!(to_time(125_000), "02分05秒");
        assert_eq!(to_time(3_723_000), "01时02分03秒");
        assert_eq!(to_time(90_061_000), "1天01时01分01秒");
        assert_eq!(to_time(86_400_000), "1天00时00分00秒");
        assert_eq!(to_time(-5), "00秒");
    }

    #[test]
    fn days_to_milliseconds_truncates() {
        assert_eq!(to_milliseconds(1.0), 86_400_000);
        assert_eq!(to_milliseconds(1.9), 86_400_000);
        assert_eq!(to_milliseconds(-1.0), -86_400_000);
        assert_eq!(to_milliseconds(0.5), 0);
    }

    #[test]
    fn days_to_milliseconds_saturates() {
        let limit = (i64::MAX / MS_PER_DAY) as f64;
        assert_eq!(to_milliseconds(limit), i64::MAX / MS_PER_DAY * MS_PER_DAY);
        assert_eq!(to_milliseconds(limit + 1.0), i64::MAX);
        assert_eq!(to_milliseconds(1e12), i64::MAX);
        assert_eq!(to_milliseconds(-1e12), i64::MIN);
        assert_eq!(to_milliseconds(f64::INFINITY), i64::MAX);
        assert_eq!(to_milliseconds(f64::NAN), 0);
    }

    #[test]
    fn utc_string_round_trip() {
        let s = to_utc_string(OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(s, "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(parse_utc_string(&s).unwrap(), OffsetDateTime::UNIX_EPOCH);
        assert!(parse_utc_string("yesterday").is_err());
    }
}
