//! Conversions for the two timestamp encodings found in OLE and MAPI data.
//!
//! - FILETIME: unsigned 64-bit count of 100ns ticks since 1601-01-01 UTC.
//! - Floating time (OLE automation date): `f64` days since 1899-12-30.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01
pub const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// FILETIME ticks per second (100ns resolution)
pub const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

/// Unix seconds of 9999-12-31T23:59:59, the last second a FILETIME may decode to
pub const MAX_FILETIME_UNIX_SECS: i64 = 253_402_300_799;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert FILETIME ticks to a UTC timestamp.
///
/// Returns `None` for instants after 9999-12-31T23:59:59, so sentinel values
/// such as `u64::MAX` are reported as failed conversions.
///
/// # Examples
///
/// ```
/// use loquat::common::time::filetime_to_datetime;
/// let dt = filetime_to_datetime(116_444_736_000_000_000).unwrap();
/// assert_eq!(dt.timestamp(), 0);
/// ```
pub fn filetime_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(ticks / FILETIME_TICKS_PER_SEC).ok()?;
    let nanos = u32::try_from((ticks % FILETIME_TICKS_PER_SEC) * 100).ok()?;
    let unix_secs = secs.checked_sub(FILETIME_UNIX_OFFSET_SECS)?;
    if unix_secs > MAX_FILETIME_UNIX_SECS {
        return None;
    }
    DateTime::from_timestamp(unix_secs, nanos)
}

/// Convert a UTC timestamp back to FILETIME ticks.
///
/// Returns `None` for instants before 1601 or after 9999-12-31T23:59:59.
/// Sub-100ns precision is truncated.
pub fn datetime_to_filetime(dt: &DateTime<Utc>) -> Option<u64> {
    if dt.timestamp() > MAX_FILETIME_UNIX_SECS {
        return None;
    }
    let secs = u64::try_from(dt.timestamp().checked_add(FILETIME_UNIX_OFFSET_SECS)?).ok()?;
    let sub_ticks = u64::from(dt.timestamp_subsec_nanos() / 100);
    secs.checked_mul(FILETIME_TICKS_PER_SEC)?
        .checked_add(sub_ticks)
}

fn floating_time_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert an OLE automation date (days since 1899-12-30) to a naive timestamp.
///
/// Floating times carry no zone. Returns `None` for non-finite or out-of-range values.
///
/// # Examples
///
/// ```
/// use loquat::common::time::floating_time_to_datetime;
/// let dt = floating_time_to_datetime(2.5).unwrap();
/// assert_eq!(dt.to_string(), "1900-01-01 12:00:00");
/// ```
pub fn floating_time_to_datetime(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() {
        return None;
    }
    let millis = (days * SECONDS_PER_DAY * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    floating_time_epoch().checked_add_signed(TimeDelta::try_milliseconds(millis as i64)?)
}

/// Convert a naive timestamp to an OLE automation date.
pub fn datetime_to_floating_time(dt: &NaiveDateTime) -> f64 {
    let delta = *dt - floating_time_epoch();
    delta.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}
