//! Conversions between system time and ZIP (MS-DOS) timestamps.
//!
//! ZIP headers store a local date/time with two-second resolution and a year
//! range of 1980..=2107. Timestamps written by this crate are UTC.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use zip::DateTime;

use crate::ArchiveError;
use crate::Result;

const SECONDS_PER_DAY: i64 = 86_400;

/// Returns the current time as a ZIP timestamp.
///
/// Falls back to the earliest representable timestamp (1980-01-01) if the
/// system clock is outside the MS-DOS range.
pub fn now() -> DateTime {
    from_system_time(SystemTime::now()).unwrap_or_default()
}

/// Converts a system time to a ZIP timestamp (UTC).
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidTimestamp`] if the time falls outside
/// 1980-01-01..=2107-12-31.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use zipwright_core::timestamp::from_system_time;
///
/// // 2001-09-09 01:46:40 UTC
/// let time = UNIX_EPOCH + Duration::from_secs(1_000_000_000);
/// let dt = from_system_time(time)?;
/// assert_eq!((dt.year(), dt.month(), dt.day()), (2001, 9, 9));
/// assert_eq!((dt.hour(), dt.minute(), dt.second()), (1, 46, 40));
///
/// assert!(from_system_time(UNIX_EPOCH).is_err());
/// # Ok::<(), zipwright_core::ArchiveError>(())
/// ```
pub fn from_system_time(time: SystemTime) -> Result<DateTime> {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
    };

    let days = secs.div_euclid(SECONDS_PER_DAY);
    let rem = secs.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = civil_from_days(days);

    let out_of_range = || ArchiveError::InvalidTimestamp { year, month, day };
    if !(1980..=2107).contains(&year) {
        return Err(out_of_range());
    }

    DateTime::from_date_and_time(
        year as u16,
        month as u8,
        day as u8,
        (rem / 3600) as u8,
        ((rem % 3600) / 60) as u8,
        (rem % 60) as u8,
    )
    .map_err(|_| out_of_range())
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
