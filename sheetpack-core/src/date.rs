//! Date serial conversion.
//!
//! Spreadsheet serials count days from an epoch the day before 1900-01-01,
//! with the historical quirk that 1900 is treated as a leap year: serial 60
//! names the nonexistent 1900-02-29. No compensation is applied; serials 61
//! and up are shifted by one day so real dates round-trip the way consumer
//! spreadsheet applications expect.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};

use crate::error::{Result, SheetpackError};

const SECONDS_PER_DAY: f64 = 86_400.0;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()
}

/// First real date affected by the phantom 1900-02-29.
fn leap_bug_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).unwrap()
}

/// Convert a wall-clock date/time to a spreadsheet serial.
pub fn to_serial(dt: NaiveDateTime) -> f64 {
    let mut days = (dt.date() - epoch()).num_days();
    if dt.date() >= leap_bug_cutoff() {
        days += 1;
    }
    let seconds = dt.num_seconds_from_midnight() as f64
        + dt.nanosecond() as f64 / 1_000_000_000.0;
    days as f64 + seconds / SECONDS_PER_DAY
}

/// Convert a spreadsheet serial back to a wall-clock date/time.
///
/// The phantom serial 60 maps forward to 1900-03-01. The time-of-day
/// fraction is rounded to the nearest millisecond to absorb float drift.
pub fn from_serial(serial: f64) -> Result<NaiveDateTime> {
    if !serial.is_finite() {
        return Err(SheetpackError::InvalidContent(format!(
            "date serial out of range: {}",
            serial
        )));
    }
    let mut days = serial.floor() as i64;
    let fraction = serial - serial.floor();
    if days >= 61 {
        days -= 1;
    }
    let date = epoch()
        .checked_add_signed(chrono::Duration::days(days))
        .ok_or_else(|| {
            SheetpackError::InvalidContent(format!("date serial out of range: {}", serial))
        })?;
    let millis = (fraction * SECONDS_PER_DAY * 1000.0).round() as i64;
    let time = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| {
            SheetpackError::InvalidContent(format!("date serial out of range: {}", serial))
        })?
        + chrono::Duration::milliseconds(millis);
    Ok(time)
}

/// Serial for an absolute instant, using the local wall clock at that
/// instant. Re-deriving the offset at the target date (rather than reusing
/// the epoch's offset) absorbs daylight-saving drift between the two.
pub fn serial_from_local(dt: DateTime<Local>) -> f64 {
    to_serial(dt.naive_local())
}

/// Absolute instant for a serial, interpreted in the local zone. Falls back
/// to the earlier offset on ambiguous wall-clock times.
pub fn serial_to_local(serial: f64) -> Result<DateTime<Local>> {
    let naive = from_serial(serial)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| {
            SheetpackError::InvalidContent(format!(
                "serial {} maps to a nonexistent local time",
                serial
            ))
        })
}
