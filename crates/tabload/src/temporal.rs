//! Date and timestamp parsing.
//!
//! Arrow's CSV decoder only understands ISO-8601 style timestamps. Exported
//! spreadsheets commonly contain US style dates and 12 hour clocks, so
//! temporal columns are decoded as strings and converted here instead.
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Date32Array, Date64Array, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tabload_error::{ErrorKind, Result, TabloadError};

/// Formats carrying a UTC offset. Values are normalized to UTC.
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%B %d, %Y",
];

/// What a string value looks like, temporally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    /// Calendar date with no time component.
    Date,
    /// Date and time of day, possibly with an offset.
    DateTime,
}

pub fn classify(s: &str) -> Option<TemporalKind> {
    let s = s.trim();
    if parse_date(s).is_some() {
        return Some(TemporalKind::Date);
    }
    if parse_datetime_only(s).is_some() {
        return Some(TemporalKind::DateTime);
    }
    None
}

/// Parse a date-only value.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

/// Parse a value into a UTC datetime. Dates are accepted as midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    parse_datetime_only(s).or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_datetime_only(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    if let Some(dt) = OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(s, format).ok())
    {
        return Some(dt.naive_utc());
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

fn days_since_epoch(date: NaiveDate) -> Option<i32> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    i32::try_from(date.signed_duration_since(epoch).num_days()).ok()
}

fn to_unit(dt: NaiveDateTime, unit: &TimeUnit) -> Option<i64> {
    let dt = dt.and_utc();
    match unit {
        TimeUnit::Second => Some(dt.timestamp()),
        TimeUnit::Millisecond => Some(dt.timestamp_millis()),
        TimeUnit::Microsecond => Some(dt.timestamp_micros()),
        TimeUnit::Nanosecond => dt.timestamp_nanos_opt(),
    }
}

/// Convert a column of strings into `target`.
///
/// Values are truncated to the precision of `target`: fractional seconds
/// beyond the timestamp unit are dropped, and date targets keep only the
/// calendar date of values carrying a time of day.
///
/// `first_record` is the 1-based record number of the first value, used in
/// error messages.
pub fn convert_column(
    array: &StringArray,
    target: &DataType,
    column: &str,
    first_record: usize,
) -> Result<ArrayRef> {
    let converted: ArrayRef = match target {
        DataType::Date32 => {
            let values = parse_each(array, target, column, first_record, |s| {
                parse_datetime(s).and_then(|dt| days_since_epoch(dt.date()))
            })?;
            Arc::new(Date32Array::from(values))
        }
        DataType::Date64 => {
            let values = parse_each(array, target, column, first_record, |s| {
                parse_datetime(s)
                    .and_then(|dt| days_since_epoch(dt.date()))
                    .map(|days| days as i64 * 86_400_000)
            })?;
            Arc::new(Date64Array::from(values))
        }
        DataType::Timestamp(unit, tz) => {
            let values = parse_each(array, target, column, first_record, |s| {
                parse_datetime(s).and_then(|dt| to_unit(dt, unit))
            })?;
            match unit {
                TimeUnit::Second => {
                    Arc::new(TimestampSecondArray::from(values).with_timezone_opt(tz.clone()))
                }
                TimeUnit::Millisecond => {
                    Arc::new(TimestampMillisecondArray::from(values).with_timezone_opt(tz.clone()))
                }
                TimeUnit::Microsecond => {
                    Arc::new(TimestampMicrosecondArray::from(values).with_timezone_opt(tz.clone()))
                }
                TimeUnit::Nanosecond => {
                    Arc::new(TimestampNanosecondArray::from(values).with_timezone_opt(tz.clone()))
                }
            }
        }
        other => {
            return Err(TabloadError::new(format!(
                "Column '{column}' has non-temporal type {other}"
            )))
        }
    };

    Ok(converted)
}

fn parse_each<T>(
    array: &StringArray,
    target: &DataType,
    column: &str,
    first_record: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    let mut values = Vec::with_capacity(array.len());
    for (idx, value) in array.iter().enumerate() {
        let parsed = match value {
            Some(s) => Some(parse(s).ok_or_else(|| {
                TabloadError::with_kind(
                    ErrorKind::InvalidValue,
                    format!(
                        "Failed to parse '{s}' as {target} for column '{column}' at record {}",
                        first_record + idx
                    ),
                )
            })?),
            None => None,
        };
        values.push(parsed);
    }
    Ok(values)
}
