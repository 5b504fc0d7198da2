//! Conversion between stored values and typed host values.
//!
//! [`to_storage`] turns any [`HostValue`] into exactly one stored [`Value`]
//! according to [`TypeOptions`]. [`from_storage`] reads a stored value back
//! into the requested [`HostKind`], accepting every representation the
//! options could have produced plus the engine's own date/time text.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::CoercionError;
use crate::options::{DateTimeFormat, GuidFormat, TypeOptions};
use crate::types::HostKind;
use crate::value::{HostValue, Value};

/// 100-nanosecond ticks between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
/// 100-nanosecond ticks between 1601-01-01 and the Unix epoch.
const FILETIME_EPOCH_TICKS: i64 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// OLE automation day number of the Unix epoch.
const OLE_UNIX_EPOCH_DAYS: f64 = 25_569.0;
/// Julian day number of the Unix epoch.
const JULIAN_UNIX_EPOCH_DAYS: f64 = 2_440_587.5;

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
const ENGINE_NATIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Converts a typed value into its stored representation.
///
/// # Examples
///
/// ```
/// use objectsql_core::{coerce, HostValue, TypeOptions, Value};
///
/// let options = TypeOptions::default();
/// assert_eq!(coerce::to_storage(&HostValue::Bool(true), &options), Value::Integer(1));
/// assert_eq!(coerce::to_storage(&HostValue::Null, &options), Value::Null);
/// ```
pub fn to_storage(value: &HostValue, options: &TypeOptions) -> Value {
    match value {
        HostValue::Null => Value::Null,
        HostValue::Bool(v) => Value::Integer(i64::from(*v)),
        HostValue::Int(v) => Value::Integer(*v),
        #[allow(clippy::cast_possible_wrap)]
        HostValue::UInt(v) => Value::Integer(*v as i64),
        HostValue::Float(v) => Value::Real(*v),
        HostValue::Decimal(v) => {
            if options.decimal_as_blob {
                Value::Blob(v.serialize().to_vec())
            } else {
                Value::Text(v.to_string())
            }
        }
        HostValue::Guid(v) => {
            if options.guid_as_blob {
                Value::Blob(v.as_bytes().to_vec())
            } else {
                Value::Text(format_guid(v, options.guid_format))
            }
        }
        HostValue::DateTime(v) => date_time_to_storage(&v.fixed_offset(), options.date_time_format),
        HostValue::DateTimeOffset(v) => date_time_to_storage(v, options.date_time_format),
        HostValue::TimeSpan(v) => match time_span_ticks(v) {
            Some(ticks) if options.timespan_as_ticks => Value::Integer(ticks),
            // Durations beyond the tick range are kept as text.
            _ => Value::Text(format_time_span(v)),
        },
        HostValue::Text(v) => Value::Text(v.clone()),
        HostValue::Bytes(v) => Value::Blob(v.clone()),
    }
}

/// Reads a stored value back as `kind`.
///
/// NULL always yields [`HostValue::Null`]; whether that is acceptable is
/// up to the target field type.
///
/// # Errors
///
/// Returns a [`CoercionError`] when the stored value cannot represent the
/// requested kind.
pub fn from_storage(
    value: &Value,
    kind: HostKind,
    options: &TypeOptions,
) -> Result<HostValue, CoercionError> {
    let fail = || CoercionError::new(value.describe(), format!("{kind:?}"));
    if value.is_null() {
        return Ok(HostValue::Null);
    }

    match kind {
        HostKind::Bool => match value {
            Value::Integer(v) => Ok(HostValue::Bool(*v != 0)),
            Value::Real(v) => Ok(HostValue::Bool(*v != 0.0)),
            Value::Text(v) => match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(HostValue::Bool(true)),
                "false" | "0" => Ok(HostValue::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        HostKind::I8 | HostKind::I16 | HostKind::I32 | HostKind::I64 | HostKind::Enum => {
            match value {
                Value::Integer(v) => Ok(HostValue::Int(*v)),
                #[allow(clippy::cast_possible_truncation)]
                Value::Real(v) if v.fract() == 0.0 => Ok(HostValue::Int(*v as i64)),
                Value::Text(v) => v.trim().parse().map(HostValue::Int).map_err(|_| fail()),
                _ => Err(fail()),
            }
        }
        HostKind::U8 | HostKind::U16 | HostKind::U32 | HostKind::U64 => match value {
            #[allow(clippy::cast_sign_loss)]
            Value::Integer(v) => Ok(HostValue::UInt(*v as u64)),
            Value::Text(v) => v.trim().parse().map(HostValue::UInt).map_err(|_| fail()),
            _ => Err(fail()),
        },
        HostKind::F32 | HostKind::F64 => match value {
            Value::Real(v) => Ok(HostValue::Float(*v)),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(v) => Ok(HostValue::Float(*v as f64)),
            Value::Text(v) => v.trim().parse().map(HostValue::Float).map_err(|_| fail()),
            Value::Blob(_) | Value::Null => Err(fail()),
        },
        HostKind::Decimal => match value {
            Value::Text(v) => v.trim().parse::<Decimal>().map(HostValue::Decimal).map_err(|_| fail()),
            Value::Integer(v) => Ok(HostValue::Decimal(Decimal::from(*v))),
            Value::Real(v) => Decimal::try_from(*v).map(HostValue::Decimal).map_err(|_| fail()),
            Value::Blob(v) => {
                let bytes: [u8; 16] = v.as_slice().try_into().map_err(|_| fail())?;
                Ok(HostValue::Decimal(Decimal::deserialize(bytes)))
            }
            Value::Null => Err(fail()),
        },
        HostKind::Guid => match value {
            Value::Blob(v) => Uuid::from_slice(v).map(HostValue::Guid).map_err(|_| fail()),
            Value::Text(v) => parse_guid(v).map(HostValue::Guid).ok_or_else(fail),
            _ => Err(fail()),
        },
        HostKind::DateTime => date_time_from_storage(value, options.date_time_format)
            .map(|v| HostValue::DateTime(v.with_timezone(&Utc)))
            .ok_or_else(fail),
        HostKind::DateTimeOffset => date_time_from_storage(value, options.date_time_format)
            .map(HostValue::DateTimeOffset)
            .ok_or_else(fail),
        HostKind::TimeSpan => match value {
            Value::Integer(v) => Ok(HostValue::TimeSpan(time_span_from_ticks(*v))),
            Value::Text(v) => parse_time_span(v).map(HostValue::TimeSpan).ok_or_else(fail),
            _ => Err(fail()),
        },
        HostKind::Text | HostKind::Json => match value {
            Value::Text(v) => Ok(HostValue::Text(v.clone())),
            Value::Integer(v) => Ok(HostValue::Text(v.to_string())),
            Value::Real(v) => Ok(HostValue::Text(v.to_string())),
            Value::Blob(v) => String::from_utf8(v.clone()).map(HostValue::Text).map_err(|_| fail()),
            Value::Null => Err(fail()),
        },
        HostKind::Bytes => match value {
            Value::Blob(v) => Ok(HostValue::Bytes(v.clone())),
            Value::Text(v) => Ok(HostValue::Bytes(v.as_bytes().to_vec())),
            _ => Err(fail()),
        },
        HostKind::Reference | HostKind::Custom => Ok(raw_host_value(value)),
    }
}

/// Maps a stored value to the host value of the same shape.
pub fn raw_host_value(value: &Value) -> HostValue {
    match value {
        Value::Null => HostValue::Null,
        Value::Integer(v) => HostValue::Int(*v),
        Value::Real(v) => HostValue::Float(*v),
        Value::Text(v) => HostValue::Text(v.clone()),
        Value::Blob(v) => HostValue::Bytes(v.clone()),
    }
}

/// Formats an identifier according to `format`.
pub fn format_guid(value: &Uuid, format: GuidFormat) -> String {
    match format {
        GuidFormat::Digits => value.simple().to_string(),
        GuidFormat::Hyphens => value.hyphenated().to_string(),
        GuidFormat::Braces => value.braced().to_string(),
        GuidFormat::Parentheses => format!("({})", value.hyphenated()),
    }
}

/// Parses an identifier in any of the [`GuidFormat`] layouts.
pub fn parse_guid(text: &str) -> Option<Uuid> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    Uuid::parse_str(inner).ok()
}

fn date_time_to_storage(value: &DateTime<FixedOffset>, format: DateTimeFormat) -> Value {
    let utc = value.with_timezone(&Utc);
    match format {
        DateTimeFormat::Ticks => ticks_or_text(value, &utc, UNIX_EPOCH_TICKS),
        DateTimeFormat::FileTime | DateTimeFormat::FileTimeUtc => {
            ticks_or_text(value, &utc, FILETIME_EPOCH_TICKS)
        }
        DateTimeFormat::UnixTimeSeconds => Value::Integer(utc.timestamp()),
        DateTimeFormat::UnixTimeMilliseconds => Value::Integer(utc.timestamp_millis()),
        #[allow(clippy::cast_precision_loss)]
        DateTimeFormat::OleAutomation => {
            Value::Real(utc.timestamp_millis() as f64 / MILLIS_PER_DAY + OLE_UNIX_EPOCH_DAYS)
        }
        #[allow(clippy::cast_precision_loss)]
        DateTimeFormat::JulianDayNumbers => {
            Value::Real(utc.timestamp_millis() as f64 / MILLIS_PER_DAY + JULIAN_UNIX_EPOCH_DAYS)
        }
        DateTimeFormat::Rfc1123 => Value::Text(utc.format(RFC1123_FORMAT).to_string()),
        DateTimeFormat::RoundTrip => Value::Text(format_offset(value, 7)),
        DateTimeFormat::Iso8601 => Value::Text(format_offset(value, 3)),
        DateTimeFormat::EngineNative => Value::Text(utc.format(ENGINE_NATIVE_FORMAT).to_string()),
    }
}

/// RFC 3339 text with `digits` fractional digits (7 or 3).
fn format_offset(value: &DateTime<FixedOffset>, digits: u32) -> String {
    let nanos = value.timestamp_subsec_nanos();
    let fraction = if digits == 7 {
        format!("{:07}", nanos / 100)
    } else {
        format!("{:03}", nanos / 1_000_000)
    };
    let offset = if value.offset().local_minus_utc() == 0 {
        "Z".to_string()
    } else {
        value.format("%:z").to_string()
    };
    format!("{}.{fraction}{offset}", value.format("%Y-%m-%dT%H:%M:%S"))
}

fn unix_ticks(value: &DateTime<Utc>) -> Option<i64> {
    value
        .timestamp()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(i64::from(value.timestamp_subsec_nanos() / 100))
}

/// Tick count from `epoch`, or round-trip text for instants outside the tick range.
fn ticks_or_text(value: &DateTime<FixedOffset>, utc: &DateTime<Utc>, epoch: i64) -> Value {
    match unix_ticks(utc).and_then(|ticks| ticks.checked_add(epoch)) {
        Some(ticks) => Value::Integer(ticks),
        None => Value::Text(format_offset(value, 7)),
    }
}

fn from_unix_ticks(ticks: i64) -> Option<DateTime<FixedOffset>> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(secs, nanos).map(|v| v.fixed_offset())
}

fn from_days(days: f64, epoch_days: f64) -> Option<DateTime<FixedOffset>> {
    #[allow(clippy::cast_possible_truncation)]
    let millis = ((days - epoch_days) * MILLIS_PER_DAY).round() as i64;
    Utc.timestamp_millis_opt(millis).single().map(|v| v.fixed_offset())
}

fn date_time_from_storage(value: &Value, format: DateTimeFormat) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Integer(v) => match format {
            DateTimeFormat::Ticks => from_unix_ticks(v.checked_sub(UNIX_EPOCH_TICKS)?),
            DateTimeFormat::FileTime | DateTimeFormat::FileTimeUtc => {
                from_unix_ticks(v.checked_sub(FILETIME_EPOCH_TICKS)?)
            }
            DateTimeFormat::UnixTimeMilliseconds => {
                Utc.timestamp_millis_opt(*v).single().map(|d| d.fixed_offset())
            }
            _ => DateTime::from_timestamp(*v, 0).map(|d| d.fixed_offset()),
        },
        Value::Real(v) => match format {
            DateTimeFormat::OleAutomation => from_days(*v, OLE_UNIX_EPOCH_DAYS),
            _ => from_days(*v, JULIAN_UNIX_EPOCH_DAYS),
        },
        Value::Text(v) => parse_date_time(v),
        Value::Blob(_) | Value::Null => None,
    }
}

/// Parses date/time text in any representation the options can produce.
///
/// Text without an offset is read as UTC.
pub fn parse_date_time(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(v) = DateTime::parse_from_rfc3339(text) {
        return Some(v);
    }
    if let Ok(v) = NaiveDateTime::parse_from_str(text, RFC1123_FORMAT) {
        return Some(v.and_utc().fixed_offset());
    }
    if let Ok(v) = DateTime::parse_from_rfc2822(text) {
        return Some(v);
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|v| v.and_utc().fixed_offset())
}

/// Duration as 100-nanosecond ticks, or `None` when it does not fit.
pub fn time_span_ticks(value: &TimeDelta) -> Option<i64> {
    value
        .num_seconds()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(i64::from(value.subsec_nanos() / 100))
}

/// Duration from 100-nanosecond ticks.
pub fn time_span_from_ticks(ticks: i64) -> TimeDelta {
    TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * 100)
}

/// Formats a duration as `[-][d.]hh:mm:ss[.fffffff]`.
///
/// # Examples
///
/// ```
/// use chrono::TimeDelta;
/// use objectsql_core::coerce::format_time_span;
///
/// assert_eq!(format_time_span(&TimeDelta::minutes(90)), "01:30:00");
/// assert_eq!(format_time_span(&(TimeDelta::days(2) + TimeDelta::milliseconds(5))), "2.00:00:00.0050000");
/// assert_eq!(format_time_span(&-TimeDelta::seconds(1)), "-00:00:01");
/// ```
pub fn format_time_span(value: &TimeDelta) -> String {
    let abs = value.abs();
    let total_seconds = abs.num_seconds().unsigned_abs();
    let fraction = abs.subsec_nanos().unsigned_abs() / 100;
    let sign = if *value < TimeDelta::zero() && (total_seconds > 0 || fraction > 0) {
        "-"
    } else {
        ""
    };

    let days = total_seconds / 86_400;
    let rest = total_seconds % 86_400;
    let (hours, minutes, seconds) = (rest / 3600, rest / 60 % 60, rest % 60);

    let mut out = String::from(sign);
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if fraction > 0 {
        out.push_str(&format!(".{fraction:07}"));
    }
    out
}

/// Parses the `[-][d.]hh:mm:ss[.fffffff]` duration layout.
pub fn parse_time_span(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (clock, fraction) = match body.split_once('.') {
        // A dot before the first colon separates days, not fractions.
        Some((head, tail)) if !head.contains(':') => match tail.split_once('.') {
            Some((clock, fraction)) => (format!("{head}.{clock}"), Some(fraction)),
            None => (format!("{head}.{tail}"), None),
        },
        Some((clock, fraction)) => (clock.to_string(), Some(fraction)),
        None => (body.to_string(), None),
    };

    let (days, clock) = match clock.split_once('.') {
        Some((days, clock)) => (days.parse::<i64>().ok()?, clock.to_string()),
        None => (0, clock),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: i64 = parts[0].parse().ok()?;
    let minutes: i64 = parts[1].parse().ok()?;
    let seconds: i64 = parts[2].parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let total_seconds = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3600)?)?
        .checked_add(minutes * 60 + seconds)?;
    let mut span = TimeDelta::try_seconds(total_seconds)?;
    if let Some(fraction) = fraction {
        if fraction.is_empty() || fraction.len() > 7 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let ticks = format!("{fraction:0<7}").parse::<i64>().ok()?;
        span = span.checked_add(&TimeDelta::nanoseconds(ticks * 100))?;
    }

    Some(if negative { -span } else { span })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 26).unwrap()
    }

    fn options_with(format: DateTimeFormat) -> TypeOptions {
        TypeOptions {
            date_time_format: format,
            ..TypeOptions::default()
        }
    }

    #[test]
    fn test_every_date_time_format_roundtrips_whole_seconds() {
        let formats = [
            DateTimeFormat::Ticks,
            DateTimeFormat::FileTime,
            DateTimeFormat::FileTimeUtc,
            DateTimeFormat::UnixTimeSeconds,
            DateTimeFormat::UnixTimeMilliseconds,
            DateTimeFormat::OleAutomation,
            DateTimeFormat::JulianDayNumbers,
            DateTimeFormat::Rfc1123,
            DateTimeFormat::RoundTrip,
            DateTimeFormat::Iso8601,
            DateTimeFormat::EngineNative,
        ];
        let instant = sample_instant();
        for format in formats {
            let options = options_with(format);
            let stored = to_storage(&HostValue::DateTime(instant), &options);
            let back = from_storage(&stored, HostKind::DateTime, &options).unwrap();
            assert_eq!(back, HostValue::DateTime(instant), "{format:?} stored as {stored:?}");
        }
    }

    #[test]
    fn test_known_date_time_encodings() {
        let instant = sample_instant();
        let ticks = to_storage(&HostValue::DateTime(instant), &options_with(DateTimeFormat::Ticks));
        assert_eq!(ticks, Value::Integer(638_455_899_260_000_000));

        let rfc = to_storage(&HostValue::DateTime(instant), &options_with(DateTimeFormat::Rfc1123));
        assert_eq!(rfc, Value::Text("Sat, 09 Mar 2024 14:05:26 GMT".into()));

        let native = to_storage(&HostValue::DateTime(instant), &options_with(DateTimeFormat::EngineNative));
        assert_eq!(native, Value::Text("2024-03-09 14:05:26.000".into()));

        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let julian = to_storage(&HostValue::DateTime(epoch), &options_with(DateTimeFormat::JulianDayNumbers));
        assert_eq!(julian, Value::Real(2_440_587.5));
    }

    #[test]
    fn test_round_trip_keeps_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let instant = offset.with_ymd_and_hms(2024, 3, 9, 16, 5, 26).unwrap();
        let options = TypeOptions::default();
        let stored = to_storage(&HostValue::DateTimeOffset(instant), &options);
        assert_eq!(stored, Value::Text("2024-03-09T16:05:26.0000000+02:00".into()));
        match from_storage(&stored, HostKind::DateTimeOffset, &options).unwrap() {
            HostValue::DateTimeOffset(v) => {
                assert_eq!(v, instant);
                assert_eq!(v.offset().local_minus_utc(), 7200);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_values_do_not_overflow() {
        assert_eq!(parse_time_span("999999999999999.00:00:00"), None);
        assert_eq!(parse_time_span("00:00:00.5"), Some(TimeDelta::milliseconds(500)));

        let options = TypeOptions {
            timespan_as_ticks: true,
            ..TypeOptions::default()
        };
        let long = TimeDelta::days(40_000 * 365);
        assert_eq!(time_span_ticks(&long), None);
        let stored = to_storage(&HostValue::TimeSpan(long), &options);
        assert!(matches!(stored, Value::Text(_)));
        assert_eq!(
            from_storage(&stored, HostKind::TimeSpan, &options),
            Ok(HostValue::TimeSpan(long))
        );
        assert!(from_storage(&Value::Text("99999999999999.00:00:00".into()), HostKind::TimeSpan, &options).is_err());

        let far = Utc.with_ymd_and_hms(200_000, 1, 1, 0, 0, 0).unwrap();
        let ticks = options_with(DateTimeFormat::Ticks);
        assert!(matches!(to_storage(&HostValue::DateTime(far), &ticks), Value::Text(_)));
        assert!(from_storage(&Value::Integer(i64::MIN), HostKind::DateTime, &ticks).is_err());
    }

    #[test]
    fn test_time_span_text_and_ticks() {
        let span = TimeDelta::days(3) + TimeDelta::hours(4) + TimeDelta::microseconds(1_500_000);
        assert_eq!(format_time_span(&span), "3.04:00:01.5000000");
        assert_eq!(parse_time_span("3.04:00:01.5000000"), Some(span));
        assert_eq!(parse_time_span("-00:00:01"), Some(-TimeDelta::seconds(1)));
        assert_eq!(parse_time_span("12:61:00"), None);
        assert_eq!(time_span_ticks(&-span).map(time_span_from_ticks), Some(-span));
    }

    #[test]
    fn test_guid_formats() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        for format in [GuidFormat::Digits, GuidFormat::Hyphens, GuidFormat::Braces, GuidFormat::Parentheses] {
            let text = format_guid(&id, format);
            assert_eq!(parse_guid(&text), Some(id), "{text}");
        }
        assert_eq!(format_guid(&id, GuidFormat::Digits), "67e5504410b1426f9247bb680e5fe0c8");
        assert_eq!(format_guid(&id, GuidFormat::Parentheses), "(67e55044-10b1-426f-9247-bb680e5fe0c8)");
    }

    #[test]
    fn test_decimal_blob_and_text() {
        let amount: Decimal = "1234.5678".parse().unwrap();
        let mut options = TypeOptions::default();
        assert_eq!(to_storage(&HostValue::Decimal(amount), &options), Value::Text("1234.5678".into()));

        options.decimal_as_blob = true;
        let stored = to_storage(&HostValue::Decimal(amount), &options);
        assert!(matches!(stored, Value::Blob(ref b) if b.len() == 16));
        assert_eq!(from_storage(&stored, HostKind::Decimal, &options).unwrap(), HostValue::Decimal(amount));
    }

    #[test]
    fn test_unsigned_wraps_through_integer() {
        let options = TypeOptions::default();
        let stored = to_storage(&HostValue::UInt(u64::MAX), &options);
        assert_eq!(stored, Value::Integer(-1));
        assert_eq!(from_storage(&stored, HostKind::U64, &options).unwrap(), HostValue::UInt(u64::MAX));
    }

    #[test]
    fn test_unsupported_inverse_is_error() {
        let options = TypeOptions::default();
        assert!(from_storage(&Value::Blob(vec![1, 2]), HostKind::I32, &options).is_err());
        assert!(from_storage(&Value::Text("maybe".into()), HostKind::Bool, &options).is_err());
        assert_eq!(from_storage(&Value::Null, HostKind::I32, &options).unwrap(), HostValue::Null);
    }
}
