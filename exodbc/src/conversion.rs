//! Helpers for the unicode boundary and for rendering the ODBC date and time structs as SQL
//! literals.
//!
//! All application facing strings of this crate are UTF-8. Conversion to UTF-16 happens at the
//! ODBC boundary, since the crate uses the wide entry points throughout.

use odbc_sys::{Date, Numeric, Time, Timestamp};
use widestring::U16String;

use crate::error::{ConversionDirection, Error};

/// Convert a UTF-8 string slice into its UTF-16 representation. Valid UTF-8 always recodes, so
/// this direction cannot fail.
pub fn utf8_to_utf16(text: &str) -> Vec<u16> {
    U16String::from_str(text).into_vec()
}

/// Convert UTF-16 encoded text into an owned UTF-8 string.
pub fn utf16_to_utf8(text: &[u16]) -> Result<String, Error> {
    String::from_utf16(text).map_err(|cause| Error::Conversion {
        direction: ConversionDirection::Utf16ToUtf8,
        message: cause.to_string(),
    })
}

/// Initialize a `SQL_TIME_STRUCT`.
pub fn init_time(hour: u16, minute: u16, second: u16) -> Time {
    Time {
        hour,
        minute,
        second,
    }
}

/// Initialize a `SQL_DATE_STRUCT`.
pub fn init_date(day: u16, month: u16, year: i16) -> Date {
    Date { year, month, day }
}

/// Initialize a `SQL_TIMESTAMP_STRUCT`.
pub fn init_timestamp(
    hour: u16,
    minute: u16,
    second: u16,
    fraction: u32,
    day: u16,
    month: u16,
    year: i16,
) -> Timestamp {
    Timestamp {
        year,
        month,
        day,
        hour,
        minute,
        second,
        fraction,
    }
}

/// Renders a date as `YYYY-MM-DD`.
pub fn date_to_sql_string(date: &Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year, date.month, date.day)
}

/// Renders a time as `hh:mm:ss`.
pub fn time_to_sql_string(time: &Time) -> String {
    format!("{:02}:{:02}:{:02}", time.hour, time.minute, time.second)
}

/// Renders a timestamp as `YYYY-MM-DD hh:mm:ss`, with the fraction appended if requested.
pub fn timestamp_to_sql_string(ts: &Timestamp, include_fraction: bool) -> String {
    let mut s = format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        ts.year, ts.month, ts.day, ts.hour, ts.minute, ts.second
    );
    if include_fraction {
        s.push_str(&format!(".{}", ts.fraction));
    }
    s
}

/// Renders a `SQL_NUMERIC_STRUCT` as a decimal literal. The value is transported as a 16 byte
/// little endian integer scaled by `10^-scale`, with a separate sign byte.
pub fn numeric_to_string(value: &Numeric) -> String {
    let mut magnitude: u128 = 0;
    for (index, byte) in value.val.iter().enumerate() {
        magnitude |= (*byte as u128) << (8 * index);
    }
    let mut digits = magnitude.to_string();
    let scale = value.scale.max(0) as usize;
    if scale > 0 {
        while digits.len() <= scale {
            digits.insert(0, '0');
        }
        digits.insert(digits.len() - scale, '.');
    }
    if value.sign == 0 {
        format!("-{digits}")
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(magnitude: u128, scale: i8, positive: bool) -> Numeric {
        let mut val = [0u8; 16];
        for (index, byte) in val.iter_mut().enumerate() {
            *byte = ((magnitude >> (8 * index)) & 0xff) as u8;
        }
        Numeric {
            precision: 18,
            scale,
            sign: if positive { 1 } else { 0 },
            val,
        }
    }

    #[test]
    fn numeric_renders_scale_and_sign() {
        assert_eq!("123.45", numeric_to_string(&numeric(12345, 2, true)));
        assert_eq!("-0.05", numeric_to_string(&numeric(5, 2, false)));
        assert_eq!("12345", numeric_to_string(&numeric(12345, 0, true)));
    }

    #[test]
    fn utf8_to_utf16_and_back_is_identity() {
        let original = "select * from täble where name = 'Ω'";
        let wide = utf8_to_utf16(original);
        assert_eq!(original, utf16_to_utf8(&wide).unwrap());
    }

    #[test]
    fn unpaired_surrogate_reports_conversion_error() {
        let invalid = [0xd800u16];
        let error = utf16_to_utf8(&invalid).unwrap_err();
        assert!(matches!(error, Error::Conversion { .. }));
    }

    #[test]
    fn timestamp_literal() {
        let ts = init_timestamp(21, 12, 4, 0, 24, 10, 1993);
        assert_eq!("1993-10-24 21:12:04", timestamp_to_sql_string(&ts, false));
    }

    #[test]
    fn timestamp_literal_with_fraction() {
        let ts = init_timestamp(4, 2, 6, 500, 1, 8, 2011);
        assert_eq!("2011-08-01 04:02:06.500", timestamp_to_sql_string(&ts, true));
    }

    #[test]
    fn date_and_time_literals() {
        assert_eq!("2011-08-01", date_to_sql_string(&init_date(1, 8, 2011)));
        assert_eq!("04:02:06", time_to_sql_string(&init_time(4, 2, 6)));
    }
}
