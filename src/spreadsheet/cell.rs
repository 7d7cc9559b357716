use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

/// Types of raw cell data found in worksheet XML.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (`1` / `0`)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as serial numbers
    NumberDateTime,
    /// Date values stored as serial numbers
    NumberDate,
    /// Time values stored as day fractions
    NumberTime,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#N/A`
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str) -> Option<Self> {
        match id {
            "22" => Some(Self::NumberDateTime),
            "14" | "15" | "16" | "17" => Some(Self::NumberDate),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::NumberTime),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::NumberDateTime,
            (true, false) => Self::NumberDate,
            (false, true) => Self::NumberTime,
            (false, false) => Self::Number,
        }
    }

    /// Maps the `t` attribute of a `<c>` element.
    pub(crate) fn from_type_attribute(kind: Option<&str>) -> Self {
        match kind {
            Some("inlineStr" | "str") => CellType::InlineString,
            Some("s") => CellType::SharedString,
            Some("d") => CellType::IsoDateTime,
            Some("b") => CellType::Boolean,
            Some("e") => CellType::Error,
            _ => CellType::Number,
        }
    }

    /// Decodes the raw text of a cell into a typed value.
    pub(crate) fn decode(self, raw: &str, shared_strings: &[String], is_1904: bool) -> CellValue {
        match self {
            CellType::Empty => CellValue::Empty,
            CellType::Boolean => CellValue::Bool(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
            CellType::SharedString => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared_strings.get(index))
                .map(|text| CellValue::text(text.as_str()))
                .unwrap_or(CellValue::Empty),
            CellType::InlineString | CellType::Error => CellValue::text(raw),
            CellType::IsoDateTime => parse_iso_datetime(raw)
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::text(raw)),
            CellType::Number => match raw.trim().parse::<f64>() {
                Ok(number) => CellValue::Number(number),
                Err(_) => CellValue::text(raw),
            },
            CellType::NumberDate | CellType::NumberDateTime => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|serial| serial_to_datetime(serial, is_1904))
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::text(raw)),
            CellType::NumberTime => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serial_to_time)
                .map(CellValue::Time)
                .unwrap_or_else(|| CellValue::text(raw)),
        }
    }
}

/// A typed cell value. Missing cells read as [`CellValue::Empty`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl CellValue {
    /// Builds a text value; the empty string becomes [`CellValue::Empty`].
    pub fn text(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_owned())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The declared type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            CellValue::Empty => ValueType::Empty,
            CellValue::Text(_) => ValueType::Text,
            CellValue::Number(_) => ValueType::Number,
            CellValue::Bool(_) => ValueType::Boolean,
            CellValue::DateTime(_) | CellValue::Time(_) => ValueType::DateTime,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(number) => {
                if number.fract() == 0.0 && number.abs() < 1e15 {
                    write!(f, "{}", *number as i64)
                } else {
                    write!(f, "{number}")
                }
            }
            CellValue::Bool(value) => f.write_str(if *value { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(time) => write!(f, "{}", time.format("%H:%M:%S")),
        }
    }
}

/// Output typing for values handed to a strongly typed pipeline.
///
/// `Any` is compatible with every other type in both directions; it is what
/// column readers declare, since a column may hold text in one row and a
/// number in the next.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Empty,
    Text,
    Number,
    Boolean,
    DateTime,
    Any,
}

impl ValueType {
    /// True when a value of type `other` may flow into a slot declared as `self`.
    pub fn accepts(self, other: ValueType) -> bool {
        self == ValueType::Any || other == ValueType::Any || other == ValueType::Empty || self == other
    }
}

/// Converts a spreadsheet serial number to a date-time.
/// Handles the Lotus 1-2-3 leap year bug for the 1900 date system.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let (base, days) = if is_1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1)?, days)
    } else if days < 60 {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, days + 1)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, days)
    };
    let date = base.checked_add_signed(Duration::try_days(days)?)?;
    let millis = (serial.fract() * 86_400_000f64).round() as i64;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::try_milliseconds(millis)?)
}

/// Converts a day fraction to a time of day.
pub(crate) fn serial_to_time(serial: f64) -> Option<NaiveTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let millis = (serial.fract() * 86_400_000f64).round() as u32;
    let millis = millis.min(86_399_999);
    NaiveTime::from_num_seconds_from_midnight_opt(millis / 1_000, (millis % 1_000) * 1_000_000)
}

fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.contains('T') {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_number_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd"), CellType::NumberDate);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm"), CellType::NumberDateTime);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss"), CellType::NumberTime);
        assert_eq!(CellType::parse_custom_number_format("0.00"), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00;\"days\""), CellType::Number);
    }

    #[test]
    fn serial_dates_in_both_systems() {
        let expected = NaiveDate::from_ymd_opt(1900, 1, 1).and_then(|date| date.and_hms_opt(0, 0, 0));
        assert_eq!(serial_to_datetime(1.0, false), expected);
        let expected = NaiveDate::from_ymd_opt(1900, 3, 1).and_then(|date| date.and_hms_opt(0, 0, 0));
        assert_eq!(serial_to_datetime(61.0, false), expected);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).and_then(|date| date.and_hms_opt(12, 0, 0));
        assert_eq!(serial_to_datetime(45306.5, false), expected);
        let expected = NaiveDate::from_ymd_opt(1904, 1, 2).and_then(|date| date.and_hms_opt(0, 0, 0));
        assert_eq!(serial_to_datetime(1.0, true), expected);
        assert_eq!(serial_to_time(0.5), NaiveTime::from_hms_opt(12, 0, 0));
    }

    #[test]
    fn display_normalizes_numbers_and_empties() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(1.5).to_string(), "1.5");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::text(""), CellValue::Empty);
    }

    #[test]
    fn decode_raw_cells() {
        let shared = vec!["Alpha".to_owned(), "".to_owned()];
        assert_eq!(CellType::SharedString.decode("0", &shared, false), CellValue::Text("Alpha".into()));
        assert_eq!(CellType::SharedString.decode("1", &shared, false), CellValue::Empty);
        assert_eq!(CellType::SharedString.decode("9", &shared, false), CellValue::Empty);
        assert_eq!(CellType::Number.decode("42", &shared, false), CellValue::Number(42.0));
        assert_eq!(CellType::Boolean.decode("1", &shared, false), CellValue::Bool(true));
        assert_eq!(CellType::Error.decode("#N/A", &shared, false), CellValue::Text("#N/A".into()));
        assert_eq!(
            CellType::NumberDate.decode("45306", &shared, false).to_string(),
            "2024-01-15 00:00:00"
        );
    }

    #[test]
    fn any_type_is_compatible_both_ways() {
        assert!(ValueType::Any.accepts(ValueType::Number));
        assert!(ValueType::Text.accepts(ValueType::Any));
        assert!(ValueType::Text.accepts(ValueType::Empty));
        assert!(!ValueType::Text.accepts(ValueType::Number));
    }

    #[test]
    fn values_report_their_declared_type() {
        let date = serial_to_datetime(45306.0, false).map(CellValue::DateTime).expect("date");
        assert_eq!(CellValue::Empty.value_type(), ValueType::Empty);
        assert_eq!(CellValue::text("fast").value_type(), ValueType::Text);
        assert_eq!(CellValue::Number(20.0).value_type(), ValueType::Number);
        assert_eq!(CellValue::Bool(true).value_type(), ValueType::Boolean);
        assert_eq!(date.value_type(), ValueType::DateTime);
        assert!(ValueType::Any.accepts(CellValue::Number(20.0).value_type()));
        assert!(!ValueType::Number.accepts(CellValue::text("fast").value_type()));
    }
}
