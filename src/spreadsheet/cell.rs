use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

const MILLISECONDS_PER_DAY: f64 = 86_400_000.0;

/// How a raw cell value is interpreted, as declared by the record or the number format.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Number,
    Boolean,
    /// Serial date/time counted from the 1900 epoch
    DateTime1900,
    /// Serial date/time counted from the 1904 epoch
    DateTime1904,
    /// ISO 8601 date/time text
    IsoDateTime,
    InlineString,
    SharedString,
    Error,
}

impl CellType {
    fn date_time(is_1904: bool) -> Self {
        if is_1904 {
            Self::DateTime1904
        } else {
            Self::DateTime1900
        }
    }

    /// Built-in number format ids that display dates or times.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "18" | "19" | "20" | "21" | "22" | "45" | "46" | "47" => {
                Some(Self::date_time(is_1904))
            }
            _ => None,
        }
    }

    /// Scans a custom format code for date or time tokens outside literals,
    /// escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_temporal = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => is_temporal = true,
                _ => (),
            }
        }

        if is_temporal {
            Self::date_time(is_1904)
        } else {
            Self::Number
        }
    }
}

/// Excel error code to its display text.
pub(crate) fn to_error_value(value: u8) -> &'static str {
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// A decoded cell value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl CellValue {
    /// Decodes a numeric serial of the given type. Date-formatted serials become
    /// `DateTime`, or `Time` when they fall in `[0, 1)`; serials outside the
    /// representable range stay numbers.
    pub(crate) fn from_serial(value: f64, kind: CellType) -> CellValue {
        let temporal = match kind {
            CellType::DateTime1900 => serial_to_temporal(value, false),
            CellType::DateTime1904 => serial_to_temporal(value, true),
            _ => None,
        };
        temporal.unwrap_or(CellValue::Number(value))
    }

    /// True for non-empty text.
    pub fn is_text(&self) -> bool {
        matches!(self, CellValue::Text(text) if !text.is_empty())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(value) => write!(f, "{}", value),
            CellValue::Text(text) => write!(f, "{}", text),
            CellValue::DateTime(datetime) => write!(f, "{}", datetime),
            CellValue::Time(time) => write!(f, "{}", time),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Converts a serial to a date/time, rounding the day fraction to the millisecond.
/// In the 1900 system serials below 60 predate the phantom 1900-02-29 and shift by a day.
fn serial_to_temporal(value: f64, is_1904: bool) -> Option<CellValue> {
    if !value.is_finite() {
        return None;
    }
    let days = value.floor();
    let milliseconds = ((value - days) * MILLISECONDS_PER_DAY).round() as i64;
    let fraction = Duration::milliseconds(milliseconds);

    if (0.0..1.0).contains(&value) && fraction < Duration::days(1) {
        let time = NaiveTime::MIN.overflowing_add_signed(fraction).0;
        return Some(CellValue::Time(time));
    }

    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let leap_bug = if !is_1904 && 0.0 < value && value < 60.0 { 1 } else { 0 };
    let days = Duration::try_days(days as i64 + leap_bug)?;
    epoch
        .and_time(NaiveTime::MIN)
        .checked_add_signed(days)?
        .checked_add_signed(fraction)
        .map(CellValue::DateTime)
}

/// A decoded cell at a 0-based position.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) value: CellValue,
}

impl Cell {
    /// The A1-style reference of this cell.
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }
}
