use crate::spreadsheet::reference::index_to_reference;
use crate::table::Value;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use iso8601_duration::Duration as IsoDuration;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings
    IsoDuration,
    /// Index into the shared string table, resolved while reading
    SharedString,
    /// Inline or already resolved shared string values
    Text,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Quoted literals, escaped characters and bracketed sections are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    fn is_1904(&self) -> bool {
        matches!(self, Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904)
    }
}

/// A single non-empty cell with its position, type and raw value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored in the file
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the raw value into a table value.
    ///
    /// Numbers stay numeric; dates, times and booleans are rendered as text;
    /// error cells and blank text become [`Value::Empty`]. A value that cannot
    /// be interpreted as its declared type falls back to its raw text.
    pub(crate) fn to_value(&self) -> Value {
        let rendered = match self.kind {
            CellType::Empty | CellType::Error => return Value::Empty,
            CellType::Number => match self.value.trim().parse::<f64>() {
                Ok(number) => return Value::Number(number),
                Err(_) => None,
            },
            CellType::Boolean => Some(match self.value.as_str() {
                "1" | "true" | "TRUE" => "true".to_owned(),
                _ => "false".to_owned(),
            }),
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                to_date_string(&self.value, self.kind.is_1904())
            }
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                to_datetime_string(&self.value, self.kind.is_1904())
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(&self.value),
            CellType::IsoDateTime => Some(iso_datetime_string(&self.value)),
            CellType::IsoDuration => iso_duration_string(&self.value),
            CellType::Text | CellType::SharedString => None,
        };
        Value::from_text(rendered.as_deref().unwrap_or(&self.value))
    }
}

/// Converts an Excel serial number to a date/time.
/// Serials below 60 are shifted by one day to undo the Lotus 1-2-3 leap year bug.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let midnight = NaiveDate::from_ymd_opt(1899, 12, 30)?
        .checked_add_signed(Duration::try_days(days.checked_add(offset)?)?)?
        .and_hms_opt(0, 0, 0)?;
    let millis = (serial.fract() * 86_400_000f64).round() as i64;
    midnight.checked_add_signed(Duration::try_milliseconds(millis)?)
}

/// Converts an Excel numeric date to an ISO date string.
fn to_date_string(value: &str, is_1904: bool) -> Option<String> {
    let datetime = serial_to_datetime(value.trim().parse().ok()?, is_1904)?;
    Some(datetime.format("%Y-%m-%d").to_string())
}

/// Converts an Excel numeric date/time to an ISO date/time string.
fn to_datetime_string(value: &str, is_1904: bool) -> Option<String> {
    let datetime = serial_to_datetime(value.trim().parse().ok()?, is_1904)?;
    Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Converts the fractional day of an Excel time to `HH:MM:SS`.
fn to_time_string(value: &str) -> Option<String> {
    let factor = value.trim().parse::<f64>().ok()?;
    let total = (factor.fract() * 86_400f64).round() as i64;
    Some(format!("{:02}:{:02}:{:02}", total / 3600, total / 60 % 60, total % 60))
}

/// Renders an ISO date/time as `YYYY-MM-DD[ HH:MM:SS]`, dropping a midnight time.
fn iso_datetime_string(value: &str) -> String {
    let value = value.trim();
    let trimmed = value.strip_suffix("T00:00:00").unwrap_or(value);
    let mut rendered = trimmed.replacen('T', " ", 1);
    if let Some(index) = rendered.find('.') {
        rendered.truncate(index);
    }
    rendered
}

/// Renders an ISO 8601 duration (`PT12H30M05S`) as `HH:MM:SS`.
fn iso_duration_string(value: &str) -> Option<String> {
    let duration = value.trim().parse::<IsoDuration>().ok()?;
    let hours = duration.day as i64 * 24 + duration.hour as i64;
    Some(format!("{:02}:{:02}:{:02}", hours, duration.minute as i64, duration.second as i64))
}
