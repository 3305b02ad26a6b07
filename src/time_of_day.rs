/*! Classification of incident times into day and night. */

use strum::{Display, EnumIter, IntoStaticStr};

/// First hour (inclusive) of the night period.
pub const NIGHT_STARTS: i32 = 21;
/// Last hour (inclusive) of the night period, after wrapping past midnight.
pub const NIGHT_ENDS: i32 = 4;

/// The hour of day decoded from a raw time code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    /// The hour component of an HHMM code. Negative codes keep their sign, so `-5` decodes
    /// from `"-005"` to hour 0 and `-2130` to hour -2.
    Hour(i32),
    /// The code was missing or could not be parsed.
    Unknown,
}

impl TimeOfDay {
    /**
     * Decode the hour from a raw 24 hour time code like `930` (09:30) or `2115` (21:15).
     *
     * The code is left padded with zeros to 4 digits and the first two digits are the hour. So
     * `30` is 00:30. Codes that are empty or non-numeric are `Unknown`. Codes written as floating
     * point numbers (`930.0`) are truncated to an integer first. The padding counts a minus sign
     * as a character, so negative codes still decode to a (signed) hour.
     */
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();

        let value: i64 = match code.parse::<i64>() {
            Ok(value) => value,
            Err(_) => match code.parse::<f64>() {
                Ok(value) if value.is_finite() => value.trunc() as i64,
                _ => return TimeOfDay::Unknown,
            },
        };

        let padded = format!("{:04}", value);
        match padded[..2].parse() {
            Ok(hour) => TimeOfDay::Hour(hour),
            Err(_) => TimeOfDay::Unknown,
        }
    }

    /// Get the temporal class. An unknown hour is always day.
    pub fn class(self) -> TemporalClass {
        match self {
            TimeOfDay::Hour(hour) if is_night(hour) => TemporalClass::Night,
            TimeOfDay::Hour(_) => TemporalClass::Day,
            TimeOfDay::Unknown => TemporalClass::Day,
        }
    }
}

/// The two disjoint subsets hotspots are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum TemporalClass {
    #[strum(serialize = "day")]
    Day,
    #[strum(serialize = "night")]
    Night,
}

impl TemporalClass {
    /// Classify a raw time code directly.
    pub fn from_code(code: &str) -> Self {
        TimeOfDay::from_code(code).class()
    }
}

/// Night runs from 21:00 through 04:59, wrapping midnight.
pub fn is_night(hour: i32) -> bool {
    hour >= NIGHT_STARTS || hour <= NIGHT_ENDS
}
