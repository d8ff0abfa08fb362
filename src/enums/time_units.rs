//! # **TimeUnits Module** - *Arrow Datetime Units*
//!
//! Defines time and interval units used by temporal logical types.
//!
//! `TimeUnit` standardises second, millisecond, microsecond and nanosecond
//! resolution for `Time32`, `Time64`, `Timestamp` and `Duration` fields.
//! `IntervalUnit` specifies year–month or day–time intervals.
//!
//! Both map one-to-one onto Apache Arrow's flatbuffer discriminants.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// # TimeUnit
///
/// Unified time unit enumeration.
///
/// ## Behaviour
/// - Temporal arrays stay physically integer-backed; the unit travels on the
///   logical `ArrowType` attached to `Field`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

/// # IntervalUnit
///
/// Inner Arrow discriminant for interval types.
///
/// `YearMonth` intervals are physically `i32`; `DayTime` intervals are two
/// packed `i32`s carried as a single `i64` lane.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum IntervalUnit {
    YearMonth,
    DayTime,
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TimeUnit::Seconds => f.write_str("Seconds"),
            TimeUnit::Milliseconds => f.write_str("Milliseconds"),
            TimeUnit::Microseconds => f.write_str("Microseconds"),
            TimeUnit::Nanoseconds => f.write_str("Nanoseconds"),
        }
    }
}

impl Display for IntervalUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            IntervalUnit::YearMonth => f.write_str("YearMonth"),
            IntervalUnit::DayTime => f.write_str("DayTime"),
        }
    }
}
