//! Turns raw ISO-8601 stamps into display fields and day columns.
//!
//! Times are taken as written in the stamp; no zone conversion happens here.
//! All-day events (`YYYY-MM-DD` with no time part) run from `00:00` to `23:59`.

use std::ops::Range;

use serde::Serialize;

use super::fetcher::{truncate_to, RawEvent};
use crate::error::NormalizeError;

pub const NAME_CAPACITY: usize = 63;

pub const ALL_DAY_START: &str = "00:00";
pub const ALL_DAY_END: &str = "23:59";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English month name for `month` in 1..=12.
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

/// Column header text, e.g. `"05 March"`.
pub fn day_month_label(day: u32, month: u32) -> Option<String> {
    month_name(month).map(|name| format!("{day:02} {name}"))
}

/// A display-ready event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub month_text: &'static str,
    pub start_hhmm: String,
    pub end_hhmm: String,
}

/// Parse leading ASCII digits; `None` if there are none.
fn leading_number(s: &str) -> Option<u32> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..digits].parse().ok()
}

fn parse_date(stamp: &str) -> Option<(i32, u32, u32)> {
    let date = stamp.split('T').next()?;
    let mut parts = date.splitn(3, '-');
    let year = i32::try_from(leading_number(parts.next()?)?).ok()?;
    let month = leading_number(parts.next()?)?;
    let day = leading_number(parts.next()?)?;
    Some((year, month, day))
}

/// Hour and minute after the `T`. `Ok(None)` means there is no time part.
fn parse_time(stamp: &str) -> Result<Option<(u32, u32)>, &'static str> {
    let Some((_, time)) = stamp.split_once('T') else {
        return Ok(None);
    };
    let mut parts = time.split(':');
    let hour = parts.next().and_then(leading_number).ok_or("unparseable time")?;
    let minute = parts.next().and_then(leading_number).ok_or("unparseable time")?;
    if hour > 23 || minute > 59 {
        return Err("time out of range");
    }
    Ok(Some((hour, minute)))
}

fn hhmm((hour, minute): (u32, u32)) -> String {
    format!("{hour:02}:{minute:02}")
}

impl NormalizedEvent {
    /// Normalize the event at position `index` (used only for error context).
    ///
    /// # Errors
    ///
    /// `InvalidDate` when the start has no parseable date, the month or day is
    /// out of range, or a time part is present but malformed.
    pub fn from_raw(index: usize, raw: &RawEvent) -> Result<Self, NormalizeError> {
        let invalid = |stamp: &str, reason: &'static str| NormalizeError::InvalidDate {
            index,
            stamp: stamp.to_string(),
            reason,
        };

        let (year, month, day) =
            parse_date(&raw.start).ok_or_else(|| invalid(&raw.start, "unparseable start date"))?;
        let month_text =
            month_name(month).ok_or_else(|| invalid(&raw.start, "month out of range"))?;
        if !(1..=31).contains(&day) {
            return Err(invalid(&raw.start, "day out of range"));
        }

        let start = parse_time(&raw.start).map_err(|reason| invalid(&raw.start, reason))?;
        let end = parse_time(&raw.end).map_err(|reason| invalid(&raw.end, reason))?;

        Ok(Self {
            name: truncate_to(&raw.title, NAME_CAPACITY),
            year,
            month,
            day,
            month_text,
            start_hhmm: start.map_or_else(|| ALL_DAY_START.to_string(), hhmm),
            end_hhmm: end.map_or_else(|| ALL_DAY_END.to_string(), hhmm),
        })
    }
}

/// Normalize `raw` into `out`, replacing its contents. Order and count are
/// preserved; the first bad event aborts the whole batch.
///
/// # Errors
///
/// The first `InvalidDate` encountered; `out` is left empty.
pub fn normalize_into(
    raw: &[RawEvent],
    out: &mut Vec<NormalizedEvent>,
) -> Result<(), NormalizeError> {
    out.clear();
    for (index, event) in raw.iter().enumerate() {
        match NormalizedEvent::from_raw(index, event) {
            Ok(normalized) => out.push(normalized),
            Err(e) => {
                out.clear();
                return Err(e);
            }
        }
    }
    Ok(())
}

/// # Errors
///
/// See [`normalize_into`].
pub fn normalize(raw: &[RawEvent]) -> Result<Vec<NormalizedEvent>, NormalizeError> {
    let mut out = Vec::with_capacity(raw.len());
    normalize_into(raw, &mut out)?;
    Ok(out)
}

/// A run of consecutive events sharing one `(day, month)`: one date header
/// and one visual column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayGroup {
    pub day: u32,
    pub month: u32,
    pub label: String,
    /// Zero-based column index, left to right
    pub column: usize,
    /// Index of the first event of the group in the normalized list
    pub first: usize,
    pub len: usize,
}

impl DayGroup {
    pub fn range(&self) -> Range<usize> {
        self.first..self.first + self.len
    }
}

/// Single left-to-right pass; a change in `(day, month)` starts a new group.
/// Relies on the service having already ordered events by start time.
pub fn group_by_day(events: &[NormalizedEvent]) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();

    for (index, event) in events.iter().enumerate() {
        if let Some(current) = groups.last_mut() {
            if current.day == event.day && current.month == event.month {
                current.len += 1;
                continue;
            }
        }
        groups.push(DayGroup {
            day: event.day,
            month: event.month,
            label: day_month_label(event.day, event.month).unwrap_or_else(|| "Invalid".to_string()),
            column: groups.len(),
            first: index,
            len: 1,
        });
    }

    groups
}
