//! Calendar data: fetching raw events and normalizing them for display.

pub mod fetcher;
pub mod normalizer;


pub use fetcher::{parse_events, EventFetcher, RawEvent, MAX_EVENTS};
pub use normalizer::{
    day_month_label, group_by_day, month_name, normalize, normalize_into, DayGroup, NormalizedEvent,
};
