//! Google Calendar events.list client.
//!
//! Issues a single authenticated GET for the upcoming window and copies at
//! most [`MAX_EVENTS`] items into a bounded table of [`RawEvent`]s.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::{iso8601_after_days, percent_encode, to_iso8601};
use crate::config::DEFAULT_API_BASE;
use crate::error::FetchError;
use crate::transport::HttpTransport;

/// Upper bound on events kept per cycle, also sent as `maxResults`.
pub const MAX_EVENTS: usize = 50;

pub const TITLE_CAPACITY: usize = 255;
pub const STAMP_CAPACITY: usize = 63;
pub const LOCATION_CAPACITY: usize = 255;
pub const DESCRIPTION_CAPACITY: usize = 511;

/// An event as received, with every field clipped to its capacity.
/// Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    pub title: String,
    /// `start.dateTime`, or `start.date` for all-day events
    pub start: String,
    pub end: String,
    pub location: String,
    pub description: String,
}

/// Clip `s` to at most `capacity` bytes, backing off to a char boundary.
/// Overflow is dropped silently.
pub fn truncate_to(s: &str, capacity: usize) -> String {
    if s.len() <= capacity {
        return s.to_string();
    }
    let mut end = capacity;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn str_field(value: &serde_json::Value, capacity: usize) -> String {
    value.as_str().map(|s| truncate_to(s, capacity)).unwrap_or_default()
}

fn stamp_field(value: &serde_json::Value) -> String {
    let stamp = value["dateTime"].as_str().or_else(|| value["date"].as_str());
    stamp.map(|s| truncate_to(s, STAMP_CAPACITY)).unwrap_or_default()
}

impl RawEvent {
    /// Map one `items[]` entry. Anything absent or of the wrong type becomes "".
    pub fn from_item(item: &serde_json::Value) -> Self {
        Self {
            title: str_field(&item["summary"], TITLE_CAPACITY),
            start: stamp_field(&item["start"]),
            end: stamp_field(&item["end"]),
            location: str_field(&item["location"], LOCATION_CAPACITY),
            description: str_field(&item["description"], DESCRIPTION_CAPACITY),
        }
    }

    pub fn is_all_day(&self) -> bool {
        !self.start.is_empty() && !self.start.contains('T')
    }
}

/// Parse an events.list body into `table`, replacing its contents.
///
/// A body without an `items` array yields zero events.
///
/// # Errors
///
/// Returns `MalformedResponse` for an empty body or invalid JSON.
pub fn parse_events(body: &[u8], table: &mut Vec<RawEvent>) -> Result<usize, FetchError> {
    table.clear();

    if body.is_empty() {
        return Err(FetchError::MalformedResponse("empty body".into()));
    }

    let root: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| FetchError::MalformedResponse(e.to_string()))?;
    if !root.is_object() {
        return Err(FetchError::MalformedResponse("root is not an object".into()));
    }

    let Some(items) = root["items"].as_array() else {
        debug!("response has no items array");
        return Ok(0);
    };

    if items.len() > MAX_EVENTS {
        debug!(received = items.len(), kept = MAX_EVENTS, "dropping events beyond capacity");
    }
    table.extend(items.iter().take(MAX_EVENTS).map(RawEvent::from_item));
    Ok(table.len())
}

/// Lists upcoming events of one calendar.
pub struct EventFetcher<T> {
    transport: Arc<T>,
    api_base: String,
    calendar_id: String,
}

impl<T: HttpTransport> EventFetcher<T> {
    pub fn new(transport: Arc<T>, calendar_id: &str) -> Self {
        Self {
            transport,
            api_base: DEFAULT_API_BASE.to_string(),
            calendar_id: calendar_id.to_string(),
        }
    }

    /// Override the API base URL (for testing with a mock server).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.api_base = url.trim_end_matches('/').to_string();
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Full events.list URL for the window `[now, now + window_days]`.
    pub fn events_url(&self, now: DateTime<Utc>, window_days: u32) -> String {
        format!(
            "{}/calendars/{}/events?singleEvents=true&orderBy=startTime\
             &timeMin={}&timeMax={}&maxResults={}",
            self.api_base,
            percent_encode(&self.calendar_id),
            percent_encode(&to_iso8601(now)),
            percent_encode(&iso8601_after_days(now, window_days)),
            MAX_EVENTS,
        )
    }

    /// Fetch into a fresh table.
    ///
    /// # Errors
    ///
    /// See [`EventFetcher::fetch_into`].
    pub async fn fetch_events(
        &self,
        token: &str,
        now: DateTime<Utc>,
        window_days: u32,
    ) -> Result<Vec<RawEvent>, FetchError> {
        let mut table = Vec::with_capacity(MAX_EVENTS);
        self.fetch_into(token, now, window_days, &mut table).await?;
        Ok(table)
    }

    /// Clear `table`, then fill it with up to [`MAX_EVENTS`] events.
    ///
    /// # Errors
    ///
    /// `AuthUnavailable` for an empty token, `Transport` when the request
    /// fails, `HttpStatus` for anything but 200, `MalformedResponse` for an
    /// empty or unparseable body.
    pub async fn fetch_into(
        &self,
        token: &str,
        now: DateTime<Utc>,
        window_days: u32,
        table: &mut Vec<RawEvent>,
    ) -> Result<usize, FetchError> {
        table.clear();
        if token.is_empty() {
            return Err(FetchError::AuthUnavailable);
        }

        let url = self.events_url(now, window_days);
        let resp = self.transport.get_authorized(&url, token).await.map_err(|e| {
            warn!(error = %e, "events request failed");
            FetchError::from(e)
        })?;

        if !resp.is_ok() {
            warn!(
                status = resp.status,
                calendar = %self.calendar_id,
                "events endpoint returned error status"
            );
            return Err(FetchError::HttpStatus(resp.status));
        }

        let count = parse_events(&resp.body, table)?;
        info!(count, window_days, "fetched calendar events");
        Ok(count)
    }
}
