//! One sync cycle: acquire token, fetch, normalize, emit.
//!
//! Each stage either hands its output to the next or ends the cycle with a
//! [`CycleError`]. The sink only ever sees a complete, valid frame.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::auth::TokenCache;
use crate::calendar::{
    group_by_day, normalize_into, DayGroup, EventFetcher, NormalizedEvent, RawEvent, MAX_EVENTS,
};
use crate::config::Config;
use crate::error::{CoreError, CycleError};
use crate::transport::HttpTransport;

/// Everything a renderer needs for one refresh.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub events: &'a [NormalizedEvent],
    pub groups: &'a [DayGroup],
    pub generated_at: DateTime<Utc>,
}

impl<'a> RenderFrame<'a> {
    /// Events belonging to `group`, in list order.
    pub fn events_of(&self, group: &DayGroup) -> &'a [NormalizedEvent] {
        &self.events[group.range()]
    }
}

/// Destination of a successful cycle.
pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame<'_>);
}

/// Summary of a successful cycle, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub groups: usize,
    pub token_refreshed: bool,
}

/// Owns the pipeline stages and the per-cycle tables.
pub struct SyncCycle<T> {
    tokens: TokenCache<T>,
    fetcher: EventFetcher<T>,
    window_days: u32,
    raw: Vec<RawEvent>,
    normalized: Vec<NormalizedEvent>,
}

impl<T: HttpTransport> SyncCycle<T> {
    pub fn new(tokens: TokenCache<T>, fetcher: EventFetcher<T>, window_days: u32) -> Self {
        Self {
            tokens,
            fetcher,
            window_days,
            raw: Vec::with_capacity(MAX_EVENTS),
            normalized: Vec::with_capacity(MAX_EVENTS),
        }
    }

    /// Build the pipeline from configuration over a shared transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the credentials
    /// cannot be loaded.
    pub fn from_config(config: &Config, transport: Arc<T>) -> Result<Self, CoreError> {
        config.validate()?;
        let creds = config.resolve_credentials()?;
        let tokens = TokenCache::new(creds.signer()?, Arc::clone(&transport));
        let fetcher = EventFetcher::new(transport, &config.calendar.calendar_id)
            .with_base_url(&config.calendar.api_base);
        Ok(Self::new(tokens, fetcher, config.calendar.window_days))
    }

    pub fn tokens(&self) -> &TokenCache<T> {
        &self.tokens
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Run one cycle at `now`. On success the sink is called exactly once.
    ///
    /// # Errors
    ///
    /// `AuthUnavailable` when no token could be obtained (no fetch is
    /// attempted), `FetchFailed` when the event list could not be retrieved,
    /// `InvalidDate` when any event has an unusable timestamp.
    pub async fn run<S: RenderSink>(
        &mut self,
        now: DateTime<Utc>,
        sink: &mut S,
    ) -> Result<CycleReport, CycleError> {
        self.raw.clear();
        self.normalized.clear();

        let exchanges_before = self.tokens.exchange_count();
        let token = self.tokens.get_token(now).await.map_err(|e| {
            warn!(error = %e, "no access token; skipping fetch");
            CycleError::AuthUnavailable(e)
        })?;
        let token_refreshed = self.tokens.exchange_count() != exchanges_before;

        let fetched = self
            .fetcher
            .fetch_into(&token, now, self.window_days, &mut self.raw)
            .await
            .map_err(CycleError::FetchFailed)?;

        normalize_into(&self.raw, &mut self.normalized).map_err(|e| {
            warn!(error = %e, "discarding batch");
            CycleError::InvalidDate(e)
        })?;

        let groups = group_by_day(&self.normalized);
        debug!(events = self.normalized.len(), groups = groups.len(), "emitting frame");
        sink.render(&RenderFrame {
            events: &self.normalized,
            groups: &groups,
            generated_at: now,
        });

        let report = CycleReport {
            fetched,
            groups: groups.len(),
            token_refreshed,
        };
        info!(fetched, groups = report.groups, token_refreshed, "sync cycle complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::signer::{test_keys, CredentialSigner};
    use crate::error::{AuthError, FetchError, NormalizeError, TransportError};
    use crate::transport::mock::{json, token_ok, MockTransport};
    use chrono::{Duration, TimeZone};
    use serde_json::json as j;

    #[derive(Default)]
    struct Captured {
        frames: Vec<(Vec<NormalizedEvent>, Vec<DayGroup>)>,
    }

    impl RenderSink for Captured {
        fn render(&mut self, frame: &RenderFrame<'_>) {
            self.frames.push((frame.events.to_vec(), frame.groups.to_vec()));
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 8, 0, 0).unwrap()
    }

    fn cycle(transport: &Arc<MockTransport>) -> SyncCycle<MockTransport> {
        let signer = CredentialSigner::from_pem(
            &test_keys::pkcs8_pem(),
            "display@project.iam.gserviceaccount.com",
            crate::config::DEFAULT_SCOPE,
            crate::config::DEFAULT_TOKEN_URI,
        )
        .unwrap();
        SyncCycle::new(
            TokenCache::new(signer, Arc::clone(transport)),
            EventFetcher::new(Arc::clone(transport), "primary"),
            30,
        )
    }

    fn event(summary: &str, start: &str, end: &str) -> serde_json::Value {
        j!({"summary": summary, "start": {"dateTime": start}, "end": {"dateTime": end}})
    }

    #[tokio::test]
    async fn happy_path_renders_grouped_frame() {
        let transport = Arc::new(MockTransport::new());
        transport.push_post(token_ok("ya29.a", 3600));
        transport.push_get(json(
            200,
            j!({"items": [
                event("Standup", "2025-03-05T09:30:00Z", "2025-03-05T10:15:00Z"),
                event("Review", "2025-03-05T14:00:00Z", "2025-03-05T15:00:00Z"),
                event("Planning", "2025-03-06T09:00:00Z", "2025-03-06T10:00:00Z"),
            ]}),
        ));
        let mut cycle = cycle(&transport);
        let mut sink = Captured::default();

        let report = cycle.run(now(), &mut sink).await.unwrap();
        assert_eq!(
            report,
            CycleReport {
                fetched: 3,
                groups: 2,
                token_refreshed: true
            }
        );
        assert_eq!(sink.frames.len(), 1);
        let (events, groups) = &sink.frames[0];
        assert_eq!(events[0].start_hhmm, "09:30");
        assert_eq!(groups[0].label, "05 March");
        assert_eq!(groups[0].len, 2);
        assert_eq!(groups[1].label, "06 March");
    }

    #[tokio::test]
    async fn second_cycle_reuses_token() {
        let transport = Arc::new(MockTransport::new());
        transport.push_post(token_ok("ya29.a", 3600));
        transport.push_get(json(200, j!({"items": []})));
        transport.push_get(json(200, j!({"items": []})));
        let mut cycle = cycle(&transport);
        let mut sink = Captured::default();

        cycle.run(now(), &mut sink).await.unwrap();
        let report = cycle.run(now() + Duration::minutes(20), &mut sink).await.unwrap();
        assert!(!report.token_refreshed);
        assert_eq!(report.groups, 0);
        assert_eq!(transport.post_count(), 1);
        assert_eq!(sink.frames.len(), 2);
    }

    #[tokio::test]
    async fn token_failure_skips_fetch_and_render() {
        let transport = Arc::new(MockTransport::new());
        transport.push_post(json(500, j!({"error": "internal"})));
        let mut cycle = cycle(&transport);
        let mut sink = Captured::default();

        let err = cycle.run(now(), &mut sink).await.unwrap_err();
        assert!(matches!(err, CycleError::AuthUnavailable(AuthError::HttpStatus(500))));
        assert_eq!(err.kind(), "auth_unavailable");
        assert_eq!(transport.get_count(), 0);
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let transport = Arc::new(MockTransport::new());
        transport.push_post(token_ok("ya29.a", 3600));
        transport.push_get(Err(TransportError::Timeout { timeout_secs: 30 }));
        let mut cycle = cycle(&transport);
        let mut sink = Captured::default();

        let err = cycle.run(now(), &mut sink).await.unwrap_err();
        assert!(matches!(err, CycleError::FetchFailed(FetchError::Transport(_))));
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn one_bad_date_discards_batch() {
        let transport = Arc::new(MockTransport::new());
        transport.push_post(token_ok("ya29.a", 3600));
        transport.push_get(json(
            200,
            j!({"items": [
                event("ok", "2025-03-05T09:30:00Z", "2025-03-05T10:00:00Z"),
                event("bad", "2025-13-05T09:30:00Z", ""),
            ]}),
        ));
        let mut cycle = cycle(&transport);
        let mut sink = Captured::default();

        let err = cycle.run(now(), &mut sink).await.unwrap_err();
        assert!(matches!(
            err,
            CycleError::InvalidDate(NormalizeError::InvalidDate { index: 1, .. })
        ));
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_on_later_cycle() {
        let transport = Arc::new(MockTransport::new());
        transport.push_post(token_ok("ya29.a", 3600));
        transport.push_post(token_ok("ya29.b", 3600));
        transport.push_get(json(200, j!({"items": []})));
        transport.push_get(json(200, j!({"items": []})));
        let mut cycle = cycle(&transport);
        let mut sink = Captured::default();

        cycle.run(now(), &mut sink).await.unwrap();
        let report = cycle.run(now() + Duration::seconds(3570), &mut sink).await.unwrap();
        assert!(report.token_refreshed);
        let requests = transport.requests.lock().unwrap();
        assert!(matches!(
            requests.last(),
            Some(crate::transport::mock::Recorded::Get { bearer, .. }) if bearer == "ya29.b"
        ));
    }
}
