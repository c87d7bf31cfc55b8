//! End-to-end sync cycles against a local mock of the Google endpoints,
//! going through the real reqwest transport.

use std::sync::Arc;
use std::time::Duration;

use calboard_core::calendar::{DayGroup, NormalizedEvent};
use calboard_core::{
    Config, CycleError, FetchError, HttpTransport, RenderFrame, RenderSink, ReqwestTransport,
    SyncCycle, TransportError,
};
use chrono::{DateTime, TimeZone, Utc};
use mockito::Matcher;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};

#[derive(Default)]
struct Collect {
    frames: Vec<(Vec<NormalizedEvent>, Vec<DayGroup>)>,
}

impl RenderSink for Collect {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        self.frames.push((frame.events.to_vec(), frame.groups.to_vec()));
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 5, 8, 0, 0).unwrap()
}

/// Config pointing every endpoint at `base`, with a fresh key on disk.
fn config_for(base: &str, dir: &tempfile::TempDir) -> Config {
    let key = rsa::RsaPrivateKey::new(&mut rand::rngs::OsRng, 1024).unwrap();
    let pem_path = dir.path().join("key.pem");
    std::fs::write(&pem_path, key.to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes()).unwrap();

    let mut config = Config::default();
    config.credentials.service_account_email =
        Some("display@project.iam.gserviceaccount.com".into());
    config.credentials.private_key_file = Some(pem_path);
    config.credentials.token_uri = Some(format!("{base}/token"));
    config.calendar.api_base = base.to_string();
    config
}

fn cycle_for(config: &Config) -> SyncCycle<ReqwestTransport> {
    let transport =
        ReqwestTransport::new(config.sync.http_timeout(), config.sync.max_response_bytes)
            .unwrap();
    SyncCycle::from_config(config, Arc::new(transport)).unwrap()
}

#[tokio::test]
async fn full_cycle_against_mock_server() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server.url(), &dir);

    let token = server
        .mock("POST", "/token")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::Regex(
            concat!(
                "^grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
                "&assertion=[A-Za-z0-9_.-]+$"
            )
            .into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"ya29.integration","expires_in":3600,"token_type":"Bearer"}"#)
        .expect(1)
        .create_async()
        .await;

    let events = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("singleEvents".into(), "true".into()),
            Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
            Matcher::UrlEncoded("timeMin".into(), "2025-03-05T08:00:00Z".into()),
            Matcher::UrlEncoded("timeMax".into(), "2025-04-04T08:00:00Z".into()),
            Matcher::UrlEncoded("maxResults".into(), "50".into()),
        ]))
        .match_header("authorization", "Bearer ya29.integration")
        .with_status(200)
        .with_body(
            r#"{"items":[
                {"summary":"Standup","start":{"dateTime":"2025-03-05T09:30:00Z"},"end":{"dateTime":"2025-03-05T10:15:00Z"}},
                {"summary":"Offsite","start":{"date":"2025-03-06"},"end":{"date":"2025-03-07"}}
            ]}"#,
        )
        .expect(2)
        .create_async()
        .await;

    let mut cycle = cycle_for(&config);
    let mut sink = Collect::default();

    let first = cycle.run(now(), &mut sink).await.unwrap();
    assert_eq!(first.fetched, 2);
    assert_eq!(first.groups, 2);
    assert!(first.token_refreshed);

    let second = cycle.run(now(), &mut sink).await.unwrap();
    assert!(!second.token_refreshed);

    token.assert_async().await;
    events.assert_async().await;

    let (normalized, groups) = &sink.frames[0];
    assert_eq!(normalized[0].start_hhmm, "09:30");
    assert_eq!(normalized[1].start_hhmm, "00:00");
    assert_eq!(normalized[1].end_hhmm, "23:59");
    assert_eq!(groups[1].label, "06 March");
}

#[tokio::test]
async fn rejected_assertion_means_no_events_request() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server.url(), &dir);

    server
        .mock("POST", "/token")
        .with_status(500)
        .with_body("oops")
        .create_async()
        .await;
    let events = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut cycle = cycle_for(&config);
    let mut sink = Collect::default();
    let err = cycle.run(now(), &mut sink).await.unwrap_err();

    assert!(matches!(err, CycleError::AuthUnavailable(_)));
    assert!(sink.frames.is_empty());
    assert!(cycle.tokens().current().await.is_none());
    events.assert_async().await;
}

#[tokio::test]
async fn forbidden_calendar_is_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server.url(), &dir);

    server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"ya29.x","expires_in":3600}"#)
        .create_async()
        .await;
    server
        .mock("GET", Matcher::Regex("^/calendars/primary/events".into()))
        .with_status(403)
        .with_body(r#"{"error":{"code":403}}"#)
        .create_async()
        .await;

    let mut cycle = cycle_for(&config);
    let err = cycle.run(now(), &mut Collect::default()).await.unwrap_err();
    assert!(matches!(err, CycleError::FetchFailed(FetchError::HttpStatus(403))));
}

#[tokio::test]
async fn oversized_body_is_truncated_at_cap() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/big")
        .with_status(200)
        .with_body(vec![b'x'; 40 * 1024])
        .create_async()
        .await;

    let transport = ReqwestTransport::new(Duration::from_secs(5), 32 * 1024).unwrap();
    let resp = transport
        .get_authorized(&format!("{}/big", server.url()), "tok")
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body.len(), 32 * 1024);
}

#[tokio::test]
async fn silent_server_times_out() {
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let transport = ReqwestTransport::new(Duration::from_millis(200), 32 * 1024).unwrap();
    let err = transport
        .post_form(&format!("http://{addr}/token"), "grant_type=x".into())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Timeout { .. }));
}
