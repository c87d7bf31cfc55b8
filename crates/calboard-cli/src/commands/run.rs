//! The supervisor loop.
//!
//! Runs a sync cycle on every interval tick (the first one immediately) and
//! applies the configured failure policy to each failed cycle. The heartbeat
//! runs as its own task and shares nothing with the loop.

use std::path::Path;
use std::sync::Arc;

use calboard_core::config::SyncConfig;
use calboard_core::{CoreError, FailurePolicy, HttpTransport, RenderSink, SyncCycle};
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::heartbeat;
use crate::render::ConsoleRenderer;

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let (path, config) = super::load_config(explicit)?;
    info!(
        config = %path.display(),
        calendar = %config.calendar.calendar_id,
        interval_secs = config.sync.interval_secs,
        "starting supervisor"
    );

    let transport = Arc::new(super::build_transport(&config)?);
    let mut cycle = SyncCycle::from_config(&config, transport)?;
    let heartbeat = config
        .heartbeat
        .enabled
        .then(|| tokio::spawn(heartbeat::run(config.heartbeat.clone())));
    let mut renderer = ConsoleRenderer::stdout();

    let outcome = tokio::select! {
        result = supervise(&mut cycle, &mut renderer, &config.sync) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    };

    if let Some(task) = heartbeat {
        task.abort();
    }
    outcome.map_err(Into::into)
}

/// Returns only when a cycle fails under [`FailurePolicy::Restart`].
pub async fn supervise<T: HttpTransport, S: RenderSink>(
    cycle: &mut SyncCycle<T>,
    sink: &mut S,
    sync: &SyncConfig,
) -> Result<(), CoreError> {
    let mut ticker = tokio::time::interval(sync.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles: u64 = 0;

    loop {
        ticker.tick().await;
        cycles += 1;

        match cycle.run(Utc::now(), sink).await {
            Ok(report) => {
                info!(
                    cycle = cycles,
                    fetched = report.fetched,
                    groups = report.groups,
                    next_in_secs = sync.interval_secs,
                    "display refreshed"
                );
            }
            Err(e) => {
                error!(cycle = cycles, kind = e.kind(), error = %e, "sync cycle failed");
                match sync.failure_policy {
                    FailurePolicy::Restart => return Err(e.into()),
                    FailurePolicy::Retry => {
                        warn!(
                            retry_in_secs = sync.interval_secs,
                            "keeping previous display until next cycle"
                        );
                    }
                }
            }
        }
    }
}
