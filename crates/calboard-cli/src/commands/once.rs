use std::path::Path;
use std::sync::Arc;

use calboard_core::SyncCycle;
use chrono::Utc;

use crate::render::{ConsoleRenderer, JsonRenderer};

/// Single cycle, no heartbeat. A failed cycle is an error exit.
pub async fn run(explicit: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, config) = super::load_config(explicit)?;
    let transport = Arc::new(super::build_transport(&config)?);
    let mut cycle = SyncCycle::from_config(&config, transport)?;

    if json {
        let mut renderer = JsonRenderer::default();
        cycle.run(Utc::now(), &mut renderer).await?;
        if let Some(frame) = renderer.take() {
            println!("{}", serde_json::to_string_pretty(&frame)?);
        }
    } else {
        let report = cycle.run(Utc::now(), &mut ConsoleRenderer::stdout()).await?;
        println!();
        println!("{} event(s) in {} day column(s)", report.fetched, report.groups);
    }
    Ok(())
}
