//! Text and JSON stand-ins for the display panel.

use std::io::Write;

use calboard_core::{DayGroup, RenderFrame, RenderSink};
use serde_json::json;
use tracing::warn;

/// Panel geometry, in pixels: one column per day, one row per event.
pub const COLUMN_X0: usize = 5;
pub const COLUMN_PITCH: usize = 160;
pub const ROW_Y0: usize = 60;
pub const ROW_PITCH: usize = 105;
/// Date headers are centred on their column, above the first box.
pub const HEADER_CENTER_X0: usize = 80;
pub const HEADER_CENTER_Y: usize = 30;

/// Top-left corner of the event box at `row` within `column`.
pub fn box_origin(column: usize, row: usize) -> (usize, usize) {
    (COLUMN_X0 + COLUMN_PITCH * column, ROW_Y0 + ROW_PITCH * row)
}

/// Centre point of the date header for `column`.
pub fn header_center(column: usize) -> (usize, usize) {
    (HEADER_CENTER_X0 + COLUMN_PITCH * column, HEADER_CENTER_Y)
}

/// Prints one header per day group followed by its events.
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl ConsoleRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, frame: &RenderFrame<'_>) -> std::io::Result<()> {
        writeln!(
            self.out,
            "Upcoming events (updated {})",
            frame.generated_at.format("%Y-%m-%d %H:%M UTC")
        )?;
        if frame.groups.is_empty() {
            writeln!(self.out, "  No upcoming events")?;
        }
        for group in frame.groups {
            writeln!(self.out)?;
            writeln!(self.out, "{}", group.label)?;
            for event in frame.events_of(group) {
                writeln!(self.out, "  {}-{}  {}", event.start_hhmm, event.end_hhmm, event.name)?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write> RenderSink for ConsoleRenderer<W> {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        if let Err(e) = self.write_frame(frame) {
            warn!(error = %e, "failed to write frame");
        }
    }
}

/// Captures the last frame as JSON, with panel coordinates for headers and boxes.
#[derive(Default)]
pub struct JsonRenderer {
    last: Option<serde_json::Value>,
}

impl JsonRenderer {
    pub fn take(&mut self) -> Option<serde_json::Value> {
        self.last.take()
    }

    fn column(frame: &RenderFrame<'_>, group: &DayGroup) -> serde_json::Value {
        let events: Vec<_> = frame
            .events_of(group)
            .iter()
            .enumerate()
            .map(|(row, event)| {
                let (x, y) = box_origin(group.column, row);
                json!({ "event": event, "x": x, "y": y })
            })
            .collect();
        let (header_x, header_y) = header_center(group.column);
        json!({
            "label": group.label,
            "header": { "x": header_x, "y": header_y },
            "day": group.day,
            "month": group.month,
            "column": group.column,
            "events": events,
        })
    }
}

impl RenderSink for JsonRenderer {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        let columns: Vec<_> = frame.groups.iter().map(|g| Self::column(frame, g)).collect();
        self.last = Some(json!({
            "generated_at": frame.generated_at.to_rfc3339(),
            "columns": columns,
        }));
    }
}
