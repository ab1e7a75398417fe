//! Server-sent event framing for relay events.
//!
//! Each event goes on the wire as:
//!
//! ```text
//! event: <name>
//! data: <json>
//!
//! ```
//!
//! JSON payloads are written compactly, so every frame is exactly one
//! `event:` line and one `data:` line. The decoder mirrors what the browser
//! client does: split on blank lines, then read the two prefixed lines.

use axum::response::sse::Event;
use serde_json::Value;
use thiserror::Error;

use crate::application::RelayEvent;

/// Errors raised while decoding an event stream body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame has no data line: {0:?}")]
    MissingData(String),

    #[error("invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Splits a relay event into its wire name and JSON payload.
fn name_and_payload(event: &RelayEvent) -> Result<(&'static str, String), serde_json::Error> {
    let mut tagged = serde_json::to_value(event)?;
    let data = tagged
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null);
    Ok((event.name(), serde_json::to_string(&data)?))
}

/// Encodes one event as a complete wire frame.
pub fn encode_event(event: &RelayEvent) -> Result<String, serde_json::Error> {
    let (name, data) = name_and_payload(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", name, data))
}

/// Converts a relay event into an axum SSE event with the same framing.
pub fn to_sse_event(event: &RelayEvent) -> Result<Event, serde_json::Error> {
    let (name, data) = name_and_payload(event)?;
    Ok(Event::default().event(name).data(data))
}

/// Decodes a full event stream body.
///
/// Comment frames (keep-alives) and frames without an `event:` line are
/// skipped.
pub fn decode_events(body: &str) -> Result<Vec<RelayEvent>, DecodeError> {
    let normalized = body.replace("\r\n", "\n");
    let mut events = Vec::new();

    for frame in normalized.split("\n\n") {
        let mut name = None;
        let mut data = None;

        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                name = Some(rest.trim());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data = Some(rest.trim());
            }
        }

        let Some(name) = name else {
            continue;
        };
        let data = data.ok_or_else(|| DecodeError::MissingData(frame.to_string()))?;

        let tagged = serde_json::json!({
            "event": name,
            "data": serde_json::from_str::<Value>(data)?,
        });
        events.push(serde_json::from_value(tagged)?);
    }

    Ok(events)
}
