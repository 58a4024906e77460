use serde::{Deserialize, Serialize};
use serde_json::Value;
use traceos_types::{GutState, ResonanceEvent};

use crate::registry::GutRegistry;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundFrame {
    ResonanceBatch { events: Vec<Value> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundFrame {
    GutState { state: GutState },
    Error { message: String },
}

/// One event-stream session, keyed by `session_id`. Transport-agnostic: it
/// consumes raw JSON frame text and produces raw JSON frame text, so the
/// caller can wire it to a WebSocket, a Unix socket, or a test harness
/// identically. Disconnect doesn't clear the underlying `GutCritic` —
/// sessions may reconnect and keep their emotional history; only an
/// explicit `clear` call (§4.9) resets it.
pub struct EventStreamSession {
    session_id: String,
    registry: GutRegistry,
}

impl EventStreamSession {
    pub fn new(session_id: impl Into<String>, registry: GutRegistry) -> Self {
        Self {
            session_id: session_id.into(),
            registry,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Handle one inbound frame, returning the reply frame as JSON text.
    /// Malformed frames never terminate the session — they yield an
    /// `error` frame instead. Malformed elements within an otherwise valid
    /// `resonance_batch` are skipped individually rather than failing the
    /// whole batch.
    pub fn handle_frame(&self, raw: &str) -> String {
        let frame: InboundFrame = match serde_json::from_str(raw) {
            Ok(f) => f,
            Err(e) => {
                return self.error_frame(&format!("malformed frame: {e}"));
            }
        };

        match frame {
            InboundFrame::ResonanceBatch { events } => {
                let mut decoded = Vec::with_capacity(events.len());
                let mut skipped = 0usize;
                for raw_event in events {
                    match serde_json::from_value::<ResonanceEvent>(raw_event) {
                        Ok(ev) => decoded.push(ev),
                        Err(_) => skipped += 1,
                    }
                }
                if skipped > 0 {
                    tracing::warn!(
                        session_id = %self.session_id,
                        skipped,
                        "dropped malformed resonance events from batch"
                    );
                }
                let state = self.registry.ingest_batch(&self.session_id, decoded);
                self.state_frame(state)
            }
        }
    }

    /// Reset this session's valuation state via the separate control path
    /// mentioned in §4.9 — not reachable through `handle_frame`.
    pub fn clear(&self) {
        self.registry.clear(&self.session_id);
    }

    fn state_frame(&self, state: GutState) -> String {
        serde_json::to_string(&OutboundFrame::GutState { state })
            .expect("GutState serializes")
    }

    fn error_frame(&self, message: &str) -> String {
        serde_json::to_string(&OutboundFrame::Error {
            message: message.to_string(),
        })
        .expect("error frame serializes")
    }
}
