use crate::filter::TraceEvent;

/// Render one line per survivor: `[timestamp] event_type by actor → detail`.
/// The detail fragment is chosen by whichever readable key the event's data
/// happens to carry — modifier, text, schema id, or asset type, in that
/// priority order.
pub fn format_events(events: &[TraceEvent]) -> String {
    events
        .iter()
        .map(format_one)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_one(event: &TraceEvent) -> String {
    let timestamp: String = event.timestamp.chars().take(19).collect();
    let mut line = format!("[{timestamp}] {} by {}", event.event_type, event.actor);

    let data = &event.data;
    if let Some(modifier) = data.get("modifier").and_then(|v| v.as_str()) {
        let value = data.get("value").map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        line.push_str(&format!(" → {modifier}={value}"));
    } else if let Some(text) = data.get("text").and_then(|v| v.as_str()) {
        let truncated = if text.chars().count() > 50 {
            format!("{}...", text.chars().take(50).collect::<String>())
        } else {
            text.to_string()
        };
        line.push_str(&format!(" → \"{truncated}\""));
    } else if let Some(schema_id) = data.get("schema_id") {
        line.push_str(&format!(" → schema {schema_id}"));
    } else if let Some(asset_type) = data.get("asset_type") {
        line.push_str(&format!(" → {asset_type} asset"));
    }

    line
}
