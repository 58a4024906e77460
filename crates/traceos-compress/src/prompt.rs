pub const COMPRESSION_SYSTEM_PROMPT: &str =
    "You are compressing design session events into a memory summary for an AI system.";

/// Build the deterministic (temperature 0, at the caller's discretion)
/// compression prompt from a rendered event log.
pub fn build_prompt(formatted_events: &str) -> String {
    format!(
        r#"Events log:
```
{formatted_events}
```

Task:
Analyze these events and create a compressed memory summary.

Extract:
1. **Summary**: 2-3 sentence narrative of what happened in the session
2. **Key Decisions**: List of important decisions made (e.g., "chose organic style", "rejected harsh transitions")
3. **Active Modifiers**: Final modifier values that were applied (e.g., {{"stroke_weight": 0.7}})
4. **User Preferences**: Any preferences or constraints mentioned (e.g., "prefers muted palette", "WCAG AA required")
5. **Design Intent**: The overall goal or direction (1 sentence)

Format your response as JSON:
{{
  "summary": "narrative summary...",
  "key_decisions": ["decision 1", "decision 2"],
  "active_modifiers": {{"modifier_name": 0.7}},
  "user_preferences": ["preference 1", "preference 2"],
  "design_intent": "the overall goal..."
}}

Keep the summary concise - target ~400 tokens total.

Respond with ONLY the JSON object, no markdown formatting or extra text."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_the_formatted_events() {
        let prompt = build_prompt("[t] session.created by system");
        assert!(prompt.contains("[t] session.created by system"));
        assert!(prompt.contains("\"summary\""));
    }
}
