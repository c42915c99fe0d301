//! System prompt template rendering

use chrono::{DateTime, SecondsFormat, Utc};

/// Placeholder substituted with the current time
pub const SYSTEM_TIME_PLACEHOLDER: &str = "{system_time}";

/// Default prompt used when a conversation does not supply its own
pub const SYSTEM_PROMPT_TEMPLATE: &str = "You are a helpful AI assistant.

System time: {system_time}";

/// Fill in the template's `{system_time}` placeholder(s)
pub fn render(template: &str, now: DateTime<Utc>) -> String {
    template.replace(
        SYSTEM_TIME_PLACEHOLDER,
        &now.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}
