//! Tool-call reconciliation
//!
//! Model APIs reject histories where a tool call has no matching result. When
//! a call was never answered (the human ignored it, the executor was
//! cancelled, a new message interrupted the run) a placeholder response is
//! synthesized so the history stays valid.

use crate::message::{IdGenerator, Message, DO_NOT_RENDER_ID_PREFIX};

/// Content of every synthesized tool response
pub const SYNTHETIC_TOOL_RESPONSE: &str = "Successfully handled tool call.";

/// Synthesize a response for every tool call that no later `tool` message
/// answers.
///
/// Calls are visited in history order and the result preserves that order.
/// A call without an id is matched (and answered) as `""`. The input is not
/// modified; callers append the result themselves.
pub fn ensure_tool_calls_have_responses(messages: &[Message], ids: &dyn IdGenerator) -> Vec<Message> {
    let mut synthesized = Vec::new();

    for (index, message) in messages.iter().enumerate() {
        let Message::Ai { tool_calls, .. } = message else {
            continue;
        };
        let later = &messages[index + 1..];

        for call in tool_calls {
            let answered = later
                .iter()
                .any(|m| m.tool_call_id() == Some(call.id()));
            if answered {
                continue;
            }

            synthesized.push(Message::tool(
                format!("{DO_NOT_RENDER_ID_PREFIX}{}", ids.next_id()),
                call.id(),
                call.name.clone(),
                SYNTHETIC_TOOL_RESPONSE,
            ));
        }
    }

    synthesized
}
