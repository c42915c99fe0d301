//! Conditional edge out of the model node

use super::approval::ApprovalStyle;
use crate::message::{ConversationState, IdGenerator, Message};
use serde::{Deserialize, Serialize};

/// Hard cutoff on model invocations per conversation
pub const MAX_TURNS: u32 = 3;

/// Appended by the max-turns node before the run ends
pub const MAX_TURNS_MESSAGE: &str = "You have reached the maximum number of allowed turns!";

/// Node to run after a model turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextNode {
    Tools,
    HumanApproval,
    MaxTurnsReached,
    End,
}

/// How pending tool calls leave the model node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRouting {
    /// Execute tool calls immediately
    #[default]
    Direct,
    /// Suspend with an informational payload before executing
    Approval,
    /// Suspend with one action request per tool call before executing
    ApprovalActions,
}

impl ToolRouting {
    /// Payload style used when tool calls need approval
    pub fn approval_style(self) -> Option<ApprovalStyle> {
        match self {
            ToolRouting::Direct => None,
            ToolRouting::Approval => Some(ApprovalStyle::Informational),
            ToolRouting::ApprovalActions => Some(ApprovalStyle::ActionRequest),
        }
    }

    fn tools_node(self) -> NextNode {
        match self {
            ToolRouting::Direct => NextNode::Tools,
            ToolRouting::Approval | ToolRouting::ApprovalActions => NextNode::HumanApproval,
        }
    }
}

/// Decide the next node from the current conversation state.
///
/// The turn limit wins over everything else. Otherwise an `ai` message with
/// at least one tool call continues to the tools (or approval) node; any other
/// last message, including an `ai` message with an empty call list, ends the
/// run.
pub fn route(state: &ConversationState, routing: ToolRouting) -> NextNode {
    if state.turn_count >= MAX_TURNS {
        return NextNode::MaxTurnsReached;
    }

    match state.last_message() {
        Some(Message::Ai { tool_calls, .. }) if !tool_calls.is_empty() => routing.tools_node(),
        _ => NextNode::End,
    }
}

/// The max-turns node: a system notice closing the run
pub fn max_turns_reached(ids: &dyn IdGenerator) -> Message {
    Message::system(ids.next_id(), MAX_TURNS_MESSAGE)
}
