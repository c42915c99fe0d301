//! Agent graph nodes
//!
//! The pieces of the ReAct loop that decide where a conversation goes next:
//! routing after a model turn, human approval of tool calls, and
//! reconciliation of unanswered tool calls. All of them are pure functions
//! over the message history; the state machine wires them together.

pub mod approval;
pub mod reconcile;
pub mod routing;


pub use approval::{
    apply_decision, human_approval, ActionRequest, ApprovalError, ApprovalOutcome, ApprovalStyle,
    HumanResponse, InterruptPayload, PendingInterrupt,
};
pub use reconcile::{ensure_tool_calls_have_responses, SYNTHETIC_TOOL_RESPONSE};
pub use routing::{max_turns_reached, route, NextNode, ToolRouting, MAX_TURNS, MAX_TURNS_MESSAGE};
