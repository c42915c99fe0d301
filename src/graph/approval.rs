//! Human approval of pending tool calls
//!
//! Approval is a durable suspension: the conversation stores a
//! [`PendingInterrupt`] and stays in `awaiting_approval` until a decision
//! naming the same interrupt id arrives, possibly after a restart.

use crate::message::{ConversationState, IdGenerator, Message, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Shape of the interrupt payload shown to the human
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStyle {
    /// A plain summary of the pending calls; approve or ignore them
    Informational,
    /// One actionable request per call with capability flags
    ActionRequest,
}

/// A tool call as listed in an informational payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub name: String,
    pub id: String,
    pub args: Map<String, Value>,
}

/// Requested action: tool name plus arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub args: Map<String, Value>,
}

/// What the human may do with an action request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)] // Wire format
pub struct HumanInterruptConfig {
    pub allow_edit: bool,
    pub allow_respond: bool,
    pub allow_ignore: bool,
    pub allow_accept: bool,
}

impl HumanInterruptConfig {
    /// Every response type permitted
    pub fn all() -> Self {
        Self {
            allow_edit: true,
            allow_respond: true,
            allow_ignore: true,
            allow_accept: true,
        }
    }

    /// Approve-or-reject only
    pub fn accept_or_ignore() -> Self {
        Self {
            allow_edit: false,
            allow_respond: false,
            allow_ignore: true,
            allow_accept: true,
        }
    }

    fn allows(self, response: &HumanResponse) -> bool {
        match response {
            HumanResponse::Accept => self.allow_accept,
            HumanResponse::Ignore => self.allow_ignore,
            HumanResponse::Response(_) => self.allow_respond,
            HumanResponse::Edit(_) => self.allow_edit,
        }
    }
}

/// A single actionable request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanInterrupt {
    pub action_request: ActionRequest,
    pub description: String,
    pub config: HumanInterruptConfig,
}

/// Payload published when a conversation suspends for approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InterruptPayload {
    ActionRequests(Vec<HumanInterrupt>),
    Informational {
        message: String,
        tool_calls: Vec<PendingToolCall>,
    },
}

/// The durable "awaiting decision" record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInterrupt {
    pub id: String,
    /// Calls awaiting the decision, in the order the model issued them
    pub tool_calls: Vec<ToolCall>,
    pub payload: InterruptPayload,
}

impl PendingInterrupt {
    /// `{id, value}` as published to clients
    pub fn client_view(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "value": self.payload,
        })
    }

    fn config_for(&self, index: usize) -> HumanInterruptConfig {
        match &self.payload {
            InterruptPayload::ActionRequests(requests) => requests
                .get(index)
                .map_or_else(HumanInterruptConfig::accept_or_ignore, |r| r.config),
            InterruptPayload::Informational { .. } => HumanInterruptConfig::accept_or_ignore(),
        }
    }
}

/// The human's answer to one action request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum HumanResponse {
    Accept,
    Ignore,
    /// Free-text reply used as the tool result instead of running the tool
    Response(String),
    /// Run the tool with replacement arguments
    Edit(ActionRequest),
}

impl HumanResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            HumanResponse::Accept => "accept",
            HumanResponse::Ignore => "ignore",
            HumanResponse::Response(_) => "response",
            HumanResponse::Edit(_) => "edit",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Expected {expected} responses (or one for all calls), got {actual}")]
    ResponseCountMismatch { expected: usize, actual: usize },
    #[error("Response '{response}' is not allowed for tool '{tool}'")]
    NotAllowed { response: &'static str, tool: String },
    #[error("Edit targets '{actual}' but the pending call is '{expected}'")]
    ActionMismatch { expected: String, actual: String },
}

/// How a decision splits the pending calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApprovalOutcome {
    /// Calls to execute, with edited arguments applied
    pub execute: Vec<ToolCall>,
    /// Tool messages carrying the human's replies
    pub responded: Vec<Message>,
    /// Calls the human declined; left for reconciliation
    pub ignored: Vec<ToolCall>,
}

/// Build the interrupt for the tool calls of the last `ai` message.
pub fn human_approval(
    state: &ConversationState,
    style: ApprovalStyle,
    ids: &dyn IdGenerator,
) -> PendingInterrupt {
    let tool_calls = state.pending_tool_calls().to_vec();

    let payload = match style {
        ApprovalStyle::Informational => InterruptPayload::Informational {
            message: format!(
                "The agent wants to run {} tool call(s). Accept to run them or ignore to stop.",
                tool_calls.len()
            ),
            tool_calls: tool_calls
                .iter()
                .map(|call| PendingToolCall {
                    name: call.name.clone(),
                    id: call.id().to_string(),
                    args: call.args.clone(),
                })
                .collect(),
        },
        ApprovalStyle::ActionRequest => InterruptPayload::ActionRequests(
            tool_calls
                .iter()
                .map(|call| HumanInterrupt {
                    action_request: ActionRequest {
                        action: call.name.clone(),
                        args: call.args.clone(),
                    },
                    description: describe_call(call),
                    config: HumanInterruptConfig::all(),
                })
                .collect(),
        ),
    };

    PendingInterrupt {
        id: ids.next_id(),
        tool_calls,
        payload,
    }
}

fn describe_call(call: &ToolCall) -> String {
    let args = serde_json::to_string_pretty(&call.args).unwrap_or_default();
    format!("Review the call to `{}` with arguments:\n{args}", call.name)
}

/// Apply a resume decision to a pending interrupt.
///
/// `responses` holds one entry per pending call, or a single entry applied
/// to every call.
pub fn apply_decision(
    interrupt: &PendingInterrupt,
    responses: &[HumanResponse],
    ids: &dyn IdGenerator,
) -> Result<ApprovalOutcome, ApprovalError> {
    let calls = &interrupt.tool_calls;
    let broadcast = responses.len() == 1;
    if !broadcast && responses.len() != calls.len() {
        return Err(ApprovalError::ResponseCountMismatch {
            expected: calls.len(),
            actual: responses.len(),
        });
    }

    let mut outcome = ApprovalOutcome::default();

    for (index, call) in calls.iter().enumerate() {
        let response = if broadcast { &responses[0] } else { &responses[index] };

        if !interrupt.config_for(index).allows(response) {
            return Err(ApprovalError::NotAllowed {
                response: response.kind(),
                tool: call.name.clone(),
            });
        }

        match response {
            HumanResponse::Accept => outcome.execute.push(call.clone()),
            HumanResponse::Edit(edit) => {
                if edit.action != call.name {
                    return Err(ApprovalError::ActionMismatch {
                        expected: call.name.clone(),
                        actual: edit.action.clone(),
                    });
                }
                outcome.execute.push(call.with_args(edit.args.clone()));
            }
            HumanResponse::Response(text) => outcome.responded.push(Message::tool(
                ids.next_id(),
                call.id(),
                call.name.clone(),
                text.clone(),
            )),
            HumanResponse::Ignore => outcome.ignored.push(call.clone()),
        }
    }

    Ok(outcome)
}
