//! Pure state transition function
//!
//! The ReAct graph expressed as state-machine edges:
//! user message -> model -> (tools | approval -> tools | max turns | end),
//! tools -> model.

use super::{ConvContext, ConvState, Effect, Event};
use crate::graph::{
    apply_decision, ensure_tool_calls_have_responses, human_approval, max_turns_reached, route,
    ApprovalError, NextNode,
};
use crate::message::{ConversationState, Message};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Agent is busy, cannot accept message")]
    AgentBusy,
    #[error("No decision is pending for this conversation")]
    NoPendingInterrupt,
    #[error("Decision targets interrupt {actual}, but {expected} is pending")]
    StaleDecision { expected: String, actual: String },
    #[error("Invalid decision: {0}")]
    InvalidDecision(#[from] ApprovalError),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs (and the same id sequence from the context) it
/// always produces the same outputs, with no I/O.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    conversation: &ConversationState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User Messages
        // ============================================================

        // A new message while approval is pending abandons the pending calls;
        // reconciliation answers them before the model sees the history.
        (
            ConvState::Idle | ConvState::Error { .. } | ConvState::AwaitingApproval { .. },
            Event::UserMessage { text },
        ) => {
            let ids = context.ids.as_ref();
            let mut messages = ensure_tool_calls_have_responses(&conversation.messages, ids);
            messages.push(Message::human(ids.next_id(), text));

            Ok(request_model(messages))
        }

        (ConvState::CallingModel | ConvState::ExecutingTools { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::AgentBusy)
        }

        // ============================================================
        // Model Responses
        // ============================================================
        (ConvState::CallingModel, Event::ModelResponse { message }) => {
            let turn_count = conversation.turn_count.saturating_add(1);
            let mut after = conversation.clone();
            after.messages.push(message.clone());
            after.turn_count = turn_count;

            let recorded = [
                Effect::SetTurnCount { turn_count },
                Effect::append(vec![message]),
            ];

            let result = match route(&after, context.tool_routing) {
                NextNode::MaxTurnsReached => {
                    // The final turn's calls never run; placeholders precede the notice
                    let ids = context.ids.as_ref();
                    let mut closing = ensure_tool_calls_have_responses(&after.messages, ids);
                    closing.push(max_turns_reached(ids));
                    let done = finish(ConvState::Idle);
                    TransitionResult::new(done.new_state)
                        .with_effect(Effect::append(closing))
                        .with_effects(done.effects)
                }
                NextNode::End => finish(ConvState::Idle),
                NextNode::Tools => {
                    let calls = after.pending_tool_calls().to_vec();
                    let new_state = ConvState::ExecutingTools {
                        calls: calls.clone(),
                    };
                    TransitionResult::new(new_state.clone())
                        .with_effect(Effect::PersistState)
                        .with_effect(Effect::notify_state_change(&new_state))
                        .with_effect(Effect::ExecuteTools { calls })
                }
                NextNode::HumanApproval => {
                    let style = context
                        .tool_routing
                        .approval_style()
                        .ok_or_else(|| {
                            TransitionError::InvalidTransition(
                                "approval requested without an approval style".to_string(),
                            )
                        })?;
                    let interrupt = human_approval(&after, style, context.ids.as_ref());
                    let notify = Effect::notify_interrupt(&interrupt);
                    let new_state = ConvState::AwaitingApproval { interrupt };
                    TransitionResult::new(new_state.clone())
                        .with_effect(Effect::PersistState)
                        .with_effect(Effect::notify_state_change(&new_state))
                        .with_effect(notify)
                }
            };

            Ok(TransitionResult {
                new_state: result.new_state,
                effects: recorded.into_iter().chain(result.effects).collect(),
            })
        }

        // Errors propagate as-is: no retry, no fallback
        (ConvState::CallingModel, Event::ModelError { message, error_kind }) => {
            let new_state = ConvState::Error {
                message,
                error_kind,
            };
            Ok(TransitionResult::new(new_state.clone())
                .with_effect(Effect::PersistState)
                .with_effect(Effect::notify_state_change(&new_state)))
        }

        // ============================================================
        // Tool Execution
        // ============================================================
        (ConvState::ExecutingTools { .. }, Event::ToolsComplete { responses }) => {
            Ok(request_model(with_gaps_filled(context, conversation, responses)))
        }

        // ============================================================
        // Human Approval
        // ============================================================
        (ConvState::AwaitingApproval { interrupt }, Event::Decision { interrupt_id, responses }) => {
            if interrupt_id != interrupt.id {
                return Err(TransitionError::StaleDecision {
                    expected: interrupt.id.clone(),
                    actual: interrupt_id,
                });
            }

            let outcome = apply_decision(interrupt, &responses, context.ids.as_ref())?;

            if !outcome.execute.is_empty() {
                let new_state = ConvState::ExecutingTools {
                    calls: outcome.execute.clone(),
                };
                let mut result = TransitionResult::new(new_state.clone());
                if !outcome.responded.is_empty() {
                    result = result.with_effect(Effect::append(outcome.responded));
                }
                Ok(result
                    .with_effect(Effect::PersistState)
                    .with_effect(Effect::notify_state_change(&new_state))
                    .with_effect(Effect::ExecuteTools {
                        calls: outcome.execute,
                    }))
            } else if !outcome.responded.is_empty() {
                Ok(request_model(with_gaps_filled(
                    context,
                    conversation,
                    outcome.responded,
                )))
            } else {
                // Everything ignored: the run ends, the next user message
                // reconciles the unanswered calls.
                Ok(finish(ConvState::Idle))
            }
        }

        (_, Event::Decision { .. }) => Err(TransitionError::NoPendingInterrupt),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} cannot handle {}",
            state.name(),
            event.name()
        ))),
    }
}

/// Append `messages` and go back to the model node
fn request_model(messages: Vec<Message>) -> TransitionResult {
    let new_state = ConvState::CallingModel;
    TransitionResult::new(new_state.clone())
        .with_effect(Effect::append(messages))
        .with_effect(Effect::PersistState)
        .with_effect(Effect::notify_state_change(&new_state))
        .with_effect(Effect::RequestModel)
}

/// End of a run
fn finish(new_state: ConvState) -> TransitionResult {
    TransitionResult::new(new_state.clone())
        .with_effect(Effect::PersistState)
        .with_effect(Effect::notify_state_change(&new_state))
        .with_effect(Effect::notify_agent_done())
}

/// `responses` followed by placeholders for every call still unanswered
fn with_gaps_filled(
    context: &ConvContext,
    conversation: &ConversationState,
    mut responses: Vec<Message>,
) -> Vec<Message> {
    let mut history = conversation.messages.clone();
    history.extend(responses.iter().cloned());
    responses.extend(ensure_tool_calls_have_responses(&history, context.ids.as_ref()));
    responses
}
