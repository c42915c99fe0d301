//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::graph::{HumanResponse, ToolRouting, MAX_TURNS};
use crate::message::{ConversationState, Message, SequentialIds, ToolCall};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context(routing: ToolRouting) -> ConvContext {
    ConvContext::new("test-conv", routing).with_ids(Arc::new(SequentialIds::default()))
}

fn appended(result: &TransitionResult) -> Vec<Message> {
    result
        .effects
        .iter()
        .filter_map(|e| match e {
            Effect::AppendMessages { messages } => Some(messages.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_call() -> impl Strategy<Value = ToolCall> {
    ("[a-z]{4}", prop_oneof![Just("adder"), Just("weather")])
        .prop_map(|(id, name)| ToolCall::new(id, name, json!({})))
}

fn arb_ai_message() -> impl Strategy<Value = Message> {
    proptest::collection::vec(arb_tool_call(), 0..3).prop_map(|calls| Message::ai("ai", "", calls))
}

fn arb_routing() -> impl Strategy<Value = ToolRouting> {
    prop_oneof![
        Just(ToolRouting::Direct),
        Just(ToolRouting::Approval),
        Just(ToolRouting::ApprovalActions),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::CallingModel),
        proptest::collection::vec(arb_tool_call(), 1..3)
            .prop_map(|calls| ConvState::ExecutingTools { calls }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{1,10}".prop_map(|text| Event::UserMessage { text }),
        arb_ai_message().prop_map(|message| Event::ModelResponse { message }),
        Just(Event::ModelError {
            message: "boom".into(),
            error_kind: ErrorKind::Network
        }),
        Just(Event::ToolsComplete { responses: vec![] }),
        Just(Event::Decision {
            interrupt_id: "x".into(),
            responses: vec![HumanResponse::Accept]
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Busy states never accept a user message
    #[test]
    fn prop_busy_rejects_user_messages(state in arb_busy_state(), text in "[a-z]{1,10}") {
        let result = transition(
            &state,
            &test_context(ToolRouting::Direct),
            &ConversationState::default(),
            Event::UserMessage { text },
        );
        prop_assert!(matches!(result, Err(TransitionError::AgentBusy)));
    }

    /// Every model response bumps the counter by exactly one
    #[test]
    fn prop_model_response_increments_turn(
        message in arb_ai_message(),
        turns in 0u32..10,
        routing in arb_routing(),
    ) {
        let conversation = ConversationState::new(vec![Message::human("h", "go")], turns);
        let result = transition(
            &ConvState::CallingModel,
            &test_context(routing),
            &conversation,
            Event::ModelResponse { message },
        ).unwrap();

        let recorded: Vec<u32> = result.effects.iter().filter_map(|e| match e {
            Effect::SetTurnCount { turn_count } => Some(*turn_count),
            _ => None,
        }).collect();
        prop_assert_eq!(recorded, vec![turns + 1]);
    }

    /// Reaching the limit always ends the run without executing tools
    #[test]
    fn prop_turn_limit_never_executes_tools(
        message in arb_ai_message(),
        turns in (MAX_TURNS - 1)..20,
        routing in arb_routing(),
    ) {
        let conversation = ConversationState::new(vec![Message::human("h", "go")], turns);
        let result = transition(
            &ConvState::CallingModel,
            &test_context(routing),
            &conversation,
            Event::ModelResponse { message },
        ).unwrap();

        prop_assert_eq!(result.new_state, ConvState::Idle);
        let executes = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ExecuteTools { .. }));
        prop_assert!(!executes, "turn limit must not execute tools");
    }

    /// Decisions are only accepted while awaiting approval
    #[test]
    fn prop_decisions_need_pending_interrupt(state in prop_oneof![
        Just(ConvState::Idle),
        Just(ConvState::CallingModel),
        arb_busy_state(),
    ]) {
        let result = transition(
            &state,
            &test_context(ToolRouting::Approval),
            &ConversationState::default(),
            Event::Decision { interrupt_id: "id-1".into(), responses: vec![HumanResponse::Accept] },
        );
        prop_assert!(matches!(result, Err(TransitionError::NoPendingInterrupt)));
    }

    /// Whatever is appended before a model request leaves no call unanswered
    #[test]
    fn prop_history_is_complete_before_model_request(
        calls in proptest::collection::vec(arb_tool_call(), 1..4),
        answered in 0usize..4,
        text in "[a-z]{1,8}",
    ) {
        let ctx = test_context(ToolRouting::Direct);
        let mut messages = vec![Message::human("h", "go"), Message::ai("a", "", calls.clone())];
        for call in calls.iter().take(answered) {
            messages.push(Message::tool(format!("t-{}", call.id()), call.id(), call.name.clone(), "ok"));
        }
        let conversation = ConversationState::new(messages, 1);

        let result = transition(&ConvState::Idle, &ctx, &conversation, Event::UserMessage { text }).unwrap();
        prop_assert!(result.effects.iter().any(|e| matches!(e, Effect::RequestModel)));

        let mut history = conversation.messages;
        history.extend(appended(&result));
        let missing = crate::graph::ensure_tool_calls_have_responses(&history, ctx.ids.as_ref());
        prop_assert!(missing.is_empty());
    }

    /// Transitions never panic, whatever the pairing
    #[test]
    fn prop_transition_total(event in arb_event(), routing in arb_routing()) {
        for state in [ConvState::Idle, ConvState::CallingModel, ConvState::ExecutingTools { calls: vec![] }] {
            let _ = transition(&state, &test_context(routing), &ConversationState::default(), event.clone());
        }
    }
}
