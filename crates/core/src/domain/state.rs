use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::intent::{BookingAction, Intent};
use crate::domain::params::{ParamName, Parameters};
use crate::domain::tool::{ToolName, ToolOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

impl Utterance {
    pub fn user(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Assistant, text: text.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntentChange {
    pub previous: Intent,
    pub current: Intent,
    pub parameters_reset: bool,
}

impl IntentChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Conversation record threaded through every node of a turn.
///
/// One instance per session, owned by the caller. The runtime never holds
/// on to it between turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: Uuid,
    history: Vec<Utterance>,
    intent: Intent,
    action: Option<BookingAction>,
    parameters: Parameters,
    selected_tool: Option<ToolName>,
    tool_result: Option<ToolOutcome>,
    turn_count: u64,
    clarification_attempts: BTreeMap<ParamName, u32>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            history: Vec::new(),
            intent: Intent::Unknown,
            action: None,
            parameters: Parameters::default(),
            selected_tool: None,
            tool_result: None,
            turn_count: 0,
            clarification_attempts: BTreeMap::new(),
        }
    }

    pub fn history(&self) -> &[Utterance] {
        &self.history
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn action(&self) -> Option<BookingAction> {
        self.action
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn selected_tool(&self) -> Option<ToolName> {
        self.selected_tool
    }

    pub fn tool_result(&self) -> Option<&ToolOutcome> {
        self.tool_result.as_ref()
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub fn last_user_utterance(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|utterance| utterance.speaker == Speaker::User)
            .map(|utterance| utterance.text.as_str())
    }

    /// Records the user utterance and clears per-turn fields.
    pub fn begin_turn(&mut self, text: impl Into<String>) {
        self.history.push(Utterance::user(text));
        self.turn_count += 1;
        self.selected_tool = None;
        self.tool_result = None;
    }

    pub fn record_reply(&mut self, text: impl Into<String>) {
        self.history.push(Utterance::assistant(text));
    }

    /// Replaces the intent. Moving to a booking kind other than the one the
    /// parameters are scoped to resets parameters, action and counters.
    pub fn apply_intent(&mut self, intent: Intent) -> IntentChange {
        let previous = self.intent;
        let mut parameters_reset = false;

        if let Some(kind) = intent.booking_kind() {
            if self.parameters.kind() != Some(kind) {
                self.parameters.reset_for(kind);
                self.action = None;
                self.clarification_attempts.clear();
                parameters_reset = true;
            }
        }

        self.intent = intent;
        IntentChange { previous, current: intent, parameters_reset }
    }

    /// Keeps the previous action when the utterance carried no signal.
    pub fn apply_action(&mut self, signal: Option<BookingAction>) {
        if signal.is_some() {
            self.action = signal;
        }
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn select_tool(&mut self, tool: ToolName) {
        self.selected_tool = Some(tool);
    }

    pub fn record_tool_result(&mut self, outcome: ToolOutcome) {
        self.tool_result = Some(outcome);
    }

    /// Counts another clarification for each missing field and returns the
    /// first field that has reached `max_attempts`.
    pub fn record_clarification(
        &mut self,
        missing: &[ParamName],
        max_attempts: u32,
    ) -> Option<ParamName> {
        let mut exhausted = None;
        for name in missing {
            let attempts = self.clarification_attempts.entry(*name).or_insert(0);
            *attempts += 1;
            if exhausted.is_none() && *attempts >= max_attempts {
                exhausted = Some(*name);
            }
        }
        exhausted
    }

    pub fn clarification_attempts(&self, name: ParamName) -> u32 {
        self.clarification_attempts.get(&name).copied().unwrap_or(0)
    }

    pub fn clear_clarification_attempts(&mut self, names: &[ParamName]) {
        for name in names {
            self.clarification_attempts.remove(name);
        }
    }

    pub fn reset_clarification_attempts(&mut self) {
        self.clarification_attempts.clear();
    }
}
