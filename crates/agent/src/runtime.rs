use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tripdesk_core::config::{AppConfig, SessionConfig};
use tripdesk_core::domain::intent::{BookingAction, BookingKind, Intent};
use tripdesk_core::domain::params::ParamName;
use tripdesk_core::domain::state::{ConversationState, Utterance};
use tripdesk_core::domain::tool::{ToolName, ToolOutcome};
use tripdesk_core::errors::DialogError;
use tripdesk_core::flows::{
    DialogFlow, DialogNode, RouteAction, RouteContext, RouteEngine, RouteEvent, RouteTracker,
    RoutingError, TravelFlow,
};
use tripdesk_core::trace::{
    NoopTraceSink, TraceCategory, TraceContext, TraceEvent, TraceOutcome, TraceSink,
};

use crate::classifier::{ActionPolicy, ClassificationSource, ClassifierInput, IntentClassifier};
use crate::composer::{Composed, ReplyKind, ReplySource, ResponseComposer};
use crate::extractor::{ExtractorInput, ParameterExtractor};
use crate::llm::LlmClient;
use crate::providers::build_client;
use crate::selector::{self, Selection};
use crate::tools::ToolRegistry;
use crate::travel_tools::travel_registry;

const TRACE_ACTOR: &str = "agent_runtime";

/// Recorded as the assistant reply when routing aborts a turn.
pub const FAILED_TURN_REPLY: &str = "Sorry, something went wrong on my side. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub max_clarification_attempts: u32,
    /// Earlier utterances shown to the model.
    pub history_window: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { max_clarification_attempts: 5, history_window: 6 }
    }
}

impl RuntimeSettings {
    pub fn from_session(session: &SessionConfig) -> Self {
        Self { max_clarification_attempts: session.max_clarification_attempts, ..Self::default() }
    }
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Configuration(DialogError),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Degradation {
    pub stage: &'static str,
    pub detail: String,
}

/// Read-only account of one completed turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnReport {
    pub turn: u64,
    pub reply: String,
    pub reply_kind: ReplyKind,
    pub reply_source: ReplySource,
    pub intent: Intent,
    pub classified_by: Option<ClassificationSource>,
    pub action: Option<BookingAction>,
    pub parameters: BTreeMap<String, String>,
    pub missing: Vec<ParamName>,
    pub selected_tool: Option<ToolName>,
    pub tool_succeeded: Option<bool>,
    pub route: Vec<DialogNode>,
    pub degradations: Vec<Degradation>,
}

impl TurnReport {
    pub fn route_label(&self) -> String {
        self.route.iter().map(DialogNode::as_str).collect::<Vec<_>>().join(" -> ")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Completed(TurnReport),
    /// The caller cancelled the turn. Conversation state is unchanged.
    Cancelled,
}

#[derive(Debug, Default)]
struct TurnWork {
    classified_by: Option<ClassificationSource>,
    missing: Vec<ParamName>,
    unclear: Vec<ParamName>,
    /// Extraction stored at least one new value this turn.
    progressed: bool,
    reply: Option<Composed>,
    degradations: Vec<Degradation>,
}

impl TurnWork {
    fn degrade(&mut self, stage: &'static str, detail: impl Into<String>) {
        self.degradations.push(Degradation { stage, detail: detail.into() });
    }
}

pub struct AgentRuntime<F = TravelFlow> {
    classifier: IntentClassifier,
    extractor: ParameterExtractor,
    composer: ResponseComposer,
    tools: ToolRegistry,
    engine: RouteEngine<F>,
    trace: Arc<dyn TraceSink>,
    settings: RuntimeSettings,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, settings: RuntimeSettings) -> Self {
        Self {
            classifier: IntentClassifier::new(llm.clone()),
            extractor: ParameterExtractor::new(llm.clone()),
            composer: ResponseComposer::new(llm),
            tools,
            engine: RouteEngine::default(),
            trace: Arc::new(NoopTraceSink),
            settings,
        }
    }

    /// Builds the configured model client and the travel tools.
    pub fn from_config(config: &AppConfig) -> Result<Self, TurnError> {
        let llm = build_client(&config.llm).map_err(|error| {
            TurnError::Configuration(DialogError::ConfigurationError { message: error.to_string() })
        })?;
        let tools = travel_registry(Duration::from_secs(config.session.tool_timeout_secs));
        Ok(Self::new(llm, tools, RuntimeSettings::from_session(&config.session)))
    }
}

impl<F> AgentRuntime<F>
where
    F: DialogFlow,
{
    /// Routes turns through `flow` instead of the travel graph.
    pub fn with_flow<G: DialogFlow>(self, flow: G) -> AgentRuntime<G> {
        AgentRuntime {
            classifier: self.classifier,
            extractor: self.extractor,
            composer: self.composer,
            tools: self.tools,
            engine: RouteEngine::new(flow),
            trace: self.trace,
            settings: self.settings,
        }
    }

    pub fn with_action_policy(mut self, policy: Arc<dyn ActionPolicy>) -> Self {
        self.classifier = self.classifier.using_policy(policy);
        self
    }

    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = sink;
        self
    }

    pub fn settings(&self) -> RuntimeSettings {
        self.settings
    }

    /// Runs one turn on a copy of `state` and commits it only when the route
    /// reaches `End`. A routing failure still records the utterance and
    /// [`FAILED_TURN_REPLY`]; a cancelled turn records nothing.
    pub async fn handle_turn(
        &self,
        state: &mut ConversationState,
        utterance: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        if cancel.is_cancelled() {
            return Ok(TurnOutcome::Cancelled);
        }

        let mut draft = state.clone();
        draft.begin_turn(utterance);
        info!(
            event_name = "turn.started",
            session_id = %draft.session_id,
            turn = draft.turn_count(),
            "turn started"
        );

        match self.drive(&mut draft, cancel).await {
            Ok(Some(report)) => {
                *state = draft;
                info!(
                    event_name = "turn.completed",
                    session_id = %state.session_id,
                    turn = report.turn,
                    intent = report.intent.as_str(),
                    reply_kind = ?report.reply_kind,
                    route = %report.route_label(),
                    degradations = report.degradations.len(),
                    "turn completed"
                );
                Ok(TurnOutcome::Completed(report))
            }
            Ok(None) => Ok(TurnOutcome::Cancelled),
            Err(error) => {
                state.begin_turn(utterance);
                state.record_reply(FAILED_TURN_REPLY);
                warn!(
                    event_name = "turn.failed",
                    session_id = %state.session_id,
                    turn = state.turn_count(),
                    error = %error,
                    "routing aborted the turn, only the utterance was kept"
                );
                Err(error.into())
            }
        }
    }

    /// Walks the route on `draft`. `None` when `cancel` fires first.
    async fn drive(
        &self,
        draft: &mut ConversationState,
        cancel: &CancellationToken,
    ) -> Result<Option<TurnReport>, RoutingError> {
        let trace = TraceContext::new(draft.session_id, draft.turn_count(), TRACE_ACTOR);
        let mut tracker = RouteTracker::start(self.engine.initial_node());
        let mut work = TurnWork::default();
        let mut event = RouteEvent::TurnStarted;
        let mut context = RouteContext::default();

        loop {
            let transition = self.engine.apply_with_trace(
                tracker.current(),
                event,
                &context,
                self.trace.as_ref(),
                &trace,
            )?;
            tracker.enter(transition.to)?;
            debug!(
                event_name = "route.node_entered",
                session_id = %draft.session_id,
                turn = draft.turn_count(),
                node = transition.to.as_str(),
                "entered node"
            );
            if transition.to.is_terminal() {
                break;
            }

            let Some(action) = transition.actions.first().copied() else {
                return Err(RoutingError::Unterminated { node: transition.to });
            };
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                step = self.perform(action, &mut *draft, &mut work, &trace) => Some(step),
            };
            match step {
                Some((next_event, next_context)) => {
                    event = next_event;
                    context = next_context;
                }
                None => {
                    info!(
                        event_name = "turn.cancelled",
                        session_id = %draft.session_id,
                        turn = draft.turn_count(),
                        node = transition.to.as_str(),
                        "turn cancelled before completion"
                    );
                    return Ok(None);
                }
            }
        }

        let Some(composed) = work.reply.take() else {
            return Err(RoutingError::Unterminated { node: DialogNode::Composing });
        };
        draft.record_reply(composed.text.clone());
        let route = tracker.finish()?;

        Ok(Some(TurnReport {
            turn: draft.turn_count(),
            reply: composed.text,
            reply_kind: composed.kind,
            reply_source: composed.source,
            intent: draft.intent(),
            classified_by: work.classified_by,
            action: draft.action(),
            parameters: draft.parameters().to_display_map(),
            missing: work.missing,
            selected_tool: draft.selected_tool(),
            tool_succeeded: draft.tool_result().map(ToolOutcome::is_success),
            route,
            degradations: work.degradations,
        }))
    }

    async fn perform(
        &self,
        action: RouteAction,
        draft: &mut ConversationState,
        work: &mut TurnWork,
        trace: &TraceContext,
    ) -> (RouteEvent, RouteContext) {
        match action {
            RouteAction::ClassifyIntent => self.classify(draft, work, trace).await,
            RouteAction::ExtractParams => self.extract(draft, work, trace).await,
            RouteAction::SelectTool => Self::select(draft),
            RouteAction::InvokeTool => self.invoke(draft, work, trace).await,
            RouteAction::ComposeClarification => {
                let reply = self.clarify(draft, work);
                Self::finish_composition(work, reply)
            }
            RouteAction::ComposeToolReply => {
                let reply = match draft.tool_result() {
                    Some(outcome) => {
                        self.composer.tool_reply(draft.intent(), draft.parameters(), outcome).await
                    }
                    None => self.converse(draft, self.settings.history_window).await,
                };
                Self::finish_composition(work, reply)
            }
            RouteAction::ComposeConversational => {
                let reply = self.converse(draft, self.settings.history_window).await;
                Self::finish_composition(work, reply)
            }
            RouteAction::EmitResponse => (RouteEvent::ResponseComposed, RouteContext::default()),
        }
    }

    async fn classify(
        &self,
        draft: &mut ConversationState,
        work: &mut TurnWork,
        trace: &TraceContext,
    ) -> (RouteEvent, RouteContext) {
        let utterance = draft.last_user_utterance().unwrap_or_default().to_string();
        let input = ClassifierInput {
            utterance: &utterance,
            history: earlier_history(draft, self.settings.history_window),
            prior: draft.intent(),
            pending: pending_kind(draft),
        };

        let (intent, action) = match self.classifier.classify(input).await {
            Ok(classification) => {
                work.classified_by = Some(classification.source);
                self.trace.emit(
                    TraceEvent::new(
                        trace,
                        "classification.completed",
                        TraceCategory::Classification,
                        TraceOutcome::Success,
                    )
                    .with_metadata("intent", classification.intent.as_str())
                    .with_metadata("source", classification.source.as_str()),
                );
                (classification.intent, classification.action)
            }
            Err(error) => {
                warn!(
                    event_name = "classification.degraded",
                    session_id = %draft.session_id,
                    turn = draft.turn_count(),
                    code = error.code(),
                    error = %error,
                    "classification unavailable, answering generally"
                );
                self.trace.emit(
                    TraceEvent::new(
                        trace,
                        "classification.degraded",
                        TraceCategory::Classification,
                        TraceOutcome::Degraded,
                    )
                    .with_metadata("error", error.to_string()),
                );
                work.degrade("classification", error.to_string());
                (Intent::General, None)
            }
        };

        let change = draft.apply_intent(intent);
        if change.parameters_reset && change.previous.is_booking() {
            info!(
                event_name = "intent.switched",
                session_id = %draft.session_id,
                from = change.previous.as_str(),
                to = change.current.as_str(),
                "booking kind changed, parameters reset"
            );
        }

        if intent.is_booking() {
            draft.apply_action(action);
            (RouteEvent::BookingIntent, RouteContext::default())
        } else {
            (RouteEvent::GeneralIntent, RouteContext::default())
        }
    }

    async fn extract(
        &self,
        draft: &mut ConversationState,
        work: &mut TurnWork,
        trace: &TraceContext,
    ) -> (RouteEvent, RouteContext) {
        let Some(kind) = draft.intent().booking_kind() else {
            return (RouteEvent::GeneralIntent, RouteContext::default());
        };

        let utterance = draft.last_user_utterance().unwrap_or_default().to_string();
        let extraction = self
            .extractor
            .extract(ExtractorInput { utterance: &utterance, kind, current: draft.parameters() })
            .await;

        if let Some(error) = &extraction.model_error {
            debug!(
                event_name = "extraction.model_skipped",
                session_id = %draft.session_id,
                error = %error,
                "model extraction unavailable, keeping local values"
            );
            work.degrade("extraction", error.to_string());
        }
        for ambiguous in &extraction.ambiguous {
            work.degrade("extraction", ambiguous.to_string());
        }
        work.unclear = extraction.unclear();

        let added = draft.parameters_mut().merge(extraction.values);
        draft.clear_clarification_attempts(&added);
        work.progressed = !added.is_empty();
        let missing = draft.parameters().missing(kind);

        self.trace.emit(
            TraceEvent::new(
                trace,
                "extraction.completed",
                TraceCategory::Extraction,
                if extraction.ambiguous.is_empty() {
                    TraceOutcome::Success
                } else {
                    TraceOutcome::Degraded
                },
            )
            .with_metadata("added", join_names(&added))
            .with_metadata("missing", join_names(&missing)),
        );

        work.missing = missing.clone();
        if missing.is_empty() {
            (RouteEvent::ParamsComplete, RouteContext::default())
        } else {
            (RouteEvent::ParamsIncomplete, RouteContext::with_missing(missing))
        }
    }

    fn select(draft: &mut ConversationState) -> (RouteEvent, RouteContext) {
        match selector::select(draft.intent(), draft.parameters(), draft.action()) {
            Selection::Tool(tool) => {
                draft.select_tool(tool);
                (RouteEvent::ToolSelected, RouteContext::default())
            }
            Selection::Clarify { .. } | Selection::Conversational => {
                (RouteEvent::NothingSelected, RouteContext::default())
            }
        }
    }

    async fn invoke(
        &self,
        draft: &mut ConversationState,
        work: &mut TurnWork,
        trace: &TraceContext,
    ) -> (RouteEvent, RouteContext) {
        let Some(tool) = draft.selected_tool() else {
            return (RouteEvent::NothingSelected, RouteContext::default());
        };

        let outcome = self.tools.invoke(tool, draft.parameters()).await;
        let trace_outcome = match &outcome {
            ToolOutcome::Completed { .. } => TraceOutcome::Success,
            ToolOutcome::Failed { cause, .. } => {
                let error = DialogError::ToolExecutionError { tool, cause: cause.clone() };
                warn!(
                    event_name = "tool.failed",
                    session_id = %draft.session_id,
                    turn = draft.turn_count(),
                    code = error.code(),
                    error = %error,
                    "tool call failed"
                );
                work.degrade("tool", error.to_string());
                TraceOutcome::Failed
            }
        };
        self.trace.emit(
            TraceEvent::new(trace, "tool.invoked", TraceCategory::Tool, trace_outcome)
                .with_metadata("tool", tool.as_str()),
        );
        draft.record_tool_result(outcome);
        (RouteEvent::ToolFinished, RouteContext::default())
    }

    fn clarify(&self, draft: &mut ConversationState, work: &TurnWork) -> Composed {
        let Some(kind) = draft.intent().booking_kind() else {
            return self.composer.clarification(BookingKind::Flight, None, &work.missing, &[]);
        };

        let exhausted = if work.progressed {
            None
        } else {
            draft.record_clarification(&work.missing, self.settings.max_clarification_attempts)
        };
        match exhausted {
            Some(param) => {
                warn!(
                    event_name = "clarification.exhausted",
                    session_id = %draft.session_id,
                    param = param.as_str(),
                    "clarification limit reached, counting again from zero"
                );
                draft.reset_clarification_attempts();
                self.composer.collection_failed(kind, param)
            }
            None => self.composer.clarification(kind, draft.action(), &work.missing, &work.unclear),
        }
    }

    async fn converse(&self, draft: &ConversationState, window: usize) -> Composed {
        let utterance = draft.last_user_utterance().unwrap_or_default();
        self.composer
            .conversational(utterance, earlier_history(draft, window), pending_kind(draft))
            .await
    }

    fn finish_composition(work: &mut TurnWork, reply: Composed) -> (RouteEvent, RouteContext) {
        if let Some(error) = &reply.model_error {
            work.degrade("composition", error.to_string());
        }
        work.reply = Some(reply);
        (RouteEvent::ResponseComposed, RouteContext::default())
    }
}

/// History before the current user utterance, limited to `window` entries.
fn earlier_history(state: &ConversationState, window: usize) -> &[Utterance] {
    let history = state.history();
    let end = history.len().saturating_sub(1);
    let start = end.saturating_sub(window);
    &history[start..end]
}

/// Booking kind whose parameters are still being collected.
fn pending_kind(state: &ConversationState) -> Option<BookingKind> {
    let parameters = state.parameters();
    parameters.kind().filter(|kind| !parameters.is_empty() && !parameters.is_complete(*kind))
}

fn join_names(names: &[ParamName]) -> String {
    names.iter().map(ParamName::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;
    use tripdesk_core::domain::intent::{BookingAction, BookingKind, Intent};
    use tripdesk_core::domain::params::ParamName;
    use tripdesk_core::domain::state::ConversationState;
    use tripdesk_core::domain::tool::ToolName;
    use tripdesk_core::flows::{
        DialogFlow, DialogNode, RouteContext, RouteEvent, RoutingError, TransitionOutcome,
        TravelFlow,
    };
    use tripdesk_core::trace::InMemoryTraceSink;

    use super::{
        earlier_history, AgentRuntime, RuntimeSettings, TurnError, TurnOutcome, TurnReport,
        FAILED_TURN_REPLY,
    };
    use crate::classifier::ActionPolicy;
    use crate::providers::OfflineLlm;
    use crate::travel_tools::travel_registry;

    fn runtime() -> AgentRuntime {
        AgentRuntime::new(
            Arc::new(OfflineLlm),
            travel_registry(Duration::from_secs(1)),
            RuntimeSettings::default(),
        )
    }

    async fn completed<F: DialogFlow>(
        runtime: &AgentRuntime<F>,
        state: &mut ConversationState,
        text: &str,
    ) -> TurnReport {
        match runtime.handle_turn(state, text, &CancellationToken::new()).await {
            Ok(TurnOutcome::Completed(report)) => report,
            other => panic!("turn `{text}` did not complete: {other:?}"),
        }
    }

    /// Travel routing that refuses to leave parameter extraction.
    struct StuckAfterExtraction;

    impl DialogFlow for StuckAfterExtraction {
        fn name(&self) -> &'static str {
            "stuck_after_extraction"
        }

        fn initial_node(&self) -> DialogNode {
            TravelFlow.initial_node()
        }

        fn transition(
            &self,
            current: DialogNode,
            event: RouteEvent,
            context: &RouteContext,
        ) -> Result<TransitionOutcome, RoutingError> {
            if current == DialogNode::ExtractingParams {
                return Err(RoutingError::InvalidTransition { node: current, event });
            }
            TravelFlow.transition(current, event, context)
        }
    }

    struct AlwaysSearch;

    impl ActionPolicy for AlwaysSearch {
        fn resolve(&self, _utterance: &str, _kind: BookingKind) -> Option<BookingAction> {
            Some(BookingAction::Search)
        }
    }

    #[tokio::test]
    async fn booking_turn_walks_the_full_route() {
        let sink = Arc::new(InMemoryTraceSink::default());
        let runtime = runtime().with_trace_sink(sink.clone());
        let mut state = ConversationState::new();

        let outcome = runtime
            .handle_turn(
                &mut state,
                "I need a hotel in London for 3 days",
                &CancellationToken::new(),
            )
            .await
            .expect("turn completes");
        let TurnOutcome::Completed(report) = outcome else {
            panic!("turn was not cancelled");
        };

        assert_eq!(
            report.route,
            vec![
                DialogNode::Start,
                DialogNode::Classifying,
                DialogNode::ExtractingParams,
                DialogNode::Selecting,
                DialogNode::Invoking,
                DialogNode::Composing,
                DialogNode::End,
            ]
        );
        assert_eq!(sink.events_of_type("route.transition_applied").len(), 6);
        assert_eq!(sink.events_of_type("tool.invoked").len(), 1);
        assert!(sink.events().iter().all(|event| event.session_id == state.session_id));
    }

    #[tokio::test]
    async fn cancelled_token_leaves_state_untouched() {
        let runtime = runtime();
        let mut state = ConversationState::new();
        let before = state.clone();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome =
            runtime.handle_turn(&mut state, "Book a flight to Paris", &cancel).await.expect("ok");
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn earlier_history_excludes_the_current_utterance() {
        let runtime = runtime();
        let mut state = ConversationState::new();
        runtime
            .handle_turn(&mut state, "hello", &CancellationToken::new())
            .await
            .expect("first turn");
        state.begin_turn("next");

        let earlier = earlier_history(&state, 6);
        assert_eq!(earlier.len(), 2);
        assert_eq!(earlier[0].text, "hello");
        assert_eq!(state.intent(), Intent::General);
    }

    #[tokio::test]
    async fn rejected_transition_keeps_the_utterance_and_apologizes() {
        let runtime = runtime().with_flow(StuckAfterExtraction);
        let mut state = ConversationState::new();

        let error = runtime
            .handle_turn(&mut state, "Book a flight to Paris", &CancellationToken::new())
            .await
            .expect_err("routing is refused");

        assert!(matches!(
            error,
            TurnError::Routing(RoutingError::InvalidTransition {
                node: DialogNode::ExtractingParams,
                ..
            })
        ));
        assert_eq!(state.turn_count(), 1);
        assert_eq!(state.history().len(), 2);
        assert_eq!(state.history()[0].text, "Book a flight to Paris");
        assert_eq!(state.history()[1].text, FAILED_TURN_REPLY);
        assert!(state.parameters().is_empty());
        assert_eq!(state.intent(), Intent::Unknown);
    }

    #[tokio::test]
    async fn plugged_in_action_policy_overrides_booking_verbs() {
        let runtime = runtime().with_action_policy(Arc::new(AlwaysSearch));
        let mut state = ConversationState::new();

        let report =
            completed(&runtime, &mut state, "Book a flight from Oslo to Rome on 2025-12-25").await;

        assert_eq!(report.action, Some(BookingAction::Search));
        assert_eq!(report.selected_tool, Some(ToolName::SearchFlights));
        assert!(report.reply.contains("flights from Oslo to Rome"));
    }

    #[tokio::test]
    async fn turns_that_add_a_detail_are_not_counted_as_clarifications() {
        let runtime = runtime();
        let mut state = ConversationState::new();

        completed(&runtime, &mut state, "I want to fly to Paris").await;
        assert_eq!(state.clarification_attempts(ParamName::Origin), 0);
        assert_eq!(state.clarification_attempts(ParamName::Date), 0);

        completed(&runtime, &mut state, "hmm").await;
        assert_eq!(state.clarification_attempts(ParamName::Origin), 1);
        assert_eq!(state.clarification_attempts(ParamName::Date), 1);

        let report = completed(&runtime, &mut state, "from Boston").await;
        assert_eq!(report.missing, vec![ParamName::Date]);
        assert_eq!(state.clarification_attempts(ParamName::Origin), 0);
        assert_eq!(state.clarification_attempts(ParamName::Date), 1);
    }
}
