use thiserror::Error;
use tracing::warn;

use crate::domain::params::ParamName;
use crate::flows::states::{DialogNode, RouteAction, RouteContext, RouteEvent, TransitionOutcome};
use crate::trace::{TraceCategory, TraceContext, TraceEvent, TraceOutcome, TraceSink};

pub trait DialogFlow {
    fn name(&self) -> &'static str;
    fn initial_node(&self) -> DialogNode;
    fn transition(
        &self,
        current: DialogNode,
        event: RouteEvent,
        context: &RouteContext,
    ) -> Result<TransitionOutcome, RoutingError>;
}

/// The single-pass travel routing graph.
#[derive(Clone, Debug, Default)]
pub struct TravelFlow;

impl DialogFlow for TravelFlow {
    fn name(&self) -> &'static str {
        "travel"
    }

    fn initial_node(&self) -> DialogNode {
        DialogNode::Start
    }

    fn transition(
        &self,
        current: DialogNode,
        event: RouteEvent,
        context: &RouteContext,
    ) -> Result<TransitionOutcome, RoutingError> {
        transition_travel(current, event, context)
    }
}

pub struct RouteEngine<F> {
    flow: F,
}

impl<F> RouteEngine<F>
where
    F: DialogFlow,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn flow_name(&self) -> &'static str {
        self.flow.name()
    }

    pub fn initial_node(&self) -> DialogNode {
        self.flow.initial_node()
    }

    pub fn apply(
        &self,
        current: DialogNode,
        event: RouteEvent,
        context: &RouteContext,
    ) -> Result<TransitionOutcome, RoutingError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_trace<S>(
        &self,
        current: DialogNode,
        event: RouteEvent,
        context: &RouteContext,
        sink: &S,
        trace: &TraceContext,
    ) -> Result<TransitionOutcome, RoutingError>
    where
        S: TraceSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    TraceEvent::new(
                        trace,
                        "route.transition_applied",
                        TraceCategory::Routing,
                        TraceOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.to.as_str())
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                warn!(
                    event_name = "route.transition_rejected",
                    session_id = %trace.session_id,
                    turn = trace.turn,
                    from = current.as_str(),
                    event = ?event,
                    error = %error,
                    "route transition rejected"
                );
                sink.emit(
                    TraceEvent::new(
                        trace,
                        "route.transition_rejected",
                        TraceCategory::Routing,
                        TraceOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for RouteEngine<TravelFlow> {
    fn default() -> Self {
        Self::new(TravelFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("parameters still missing before leaving {node}: {missing:?}")]
    MissingParams { node: DialogNode, missing: Vec<ParamName> },
    #[error("invalid transition from {node} using event {event:?}")]
    InvalidTransition { node: DialogNode, event: RouteEvent },
    #[error("node {node} entered twice in one turn")]
    NodeRevisited { node: DialogNode },
    #[error("turn ended at {node} before reaching end")]
    Unterminated { node: DialogNode },
}

/// Visited nodes for one turn. Entering a node a second time is an error,
/// which bounds every turn to a single pass through the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTracker {
    path: Vec<DialogNode>,
}

impl RouteTracker {
    pub fn start(initial: DialogNode) -> Self {
        Self { path: vec![initial] }
    }

    pub fn current(&self) -> DialogNode {
        self.path.last().copied().unwrap_or(DialogNode::Start)
    }

    pub fn enter(&mut self, node: DialogNode) -> Result<(), RoutingError> {
        if self.path.contains(&node) {
            return Err(RoutingError::NodeRevisited { node });
        }
        self.path.push(node);
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<DialogNode>, RoutingError> {
        let node = self.current();
        if node.is_terminal() {
            Ok(self.path)
        } else {
            Err(RoutingError::Unterminated { node })
        }
    }

    pub fn path(&self) -> &[DialogNode] {
        &self.path
    }
}

fn transition_travel(
    current: DialogNode,
    event: RouteEvent,
    context: &RouteContext,
) -> Result<TransitionOutcome, RoutingError> {
    use DialogNode::{Classifying, Composing, End, ExtractingParams, Invoking, Selecting, Start};
    use RouteAction::{
        ClassifyIntent, ComposeClarification, ComposeConversational, ComposeToolReply,
        EmitResponse, ExtractParams, InvokeTool, SelectTool,
    };
    use RouteEvent::{
        BookingIntent, GeneralIntent, NothingSelected, ParamsComplete, ParamsIncomplete,
        ResponseComposed, ToolFinished, ToolSelected, TurnStarted,
    };

    let (to, actions) = match (current, event) {
        (Start, TurnStarted) => (Classifying, vec![ClassifyIntent]),
        (Classifying, BookingIntent) => (ExtractingParams, vec![ExtractParams]),
        (Classifying, GeneralIntent) => (Composing, vec![ComposeConversational]),
        (ExtractingParams, ParamsComplete) => {
            if !context.missing_params.is_empty() {
                return Err(RoutingError::MissingParams {
                    node: current,
                    missing: context.missing_params.clone(),
                });
            }
            (Selecting, vec![SelectTool])
        }
        (ExtractingParams, ParamsIncomplete) => (Composing, vec![ComposeClarification]),
        (Selecting, ToolSelected) => (Invoking, vec![InvokeTool]),
        (Selecting, NothingSelected) => (Composing, vec![ComposeConversational]),
        (Invoking, ToolFinished) => (Composing, vec![ComposeToolReply]),
        (Composing, ResponseComposed) => (End, vec![EmitResponse]),
        _ => return Err(RoutingError::InvalidTransition { node: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}
