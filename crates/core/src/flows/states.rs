use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::params::ParamName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogNode {
    Start,
    Classifying,
    ExtractingParams,
    Selecting,
    Invoking,
    Composing,
    End,
}

impl DialogNode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Classifying => "classifying",
            Self::ExtractingParams => "extracting_params",
            Self::Selecting => "selecting",
            Self::Invoking => "invoking",
            Self::Composing => "composing",
            Self::End => "end",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for DialogNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteEvent {
    TurnStarted,
    BookingIntent,
    GeneralIntent,
    ParamsComplete,
    ParamsIncomplete,
    ToolSelected,
    NothingSelected,
    ToolFinished,
    ResponseComposed,
}

/// Facts the transition function needs beyond the event itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RouteContext {
    pub missing_params: Vec<ParamName>,
}

impl RouteContext {
    pub fn with_missing(missing_params: Vec<ParamName>) -> Self {
        Self { missing_params }
    }
}

/// Work the runtime performs after entering the target node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    ClassifyIntent,
    ExtractParams,
    SelectTool,
    InvokeTool,
    ComposeClarification,
    ComposeToolReply,
    ComposeConversational,
    EmitResponse,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: DialogNode,
    pub to: DialogNode,
    pub event: RouteEvent,
    pub actions: Vec<RouteAction>,
}
