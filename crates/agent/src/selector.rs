use tripdesk_core::catalog;
use tripdesk_core::domain::intent::{BookingAction, BookingKind, Intent};
use tripdesk_core::domain::params::{ParamName, Parameters};
use tripdesk_core::domain::tool::ToolName;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Tool(ToolName),
    Clarify { kind: BookingKind, missing: Vec<ParamName> },
    Conversational,
}

/// Pure lookup over intent, completeness and the action signal.
pub fn select(intent: Intent, parameters: &Parameters, action: Option<BookingAction>) -> Selection {
    let Some(kind) = intent.booking_kind() else {
        return Selection::Conversational;
    };

    let missing = parameters.missing(kind);
    if missing.is_empty() {
        Selection::Tool(catalog::lookup(kind, action.unwrap_or_default()))
    } else {
        Selection::Clarify { kind, missing }
    }
}
