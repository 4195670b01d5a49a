pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod trace;

pub use catalog::{ArgKind, ArgSpec, ToolSpec};
pub use config::{AppConfig, ConfigError, LlmProvider, LoadOptions, LogFormat};
pub use domain::intent::{BookingAction, BookingKind, Intent};
pub use domain::params::{ParamName, ParamValue, Parameters};
pub use domain::state::{ConversationState, IntentChange, Speaker, Utterance};
pub use domain::tool::{ToolName, ToolOutcome};
pub use errors::DialogError;
pub use flows::{DialogNode, RouteEngine, RouteEvent, RouteTracker, RoutingError, TravelFlow};
pub use trace::{InMemoryTraceSink, NoopTraceSink, TraceEvent, TraceSink};
