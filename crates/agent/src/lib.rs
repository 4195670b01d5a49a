//! Dialog runtime for the travel assistant.
//!
//! Every turn walks the same nodes: intent classification, parameter
//! extraction, tool selection, tool invocation and response composition.
//! The route engine in `tripdesk-core` decides which node runs next; the
//! modules here do the work at each node.
//!
//! The language model only labels and phrases. Which tool runs, with which
//! arguments, is decided by keyword rules, the tool catalog and the
//! parameter set. When the model is unreachable every node has a local
//! answer, so a turn always ends with a reply.

pub mod classifier;
pub mod composer;
pub mod extractor;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod runtime;
pub mod selector;
mod text;
pub mod tools;
pub mod travel_tools;

pub use classifier::{ActionPolicy, Classification, IntentClassifier, KeywordActionPolicy};
pub use composer::{Composed, ReplyKind, ReplySource, ResponseComposer};
pub use extractor::{Extraction, ParameterExtractor};
pub use llm::{CompletionRequest, LlmClient, LlmError, LlmErrorKind, LlmRole, ResilientLlm};
pub use providers::{build_client, OfflineLlm, ScriptedLlm};
pub use runtime::{
    AgentRuntime, RuntimeSettings, TurnError, TurnOutcome, TurnReport, FAILED_TURN_REPLY,
};
pub use selector::Selection;
pub use tools::{Tool, ToolRegistry};
pub use travel_tools::travel_registry;
