//! Reply composition.
//!
//! The branch and the facts are decided here. The model only phrases tool
//! results and small talk, and any reply it produces for a tool result must
//! still mention the booking facts or the template text is used instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tripdesk_core::domain::intent::{BookingAction, BookingKind, Intent};
use tripdesk_core::domain::params::{ParamName, Parameters};
use tripdesk_core::domain::state::Utterance;
use tripdesk_core::domain::tool::ToolOutcome;
use tripdesk_core::errors::DialogError;

use crate::llm::{CompletionRequest, LlmClient, LlmError, LlmRole};
use crate::prompts::{
    PromptTemplate, CONVERSATION_PROMPT, CONVERSATION_SYSTEM, RESULT_PROMPT, RESULT_SYSTEM,
};

const FLIGHT_EXAMPLE: &str = "Book a flight from New York to Paris on December 25th";
const HOTEL_EXAMPLE: &str = "I need a hotel in London for 3 days";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Clarification,
    CollectionFailed,
    ToolSuccess,
    ToolFailure,
    Conversational,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Template,
    Model,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Composed {
    pub text: String,
    pub kind: ReplyKind,
    pub source: ReplySource,
    /// Why the template was used when the model was asked.
    pub model_error: Option<LlmError>,
}

impl Composed {
    fn template(kind: ReplyKind, text: String) -> Self {
        Self { text, kind, source: ReplySource::Template, model_error: None }
    }
}

pub struct ResponseComposer {
    llm: Arc<dyn LlmClient>,
}

impl ResponseComposer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn clarification(
        &self,
        kind: BookingKind,
        action: Option<BookingAction>,
        missing: &[ParamName],
        unclear: &[ParamName],
    ) -> Composed {
        let lead = match (kind, action.unwrap_or_default()) {
            (BookingKind::Flight, BookingAction::Book) => "To book your flight",
            (BookingKind::Flight, BookingAction::Search) => "To search for flights",
            (BookingKind::Hotel, BookingAction::Book) => "To book your hotel",
            (BookingKind::Hotel, BookingAction::Search) => "To search for hotels",
        };
        let labels = missing.iter().map(ParamName::label).collect::<Vec<_>>();
        let mut text = format!("{lead}, I still need the {}.", join_words(&labels));

        let unclear = unclear.iter().filter(|name| missing.contains(name)).collect::<Vec<_>>();
        if !unclear.is_empty() {
            let labels = unclear.iter().map(|name| name.label()).collect::<Vec<_>>();
            let verb = if labels.len() == 1 { "was" } else { "were" };
            text.push_str(&format!(
                " The {} you gave {verb} not clear enough for me to use.",
                join_words(&labels)
            ));
        }
        for name in missing {
            text.push(' ');
            text.push_str(name.question());
        }

        Composed::template(ReplyKind::Clarification, text)
    }

    pub fn collection_failed(&self, kind: BookingKind, param: ParamName) -> Composed {
        let example = match kind {
            BookingKind::Flight => FLIGHT_EXAMPLE,
            BookingKind::Hotel => HOTEL_EXAMPLE,
        };
        Composed::template(
            ReplyKind::CollectionFailed,
            format!(
                "I've tried several times to get the {} from you without luck. Please send the \
                 rest of your {} details in one message. For example: '{example}'.",
                param.label(),
                kind.noun()
            ),
        )
    }

    pub async fn tool_reply(
        &self,
        intent: Intent,
        parameters: &Parameters,
        outcome: &ToolOutcome,
    ) -> Composed {
        match outcome {
            ToolOutcome::Completed { tool, payload, message } => {
                let mut must_mention =
                    parameters.iter().map(|(_, value)| value.to_string()).collect::<Vec<_>>();
                if let Some(booking_id) = payload.get("booking_id").and_then(Value::as_str) {
                    must_mention.push(booking_id.to_string());
                }
                let fallback = success_template(intent, payload, message);
                let facts = ResultFacts {
                    success: true,
                    must_mention: &must_mention,
                    intent: intent.as_str(),
                    parameters: parameters.to_display_map(),
                    tool: tool.as_str(),
                    result: payload.to_string(),
                };

                let mut composed = self
                    .phrase(ReplyKind::ToolSuccess, RESULT_SYSTEM, RESULT_PROMPT, &facts, fallback)
                    .await;
                let faithful = mentions_all(&composed.text, &must_mention);
                if composed.source == ReplySource::Model && !faithful {
                    composed = Composed {
                        text: success_template(intent, payload, message),
                        kind: ReplyKind::ToolSuccess,
                        source: ReplySource::Template,
                        model_error: Some(LlmError::invalid_response(
                            "reply left out booking details",
                        )),
                    };
                }
                composed
            }
            ToolOutcome::Failed { tool, cause } => {
                let subject = match intent.booking_kind() {
                    Some(kind) => format!("{} request", kind.noun()),
                    None => "request".to_string(),
                };
                let error = DialogError::ToolExecutionError { tool: *tool, cause: cause.clone() };
                let fallback = format!(
                    "I'm sorry, I couldn't complete your {subject}: {cause}. {}",
                    error.user_message()
                );
                let facts = ResultFacts {
                    success: false,
                    must_mention: &[],
                    intent: intent.as_str(),
                    parameters: parameters.to_display_map(),
                    tool: tool.as_str(),
                    result: json!({ "status": "error", "message": cause }).to_string(),
                };
                self.phrase(ReplyKind::ToolFailure, RESULT_SYSTEM, RESULT_PROMPT, &facts, fallback)
                    .await
            }
        }
    }

    pub async fn conversational(
        &self,
        utterance: &str,
        history: &[Utterance],
        pending: Option<BookingKind>,
    ) -> Composed {
        let mut fallback = format!(
            "I can help you search for and book flights and hotels. Try something like \
             '{FLIGHT_EXAMPLE}' or '{HOTEL_EXAMPLE}'."
        );
        if let Some(kind) = pending {
            fallback.push_str(&format!(
                " We were in the middle of your {} booking, so just tell me the remaining \
                 details whenever you're ready.",
                kind.noun()
            ));
        }
        let facts =
            ConversationFacts { pending: pending.map(|kind| kind.noun()), history, utterance };
        self.phrase(
            ReplyKind::Conversational,
            CONVERSATION_SYSTEM,
            CONVERSATION_PROMPT,
            &facts,
            fallback,
        )
        .await
    }

    async fn phrase<T>(
        &self,
        kind: ReplyKind,
        system: PromptTemplate,
        prompt: PromptTemplate,
        facts: &T,
        fallback: String,
    ) -> Composed
    where
        T: Serialize + Sync,
    {
        let rendered = system
            .render(facts)
            .and_then(|system| prompt.render(facts).map(|prompt| (system, prompt)));
        let (system, prompt) = match rendered {
            Ok(pair) => pair,
            Err(error) => {
                return Composed {
                    model_error: Some(LlmError::invalid_request(error.to_string())),
                    ..Composed::template(kind, fallback)
                }
            }
        };

        let request = CompletionRequest::for_role(LlmRole::Composer, system, prompt);
        match self.llm.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => Composed {
                text: text.trim().to_string(),
                kind,
                source: ReplySource::Model,
                model_error: None,
            },
            Ok(_) => Composed {
                model_error: Some(LlmError::invalid_response("empty reply")),
                ..Composed::template(kind, fallback)
            },
            Err(error) => {
                Composed { model_error: Some(error), ..Composed::template(kind, fallback) }
            }
        }
    }
}

#[derive(Serialize)]
struct ResultFacts<'a> {
    success: bool,
    must_mention: &'a [String],
    intent: &'a str,
    parameters: BTreeMap<String, String>,
    tool: &'a str,
    result: String,
}

#[derive(Serialize)]
struct ConversationFacts<'a> {
    pending: Option<&'static str>,
    history: &'a [Utterance],
    utterance: &'a str,
}

fn mentions_all(text: &str, facts: &[String]) -> bool {
    let text = text.to_lowercase();
    facts.iter().all(|fact| text.contains(&fact.to_lowercase()))
}

fn join_words(words: &[&str]) -> String {
    match words {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{} and {last}", head.join(", ")),
    }
}

fn success_template(intent: Intent, payload: &Value, message: &str) -> String {
    let mut text = if message.is_empty() {
        format!("Your {} request is complete.", intent.as_str().replace('_', " "))
    } else {
        format!("{}.", message.trim_end_matches('.'))
    };

    if let Some(booking_id) = payload.get("booking_id").and_then(Value::as_str) {
        text.push_str(&format!(" Your booking reference is {booking_id}."));
    }
    if let Some(flight) = payload.get("flight") {
        if let (Some(airline), Some(id), Some(price)) = (
            flight.get("airline").and_then(Value::as_str),
            flight.get("flight_id").and_then(Value::as_str),
            flight.get("price").and_then(Value::as_u64),
        ) {
            text.push_str(&format!(" You're on {airline} {id} at ${price}."));
        }
    }
    if let Some(hotel) = payload.get("hotel") {
        if let (Some(name), Some(nightly), Some(total)) = (
            hotel.get("name").and_then(Value::as_str),
            hotel.get("price_per_night").and_then(Value::as_u64),
            hotel.get("total_price").and_then(Value::as_u64),
        ) {
            text.push_str(&format!(
                " You're staying at {name}, ${nightly} per night, ${total} in total."
            ));
        }
    }

    let options = payload
        .get("flight_options")
        .and_then(Value::as_array)
        .map(|options| options.iter().filter_map(flight_option_line).collect::<Vec<_>>())
        .or_else(|| {
            payload
                .get("hotel_options")
                .and_then(Value::as_array)
                .map(|options| options.iter().filter_map(hotel_option_line).collect::<Vec<_>>())
        })
        .unwrap_or_default();
    if !options.is_empty() {
        text.push_str(" Options: ");
        text.push_str(&options.join("; "));
        text.push('.');
    }
    text
}

fn flight_option_line(option: &Value) -> Option<String> {
    let airline = option.get("airline")?.as_str()?;
    let id = option.get("flight_id")?.as_str()?;
    let price = option.get("price")?.as_u64()?;
    let line = match option.get("departure").and_then(Value::as_str) {
        Some(departure) => format!("{airline} {id} departing {departure} for ${price}"),
        None => format!("{airline} {id} for ${price}"),
    };
    Some(line)
}

fn hotel_option_line(option: &Value) -> Option<String> {
    let name = option.get("name")?.as_str()?;
    let nightly = option.get("price_per_night")?.as_u64()?;
    let rating = option.get("rating")?.as_f64()?;
    Some(format!("{name} at ${nightly} per night, rated {rating}"))
}
