use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tripdesk_core::domain::intent::{BookingAction, BookingKind, Intent};
use tripdesk_core::domain::state::Utterance;
use tripdesk_core::errors::DialogError;

use crate::llm::{CompletionRequest, LlmClient, LlmRole};
use crate::prompts::{CLASSIFIER_PROMPT, CLASSIFIER_SYSTEM};
use crate::text::{contains_any, lowercase_tokens};

pub(crate) const FLIGHT_CUES: &[&str] =
    &["flight", "flights", "fly", "plane", "airline", "airfare", "ticket"];
pub(crate) const HOTEL_CUES: &[&str] =
    &["hotel", "hotels", "accommodation", "room", "stay", "motel", "hostel", "lodging"];

pub(crate) const SEARCH_VERBS: &[&str] =
    &["search", "find", "look", "show", "list", "compare", "options", "available", "availability"];
pub(crate) const BOOK_VERBS: &[&str] = &["book", "reserve", "reservation", "purchase", "buy"];

const SMALL_TALK: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank", "cheers", "bye", "goodbye", "help", "weather",
];
const QUESTION_STARTERS: &[&str] =
    &["what", "how", "why", "who", "can", "could", "do", "does", "is", "are", "will", "should"];

const INTENT_DESCRIPTIONS: &[(Intent, &str)] = &[
    (Intent::FlightBooking, "Book or search for flights, airline tickets or air travel"),
    (Intent::HotelBooking, "Book or search for hotels, accommodation or lodging"),
    (Intent::General, "Greetings, questions and anything that is not a booking"),
];

/// Decides between searching and booking for a booking intent.
pub trait ActionPolicy: Send + Sync {
    /// `None` when the utterance carries no action signal.
    fn resolve(&self, utterance: &str, kind: BookingKind) -> Option<BookingAction>;
}

/// Verb matching. When both verb families appear, the booking verb wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordActionPolicy;

impl ActionPolicy for KeywordActionPolicy {
    fn resolve(&self, utterance: &str, _kind: BookingKind) -> Option<BookingAction> {
        let tokens = lowercase_tokens(utterance);
        if contains_any(&tokens, BOOK_VERBS) {
            Some(BookingAction::Book)
        } else if contains_any(&tokens, SEARCH_VERBS) {
            Some(BookingAction::Search)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClassifierInput<'a> {
    pub utterance: &'a str,
    pub history: &'a [Utterance],
    pub prior: Intent,
    /// Booking kind with parameters still being collected.
    pub pending: Option<BookingKind>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Keywords,
    Continuation,
    Model,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::Continuation => "continuation",
            Self::Model => "model",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub action: Option<BookingAction>,
    pub source: ClassificationSource,
}

pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    policy: Arc<dyn ActionPolicy>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_policy(llm, Arc::new(KeywordActionPolicy))
    }

    pub fn with_policy(llm: Arc<dyn LlmClient>, policy: Arc<dyn ActionPolicy>) -> Self {
        Self { llm, policy }
    }

    pub fn using_policy(self, policy: Arc<dyn ActionPolicy>) -> Self {
        Self { policy, ..self }
    }

    pub async fn classify(
        &self,
        input: ClassifierInput<'_>,
    ) -> Result<Classification, DialogError> {
        let tokens = lowercase_tokens(input.utterance);

        if let Some(kind) = keyword_kind(&tokens) {
            return Ok(self.booking(kind, input.utterance, ClassificationSource::Keywords));
        }

        let mixed = contains_any(&tokens, FLIGHT_CUES) && contains_any(&tokens, HOTEL_CUES);
        if !mixed && !is_small_talk(input.utterance, &tokens) {
            if let Some(kind) = input.prior.booking_kind().or(input.pending) {
                return Ok(self.booking(kind, input.utterance, ClassificationSource::Continuation));
            }
        }

        let intent = self.ask_model(&input).await?;
        Ok(match intent.booking_kind() {
            Some(kind) => self.booking(kind, input.utterance, ClassificationSource::Model),
            None => Classification { intent, action: None, source: ClassificationSource::Model },
        })
    }

    fn booking(
        &self,
        kind: BookingKind,
        utterance: &str,
        source: ClassificationSource,
    ) -> Classification {
        Classification {
            intent: kind.intent(),
            action: self.policy.resolve(utterance, kind),
            source,
        }
    }

    async fn ask_model(&self, input: &ClassifierInput<'_>) -> Result<Intent, DialogError> {
        let intents = INTENT_DESCRIPTIONS
            .iter()
            .map(|(intent, description)| {
                json!({ "label": intent.as_str(), "description": description })
            })
            .collect::<Vec<_>>();
        let system =
            CLASSIFIER_SYSTEM.render(&json!({ "intents": intents })).map_err(unavailable)?;
        let prompt = CLASSIFIER_PROMPT
            .render(&json!({ "history": input.history, "utterance": input.utterance }))
            .map_err(unavailable)?;

        let label = self
            .llm
            .complete(&CompletionRequest::for_role(LlmRole::Classifier, system, prompt))
            .await
            .map_err(unavailable)?;

        Ok(label.lines().find_map(Intent::parse_label).unwrap_or(Intent::General))
    }
}

fn unavailable(error: impl std::fmt::Display) -> DialogError {
    DialogError::ClassificationUnavailable { reason: error.to_string() }
}

fn keyword_kind(tokens: &[String]) -> Option<BookingKind> {
    match (contains_any(tokens, FLIGHT_CUES), contains_any(tokens, HOTEL_CUES)) {
        (true, false) => Some(BookingKind::Flight),
        (false, true) => Some(BookingKind::Hotel),
        _ => None,
    }
}

pub(crate) fn is_small_talk(utterance: &str, tokens: &[String]) -> bool {
    if utterance.trim_end().ends_with('?') || contains_any(tokens, SMALL_TALK) {
        return true;
    }
    tokens.first().is_some_and(|first| QUESTION_STARTERS.contains(&first.as_str()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tripdesk_core::domain::intent::{BookingAction, BookingKind, Intent};
    use tripdesk_core::errors::DialogError;

    use super::{
        ActionPolicy, ClassificationSource, ClassifierInput, IntentClassifier, KeywordActionPolicy,
    };
    use crate::llm::LlmError;
    use crate::providers::{OfflineLlm, ScriptedLlm};

    fn input(utterance: &str, prior: Intent) -> ClassifierInput<'_> {
        ClassifierInput { utterance, history: &[], prior, pending: None }
    }

    #[tokio::test]
    async fn keyword_cues_classify_without_the_model() {
        let classifier = IntentClassifier::new(Arc::new(OfflineLlm));

        let flight = classifier
            .classify(input(
                "Book a flight from New York to Paris on December 25th",
                Intent::Unknown,
            ))
            .await
            .expect("flight cue");
        assert_eq!(flight.intent, Intent::FlightBooking);
        assert_eq!(flight.action, Some(BookingAction::Book));
        assert_eq!(flight.source, ClassificationSource::Keywords);

        let hotel = classifier
            .classify(input("Show me hotel options in Rome", Intent::FlightBooking))
            .await
            .expect("hotel cue");
        assert_eq!(hotel.intent, Intent::HotelBooking);
        assert_eq!(hotel.action, Some(BookingAction::Search));
    }

    #[tokio::test]
    async fn short_answers_continue_the_current_booking() {
        let classifier = IntentClassifier::new(Arc::new(OfflineLlm));
        let result = classifier
            .classify(input("From Boston", Intent::FlightBooking))
            .await
            .expect("continuation needs no model");
        assert_eq!(result.intent, Intent::FlightBooking);
        assert_eq!(result.action, None);
        assert_eq!(result.source, ClassificationSource::Continuation);
    }

    #[tokio::test]
    async fn pending_kind_survives_a_general_detour() {
        let classifier = IntentClassifier::new(Arc::new(OfflineLlm));
        let result = classifier
            .classify(ClassifierInput {
                utterance: "London",
                history: &[],
                prior: Intent::General,
                pending: Some(BookingKind::Hotel),
            })
            .await
            .expect("continuation");
        assert_eq!(result.intent, Intent::HotelBooking);
    }

    #[tokio::test]
    async fn greetings_go_to_the_model_and_unknown_labels_become_general() {
        let scripted = Arc::new(ScriptedLlm::new(vec![Ok("plan_vacation".to_string())]));
        let classifier = IntentClassifier::new(scripted.clone());
        let result =
            classifier.classify(input("hello there", Intent::FlightBooking)).await.expect("label");
        assert_eq!(result.intent, Intent::General);
        assert_eq!(result.source, ClassificationSource::Model);
        assert_eq!(scripted.requests().len(), 1);
    }

    #[tokio::test]
    async fn mixed_cues_are_resolved_by_the_model() {
        let scripted = Arc::new(ScriptedLlm::new(vec![Ok("hotel_booking\n".to_string())]));
        let classifier = IntentClassifier::new(scripted);
        let result = classifier
            .classify(input("fly to Rome and find a hotel", Intent::Unknown))
            .await
            .expect("label");
        assert_eq!(result.intent, Intent::HotelBooking);
        assert_eq!(result.action, Some(BookingAction::Search));
    }

    #[tokio::test]
    async fn model_failure_is_classification_unavailable() {
        let scripted = Arc::new(ScriptedLlm::new(vec![Err(LlmError::quota("daily limit"))]));
        let classifier = IntentClassifier::new(scripted);
        let error =
            classifier.classify(input("hi", Intent::Unknown)).await.expect_err("no model");
        assert!(matches!(error, DialogError::ClassificationUnavailable { .. }));
    }

    #[test]
    fn keyword_policy_prefers_booking_verbs() {
        let policy = KeywordActionPolicy;
        assert_eq!(
            policy.resolve("find and book a flight", BookingKind::Flight),
            Some(BookingAction::Book)
        );
        assert_eq!(
            policy.resolve("list available hotels", BookingKind::Hotel),
            Some(BookingAction::Search)
        );
        assert_eq!(policy.resolve("to Paris", BookingKind::Flight), None);
    }
}
