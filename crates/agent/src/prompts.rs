//! Prompt templates rendered with tera from serializable fact sheets.

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("prompt `{template}` failed to render: {source}")]
pub struct PromptError {
    pub template: &'static str,
    #[source]
    pub source: tera::Error,
}

#[derive(Clone, Copy, Debug)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub body: &'static str,
}

impl PromptTemplate {
    pub fn render<T>(&self, facts: &T) -> Result<String, PromptError>
    where
        T: Serialize,
    {
        let context = Context::from_serialize(facts)
            .map_err(|source| PromptError { template: self.name, source })?;
        Tera::one_off(self.body, &context, false)
            .map(|rendered| rendered.trim().to_string())
            .map_err(|source| PromptError { template: self.name, source })
    }
}

pub const CLASSIFIER_SYSTEM: PromptTemplate = PromptTemplate {
    name: "classifier_system",
    body: r#"You are an intent detection specialist for a travel assistant. Analyze the user's latest message and detect their primary intent.

Available intents:
{% for intent in intents %}- {{ intent.label }}: {{ intent.description }}
{% endfor %}
Respond with ONLY the intent name from the list above, or 'general' if unclear."#,
};

pub const CLASSIFIER_PROMPT: PromptTemplate = PromptTemplate {
    name: "classifier_prompt",
    body: r#"{% if history %}Recent conversation:
{% for turn in history %}{{ turn.speaker }}: {{ turn.text }}
{% endfor %}
{% endif %}User message: '{{ utterance }}'

What is the user's intent?"#,
};

pub const EXTRACTOR_SYSTEM: PromptTemplate = PromptTemplate {
    name: "extractor_system",
    body: r#"You are a parameter extraction specialist. Extract specific parameters from user input for slot filling.

Current intent: {{ intent }}
Currently have: {% if have %}{% for name, value in have %}{{ name }}={{ value }}{% if not loop.last %}, {% endif %}{% endfor %}{% else %}nothing{% endif %}
Still need: {{ missing | map(attribute="name") | join(sep=", ") }}

Parameter definitions:
{% for param in missing %}- {{ param.name }}: {{ param.description }}
{% endfor %}
Extract ONLY the parameters that are mentioned in the user input. Do not make assumptions.

Respond with a JSON object containing only the extracted parameters:
{"parameter_name": "extracted_value"}

If no parameters are found, return: {}"#,
};

pub const EXTRACTOR_PROMPT: PromptTemplate = PromptTemplate {
    name: "extractor_prompt",
    body: r#"User input: "{{ utterance }}"

Extract any parameters mentioned in this input that we still need for the {{ intent }} intent.
Focus on these missing parameters: {{ missing | map(attribute="name") | join(sep=", ") }}"#,
};

pub const RESULT_SYSTEM: PromptTemplate = PromptTemplate {
    name: "result_system",
    body: r#"You are a helpful travel assistant that summarizes task completion results.

Guidelines:
- Be conversational and friendly
{% if success %}- Confirm what was accomplished and repeat the key details: {{ must_mention | join(sep=", ") }}
{% else %}- Apologize, explain briefly what went wrong, and suggest trying again
{% endif %}- Keep the response concise but informative
- Never invent prices, times or booking references that are not in the results"#,
};

pub const RESULT_PROMPT: PromptTemplate = PromptTemplate {
    name: "result_prompt",
    body: r#"User intent: {{ intent }}
Parameters: {% for name, value in parameters %}{{ name }}={{ value }}{% if not loop.last %}, {% endif %}{% endfor %}
Tool: {{ tool }}
Tool result: {{ result }}

Generate a helpful response summarizing the result."#,
};

pub const CONVERSATION_SYSTEM: PromptTemplate = PromptTemplate {
    name: "conversation_system",
    body: r#"You are a friendly travel assistant. You can search and book flights and hotels.

Guidelines:
- Answer the user's message briefly and helpfully
- If it fits, mention what you can do and give one example request
{% if pending %}- The user has an unfinished {{ pending }} booking; offer to continue it
{% endif %}- Never claim that anything was booked"#,
};

pub const CONVERSATION_PROMPT: PromptTemplate = PromptTemplate {
    name: "conversation_prompt",
    body: r#"{% if history %}Recent conversation:
{% for turn in history %}{{ turn.speaker }}: {{ turn.text }}
{% endfor %}
{% endif %}User message: '{{ utterance }}'"#,
};

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CLASSIFIER_PROMPT, CLASSIFIER_SYSTEM, EXTRACTOR_SYSTEM, RESULT_SYSTEM};

    #[test]
    fn classifier_system_lists_every_intent() {
        let rendered = CLASSIFIER_SYSTEM
            .render(&json!({
                "intents": [
                    { "label": "flight_booking", "description": "Book or search flights" },
                    { "label": "hotel_booking", "description": "Book or search hotels" },
                ]
            }))
            .expect("render");
        assert!(rendered.contains("- flight_booking: Book or search flights"));
        assert!(rendered.contains("- hotel_booking: Book or search hotels"));
    }

    #[test]
    fn classifier_prompt_skips_empty_history() {
        let rendered = CLASSIFIER_PROMPT
            .render(&json!({ "history": [], "utterance": "hello" }))
            .expect("render");
        assert!(rendered.starts_with("User message: 'hello'"));
    }

    #[test]
    fn extractor_system_names_missing_fields_and_current_values() {
        let rendered = EXTRACTOR_SYSTEM
            .render(&json!({
                "intent": "flight_booking",
                "have": { "destination": "Paris" },
                "missing": [
                    { "name": "origin", "description": "Departure city" },
                    { "name": "date", "description": "Travel date" },
                ]
            }))
            .expect("render");
        assert!(rendered.contains("Currently have: destination=Paris"));
        assert!(rendered.contains("Still need: origin, date"));
        assert!(rendered.contains("- date: Travel date"));
    }

    #[test]
    fn result_system_switches_on_success() {
        let failure = RESULT_SYSTEM
            .render(&json!({ "success": false, "must_mention": [] }))
            .expect("render");
        assert!(failure.contains("Apologize"));
        let success = RESULT_SYSTEM
            .render(&json!({ "success": true, "must_mention": ["Paris", "BK1002"] }))
            .expect("render");
        assert!(success.contains("Paris, BK1002"));
    }

    #[test]
    fn missing_variable_is_a_render_error() {
        let error = CLASSIFIER_PROMPT.render(&json!({})).expect_err("utterance is required");
        assert_eq!(error.template, "classifier_prompt");
    }
}
