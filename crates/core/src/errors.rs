use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::params::ParamName;
use crate::domain::tool::ToolName;

/// Failures a turn can hit. Only `ConfigurationError` is fatal; the rest are
/// recovered into a conversational reply and recorded as degradations.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DialogError {
    #[error("intent classification unavailable: {reason}")]
    ClassificationUnavailable { reason: String },
    #[error("value for {param} is ambiguous: `{raw}`")]
    ExtractionAmbiguous { param: ParamName, raw: String },
    #[error("tool {tool} failed: {cause}")]
    ToolExecutionError { tool: ToolName, cause: String },
    #[error("configuration failure: {message}")]
    ConfigurationError { message: String },
}

impl DialogError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClassificationUnavailable { .. } => "classification_unavailable",
            Self::ExtractionAmbiguous { .. } => "extraction_ambiguous",
            Self::ToolExecutionError { .. } => "tool_execution_error",
            Self::ConfigurationError { .. } => "configuration_error",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationError { .. })
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ClassificationUnavailable { .. } => {
                "I could not work out what you need right now, so I answered generally."
            }
            Self::ExtractionAmbiguous { .. } => "One of the details was unclear.",
            Self::ToolExecutionError { .. } => {
                "The booking service ran into a problem. Please try again shortly."
            }
            Self::ConfigurationError { .. } => {
                "The assistant is not configured. Check the model and credential settings."
            }
        }
    }
}

impl From<ConfigError> for DialogError {
    fn from(value: ConfigError) -> Self {
        Self::ConfigurationError { message: value.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::domain::params::ParamName;
    use crate::domain::tool::ToolName;
    use crate::errors::DialogError;

    #[test]
    fn only_configuration_errors_are_fatal() {
        let recoverable = [
            DialogError::ClassificationUnavailable { reason: "timeout".to_owned() },
            DialogError::ExtractionAmbiguous { param: ParamName::Days, raw: "a few".to_owned() },
            DialogError::ToolExecutionError {
                tool: ToolName::BookFlight,
                cause: "unavailable".to_owned(),
            },
        ];
        assert!(recoverable.iter().all(|error| !error.is_fatal()));

        let fatal = DialogError::from(ConfigError::Validation("llm.api_key is required".to_owned()));
        assert!(fatal.is_fatal());
        assert_eq!(fatal.code(), "configuration_error");
    }

    #[test]
    fn display_names_the_field_and_raw_value() {
        let error = DialogError::ExtractionAmbiguous {
            param: ParamName::Date,
            raw: "sometime soon".to_owned(),
        };
        assert_eq!(error.to_string(), "value for date is ambiguous: `sometime soon`");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let error = DialogError::ToolExecutionError {
            tool: ToolName::SearchHotels,
            cause: "timed out".to_owned(),
        };
        let value = serde_json::to_value(&error).expect("serialize");
        assert_eq!(value["kind"], "tool_execution_error");
        assert_eq!(value["tool"], "search_hotels");
    }
}
