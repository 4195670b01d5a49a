use std::env;
use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use toml::Value;
use tripdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use tripdesk_core::DialogError;

use crate::commands::CommandResult;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let options =
        LoadOptions { config_path: config_path.map(Path::to_path_buf), ..LoadOptions::default() };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            let error = DialogError::from(error);
            return CommandResult::failure("config", "config_validation", error.to_string(), 2);
        }
    };

    let file_path = resolve_config_path(config_path);
    let file_doc = load_config_file_doc(file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(&field, file_doc.as_ref(), file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }
    CommandResult::text(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = match &config.llm.api_key {
        Some(key) => redact_secret(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        Field::new("llm.provider", config.llm.provider.as_str(), &["TRIPDESK_LLM_PROVIDER"]),
        Field::new("llm.model", config.llm.model.as_str(), &["TRIPDESK_LLM_MODEL", "MODEL_NAME"]),
        Field::new(
            "llm.base_url",
            config.llm.base_url.as_deref().unwrap_or("<unset>"),
            &["TRIPDESK_LLM_BASE_URL"],
        ),
        Field::new("llm.api_key", api_key, &["TRIPDESK_LLM_API_KEY", "GOOGLE_AI_API_KEY"]),
        Field::new(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["TRIPDESK_LLM_TIMEOUT_SECS"],
        ),
        Field::new(
            "llm.max_retries",
            config.llm.max_retries.to_string(),
            &["TRIPDESK_LLM_MAX_RETRIES"],
        ),
        Field::new(
            "session.debug",
            config.session.debug.to_string(),
            &["TRIPDESK_SESSION_DEBUG", "DEBUG"],
        ),
        Field::new(
            "session.max_clarification_attempts",
            config.session.max_clarification_attempts.to_string(),
            &["TRIPDESK_SESSION_MAX_CLARIFICATION_ATTEMPTS"],
        ),
        Field::new(
            "session.tool_timeout_secs",
            config.session.tool_timeout_secs.to_string(),
            &["TRIPDESK_SESSION_TOOL_TIMEOUT_SECS"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.as_str(),
            &["TRIPDESK_LOGGING_LEVEL", "TRIPDESK_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["TRIPDESK_LOGGING_FORMAT", "TRIPDESK_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = file_doc {
        if contains_path(doc, field.key) {
            let file_path = file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the last four characters of long keys so operators can tell them apart.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars = trimmed.chars().collect::<Vec<_>>();
    if chars.len() < 12 {
        return "<redacted>".to_string();
    }
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_secret};

    #[test]
    fn short_secrets_are_fully_hidden() {
        assert_eq!(redact_secret("abc"), "<redacted>");
        assert_eq!(redact_secret("   "), "<empty>");
        assert_eq!(redact_secret("AIzaSyExampleKey1234"), "***1234");
    }

    #[test]
    fn dotted_paths_walk_nested_tables() {
        let doc = "[llm]\nmodel = \"gemini-2.5-flash\"\n".parse::<toml::Value>().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "session.debug"));
    }
}
