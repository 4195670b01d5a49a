use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;
use tripdesk_core::catalog::{self, ArgKind, ToolSpec};
use tripdesk_core::domain::params::{ParamValue, Parameters};
use tripdesk_core::domain::tool::{ToolName, ToolOutcome};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;
    async fn execute(&self, input: Value) -> Result<Value>;
}

/// Registered tools, invoked with arguments built from the catalog schema.
pub struct ToolRegistry {
    tools: HashMap<ToolName, Box<dyn Tool>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self { tools: HashMap::new(), timeout }
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: ToolName) -> bool {
        self.tools.contains_key(&name)
    }

    /// Maps conversation parameters onto the tool's argument names.
    pub fn build_args(spec: &ToolSpec, parameters: &Parameters) -> Result<Value, String> {
        let mut args = Map::new();
        for arg in spec.args {
            let value = parameters
                .get(arg.source)
                .ok_or_else(|| format!("missing argument `{}`", arg.name))?;
            let value = match (arg.kind, value) {
                (ArgKind::Text, ParamValue::Text(text)) => Value::String(text.clone()),
                (ArgKind::Count, ParamValue::Count(count)) => Value::from(*count),
                _ => return Err(format!("argument `{}` has the wrong type", arg.name)),
            };
            args.insert(arg.name.to_string(), value);
        }
        Ok(Value::Object(args))
    }

    pub async fn invoke(&self, name: ToolName, parameters: &Parameters) -> ToolOutcome {
        let failed = |cause: String| {
            warn!(event_name = "tool.failed", tool = name.as_str(), cause = %cause, "tool failed");
            ToolOutcome::Failed { tool: name, cause }
        };

        let Some(tool) = self.tools.get(&name) else {
            return failed(format!("tool `{name}` is not registered"));
        };
        let args = match Self::build_args(catalog::spec(name), parameters) {
            Ok(args) => args,
            Err(cause) => return failed(cause),
        };

        let payload = match tokio::time::timeout(self.timeout, tool.execute(args)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(error)) => return failed(format!("{error:#}")),
            Err(_) => {
                return failed(format!("no result within {}s", self.timeout.as_secs_f32()))
            }
        };

        let message =
            payload.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
        if payload.get("status").and_then(Value::as_str) == Some("error") {
            if message.is_empty() {
                return failed("the tool reported an error".to_string());
            }
            return failed(message);
        }

        ToolOutcome::Completed { tool: name, payload, message }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tripdesk_core::catalog;
    use tripdesk_core::domain::intent::BookingKind;
    use tripdesk_core::domain::params::{ParamName, ParamValue, Parameters};
    use tripdesk_core::domain::tool::{ToolName, ToolOutcome};

    use super::{Tool, ToolRegistry};

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> ToolName {
            ToolName::BookHotel
        }

        async fn execute(&self, input: Value) -> Result<Value> {
            Ok(json!({ "status": "success", "message": "ok", "echo": input }))
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> ToolName {
            ToolName::SearchHotels
        }

        async fn execute(&self, _input: Value) -> Result<Value> {
            Err(anyhow!("inventory offline"))
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> ToolName {
            ToolName::BookFlight
        }

        async fn execute(&self, _input: Value) -> Result<Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({ "status": "success" }))
        }
    }

    fn hotel(days: ParamValue) -> Parameters {
        let mut params = Parameters::for_kind(BookingKind::Hotel);
        params.merge([
            (ParamName::City, ParamValue::Text("London".to_string())),
            (ParamName::Days, days),
        ]);
        params
    }

    #[test]
    fn args_follow_the_catalog_names() {
        let spec = catalog::spec(ToolName::SearchHotels);
        let args = ToolRegistry::build_args(spec, &hotel(ParamValue::Count(3))).expect("complete");
        assert_eq!(args, json!({ "destination": "London", "days": 3 }));
    }

    #[tokio::test]
    async fn mistyped_argument_fails_without_calling_the_tool() {
        let mut registry = ToolRegistry::new(Duration::from_secs(1));
        registry.register(Echo);
        let params = hotel(ParamValue::Text("three".to_string()));
        let outcome = registry.invoke(ToolName::BookHotel, &params).await;
        match outcome {
            ToolOutcome::Failed { cause, .. } => assert!(cause.contains("days")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn completed_outcome_carries_payload_and_message() {
        let mut registry = ToolRegistry::new(Duration::from_secs(1));
        registry.register(Echo);
        let outcome = registry.invoke(ToolName::BookHotel, &hotel(ParamValue::Count(2))).await;
        match outcome {
            ToolOutcome::Completed { tool, payload, message } => {
                assert_eq!(tool, ToolName::BookHotel);
                assert_eq!(message, "ok");
                assert_eq!(payload["echo"]["city"], "London");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn errors_timeouts_and_unregistered_tools_are_failures() {
        let mut registry = ToolRegistry::new(Duration::from_millis(20));
        registry.register(Broken);
        registry.register(Slow);

        let broken = registry.invoke(ToolName::SearchHotels, &hotel(ParamValue::Count(1))).await;
        assert_eq!(
            broken,
            ToolOutcome::Failed {
                tool: ToolName::SearchHotels,
                cause: "inventory offline".to_string(),
            }
        );

        let mut flight = Parameters::for_kind(BookingKind::Flight);
        flight.merge([
            (ParamName::Origin, ParamValue::Text("Oslo".to_string())),
            (ParamName::Destination, ParamValue::Text("Rome".to_string())),
            (ParamName::Date, ParamValue::Text("tomorrow".to_string())),
        ]);
        let slow = registry.invoke(ToolName::BookFlight, &flight).await;
        assert!(!slow.is_success());

        let missing = registry.invoke(ToolName::SearchFlights, &flight).await;
        match missing {
            ToolOutcome::Failed { cause, .. } => assert!(cause.contains("not registered")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
