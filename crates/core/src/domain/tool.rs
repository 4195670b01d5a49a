use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    SearchFlights,
    BookFlight,
    SearchHotels,
    BookHotel,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchFlights => "search_flights",
            Self::BookFlight => "book_flight",
            Self::SearchHotels => "search_hotels",
            Self::BookHotel => "book_hotel",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "search_flights" => Ok(Self::SearchFlights),
            "book_flight" => Ok(Self::BookFlight),
            "search_hotels" => Ok(Self::SearchHotels),
            "book_hotel" => Ok(Self::BookHotel),
            other => Err(format!("unknown tool `{other}`")),
        }
    }
}

/// Normalized result of the last tool invocation in a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Completed { tool: ToolName, payload: Value, message: String },
    Failed { tool: ToolName, cause: String },
}

impl ToolOutcome {
    pub fn tool(&self) -> ToolName {
        match self {
            Self::Completed { tool, .. } | Self::Failed { tool, .. } => *tool,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
