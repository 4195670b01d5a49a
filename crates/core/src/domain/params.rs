use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::intent::BookingKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamName {
    Origin,
    Destination,
    Date,
    City,
    Days,
}

impl ParamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Destination => "destination",
            Self::Date => "date",
            Self::City => "city",
            Self::Days => "days",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "origin" => Some(Self::Origin),
            "destination" => Some(Self::Destination),
            "date" => Some(Self::Date),
            "city" => Some(Self::City),
            "days" => Some(Self::Days),
            _ => None,
        }
    }

    /// Name used when asking the user for the field.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Destination => "destination",
            Self::Date => "travel date",
            Self::City => "city",
            Self::Days => "number of days",
        }
    }

    pub fn question(&self) -> &'static str {
        match self {
            Self::Origin => "Which city or airport are you departing from?",
            Self::Destination => "Where would you like to fly to?",
            Self::Date => "What date would you like to travel?",
            Self::City => "Which city do you need a hotel in?",
            Self::Days => "How many days will you be staying?",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Origin => "Departure city or airport (text)",
            Self::Destination => "Arrival city or airport (text)",
            Self::Date => "Travel date (YYYY-MM-DD, MM/DD/YYYY, December 25, etc.)",
            Self::City => "City or location for the hotel (text)",
            Self::Days => "Number of days to stay (integer)",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Count(u32),
    Text(String),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Count(_) => None,
        }
    }

    pub fn as_count(&self) -> Option<u32> {
        match self {
            Self::Count(count) => Some(*count),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(count) => write!(f, "{count}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Extracted parameters, scoped to the booking kind they were collected for.
///
/// Keys are present only once extracted. Merging never removes a key; only
/// [`Parameters::reset_for`] does.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    kind: Option<BookingKind>,
    values: BTreeMap<ParamName, ParamValue>,
}

impl Parameters {
    pub fn for_kind(kind: BookingKind) -> Self {
        Self { kind: Some(kind), values: BTreeMap::new() }
    }

    pub fn kind(&self) -> Option<BookingKind> {
        self.kind
    }

    pub fn get(&self, name: ParamName) -> Option<&ParamValue> {
        self.values.get(&name)
    }

    pub fn contains(&self, name: ParamName) -> bool {
        self.values.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamName, &ParamValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inserts or overwrites the given values and returns the names that
    /// were not present before.
    pub fn merge(
        &mut self,
        extracted: impl IntoIterator<Item = (ParamName, ParamValue)>,
    ) -> Vec<ParamName> {
        let mut added = Vec::new();
        for (name, value) in extracted {
            if self.values.insert(name, value).is_none() {
                added.push(name);
            }
        }
        added
    }

    pub fn reset_for(&mut self, kind: BookingKind) {
        self.kind = Some(kind);
        self.values.clear();
    }

    pub fn missing(&self, kind: BookingKind) -> Vec<ParamName> {
        if self.kind != Some(kind) {
            return kind.required_params().to_vec();
        }
        kind.required_params().iter().copied().filter(|name| !self.contains(*name)).collect()
    }

    pub fn is_complete(&self, kind: BookingKind) -> bool {
        self.missing(kind).is_empty()
    }

    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        self.values.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
    }
}
