//! Parameter extraction for booking intents.
//!
//! A deterministic pass over the utterance runs first. The language model is
//! only asked for fields that are still missing afterwards, and whatever it
//! returns goes through the same validation as the local values. Values that
//! fail validation are reported as ambiguous and never stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tripdesk_core::domain::intent::BookingKind;
use tripdesk_core::domain::params::{ParamName, ParamValue, Parameters};
use tripdesk_core::errors::DialogError;

use crate::classifier::{is_small_talk, BOOK_VERBS, FLIGHT_CUES, HOTEL_CUES, SEARCH_VERBS};
use crate::llm::{CompletionRequest, LlmClient, LlmError, LlmRole};
use crate::prompts::{EXTRACTOR_PROMPT, EXTRACTOR_SYSTEM};
use crate::text::{contains_any, lowercase_tokens, tokenize};

const MAX_PHRASE_TOKENS: usize = 4;
const MAX_BARE_ANSWER_TOKENS: usize = 4;
const MAX_DAYS: u32 = 365;

const ORIGIN_STOPS: &[&str] = &[
    "to", "on", "for", "at", "by", "in", "next", "this", "tomorrow", "today", "tonight", "and",
    "leaving", "departing", "returning", "around", "please", "with",
];
const DESTINATION_STOPS: &[&str] = &[
    "from", "on", "for", "at", "by", "in", "next", "this", "tomorrow", "today", "tonight", "and",
    "leaving", "departing", "returning", "around", "please", "with",
];
const CITY_STOPS: &[&str] = &[
    "for", "on", "from", "to", "next", "this", "tomorrow", "today", "tonight", "and", "with",
    "starting", "during", "please", "until",
];
/// Words after `to` that make it an infinitive rather than a destination.
const INFINITIVE_VERBS: &[&str] = &[
    "fly", "go", "travel", "book", "get", "visit", "find", "see", "make", "reserve", "stay",
    "leave", "head", "return", "search", "be", "have", "know", "check",
];
const REJECTED_LEADS: &[&str] = &["a", "an", "my", "our", "your", "least", "once", "some"];
const NON_ANSWERS: &[&str] =
    &["yes", "no", "ok", "okay", "sure", "nope", "yeah", "yep", "please", "maybe"];
const PLACE_MARKERS: &[&str] = &["from", "to", "in", "at", "near", "on", "for"];

const VAGUE_DATES: &[&str] = &["sometime", "soon", "whenever", "later", "someday", "eventually"];
const VAGUE_COUNTS: &[&str] = &["few", "couple", "several", "some", "many"];
const WEEKDAYS: &[&str] =
    &["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];
const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("fourteen", 14),
    ("fifteen", 15),
    ("twenty", 20),
    ("thirty", 30),
];

#[derive(Clone, Copy, Debug)]
pub struct ExtractorInput<'a> {
    pub utterance: &'a str,
    pub kind: BookingKind,
    /// Parameters collected in earlier turns.
    pub current: &'a Parameters,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub values: Vec<(ParamName, ParamValue)>,
    /// One `ExtractionAmbiguous` per field whose value could not be accepted.
    pub ambiguous: Vec<DialogError>,
    /// Set when the model pass failed. Local values are still returned.
    pub model_error: Option<LlmError>,
}

impl Extraction {
    pub fn unclear(&self) -> Vec<ParamName> {
        self.ambiguous
            .iter()
            .filter_map(|error| match error {
                DialogError::ExtractionAmbiguous { param, .. } => Some(*param),
                _ => None,
            })
            .collect()
    }
}

pub struct ParameterExtractor {
    llm: Arc<dyn LlmClient>,
}

impl ParameterExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn extract(&self, input: ExtractorInput<'_>) -> Extraction {
        let mut findings = local_pass(input.utterance, input.kind, input.current);

        let still_missing = input
            .current
            .missing(input.kind)
            .into_iter()
            .filter(|name| !findings.values.contains_key(name))
            .collect::<Vec<_>>();

        let mut model_error = None;
        if !still_missing.is_empty() {
            match self.ask_model(&input, &findings.values, &still_missing).await {
                Ok(object) => {
                    for (key, value) in object {
                        let Some(name) = ParamName::parse(&key) else { continue };
                        if !still_missing.contains(&name) {
                            continue;
                        }
                        match validate_model_value(name, &value) {
                            Ok(Some(accepted)) => {
                                findings.ambiguous.remove(&name);
                                findings.values.insert(name, accepted);
                            }
                            Ok(None) => {}
                            Err(raw) => {
                                findings.ambiguous.entry(name).or_insert(raw);
                            }
                        }
                    }
                }
                Err(error) => model_error = Some(error),
            }
        }

        Extraction {
            values: findings.values.into_iter().collect(),
            ambiguous: findings
                .ambiguous
                .into_iter()
                .map(|(param, raw)| DialogError::ExtractionAmbiguous { param, raw })
                .collect(),
            model_error,
        }
    }

    async fn ask_model(
        &self,
        input: &ExtractorInput<'_>,
        local: &BTreeMap<ParamName, ParamValue>,
        missing: &[ParamName],
    ) -> Result<Map<String, Value>, LlmError> {
        let mut have = input.current.to_display_map();
        have.extend(local.iter().map(|(name, value)| (name.to_string(), value.to_string())));
        let missing = missing
            .iter()
            .map(|name| json!({ "name": name.as_str(), "description": name.description() }))
            .collect::<Vec<_>>();
        let intent = input.kind.intent().as_str();

        let system = EXTRACTOR_SYSTEM
            .render(&json!({ "intent": intent, "have": have, "missing": missing }))
            .map_err(|error| LlmError::invalid_request(error.to_string()))?;
        let prompt = EXTRACTOR_PROMPT
            .render(&json!({ "utterance": input.utterance, "intent": intent, "missing": missing }))
            .map_err(|error| LlmError::invalid_request(error.to_string()))?;

        let raw = self
            .llm
            .complete(&CompletionRequest::for_role(LlmRole::Extractor, system, prompt))
            .await?;
        parse_model_object(&raw)
    }
}

#[derive(Debug, Default)]
struct Findings {
    values: BTreeMap<ParamName, ParamValue>,
    ambiguous: BTreeMap<ParamName, String>,
}

impl Findings {
    fn is_empty(&self) -> bool {
        self.values.is_empty() && self.ambiguous.is_empty()
    }
}

fn local_pass(utterance: &str, kind: BookingKind, current: &Parameters) -> Findings {
    let tokens = tokenize(utterance);
    let lower = lowercase_tokens(utterance);
    let mut findings = Findings::default();

    match kind {
        BookingKind::Flight => {
            if let Some(origin) = marked_phrase(&tokens, &lower, &["from"], ORIGIN_STOPS) {
                findings.values.insert(ParamName::Origin, ParamValue::Text(origin));
            }
            if let Some(destination) = destination_phrase(&tokens, &lower) {
                findings.values.insert(ParamName::Destination, ParamValue::Text(destination));
            }
            match scan_date(&tokens, &lower) {
                Some(DateFinding::Found(date)) => {
                    findings.values.insert(ParamName::Date, ParamValue::Text(date));
                }
                Some(DateFinding::Unclear(raw)) => {
                    findings.ambiguous.insert(ParamName::Date, raw);
                }
                None => {}
            }
        }
        BookingKind::Hotel => {
            if let Some(city) = marked_phrase(&tokens, &lower, &["in", "at", "near"], CITY_STOPS) {
                findings.values.insert(ParamName::City, ParamValue::Text(city));
            }
            match scan_days(&tokens, &lower) {
                Some(DaysFinding::Found(days)) => {
                    findings.values.insert(ParamName::Days, ParamValue::Count(days));
                }
                Some(DaysFinding::Unclear(raw)) => {
                    findings.ambiguous.insert(ParamName::Days, raw);
                }
                None => {}
            }
        }
    }

    if findings.is_empty() {
        if let [only] = current.missing(kind).as_slice() {
            bare_answer(utterance, &tokens, &lower, *only, &mut findings);
        }
    }

    findings
}

/// Treats a short reply without any cue as the answer to the one open
/// question.
fn bare_answer(
    utterance: &str,
    tokens: &[String],
    lower: &[String],
    missing: ParamName,
    findings: &mut Findings,
) {
    if tokens.is_empty()
        || tokens.len() > MAX_BARE_ANSWER_TOKENS
        || is_small_talk(utterance, lower)
        || lower.iter().all(|token| NON_ANSWERS.contains(&token.as_str()))
        || [PLACE_MARKERS, FLIGHT_CUES, HOTEL_CUES, BOOK_VERBS, SEARCH_VERBS]
            .iter()
            .any(|words| contains_any(lower, words))
    {
        return;
    }

    let answer = tokens.join(" ");
    match missing {
        ParamName::Origin | ParamName::Destination | ParamName::City => {
            findings.values.insert(missing, ParamValue::Text(answer));
        }
        ParamName::Date => {
            findings.ambiguous.insert(missing, answer);
        }
        ParamName::Days => match lower {
            [single] => match parse_number(single) {
                Some(days) if (1..=MAX_DAYS).contains(&days) => {
                    findings.values.insert(missing, ParamValue::Count(days));
                }
                _ => {
                    findings.ambiguous.insert(missing, answer);
                }
            },
            _ => {
                findings.ambiguous.insert(missing, answer);
            }
        },
    }
}

fn marked_phrase(
    tokens: &[String],
    lower: &[String],
    markers: &[&str],
    stops: &[&str],
) -> Option<String> {
    lower
        .iter()
        .enumerate()
        .filter(|(_, token)| markers.contains(&token.as_str()))
        .find_map(|(index, _)| phrase_after(tokens, lower, index, stops))
}

fn destination_phrase(tokens: &[String], lower: &[String]) -> Option<String> {
    lower
        .iter()
        .enumerate()
        .filter(|(_, token)| token.as_str() == "to")
        .filter(|(index, _)| {
            lower.get(index + 1).map_or(true, |next| !INFINITIVE_VERBS.contains(&next.as_str()))
        })
        .find_map(|(index, _)| phrase_after(tokens, lower, index, DESTINATION_STOPS))
}

fn phrase_after(
    tokens: &[String],
    lower: &[String],
    marker: usize,
    stops: &[&str],
) -> Option<String> {
    let mut start = marker + 1;
    if lower.get(start).is_some_and(|token| token == "the") {
        start += 1;
    }
    let lead = lower.get(start)?;
    if REJECTED_LEADS.contains(&lead.as_str()) {
        return None;
    }

    let mut end = start;
    while end < lower.len() && end - start < MAX_PHRASE_TOKENS {
        let word = lower[end].as_str();
        if stops.contains(&word)
            || word.starts_with(|c: char| c.is_ascii_digit())
            || month_number(word).is_some()
            || WEEKDAYS.contains(&word)
            || VAGUE_DATES.contains(&word)
            || FLIGHT_CUES.contains(&word)
            || HOTEL_CUES.contains(&word)
        {
            break;
        }
        end += 1;
    }

    (end > start).then(|| tokens[start..end].join(" "))
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum DateFinding {
    /// Original text of a recognised date.
    Found(String),
    Unclear(String),
}

fn scan_date(tokens: &[String], lower: &[String]) -> Option<DateFinding> {
    use DateFinding::{Found, Unclear};

    for (index, word) in lower.iter().enumerate() {
        let word = word.as_str();
        let next = lower.get(index + 1).map(String::as_str);

        if matches!(word, "today" | "tomorrow" | "tonight") {
            return Some(Found(tokens[index].clone()));
        }
        if WEEKDAYS.contains(&word) {
            let start = match index.checked_sub(1).map(|prev| lower[prev].as_str()) {
                Some("next" | "this") => index - 1,
                _ => index,
            };
            return Some(Found(tokens[start..=index].join(" ")));
        }
        if word == "next" && matches!(next, Some("week" | "month" | "year" | "weekend")) {
            return Some(Unclear(tokens[index..=index + 1].join(" ")));
        }
        if VAGUE_DATES.contains(&word) {
            return Some(Unclear(tokens[index].clone()));
        }
        if let Some(valid) = numeric_date(word) {
            let text = tokens[index].clone();
            return Some(if valid { Found(text) } else { Unclear(text) });
        }
        if let Some(month) = month_number(word) {
            if let Some(day) = next.and_then(day_of_month) {
                let end = if lower.get(index + 2).is_some_and(|token| is_year(token)) {
                    index + 2
                } else {
                    index + 1
                };
                let text = tokens[index..=end].join(" ");
                return Some(if day <= days_in_month(month) { Found(text) } else { Unclear(text) });
            }
            if let Some(day) = index.checked_sub(1).and_then(|prev| day_of_month(&lower[prev])) {
                let text = tokens[index - 1..=index].join(" ");
                return Some(if day <= days_in_month(month) { Found(text) } else { Unclear(text) });
            }
            if index > 0 && lower[index - 1] == "in" {
                return Some(Unclear(tokens[index - 1..=index].join(" ")));
            }
        }
        if word == "on" && next == Some("the") {
            if let Some(day_token) = lower.get(index + 2) {
                if day_of_month(day_token).is_some() {
                    return Some(Found(tokens[index + 1..=index + 2].join(" ")));
                }
            }
        }
    }
    None
}

/// `Some(valid)` when the token has the shape of an ISO or slash date.
fn numeric_date(token: &str) -> Option<bool> {
    let iso_shape = token.len() == 10
        && token.chars().enumerate().all(|(i, c)| {
            if i == 4 || i == 7 {
                c == '-'
            } else {
                c.is_ascii_digit()
            }
        });
    if iso_shape {
        return Some(NaiveDate::parse_from_str(token, "%Y-%m-%d").is_ok());
    }

    let parts = token.split('/').collect::<Vec<_>>();
    let slash_shape = (2..=3).contains(&parts.len())
        && parts.iter().all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if !slash_shape {
        return None;
    }
    if parts.len() == 3 {
        return Some(NaiveDate::parse_from_str(token, "%m/%d/%Y").is_ok());
    }
    let month = parts[0].parse::<u32>().ok();
    let day = parts[1].parse::<u32>().ok();
    Some(matches!((month, day), (Some(m @ 1..=12), Some(d)) if (1..=days_in_month(m)).contains(&d)))
}

fn month_number(word: &str) -> Option<u32> {
    let month = match word {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn day_of_month(token: &str) -> Option<u32> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|day| (1..=31).contains(day))
}

fn is_year(token: &str) -> bool {
    token.len() == 4 && token.parse::<u32>().is_ok_and(|year| (1900..=2100).contains(&year))
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum DaysFinding {
    Found(u32),
    Unclear(String),
}

fn scan_days(tokens: &[String], lower: &[String]) -> Option<DaysFinding> {
    for (index, word) in lower.iter().enumerate() {
        if let Some((number, unit)) = word.split_once('-') {
            if let (Some(count), Some(factor)) = (parse_number(number), unit_factor(unit)) {
                return Some(checked_days(count.saturating_mul(factor), &tokens[index]));
            }
        }

        let Some(factor) = unit_factor(word) else { continue };
        let Some(prev) = index.checked_sub(1) else { continue };
        let previous = lower[prev].as_str();

        if let Some(count) = parse_number(previous) {
            let raw = tokens[prev..=index].join(" ");
            return Some(checked_days(count.saturating_mul(factor), &raw));
        }
        if matches!(previous, "a" | "an") {
            return Some(DaysFinding::Found(factor));
        }

        let vague = if VAGUE_COUNTS.contains(&previous) {
            Some(prev)
        } else if previous == "of" && prev > 0 && VAGUE_COUNTS.contains(&lower[prev - 1].as_str())
        {
            Some(prev - 1)
        } else {
            None
        };
        if let Some(mut start) = vague {
            if start > 0 && matches!(lower[start - 1].as_str(), "a" | "an") {
                start -= 1;
            }
            return Some(DaysFinding::Unclear(tokens[start..=index].join(" ")));
        }
    }
    None
}

fn unit_factor(word: &str) -> Option<u32> {
    match word {
        "day" | "days" | "night" | "nights" => Some(1),
        "week" | "weeks" => Some(7),
        _ => None,
    }
}

fn parse_number(word: &str) -> Option<u32> {
    if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) {
        let count = word.parse::<u64>().ok().and_then(|n| u32::try_from(n).ok());
        return Some(count.unwrap_or(u32::MAX));
    }
    NUMBER_WORDS.iter().find(|(name, _)| *name == word).map(|(_, value)| *value)
}

fn checked_days(days: u32, raw: &str) -> DaysFinding {
    if (1..=MAX_DAYS).contains(&days) {
        DaysFinding::Found(days)
    } else {
        DaysFinding::Unclear(raw.to_string())
    }
}

/// Accepts a bare object or one wrapped in prose or a fenced block.
fn parse_model_object(raw: &str) -> Result<Map<String, Value>, LlmError> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(LlmError::invalid_response(format!("no JSON object in `{}`", raw.trim())));
    };
    if end < start {
        return Err(LlmError::invalid_response(format!("no JSON object in `{}`", raw.trim())));
    }
    serde_json::from_str::<Map<String, Value>>(&raw[start..=end])
        .map_err(|error| LlmError::invalid_response(format!("extraction JSON: {error}")))
}

/// `Ok(None)` for explicit nulls, `Err(raw)` for values that fail validation.
fn validate_model_value(name: ParamName, value: &Value) -> Result<Option<ParamValue>, String> {
    if value.is_null() {
        return Ok(None);
    }
    let raw = match value {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    };

    match name {
        ParamName::Date => {
            let tokens = tokenize(&raw);
            let lower = lowercase_tokens(&raw);
            match scan_date(&tokens, &lower) {
                Some(DateFinding::Found(_)) => Ok(Some(ParamValue::Text(raw))),
                _ => Err(raw),
            }
        }
        ParamName::Days => {
            let count = match value {
                Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
                Value::String(_) => {
                    let lower = lowercase_tokens(&raw);
                    match lower.as_slice() {
                        [single] => parse_number(single),
                        _ => match scan_days(&tokenize(&raw), &lower) {
                            Some(DaysFinding::Found(days)) => Some(days),
                            _ => None,
                        },
                    }
                }
                _ => None,
            };
            match count {
                Some(days) if (1..=MAX_DAYS).contains(&days) => Ok(Some(ParamValue::Count(days))),
                _ => Err(raw),
            }
        }
        ParamName::Origin | ParamName::Destination | ParamName::City => {
            let placeholder = matches!(
                raw.to_ascii_lowercase().as_str(),
                "" | "null" | "none" | "unknown" | "n/a"
            );
            match value {
                Value::String(_) if placeholder => Ok(None),
                Value::String(_) => Ok(Some(ParamValue::Text(raw))),
                _ => Err(raw),
            }
        }
    }
}
