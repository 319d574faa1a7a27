//! Normalization of free-form agent replies.
//!
//! Specialist agents are asked for JSON but reply with anything from a clean
//! object to prose wrapping a fenced array. Everything here is lenient: input
//! that cannot be read as JSON becomes a plain-text answer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

static CODE_BLOCK_PATTERN: OnceLock<Regex> = OnceLock::new();
static JSON_SPAN_PATTERN: OnceLock<Regex> = OnceLock::new();
static BOT_VALUE_PATTERN: OnceLock<Regex> = OnceLock::new();

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn code_block_pattern() -> &'static Regex {
    CODE_BLOCK_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*([\[{].*[\]}])\s*```")
            .expect("Static regex pattern is guaranteed to be valid")
    })
}

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn json_span_pattern() -> &'static Regex {
    JSON_SPAN_PATTERN.get_or_init(|| {
        Regex::new(r"(?s)[\[{].*[\]}]").expect("Static regex pattern is guaranteed to be valid")
    })
}

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn bot_value_pattern() -> &'static Regex {
    BOT_VALUE_PATTERN.get_or_init(|| {
        Regex::new(r"'value':\s*'([^']*)'").expect("Static regex pattern is guaranteed to be valid")
    })
}

/// Fixed-shape reply handed back to the chat front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    pub agent: String,
    /// Product list as JSON text, or empty.
    pub products: String,
    pub discount_percentage: String,
    pub image_url: String,
    pub additional_data: String,
    pub cart: Vec<Value>,
}

impl AgentResponse {
    /// A reply carrying only an answer.
    #[must_use]
    pub fn from_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Self::default()
        }
    }
}

/// Locate the JSON text a reply most likely carries.
///
/// A fenced code block wins over a bare span; the bare span runs from the
/// first `[`/`{` to the last `]`/`}`.
#[must_use]
pub fn extract_json_candidate(text: &str) -> Option<&str> {
    if let Some(inner) = code_block_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
    {
        return Some(inner.as_str().trim());
    }
    json_span_pattern().find(text).map(|m| m.as_str().trim())
}

/// Parse an agent reply into an [`AgentResponse`].
///
/// When no JSON can be parsed the whole input becomes the answer, not the
/// bracketed span that failed to parse.
#[must_use]
pub fn parse_agent_response(response: &str) -> AgentResponse {
    let candidate = extract_json_candidate(response).unwrap_or(response);
    serde_json::from_str::<Value>(candidate)
        .map_or_else(|_| AgentResponse::from_answer(response), from_value)
}

fn from_value(value: Value) -> AgentResponse {
    match value {
        Value::Array(items) => {
            if let Some(Value::Object(first)) = items.first() {
                return from_list_item(first);
            }
            AgentResponse::from_answer(Value::Array(items).to_string())
        }
        Value::Object(map) => from_mapping(&map),
        Value::String(text) => AgentResponse::from_answer(text),
        other => AgentResponse::from_answer(other.to_string()),
    }
}

/// First element of a list reply; image links arrive as `image_output`.
fn from_list_item(item: &Map<String, Value>) -> AgentResponse {
    AgentResponse {
        answer: field_text(item.get("answer")),
        agent: String::new(),
        products: products_text(item.get("products")),
        discount_percentage: discount_text(item.get("discount_percentage")),
        image_url: field_text(item.get("image_output")),
        additional_data: String::new(),
        cart: cart_items(item.get("cart")),
    }
}

fn from_mapping(map: &Map<String, Value>) -> AgentResponse {
    let answer = match map.get("answer") {
        Some(Value::String(text)) => unwrap_nested_answer(text).unwrap_or_else(|| text.clone()),
        other => field_text(other),
    };

    AgentResponse {
        answer,
        agent: field_text(map.get("agent")),
        products: products_text(map.get("products")),
        discount_percentage: discount_text(map.get("discount_percentage")),
        image_url: field_text(map.get("image_url")),
        additional_data: field_text(map.get("additional_data")),
        cart: cart_items(map.get("cart")),
    }
}

/// An answer that is itself a serialized list reply is unwrapped one level.
fn unwrap_nested_answer(answer: &str) -> Option<String> {
    if !(answer.starts_with('[') && answer.ends_with(']')) {
        return None;
    }
    let nested: Value = serde_json::from_str(answer).ok()?;
    let first = nested.as_array()?.first()?.as_object()?;
    first.get("answer").map(|inner| field_text(Some(inner)))
}

/// Answer text of a JSON bot reply, if the reply is one.
#[must_use]
pub fn extract_answer(message: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(message).ok()?;
    let holder = match &parsed {
        Value::Array(items) => items.first()?.as_object()?,
        Value::Object(map) => map,
        _ => return None,
    };
    holder.get("answer").map(|answer| field_text(Some(answer)))
}

/// Pull the quoted `'value'` out of a stringified agent message.
#[must_use]
pub fn extract_bot_reply(message: &str) -> String {
    bot_value_pattern()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| message.to_string(), |m| m.as_str().to_string())
}

/// Suffix naming the products a reply mentions, e.g. ` [Products Mentioned: Lamp, Rug]`.
///
/// Returns an empty string when the reply carries no named products.
#[must_use]
pub fn extract_product_names(response: &str) -> String {
    serde_json::from_str::<Value>(response)
        .map(|value| product_names_from_value(&value))
        .unwrap_or_default()
}

/// Same as [`extract_product_names`] for an already parsed reply.
#[must_use]
pub fn product_names_from_value(response: &Value) -> String {
    let Some(products) = response.get("products") else {
        return String::new();
    };

    let parsed;
    let list = match products {
        Value::Array(items) => items,
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).ok();
            match parsed.as_ref().and_then(Value::as_array) {
                Some(items) => items,
                None => return String::new(),
            }
        }
        _ => return String::new(),
    };

    let names: Vec<&str> = list
        .iter()
        .filter_map(|product| product.get("name").and_then(Value::as_str))
        .collect();

    if names.is_empty() {
        String::new()
    } else {
        format!(" [Products Mentioned: {}]", names.join(", "))
    }
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Lists and mappings are re-serialized; empty values collapse to "".
fn products_text(value: Option<&Value>) -> String {
    match value {
        Some(v) if is_truthy(v) => field_text(Some(v)),
        _ => String::new(),
    }
}

fn discount_text(value: Option<&Value>) -> String {
    products_text(value)
}

fn cart_items(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
