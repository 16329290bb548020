//! Strict parser for the stock payload.
//!
//! The payload nests per-state location lists. Only the fields the aggregator
//! depends on are validated for type; every other store field is carried
//! through opaquely so the notification layer can echo it verbatim. A matched
//! response that does not conform is a hard error, never a silent skip: the
//! match rule already established this was the stock response, so a shape
//! mismatch means the site contract changed.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

const EXCERPT_LEN: usize = 160;

/// Top-level parsed structure. An empty `stocks` list is valid: the site is
/// simply reporting zero states right now.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockPayload {
    pub stocks: Vec<StateStock>,
}

/// One geographic state/region and the stores inside it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateStock {
    pub id: StateId,
    pub name: String,
    pub locations: Vec<LocationStock>,
}

/// One physical store. `available` is validated; everything else the site
/// sends rides along untouched in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocationStock {
    pub name: Option<String>,
    pub available: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Opaque state identifier; the site uses integers today but the contract
/// only promises "string or integer".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StateId {
    Int(i64),
    Text(String),
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Int(n) => write!(f, "{n}"),
            StateId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Error)]
pub enum PayloadParseError {
    #[error("response body is not JSON ({source}): {excerpt}")]
    NotJson {
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing or mis-typed `{field}` field: {excerpt}")]
    BadField { field: &'static str, excerpt: String },
    #[error("`available` is not a non-negative integer: {value}")]
    BadAvailable { value: String },
}

/// Parse a raw response body into a validated [`StockPayload`].
pub fn parse(body: &str) -> Result<StockPayload, PayloadParseError> {
    let root: Value = serde_json::from_str(body).map_err(|source| PayloadParseError::NotJson {
        excerpt: excerpt(body),
        source,
    })?;

    let states = root
        .get("stocks")
        .and_then(Value::as_array)
        .ok_or_else(|| bad_field("stocks", &root))?;

    let mut stocks = Vec::with_capacity(states.len());
    for state in states {
        let id = state
            .get("id")
            .and_then(state_id)
            .ok_or_else(|| bad_field("id", state))?;
        let name = state
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_field("name", state))?
            .to_string();
        let locations = state
            .get("locations")
            .and_then(Value::as_array)
            .ok_or_else(|| bad_field("locations", state))?
            .iter()
            .map(location)
            .collect::<Result<Vec<_>, _>>()?;
        stocks.push(StateStock {
            id,
            name,
            locations,
        });
    }

    Ok(StockPayload { stocks })
}

fn location(value: &Value) -> Result<LocationStock, PayloadParseError> {
    let fields = value
        .as_object()
        .ok_or_else(|| bad_field("locations", value))?;
    let available = fields
        .get("available")
        .ok_or_else(|| bad_field("available", value))
        .and_then(coerce_available)?;
    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let extra = fields
        .iter()
        .filter(|(key, _)| *key != "available" && *key != "name")
        .map(|(key, val)| (key.clone(), val.clone()))
        .collect();
    Ok(LocationStock {
        name,
        available,
        extra,
    })
}

/// `available` arrives either as a JSON number or as a numeric string.
/// Coercion failure is a parse error, not a silent zero.
fn coerce_available(value: &Value) -> Result<u64, PayloadParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| PayloadParseError::BadAvailable {
        value: value.to_string(),
    })
}

fn state_id(value: &Value) -> Option<StateId> {
    match value {
        Value::Number(n) => n.as_i64().map(StateId::Int),
        Value::String(s) => Some(StateId::Text(s.clone())),
        _ => None,
    }
}

fn bad_field(field: &'static str, context: &Value) -> PayloadParseError {
    PayloadParseError::BadField {
        field,
        excerpt: excerpt(&context.to_string()),
    }
}

fn excerpt(text: &str) -> String {
    let mut end = EXCERPT_LEN.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if end < text.len() {
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    }
}
