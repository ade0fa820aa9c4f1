//! Response body classification.
//!
//! The backend answers with three different body layouts depending on the
//! endpoint. Every body is classified once, in a fixed priority order, and
//! callers then use [`ResponseShape::into_listing`] or
//! [`ResponseShape::into_item`] regardless of which layout arrived.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("response body is not valid JSON: {0}")]
    Malformed(String),
    #[error("expected a list payload, found {0}")]
    NotAList(&'static str),
    #[error("expected a single object payload, found {0}")]
    NotAnItem(&'static str),
    #[error("payload does not match the expected type: {0}")]
    Decode(String),
}

/// Pagination fields shared by paginated bodies and enveloped lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub total: Option<u64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// `{code, message, data}`, optionally with top-level paging fields.
    Enveloped {
        code: i64,
        message: String,
        data: Value,
        page: PageInfo,
    },
    /// `{data: [...], total, page, pageSize}` or `{items: [...], ...}`.
    Paginated { items: Vec<Value>, page: PageInfo },
    /// `[...]`
    BareArray(Vec<Value>),
    /// Any other JSON value, including `null` for empty bodies.
    BareValue(Value),
}

/// A list payload after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl<T> Listing<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: None,
            page_size: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parses raw body bytes and classifies them. Empty bodies become `BareValue(Null)`.
pub fn parse_body(bytes: &[u8]) -> Result<ResponseShape, ShapeError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ResponseShape::BareValue(Value::Null));
    }
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| ShapeError::Malformed(err.to_string()))?;
    Ok(classify(value))
}

/// Classifies a decoded body. The order of the tests below is the contract.
pub fn classify(value: Value) -> ResponseShape {
    match value {
        Value::Object(map) if is_envelope(&map) => into_envelope(map),
        Value::Object(map) if list_key(&map).is_some() => into_paginated(map),
        Value::Array(items) => ResponseShape::BareArray(items),
        other => ResponseShape::BareValue(other),
    }
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    map.get("code").is_some_and(Value::is_i64)
        && map.get("message").is_some_and(Value::is_string)
        && map.contains_key("data")
}

fn list_key(map: &Map<String, Value>) -> Option<&'static str> {
    ["data", "items"]
        .into_iter()
        .find(|key| map.get(*key).is_some_and(Value::is_array))
}

fn into_envelope(mut map: Map<String, Value>) -> ResponseShape {
    let page = page_info(&map);
    let code = map.get("code").and_then(Value::as_i64).unwrap_or_default();
    let message = match map.remove("message") {
        Some(Value::String(message)) => message,
        _ => String::new(),
    };
    let data = map.remove("data").unwrap_or(Value::Null);
    ResponseShape::Enveloped {
        code,
        message,
        data,
        page,
    }
}

fn into_paginated(mut map: Map<String, Value>) -> ResponseShape {
    let page = page_info(&map);
    let items = match list_key(&map).and_then(|key| map.remove(key)) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    ResponseShape::Paginated { items, page }
}

fn page_info(map: &Map<String, Value>) -> PageInfo {
    PageInfo {
        total: map.get("total").and_then(as_count),
        page: map.get("page").and_then(as_count).map(saturating_u32),
        page_size: map
            .get("pageSize")
            .or_else(|| map.get("page_size"))
            .and_then(as_count)
            .map(saturating_u32),
    }
}

/// Counts sometimes arrive as strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl ResponseShape {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseShape::Enveloped { .. } => "enveloped",
            ResponseShape::Paginated { .. } => "paginated",
            ResponseShape::BareArray(_) => "bare array",
            ResponseShape::BareValue(Value::Null) => "empty body",
            ResponseShape::BareValue(_) => "bare value",
        }
    }

    /// Envelope code and message when the envelope reports a failure.
    ///
    /// `0` and `200..=299` count as success.
    pub fn rejected_code(&self) -> Option<(i64, &str)> {
        match self {
            ResponseShape::Enveloped { code, message, .. }
                if *code != 0 && !(200..=299).contains(code) =>
            {
                Some((*code, message.as_str()))
            }
            _ => None,
        }
    }

    /// Normalizes any list-carrying layout into a [`Listing`].
    pub fn into_listing<T: DeserializeOwned>(self) -> Result<Listing<T>, ShapeError> {
        let (items, page) = match self {
            ResponseShape::Enveloped { data, page, .. } => match classify(data) {
                ResponseShape::BareArray(items) => (items, page),
                ResponseShape::Paginated {
                    items,
                    page: inner,
                } => (items, merge_page(inner, page)),
                other => return Err(ShapeError::NotAList(other.kind())),
            },
            ResponseShape::Paginated { items, page } => (items, page),
            ResponseShape::BareArray(items) => (items, PageInfo::default()),
            other => return Err(ShapeError::NotAList(other.kind())),
        };

        let total = page.total.unwrap_or(items.len() as u64);
        let items = decode(Value::Array(items))?;
        Ok(Listing {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    /// Extracts a single object payload, unwrapping an envelope if present.
    pub fn into_item<T: DeserializeOwned>(self) -> Result<T, ShapeError> {
        match self {
            ResponseShape::Enveloped { data, .. } => match data {
                Value::Null => Err(ShapeError::NotAnItem("empty envelope")),
                data => decode(data),
            },
            ResponseShape::BareValue(Value::Null) => Err(ShapeError::NotAnItem("empty body")),
            ResponseShape::BareValue(value) => decode(value),
            other => Err(ShapeError::NotAnItem(other.kind())),
        }
    }

    /// The payload with any envelope removed, for callers that only need raw JSON.
    pub fn into_value(self) -> Value {
        match self {
            ResponseShape::Enveloped { data, .. } => data,
            ResponseShape::Paginated { items, .. } | ResponseShape::BareArray(items) => {
                Value::Array(items)
            }
            ResponseShape::BareValue(value) => value,
        }
    }
}

fn merge_page(inner: PageInfo, outer: PageInfo) -> PageInfo {
    PageInfo {
        total: inner.total.or(outer.total),
        page: inner.page.or(outer.page),
        page_size: inner.page_size.or(outer.page_size),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ShapeError> {
    serde_json::from_value(value).map_err(|err| ShapeError::Decode(err.to_string()))
}
