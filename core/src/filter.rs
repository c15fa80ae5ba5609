//! Todo list filter and its query-string encoding.
//!
//! Only fields that are `Some` reach the wire, always in the order
//! `project_id, completed, priority, author, search, limit, offset`. Values
//! are form-urlencoded the way browsers encode `URLSearchParams`
//! (space becomes `+`).

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::types::Priority;

const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Page size the server applies when `limit` is absent.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Optional, conjunctive filter over the todo list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TodoFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl TodoFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Page size in effect: the explicit limit or the server default.
    pub fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// The same filter with pagination stripped, i.e. its "filter identity".
    pub fn without_paging(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// `(name, value)` pairs for every provided field, in wire order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(project_id) = self.project_id {
            pairs.push(("project_id", project_id.to_string()));
        }
        if let Some(completed) = self.completed {
            pairs.push(("completed", completed.to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(author) = &self.author {
            pairs.push(("author", author.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }

    /// Encoded query string without the leading `?`. Empty for an empty filter.
    pub fn to_query_string(&self) -> String {
        self.pairs()
            .into_iter()
            .map(|(name, value)| format!("{name}={}", encode_form_value(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse a query string produced by [`TodoFilter::to_query_string`].
    ///
    /// Unknown parameters are ignored; malformed values for known ones are
    /// an error.
    pub fn from_query_string(query: &str) -> Result<Self, String> {
        let mut filter = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);
        for part in query.split('&').filter(|p| !p.is_empty()) {
            let (name, raw) = part.split_once('=').unwrap_or((part, ""));
            let value = decode_form_value(raw);
            match name {
                "project_id" => filter.project_id = Some(parse_field(name, &value)?),
                "completed" => filter.completed = Some(parse_field(name, &value)?),
                "priority" => {
                    filter.priority = Some(value.parse().map_err(|e| format!("{e}"))?)
                }
                "author" => filter.author = Some(value),
                "search" => filter.search = Some(value),
                "limit" => filter.limit = Some(parse_field(name, &value)?),
                "offset" => filter.offset = Some(parse_field(name, &value)?),
                _ => {}
            }
        }
        Ok(filter)
    }
}

fn parse_field<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid value `{value}` for `{name}`"))
}

fn encode_form_value(value: &str) -> String {
    utf8_percent_encode(value, FORM_VALUE)
        .to_string()
        .replace("%20", "+")
}

fn decode_form_value(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
