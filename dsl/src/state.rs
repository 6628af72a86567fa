//! Filter editor state carried in a shareable URL parameter

use super::types::{FilterCondition, FilterValue, LogicalOperator};
use serde::Serialize;

/// URL parameter name the console uses for filter state
pub const DEFAULT_PARAM_NAME: &str = "filter";

/// A row as it appears in the URL: everything but the id
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SharedCondition<'a> {
    field: &'a str,
    operator: &'a str,
    value: Option<&'a FilterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    second_value: Option<&'a FilterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logical_operator: Option<LogicalOperator>,
}

impl<'a> From<&'a FilterCondition> for SharedCondition<'a> {
    fn from(condition: &'a FilterCondition) -> Self {
        Self {
            field: &condition.field,
            operator: &condition.operator,
            value: condition.value.as_ref(),
            second_value: condition.second_value.as_ref(),
            logical_operator: condition.logical_operator,
        }
    }
}

pub fn generate_condition_id() -> String {
    format!("filter_{}", uuid::Uuid::new_v4().simple())
}

/// Serializes the rows worth sharing as compact JSON, without their ids.
/// Returns an empty string when no row has a field and a usable value.
pub fn serialize_conditions(conditions: &[FilterCondition]) -> String {
    let shareable: Vec<SharedCondition<'_>> = conditions
        .iter()
        .filter(|c| !c.field.is_empty())
        .filter(|c| {
            c.parsed_operator().is_some_and(|op| op.takes_no_value()) || c.has_value()
        })
        .map(SharedCondition::from)
        .collect();

    if shareable.is_empty() {
        return String::new();
    }

    serde_json::to_string(&shareable).unwrap_or_default()
}

/// Restores rows from [`serialize_conditions`] output, assigning fresh ids.
/// Malformed, empty or non-array input yields `None`.
pub fn deserialize_conditions(encoded: &str) -> Option<Vec<FilterCondition>> {
    if encoded.trim().is_empty() {
        return None;
    }

    let mut conditions: Vec<FilterCondition> = match serde_json::from_str(encoded) {
        Ok(conditions) => conditions,
        Err(e) => {
            tracing::debug!("ignoring unreadable filter state: {}", e);
            return None;
        }
    };

    if conditions.is_empty() {
        return None;
    }

    for condition in &mut conditions {
        condition.id = generate_condition_id();
    }
    Some(conditions)
}

/// Percent-encoded form of [`serialize_conditions`] for a query string
pub fn to_query_param(conditions: &[FilterCondition]) -> String {
    urlencoding::encode(&serialize_conditions(conditions)).into_owned()
}

pub fn from_query_param(param: &str) -> Option<Vec<FilterCondition>> {
    let decoded = urlencoding::decode(param).ok()?;
    deserialize_conditions(&decoded)
}

/// Appends the filter state to `url` under [`DEFAULT_PARAM_NAME`].
/// `url` comes back unchanged when no row is worth sharing.
pub fn share_url(url: &str, conditions: &[FilterCondition]) -> String {
    let param = to_query_param(conditions);
    if param.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, DEFAULT_PARAM_NAME, param)
}

/// Picks the [`DEFAULT_PARAM_NAME`] value out of a URL or query string.
/// Input without `?` or `=` is taken as the bare parameter value.
pub fn filter_param(input: &str) -> Option<&str> {
    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None if input.contains('=') => input,
        None => return Some(input),
    };
    let query = query.split('#').next().unwrap_or_default();
    query.split('&').find_map(|pair| {
        pair.split_once('=')
            .filter(|(name, _)| *name == DEFAULT_PARAM_NAME)
            .map(|(_, value)| value)
    })
}
