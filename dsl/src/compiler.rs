use super::operators::operator_config;
use super::types::{DataType, FieldConfig, FilterCondition, FilterValue, LogicalOperator, Operator};
use std::collections::HashMap;
use std::fmt;

/// Why a condition was left out of the compiled query
#[derive(Debug, Clone, PartialEq)]
enum Skip {
    UnknownField,
    UnknownOperator,
    OperatorNotAllowed(DataType),
    MissingValue,
    MissingSecondValue,
    NotNumeric(String),
    EmptySet,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::UnknownField => write!(f, "field is not in the catalog"),
            Skip::UnknownOperator => write!(f, "operator is not recognised"),
            Skip::OperatorNotAllowed(t) => write!(f, "operator is not available for {} fields", t),
            Skip::MissingValue => write!(f, "value is required"),
            Skip::MissingSecondValue => write!(f, "second value is required"),
            Skip::NotNumeric(v) => write!(f, "value {:?} is not a number", v),
            Skip::EmptySet => write!(f, "no values left after splitting"),
        }
    }
}

/// Compiles filter rows against a field catalog.
///
/// Compilation is best-effort: rows referencing unknown fields, using operators
/// the field's type does not support, or missing a required operand are left out
/// instead of producing an error, so a half-filled editor always yields a usable
/// query.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    fields: HashMap<String, FieldConfig>,
}

impl Compiler {
    pub fn new(fields: &[FieldConfig]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|f| (f.key.clone(), f.clone()))
                .collect(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldConfig> {
        self.fields.get(key)
    }

    pub fn compile(&self, conditions: &[FilterCondition]) -> String {
        let mut parts: Vec<String> = Vec::new();

        for condition in conditions {
            let rendered = match self.render_condition(condition) {
                Ok(rendered) => rendered,
                Err(reason) => {
                    tracing::debug!(
                        id = %condition.id,
                        field = %condition.field,
                        operator = %condition.operator,
                        "skipping filter condition: {}",
                        reason
                    );
                    continue;
                }
            };

            // The first surviving row never carries a connector; later rows
            // without one are joined with AND.
            if !parts.is_empty() {
                let connector = condition.logical_operator.unwrap_or(LogicalOperator::And);
                parts.push(connector.to_string());
            }
            parts.push(rendered);
        }

        parts.join(" ")
    }

    fn render_condition(&self, condition: &FilterCondition) -> Result<String, Skip> {
        let field = self
            .fields
            .get(&condition.field)
            .ok_or(Skip::UnknownField)?;
        let operator = condition.parsed_operator().ok_or(Skip::UnknownOperator)?;
        let config = operator_config(field.data_type, operator)
            .ok_or(Skip::OperatorNotAllowed(field.data_type))?;

        if !config.requires_value {
            return Ok(format!("{} {}()", condition.field, operator));
        }

        let value = condition
            .value
            .as_ref()
            .filter(|_| condition.has_value())
            .ok_or(Skip::MissingValue)?;

        match operator {
            Operator::Between => {
                let second = condition
                    .second_value
                    .as_ref()
                    .filter(|_| condition.has_second_value())
                    .ok_or(Skip::MissingSecondValue)?;
                let low = format_value(value, field.data_type)?;
                let high = format_value(second, field.data_type)?;
                Ok(format!("{} @between({}, {})", condition.field, low, high))
            }
            Operator::In | Operator::NotIn => {
                let values = split_set(value, field.data_type);
                if values.is_empty() {
                    return Err(Skip::EmptySet);
                }
                Ok(format!(
                    "{} {}({})",
                    condition.field,
                    operator,
                    values.join(", ")
                ))
            }
            op if op.is_function() => {
                let literal = format_value(value, field.data_type)?;
                Ok(format!("{} {}({})", condition.field, op, literal))
            }
            op => {
                let literal = format_value(value, field.data_type)?;
                Ok(format!("{} {} {}", condition.field, op, literal))
            }
        }
    }
}

/// Compiles `conditions` into a single-line DSL expression.
/// Returns an empty string when no condition survives.
pub fn compile(conditions: &[FilterCondition], fields: &[FieldConfig]) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    Compiler::new(fields).compile(conditions)
}

fn format_value(value: &FilterValue, data_type: DataType) -> Result<String, Skip> {
    match data_type {
        DataType::String | DataType::Date => Ok(quote(&value.to_string())),
        DataType::Bool => Ok(bool_literal(value).to_string()),
        DataType::Int | DataType::Long => {
            number_literal(value).ok_or_else(|| Skip::NotNumeric(value.to_string()))
        }
    }
}

/// Splits a comma-joined set operand, trimming tokens and discarding empty ones.
/// Numeric fields also discard tokens that are not numbers.
fn split_set(value: &FilterValue, data_type: DataType) -> Vec<String> {
    value
        .to_string()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| format_value(&FilterValue::Text(token.to_string()), data_type).ok())
        .collect()
}

fn bool_literal(value: &FilterValue) -> bool {
    match value {
        FilterValue::Bool(b) => *b,
        FilterValue::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        FilterValue::Integer(_) | FilterValue::Number(_) => false,
    }
}

fn number_literal(value: &FilterValue) -> Option<String> {
    match value {
        FilterValue::Integer(i) => Some(i.to_string()),
        FilterValue::Number(n) if n.is_finite() => Some(n.to_string()),
        FilterValue::Text(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(i.to_string())
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.to_string())
            }
        }
        _ => None,
    }
}

/// Wraps a string or date literal in double quotes, escaping `"` and `\`.
/// Line breaks become `\n` and `\r` so the query stays on one line.
pub(crate) fn quote(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for ch in raw.chars() {
        match ch {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}
