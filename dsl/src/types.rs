//! Condition and catalog types shared by the compiler, builder and URL state codec

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Long,
    Date,
    Bool,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::String => write!(f, "string"),
            DataType::Int => write!(f, "int"),
            DataType::Long => write!(f, "long"),
            DataType::Date => write!(f, "date"),
            DataType::Bool => write!(f, "bool"),
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(DataType::String),
            "int" => Ok(DataType::Int),
            "long" => Ok(DataType::Long),
            "date" => Ok(DataType::Date),
            "bool" => Ok(DataType::Bool),
            _ => Err(format!(
                "Unknown data type: {} (expected string, int, long, date or bool)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,         // ==
    Neq,        // !=
    Gt,         // >
    Gte,        // >=
    Lt,         // <
    Lte,        // <=
    Contains,   // @contains
    NContains,  // @ncontains
    StartsWith, // @startswith
    EndsWith,   // @endswith
    In,         // @in
    NotIn,      // @nin
    Between,    // @between
    IsNull,     // @isnull
    NotNull,    // @notnull
}

impl Operator {
    pub const ALL: [Operator; 15] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Contains,
        Operator::NContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::IsNull,
        Operator::NotNull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Contains => "@contains",
            Operator::NContains => "@ncontains",
            Operator::StartsWith => "@startswith",
            Operator::EndsWith => "@endswith",
            Operator::In => "@in",
            Operator::NotIn => "@nin",
            Operator::Between => "@between",
            Operator::IsNull => "@isnull",
            Operator::NotNull => "@notnull",
        }
    }

    /// Function-style operators render as `field @op(args)`, the rest as `field op value`
    pub fn is_function(&self) -> bool {
        self.as_str().starts_with('@')
    }

    pub fn takes_no_value(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::NotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .find(|op| op.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown operator: {}", s))
    }
}

impl Serialize for Operator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
        }
    }
}

/// Operand as entered in a filter row. JSON `null` is represented by `Option::None`.
///
/// JSON integers that fit an `i64` load as [`FilterValue::Integer`] so `long`
/// ids keep every digit; other numbers load as [`FilterValue::Number`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl FilterValue {
    /// Empty text counts as "no value"; whitespace does not
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Integer(i) => write!(f, "{}", i),
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// One row of the filter editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    #[serde(default)]
    pub id: String,
    pub field: String,
    /// Raw operator token; unknown tokens survive loading and are dropped at compile time
    pub operator: String,
    #[serde(default)]
    pub value: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_value: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
}

impl FilterCondition {
    pub fn new(
        id: impl Into<String>,
        field: impl Into<String>,
        operator: Operator,
        value: Option<FilterValue>,
    ) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            operator: operator.as_str().to_string(),
            value,
            second_value: None,
            logical_operator: None,
        }
    }

    pub fn with_second_value(mut self, value: impl Into<FilterValue>) -> Self {
        self.second_value = Some(value.into());
        self
    }

    pub fn with_logical_operator(mut self, logical_operator: LogicalOperator) -> Self {
        self.logical_operator = Some(logical_operator);
        self
    }

    pub fn parsed_operator(&self) -> Option<Operator> {
        self.operator.parse().ok()
    }

    pub(crate) fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_empty())
    }

    pub(crate) fn has_second_value(&self) -> bool {
        self.second_value.as_ref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumOption {
    pub label: String,
    pub value: FilterValue,
}

/// Catalog entry describing a filterable attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_options: Option<Vec<EnumOption>>,
}

impl FieldConfig {
    pub fn new(key: impl Into<String>, data_type: DataType) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            data_type,
            enum_options: None,
        }
    }
}
