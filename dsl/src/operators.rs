use super::types::{DataType, Operator};

/// Input widget a UI should render for an operator's operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Number,
    Date,
    Boolean,
    Multi,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    pub operator: Operator,
    pub label: &'static str,
    pub requires_value: bool,
    pub requires_second_value: bool,
    pub value_kind: ValueKind,
}

const fn op(operator: Operator, label: &'static str, value_kind: ValueKind) -> OperatorConfig {
    OperatorConfig {
        operator,
        label,
        requires_value: true,
        requires_second_value: false,
        value_kind,
    }
}

const fn range(operator: Operator, label: &'static str, value_kind: ValueKind) -> OperatorConfig {
    OperatorConfig {
        operator,
        label,
        requires_value: true,
        requires_second_value: true,
        value_kind,
    }
}

const fn nullary(operator: Operator, label: &'static str) -> OperatorConfig {
    OperatorConfig {
        operator,
        label,
        requires_value: false,
        requires_second_value: false,
        value_kind: ValueKind::None,
    }
}

static STRING_OPERATORS: [OperatorConfig; 10] = [
    op(Operator::Eq, "equals", ValueKind::Text),
    op(Operator::Neq, "does not equal", ValueKind::Text),
    op(Operator::Contains, "contains", ValueKind::Text),
    op(Operator::NContains, "does not contain", ValueKind::Text),
    op(Operator::StartsWith, "starts with", ValueKind::Text),
    op(Operator::EndsWith, "ends with", ValueKind::Text),
    op(Operator::In, "is in", ValueKind::Multi),
    op(Operator::NotIn, "is not in", ValueKind::Multi),
    nullary(Operator::IsNull, "is null"),
    nullary(Operator::NotNull, "is not null"),
];

// Shared by int and long
static NUMERIC_OPERATORS: [OperatorConfig; 11] = [
    op(Operator::Eq, "equals", ValueKind::Number),
    op(Operator::Neq, "does not equal", ValueKind::Number),
    op(Operator::Gt, "greater than", ValueKind::Number),
    op(Operator::Gte, "greater than or equal", ValueKind::Number),
    op(Operator::Lt, "less than", ValueKind::Number),
    op(Operator::Lte, "less than or equal", ValueKind::Number),
    op(Operator::In, "is in", ValueKind::Multi),
    op(Operator::NotIn, "is not in", ValueKind::Multi),
    range(Operator::Between, "is between", ValueKind::Number),
    nullary(Operator::IsNull, "is null"),
    nullary(Operator::NotNull, "is not null"),
];

static DATE_OPERATORS: [OperatorConfig; 11] = [
    op(Operator::Eq, "equals", ValueKind::Date),
    op(Operator::Neq, "does not equal", ValueKind::Date),
    op(Operator::Gt, "after", ValueKind::Date),
    op(Operator::Gte, "on or after", ValueKind::Date),
    op(Operator::Lt, "before", ValueKind::Date),
    op(Operator::Lte, "on or before", ValueKind::Date),
    op(Operator::In, "is in", ValueKind::Multi),
    op(Operator::NotIn, "is not in", ValueKind::Multi),
    range(Operator::Between, "is between", ValueKind::Date),
    nullary(Operator::IsNull, "is null"),
    nullary(Operator::NotNull, "is not null"),
];

static BOOL_OPERATORS: [OperatorConfig; 4] = [
    op(Operator::Eq, "equals", ValueKind::Boolean),
    op(Operator::Neq, "does not equal", ValueKind::Boolean),
    nullary(Operator::IsNull, "is null"),
    nullary(Operator::NotNull, "is not null"),
];

/// Operators legal for a data type, in the order a UI should offer them
pub fn operators_for(data_type: DataType) -> &'static [OperatorConfig] {
    match data_type {
        DataType::String => &STRING_OPERATORS,
        DataType::Int | DataType::Long => &NUMERIC_OPERATORS,
        DataType::Date => &DATE_OPERATORS,
        DataType::Bool => &BOOL_OPERATORS,
    }
}

pub fn operator_config(data_type: DataType, operator: Operator) -> Option<&'static OperatorConfig> {
    operators_for(data_type)
        .iter()
        .find(|config| config.operator == operator)
}

pub fn default_operator(data_type: DataType) -> Operator {
    operators_for(data_type)[0].operator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_gets_equality_and_null_only() {
        let ops: Vec<Operator> = operators_for(DataType::Bool)
            .iter()
            .map(|c| c.operator)
            .collect();
        assert_eq!(
            ops,
            vec![
                Operator::Eq,
                Operator::Neq,
                Operator::IsNull,
                Operator::NotNull
            ]
        );
    }

    #[test]
    fn test_int_and_long_share_table() {
        assert_eq!(
            operators_for(DataType::Int),
            operators_for(DataType::Long)
        );
    }

    #[test]
    fn test_only_null_operators_skip_value() {
        for data_type in [
            DataType::String,
            DataType::Int,
            DataType::Date,
            DataType::Bool,
        ] {
            for config in operators_for(data_type) {
                assert_eq!(
                    config.requires_value,
                    !config.operator.takes_no_value(),
                    "{} on {}",
                    config.operator,
                    data_type
                );
                assert_eq!(
                    config.requires_second_value,
                    config.operator == Operator::Between
                );
            }
        }
    }

    #[test]
    fn test_string_has_no_ordering_or_between() {
        assert!(operator_config(DataType::String, Operator::Gt).is_none());
        assert!(operator_config(DataType::String, Operator::Between).is_none());
        assert!(operator_config(DataType::String, Operator::StartsWith).is_some());
    }

    #[test]
    fn test_date_labels() {
        let config = operator_config(DataType::Date, Operator::Lt).unwrap();
        assert_eq!(config.label, "before");
        assert_eq!(config.value_kind, ValueKind::Date);
    }

    #[test]
    fn test_default_operator_is_equality() {
        assert_eq!(default_operator(DataType::Bool), Operator::Eq);
        assert_eq!(default_operator(DataType::String), Operator::Eq);
    }
}
