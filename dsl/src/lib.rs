//! Filter DSL for the admin console search API.
//!
//! Filter rows from the editor are compiled with [`compile`]; code that needs
//! explicit grouping builds expressions with [`dsl`]. Both emit the same grammar,
//! which [`parse_query`] reads back.

mod builder;
mod compiler;
mod operators;
mod parser;
pub mod state;
mod types;

pub use builder::{
    dsl, BoolField, DateField, DateLiteral, DslBuilder, DslNumber, NumberField, StringField,
};
pub use compiler::{compile, Compiler};
pub use operators::{default_operator, operator_config, operators_for, OperatorConfig, ValueKind};
pub use parser::{parse_query, Expr, Literal, ParseError, Predicate};
pub use types::{
    DataType, EnumOption, FieldConfig, FilterCondition, FilterValue, LogicalOperator, Operator,
};
