use super::compiler::quote;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::fmt::Display;

const OPEN_GROUP: &str = "(";
const CLOSE_GROUP: &str = ")";

/// Fluent builder for DSL expressions.
///
/// ```
/// use console_dsl::dsl;
///
/// let query = dsl()
///     .string("name")
///     .contains("acme")
///     .and()
///     .group(|b| {
///         b.number("age").gte(18).or().bool("verified").eq(true);
///     })
///     .build();
/// assert_eq!(
///     query,
///     r#"name @contains("acme") AND ( age >= 18 OR verified == true )"#
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct DslBuilder {
    parts: Vec<String>,
}

pub fn dsl() -> DslBuilder {
    DslBuilder::new()
}

impl DslBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(&mut self, field: &str) -> StringField<'_> {
        StringField(FieldScope::new(self, field))
    }

    /// Int or long field
    pub fn number(&mut self, field: &str) -> NumberField<'_> {
        NumberField(FieldScope::new(self, field))
    }

    pub fn date(&mut self, field: &str) -> DateField<'_> {
        DateField(FieldScope::new(self, field))
    }

    pub fn bool(&mut self, field: &str) -> BoolField<'_> {
        BoolField(FieldScope::new(self, field))
    }

    pub fn and(&mut self) -> &mut Self {
        self.connector("AND")
    }

    pub fn or(&mut self) -> &mut Self {
        self.connector("OR")
    }

    /// Wraps whatever `build_group` appends in parentheses
    pub fn group<F>(&mut self, build_group: F) -> &mut Self
    where
        F: FnOnce(&mut DslBuilder),
    {
        self.parts.push(OPEN_GROUP.to_string());
        build_group(self);
        self.parts.push(CLOSE_GROUP.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Joins the collected tokens with single spaces. Adjacent or trailing
    /// connectors are left as the caller wrote them.
    pub fn build(&self) -> String {
        self.parts.join(" ")
    }

    fn connector(&mut self, keyword: &str) -> &mut Self {
        // Never lead an expression or a group with a connector
        if self.parts.last().is_some_and(|last| last != OPEN_GROUP) {
            self.parts.push(keyword.to_string());
        }
        self
    }
}

struct FieldScope<'a> {
    builder: &'a mut DslBuilder,
    field: String,
}

impl<'a> FieldScope<'a> {
    fn new(builder: &'a mut DslBuilder, field: &str) -> Self {
        Self {
            builder,
            field: field.to_string(),
        }
    }

    fn infix(self, operator: &str, literal: String) -> &'a mut DslBuilder {
        let part = format!("{} {} {}", self.field, operator, literal);
        self.push(part)
    }

    fn call(self, function: &str, args: &[String]) -> &'a mut DslBuilder {
        let part = format!("{} @{}({})", self.field, function, args.join(", "));
        self.push(part)
    }

    fn set(self, function: &str, literals: Vec<String>) -> &'a mut DslBuilder {
        if literals.is_empty() {
            return self.builder;
        }
        self.call(function, &literals)
    }

    fn skip(self) -> &'a mut DslBuilder {
        self.builder
    }

    fn push(self, part: String) -> &'a mut DslBuilder {
        self.builder.parts.push(part);
        self.builder
    }
}

/// Numeric literal accepted by [`NumberField`]
pub trait DslNumber: Copy + Display {
    /// `None` for NaN and infinities, which the grammar has no literal for
    fn finite_literal(&self) -> Option<String> {
        Some(self.to_string())
    }
}

macro_rules! dsl_integer {
    ($($t:ty),*) => { $(impl DslNumber for $t {})* };
}

macro_rules! dsl_float {
    ($($t:ty),*) => {
        $(impl DslNumber for $t {
            fn finite_literal(&self) -> Option<String> {
                self.is_finite().then(|| self.to_string())
            }
        })*
    };
}

dsl_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);
dsl_float!(f32, f64);

/// Date literal accepted by [`DateField`], rendered quoted
pub trait DateLiteral {
    fn to_literal(&self) -> String;
}

impl DateLiteral for &str {
    fn to_literal(&self) -> String {
        (*self).to_string()
    }
}

impl DateLiteral for String {
    fn to_literal(&self) -> String {
        self.clone()
    }
}

impl DateLiteral for NaiveDate {
    fn to_literal(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl DateLiteral for DateTime<Utc> {
    fn to_literal(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

pub struct StringField<'a>(FieldScope<'a>);

impl<'a> StringField<'a> {
    pub fn eq(self, value: &str) -> &'a mut DslBuilder {
        self.0.infix("==", quote(value))
    }

    pub fn neq(self, value: &str) -> &'a mut DslBuilder {
        self.0.infix("!=", quote(value))
    }

    pub fn contains(self, value: &str) -> &'a mut DslBuilder {
        self.0.call("contains", &[quote(value)])
    }

    pub fn ncontains(self, value: &str) -> &'a mut DslBuilder {
        self.0.call("ncontains", &[quote(value)])
    }

    pub fn startswith(self, value: &str) -> &'a mut DslBuilder {
        self.0.call("startswith", &[quote(value)])
    }

    pub fn endswith(self, value: &str) -> &'a mut DslBuilder {
        self.0.call("endswith", &[quote(value)])
    }

    /// No-op when `values` is empty
    pub fn in_<S: AsRef<str>>(self, values: &[S]) -> &'a mut DslBuilder {
        self.0
            .set("in", values.iter().map(|v| quote(v.as_ref())).collect())
    }

    /// No-op when `values` is empty
    pub fn nin<S: AsRef<str>>(self, values: &[S]) -> &'a mut DslBuilder {
        self.0
            .set("nin", values.iter().map(|v| quote(v.as_ref())).collect())
    }

    pub fn is_null(self) -> &'a mut DslBuilder {
        self.0.call("isnull", &[])
    }

    pub fn not_null(self) -> &'a mut DslBuilder {
        self.0.call("notnull", &[])
    }
}

/// Numeric comparisons. A NaN or infinite operand leaves the builder
/// unchanged, like an empty set does.
pub struct NumberField<'a>(FieldScope<'a>);

impl<'a> NumberField<'a> {
    pub fn eq<N: DslNumber>(self, value: N) -> &'a mut DslBuilder {
        self.compare("==", value)
    }

    pub fn neq<N: DslNumber>(self, value: N) -> &'a mut DslBuilder {
        self.compare("!=", value)
    }

    pub fn gt<N: DslNumber>(self, value: N) -> &'a mut DslBuilder {
        self.compare(">", value)
    }

    pub fn gte<N: DslNumber>(self, value: N) -> &'a mut DslBuilder {
        self.compare(">=", value)
    }

    pub fn lt<N: DslNumber>(self, value: N) -> &'a mut DslBuilder {
        self.compare("<", value)
    }

    pub fn lte<N: DslNumber>(self, value: N) -> &'a mut DslBuilder {
        self.compare("<=", value)
    }

    pub fn between<N: DslNumber>(self, min: N, max: N) -> &'a mut DslBuilder {
        match (min.finite_literal(), max.finite_literal()) {
            (Some(min), Some(max)) => self.0.call("between", &[min, max]),
            _ => self.0.skip(),
        }
    }

    /// Non-finite values are dropped from the set
    pub fn in_<N: DslNumber>(self, values: &[N]) -> &'a mut DslBuilder {
        self.0
            .set("in", values.iter().filter_map(DslNumber::finite_literal).collect())
    }

    pub fn nin<N: DslNumber>(self, values: &[N]) -> &'a mut DslBuilder {
        self.0
            .set("nin", values.iter().filter_map(DslNumber::finite_literal).collect())
    }

    pub fn is_null(self) -> &'a mut DslBuilder {
        self.0.call("isnull", &[])
    }

    pub fn not_null(self) -> &'a mut DslBuilder {
        self.0.call("notnull", &[])
    }

    fn compare<N: DslNumber>(self, operator: &str, value: N) -> &'a mut DslBuilder {
        match value.finite_literal() {
            Some(literal) => self.0.infix(operator, literal),
            None => self.0.skip(),
        }
    }
}

pub struct DateField<'a>(FieldScope<'a>);

impl<'a> DateField<'a> {
    pub fn eq<D: DateLiteral>(self, value: D) -> &'a mut DslBuilder {
        self.0.infix("==", quote(&value.to_literal()))
    }

    pub fn neq<D: DateLiteral>(self, value: D) -> &'a mut DslBuilder {
        self.0.infix("!=", quote(&value.to_literal()))
    }

    /// After
    pub fn gt<D: DateLiteral>(self, value: D) -> &'a mut DslBuilder {
        self.0.infix(">", quote(&value.to_literal()))
    }

    /// On or after
    pub fn gte<D: DateLiteral>(self, value: D) -> &'a mut DslBuilder {
        self.0.infix(">=", quote(&value.to_literal()))
    }

    /// Before
    pub fn lt<D: DateLiteral>(self, value: D) -> &'a mut DslBuilder {
        self.0.infix("<", quote(&value.to_literal()))
    }

    /// On or before
    pub fn lte<D: DateLiteral>(self, value: D) -> &'a mut DslBuilder {
        self.0.infix("<=", quote(&value.to_literal()))
    }

    pub fn between<D: DateLiteral>(self, start: D, end: D) -> &'a mut DslBuilder {
        self.0.call(
            "between",
            &[quote(&start.to_literal()), quote(&end.to_literal())],
        )
    }

    pub fn in_<D: DateLiteral>(self, values: &[D]) -> &'a mut DslBuilder {
        self.0.set(
            "in",
            values.iter().map(|v| quote(&v.to_literal())).collect(),
        )
    }

    pub fn nin<D: DateLiteral>(self, values: &[D]) -> &'a mut DslBuilder {
        self.0.set(
            "nin",
            values.iter().map(|v| quote(&v.to_literal())).collect(),
        )
    }

    pub fn is_null(self) -> &'a mut DslBuilder {
        self.0.call("isnull", &[])
    }

    pub fn not_null(self) -> &'a mut DslBuilder {
        self.0.call("notnull", &[])
    }
}

pub struct BoolField<'a>(FieldScope<'a>);

impl<'a> BoolField<'a> {
    pub fn eq(self, value: bool) -> &'a mut DslBuilder {
        self.0.infix("==", value.to_string())
    }

    pub fn neq(self, value: bool) -> &'a mut DslBuilder {
        self.0.infix("!=", value.to_string())
    }

    pub fn is_null(self) -> &'a mut DslBuilder {
        self.0.call("isnull", &[])
    }

    pub fn not_null(self) -> &'a mut DslBuilder {
        self.0.call("notnull", &[])
    }
}
