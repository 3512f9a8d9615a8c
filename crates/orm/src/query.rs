use anyhow::{Result, bail};
use prism_sql::Value;
use sea_query::backend::{
    EscapeBuilder, OperLeftAssocDecider, PrecedenceDecider, QuotedBuilder, TableRefBuilder,
};
use sea_query::prepare::SqlWriter;
use sea_query::{BinOper, Oper, Quote, SimpleExpr, SubQueryStatement, Values};

/// Rendered SQL plus its bound parameters, ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Native SQL text.
    pub sql: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

/// ``SeaQuery`` backend parameterized by quote and placeholder style.
///
/// Use [`crate::Dialect::query_builder`] to obtain one for a dialect.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    pub quote: Quote,
    pub placeholder: &'static str, // "?" or "$"
    pub numbered: bool,            // false for "?", true for "$1, $2, ..."
}

impl Default for QueryBuilder {
    fn default() -> Self {
        crate::Dialect::default().query_builder()
    }
}

impl QuotedBuilder for QueryBuilder {
    fn quote(&self) -> Quote {
        self.quote
    }
}

impl EscapeBuilder for QueryBuilder {}

impl TableRefBuilder for QueryBuilder {}

impl OperLeftAssocDecider for QueryBuilder {
    fn well_known_left_associative(&self, op: &BinOper) -> bool {
        // Copied from sea-query 0.32.7 backend/query_builder.rs `common_well_known_left_associative`
        matches!(
            op,
            BinOper::And | BinOper::Or | BinOper::Add | BinOper::Sub | BinOper::Mul | BinOper::Mod
        )
    }
}

impl PrecedenceDecider for QueryBuilder {
    fn inner_expr_well_known_greater_precedence(
        &self, _inner: &SimpleExpr, _outer_oper: &Oper,
    ) -> bool {
        // Conservative approach that forces parentheses
        false
    }
}

impl sea_query::backend::QueryBuilder for QueryBuilder {
    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        match query {
            SubQueryStatement::SelectStatement(s) => self.prepare_select_statement(s, sql),
            SubQueryStatement::InsertStatement(s) => self.prepare_insert_statement(s, sql),
            SubQueryStatement::UpdateStatement(s) => self.prepare_update_statement(s, sql),
            SubQueryStatement::DeleteStatement(s) => self.prepare_delete_statement(s, sql),
            SubQueryStatement::WithStatement(s) => self.prepare_with_query(s, sql),
        }
    }

    fn prepare_value(&self, value: &sea_query::Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self);
    }

    fn placeholder(&self) -> (&str, bool) {
        (self.placeholder, self.numbered)
    }
}

/// Converts a prism value into a bindable ``SeaQuery`` value.
///
/// # Errors
///
/// Collections and views cannot be bound as parameters.
pub fn to_sea_value(value: Value) -> Result<sea_query::Value> {
    let value = match value {
        Value::Null => sea_query::Value::String(None),
        Value::Bool(v) => sea_query::Value::Bool(Some(v)),
        Value::Int(v) => sea_query::Value::BigInt(Some(v)),
        Value::Double(v) => sea_query::Value::Double(Some(v)),
        Value::Text(v) => sea_query::Value::String(Some(Box::new(v))),
        Value::Bytes(v) => sea_query::Value::Bytes(Some(Box::new(v))),
        Value::Timestamp(v) => sea_query::Value::ChronoDateTimeUtc(Some(Box::new(v))),
        Value::Collection(_) | Value::View(_) => {
            bail!("materialized collections and views cannot be bound as parameters")
        }
    };
    Ok(value)
}

pub(crate) fn from_sea_values(values: Values) -> Result<Vec<Value>> {
    values.into_iter().map(from_sea_value).collect()
}

#[allow(clippy::cast_possible_wrap)]
fn from_sea_value(value: sea_query::Value) -> Result<Value> {
    let value = match value {
        sea_query::Value::Bool(v) => v.into(),
        sea_query::Value::TinyInt(v) => v.map(i64::from).into(),
        sea_query::Value::SmallInt(v) => v.map(i64::from).into(),
        sea_query::Value::Int(v) => v.map(i64::from).into(),
        sea_query::Value::BigInt(v) => v.into(),
        sea_query::Value::TinyUnsigned(v) => v.map(i64::from).into(),
        sea_query::Value::SmallUnsigned(v) => v.map(i64::from).into(),
        sea_query::Value::Unsigned(v) => v.map(i64::from).into(),
        sea_query::Value::BigUnsigned(v) => v.map(|value| value as i64).into(),
        sea_query::Value::Float(v) => v.map(f64::from).into(),
        sea_query::Value::Double(v) => v.into(),
        sea_query::Value::String(v) => v.map(|value| *value).into(),
        sea_query::Value::Char(v) => v.map(|ch| ch.to_string()).into(),
        sea_query::Value::Bytes(v) => v.map(|bytes| *bytes).into(),
        sea_query::Value::ChronoDateTimeUtc(v) => v.map(|value| *value).into(),
        sea_query::Value::ChronoDateTime(v) => v.map(|value| value.and_utc()).into(),
        sea_query::Value::ChronoDate(v) => v.map(|value| value.to_string()).into(),
        sea_query::Value::ChronoTime(v) => v.map(|value| value.to_string()).into(),
        _ => {
            bail!("unsupported values require explicit conversion before building the query")
        }
    };
    Ok(value)
}

/// Renders a statement for `dialect`, converting its parameters.
pub(crate) fn render<S>(statement: &S, dialect: crate::Dialect) -> Result<Query>
where
    S: RenderStatement,
{
    let (sql, values) = statement.render(dialect.query_builder());
    let params = from_sea_values(values)?;
    Ok(Query { sql, params })
}

/// ``SeaQuery`` statements that render through a [`QueryBuilder`].
pub(crate) trait RenderStatement {
    fn render(&self, builder: QueryBuilder) -> (String, Values);
}

macro_rules! render_statement {
    ($($statement:ty),*) => {
        $(
            impl RenderStatement for $statement {
                fn render(&self, builder: QueryBuilder) -> (String, Values) {
                    self.build(builder)
                }
            }
        )*
    };
}

render_statement!(
    sea_query::SelectStatement,
    sea_query::InsertStatement,
    sea_query::UpdateStatement,
    sea_query::DeleteStatement
);
