//! Grid query builder.
//!
//! Turns a [`GridView`] descriptor plus a client [`GridQuery`] into a
//! parameterized Postgres query, or evaluates the same query over in-memory
//! rows. Both paths share the validation in [`check_query`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use seniorcare_core::{ColumnType, GridColumn, GridView, Row, SpaceId};

/// Pagination parameters for grid queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    /// 0-based.
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// Clamp a deserialized value to the allowed range.
    pub fn clamped(self) -> Self {
        Self::new(Some(self.limit), Some(self.offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equal,
    NotEqual,
    Like,
    Greater,
    Less,
    Between,
    Empty,
    NotEmpty,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Equal => "equal",
            FilterOp::NotEqual => "not_equal",
            FilterOp::Like => "like",
            FilterOp::Greater => "greater",
            FilterOp::Less => "less",
            FilterOp::Between => "between",
            FilterOp::Empty => "empty",
            FilterOp::NotEmpty => "not_empty",
        }
    }

    /// Whether the operator makes sense for a column type.
    pub fn applies_to(self, column_type: ColumnType) -> bool {
        match self {
            FilterOp::Empty | FilterOp::NotEmpty => true,
            FilterOp::Equal | FilterOp::NotEqual => !column_type.is_json(),
            FilterOp::Like => column_type.is_textual(),
            FilterOp::Greater | FilterOp::Less | FilterOp::Between => {
                matches!(column_type, ColumnType::Number | ColumnType::Date)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFilter {
    pub key: String,
    pub op: FilterOp,
    /// Scalar for most operators, `[low, high]` for `between`, absent for
    /// `empty`/`not_empty`.
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSort {
    pub key: String,
    #[serde(default)]
    pub direction: SortDirection,
}

fn default_view() -> String {
    "list".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridQuery {
    #[serde(default = "default_view")]
    pub view: String,
    #[serde(default)]
    pub filters: Vec<GridFilter>,
    #[serde(default)]
    pub sort: Vec<GridSort>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl Default for GridQuery {
    fn default() -> Self {
        Self {
            view: default_view(),
            filters: Vec::new(),
            sort: Vec::new(),
            pagination: Pagination::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("unknown grid view '{0}'")]
    UnknownView(String),

    #[error("unknown grid column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' is not sortable")]
    NotSortable(String),

    #[error("column '{0}' is not filterable")]
    NotFilterable(String),

    #[error("operator '{op}' does not apply to {column_type} column '{key}'")]
    InvalidOperator {
        key: String,
        op: &'static str,
        column_type: ColumnType,
    },

    #[error("invalid value for column '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("grid view '{view}' is malformed: {reason}")]
    MalformedView { view: String, reason: String },
}

/// One page of grid rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPage {
    pub columns: Vec<GridColumn>,
    /// Rows keyed by column key.
    pub rows: Vec<Row>,
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl GridPage {
    pub fn new(columns: Vec<GridColumn>, rows: Vec<Row>, total: u64, pagination: Pagination) -> Self {
        let has_more = u64::from(pagination.offset) + (rows.len() as u64) < total;
        Self {
            columns,
            rows,
            total,
            pagination,
            has_more,
        }
    }
}

/// A filter resolved against its column.
#[derive(Debug, Clone)]
struct Predicate<'a> {
    column: &'a GridColumn,
    op: FilterOp,
    values: Vec<Value>,
}

/// Sort key resolved against its column.
#[derive(Debug, Clone, Copy)]
struct Order<'a> {
    column: &'a GridColumn,
    direction: SortDirection,
}

/// Validated query parts.
struct Checked<'a> {
    predicates: Vec<Predicate<'a>>,
    orders: Vec<Order<'a>>,
    pagination: Pagination,
}

fn check_query<'a>(view: &'a GridView, query: &GridQuery) -> Result<Checked<'a>, GridError> {
    view.validate().map_err(|e| GridError::MalformedView {
        view: view.name.to_string(),
        reason: e.to_string(),
    })?;

    let mut predicates = Vec::with_capacity(query.filters.len());
    for filter in &query.filters {
        let column = view
            .find_column(&filter.key)
            .ok_or_else(|| GridError::UnknownColumn(filter.key.clone()))?;
        if !column.filterable {
            return Err(GridError::NotFilterable(filter.key.clone()));
        }
        if !filter.op.applies_to(column.column_type) {
            return Err(GridError::InvalidOperator {
                key: filter.key.clone(),
                op: filter.op.as_str(),
                column_type: column.column_type,
            });
        }
        let values = filter_values(column, filter)?;
        predicates.push(Predicate {
            column,
            op: filter.op,
            values,
        });
    }

    let mut orders = Vec::with_capacity(query.sort.len().max(1));
    for sort in &query.sort {
        let column = view
            .find_column(&sort.key)
            .ok_or_else(|| GridError::UnknownColumn(sort.key.clone()))?;
        if !column.sortable {
            return Err(GridError::NotSortable(sort.key.clone()));
        }
        orders.push(Order {
            column,
            direction: sort.direction,
        });
    }
    if orders.is_empty() {
        if let Some(column) = view.columns.iter().find(|c| c.sortable) {
            orders.push(Order {
                column,
                direction: SortDirection::Asc,
            });
        }
    }

    Ok(Checked {
        predicates,
        orders,
        pagination: query.pagination.clamped(),
    })
}

fn filter_values(column: &GridColumn, filter: &GridFilter) -> Result<Vec<Value>, GridError> {
    let invalid = |reason: &str| GridError::InvalidValue {
        key: filter.key.clone(),
        reason: reason.to_string(),
    };
    let values = match filter.op {
        FilterOp::Empty | FilterOp::NotEmpty => return Ok(Vec::new()),
        FilterOp::Between => match &filter.value {
            Value::Array(items) if items.len() == 2 => items.clone(),
            _ => return Err(invalid("between expects [low, high]")),
        },
        _ => vec![filter.value.clone()],
    };
    for value in &values {
        check_scalar(column.column_type, value).map_err(|reason| invalid(&reason))?;
    }
    Ok(values)
}

fn check_scalar(column_type: ColumnType, value: &Value) -> Result<(), String> {
    match (column_type, value) {
        (_, Value::Null) => Err("value is required".into()),
        (ColumnType::Number, _) if as_number(value).is_some() => Ok(()),
        (ColumnType::Number, _) => Err("expected a number".into()),
        (ColumnType::Boolean, Value::Bool(_)) => Ok(()),
        (ColumnType::Boolean, _) => Err("expected true or false".into()),
        (ColumnType::Date, Value::String(s)) if parse_date(s).is_some() => Ok(()),
        (ColumnType::Date, _) => Err("expected a date (YYYY-MM-DD)".into()),
        (ColumnType::Id, Value::String(s)) if Uuid::parse_str(s).is_ok() => Ok(()),
        (ColumnType::Id, _) => Err("expected a uuid".into()),
        (_, Value::String(_) | Value::Number(_) | Value::Bool(_)) => Ok(()),
        _ => Err("expected a scalar".into()),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    s.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// A generated statement with its text parameters (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub count_sql: String,
    pub params: Vec<String>,
}

fn cast_for(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Id => "uuid",
        ColumnType::Number => "numeric",
        ColumnType::Boolean => "boolean",
        ColumnType::Date => "date",
        ColumnType::String
        | ColumnType::StringUppercase
        | ColumnType::JsonSorted
        | ColumnType::JsonSortedHorizontal => "text",
    }
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render `view` + `query` as a Postgres statement scoped to `space`.
pub fn build_sql(
    view: &GridView,
    query: &GridQuery,
    space: Option<SpaceId>,
) -> Result<BuiltQuery, GridError> {
    let checked = check_query(view, query)?;
    let mut params = Vec::new();

    let select: Vec<String> = view
        .columns
        .iter()
        .map(|c| format!("{} AS \"{}\"", c.expression, c.key))
        .collect();

    let mut from = format!("FROM \"{}\" AS \"{}\"", view.table, view.alias);
    for join in view.joins_for(view.columns.iter()) {
        from.push_str(&format!(
            " LEFT JOIN \"{}\" AS \"{}\" ON \"{}\".\"{}\" = \"{}\".\"{}\"",
            join.table, join.alias, join.alias, join.to_column, join.from_alias, join.from_column
        ));
    }

    let mut conditions = Vec::new();
    if let (Some((alias, column)), Some(space)) = (view.space_column, space) {
        params.push(space.to_string());
        conditions.push(format!("\"{alias}\".\"{column}\" = ${}::uuid", params.len()));
    }
    for predicate in &checked.predicates {
        conditions.push(render_predicate(predicate, &mut params));
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let order_by = if checked.orders.is_empty() {
        String::new()
    } else {
        let keys: Vec<String> = checked
            .orders
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{} {dir}", o.column.expression)
            })
            .collect();
        format!(" ORDER BY {}", keys.join(", "))
    };

    let sql = format!(
        "SELECT {} {from}{where_clause}{order_by} LIMIT {} OFFSET {}",
        select.join(", "),
        checked.pagination.limit,
        checked.pagination.offset
    );
    let count_sql = format!("SELECT COUNT(*) AS total {from}{where_clause}");
    Ok(BuiltQuery {
        sql,
        count_sql,
        params,
    })
}

fn render_predicate(predicate: &Predicate<'_>, params: &mut Vec<String>) -> String {
    let expr = predicate.column.expression;
    let cast = cast_for(predicate.column.column_type);
    let values = &predicate.values;
    match predicate.op {
        FilterOp::Equal => format!("{expr} = {}", bind(params, &values[0], cast)),
        FilterOp::NotEqual => {
            format!("{expr} IS DISTINCT FROM {}", bind(params, &values[0], cast))
        }
        FilterOp::Greater => format!("{expr} > {}", bind(params, &values[0], cast)),
        FilterOp::Less => format!("{expr} < {}", bind(params, &values[0], cast)),
        FilterOp::Between => {
            let low = bind(params, &values[0], cast);
            let high = bind(params, &values[1], cast);
            format!("{expr} BETWEEN {low} AND {high}")
        }
        FilterOp::Like => {
            params.push(format!("%{}%", escape_like(&param_text(&values[0]))));
            format!("({expr})::text ILIKE ${}", params.len())
        }
        FilterOp::Empty => format!("({expr} IS NULL OR ({expr})::text = '')"),
        FilterOp::NotEmpty => format!("({expr} IS NOT NULL AND ({expr})::text <> '')"),
    }
}

fn bind(params: &mut Vec<String>, value: &Value, cast: &str) -> String {
    params.push(param_text(value));
    format!("${}::{cast}", params.len())
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Rows of every table, keyed by id.
pub type Tables = HashMap<&'static str, BTreeMap<Uuid, Row>>;

/// Evaluate `query` over in-memory tables.
///
/// Plain `alias.column` expressions are resolved through the view's joins;
/// computed expressions evaluate to null.
pub fn evaluate(
    view: &GridView,
    query: &GridQuery,
    space: Option<SpaceId>,
    tables: &Tables,
) -> Result<GridPage, GridError> {
    let checked = check_query(view, query)?;
    let joins = view.joins_for(view.columns.iter());
    let space_text = space.map(|s| s.to_string());

    let mut rows: Vec<Row> = Vec::new();
    let empty = BTreeMap::new();
    for root in tables.get(view.table).unwrap_or(&empty).values() {
        let mut context: HashMap<&str, &Row> = HashMap::from([(view.alias, root)]);
        for join in &joins {
            let target = context
                .get(join.from_alias)
                .and_then(|row| row.get(join.from_column))
                .and_then(Value::as_str)
                .and_then(|id| Uuid::parse_str(id).ok())
                .and_then(|id| tables.get(join.table)?.get(&id));
            if let Some(target) = target {
                context.insert(join.alias, target);
            }
        }

        if let (Some((alias, column)), Some(space)) = (view.space_column, &space_text) {
            let owner = context
                .get(alias)
                .and_then(|row| row.get(column))
                .and_then(Value::as_str);
            if owner != Some(space.as_str()) {
                continue;
            }
        }

        let mut out = Row::new();
        for column in &view.columns {
            let value = column
                .field_ref()
                .and_then(|(alias, field)| context.get(alias)?.get(field).cloned())
                .unwrap_or(Value::Null);
            out.insert(column.key.to_string(), value);
        }
        if checked.predicates.iter().all(|p| matches_predicate(p, &out)) {
            rows.push(out);
        }
    }

    rows.sort_by(|a, b| {
        for order in &checked.orders {
            let key = order.column.key;
            let ord = compare_nullable(
                order.column.column_type,
                a.get(key).unwrap_or(&Value::Null),
                b.get(key).unwrap_or(&Value::Null),
            );
            let ord = match order.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let total = rows.len() as u64;
    let pagination = checked.pagination;
    let page: Vec<Row> = rows
        .into_iter()
        .skip(pagination.offset as usize)
        .take(pagination.limit as usize)
        .collect();
    Ok(GridPage::new(view.columns.clone(), page, total, pagination))
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn matches_predicate(predicate: &Predicate<'_>, row: &Row) -> bool {
    let value = row.get(predicate.column.key).unwrap_or(&Value::Null);
    let column_type = predicate.column.column_type;
    let cmp = |other: &Value| compare(column_type, value, other);
    match predicate.op {
        FilterOp::Empty => is_empty_value(value),
        FilterOp::NotEmpty => !is_empty_value(value),
        FilterOp::Equal => cmp(&predicate.values[0]) == Some(Ordering::Equal),
        FilterOp::NotEqual => cmp(&predicate.values[0]) != Some(Ordering::Equal),
        FilterOp::Greater => cmp(&predicate.values[0]) == Some(Ordering::Greater),
        FilterOp::Less => cmp(&predicate.values[0]) == Some(Ordering::Less),
        FilterOp::Between => {
            matches!(cmp(&predicate.values[0]), Some(Ordering::Greater | Ordering::Equal))
                && matches!(cmp(&predicate.values[1]), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOp::Like => match value {
            Value::Null => false,
            other => param_text(other)
                .to_lowercase()
                .contains(&param_text(&predicate.values[0]).to_lowercase()),
        },
    }
}

/// Numbers arrive as JSON numbers or, for `NUMERIC` columns, as strings.
fn as_number(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Typed comparison; `None` when either side is null or not comparable.
fn compare(column_type: ColumnType, a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    match column_type {
        ColumnType::Number => Some(as_number(a)?.cmp(&as_number(b)?)),
        ColumnType::Date => Some(parse_date(a.as_str()?)?.cmp(&parse_date(b.as_str()?)?)),
        ColumnType::Boolean => Some(a.as_bool()?.cmp(&b.as_bool()?)),
        ColumnType::Id => {
            let a = Uuid::parse_str(a.as_str()?).ok()?;
            let b = Uuid::parse_str(b.as_str()?).ok()?;
            Some(a.cmp(&b))
        }
        _ => Some(param_text(a).cmp(&param_text(b))),
    }
}

/// Nulls sort after every value, as in an ascending Postgres sort.
fn compare_nullable(column_type: ColumnType, a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare(column_type, a, b).unwrap_or(Ordering::Equal),
    }
}
