//! Grid descriptors: declarative column/query metadata for listing and
//! export views.
//!
//! A descriptor only describes a view; building and running the query is the
//! job of the grid query builder in the infrastructure layer. Column order is
//! significant and is preserved in the output.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Rendering/formatting tag understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Id,
    Number,
    String,
    StringUppercase,
    Boolean,
    Date,
    JsonSorted,
    JsonSortedHorizontal,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Id => "id",
            ColumnType::Number => "number",
            ColumnType::String => "string",
            ColumnType::StringUppercase => "string_uppercase",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::JsonSorted => "json_sorted",
            ColumnType::JsonSortedHorizontal => "json_sorted_horizontal",
        }
    }

    pub fn is_textual(self) -> bool {
        matches!(self, ColumnType::String | ColumnType::StringUppercase)
    }

    pub fn is_json(self) -> bool {
        matches!(self, ColumnType::JsonSorted | ColumnType::JsonSortedHorizontal)
    }
}

impl core::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a grid view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridColumn {
    pub key: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub sortable: bool,
    pub filterable: bool,
    /// Alias-qualified field (`cfo.state`) or a computed SQL expression.
    #[serde(skip)]
    pub expression: &'static str,
    /// Selected (e.g. for row ids) but not displayed.
    pub hidden: bool,
}

impl GridColumn {
    pub const fn new(key: &'static str, column_type: ColumnType) -> Self {
        Self {
            key,
            column_type,
            sortable: false,
            filterable: false,
            expression: "",
            hidden: false,
        }
    }

    pub const fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub const fn expr(mut self, expression: &'static str) -> Self {
        self.expression = expression;
        self
    }

    /// `Some((alias, column))` when the expression is a plain
    /// alias-qualified field.
    pub fn field_ref(&self) -> Option<(&'static str, &'static str)> {
        let (alias, column) = self.expression.split_once('.')?;
        (is_ident(alias) && is_ident(column)).then_some((alias, column))
    }

    /// Aliases this column's expression reads from.
    pub fn aliases(&self) -> BTreeSet<&'static str> {
        aliases_in(self.expression)
    }
}

/// Left join from an already-available alias to another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridJoin {
    pub alias: &'static str,
    pub table: &'static str,
    /// Alias the join hangs off.
    pub from_alias: &'static str,
    /// Foreign-key column on `from_alias`.
    pub from_column: &'static str,
    /// Referenced column on the joined table.
    pub to_column: &'static str,
}

impl GridJoin {
    pub const fn new(
        alias: &'static str,
        table: &'static str,
        from_alias: &'static str,
        from_column: &'static str,
    ) -> Self {
        Self {
            alias,
            table,
            from_alias,
            from_column,
            to_column: "id",
        }
    }
}

/// A named listing view over one root table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub name: &'static str,
    pub table: &'static str,
    pub alias: &'static str,
    /// Column on some alias holding the space id, e.g. `("f", "space_id")`.
    pub space_column: Option<(&'static str, &'static str)>,
    pub joins: Vec<GridJoin>,
    pub columns: Vec<GridColumn>,
}

impl GridView {
    pub fn new(name: &'static str, table: &'static str, alias: &'static str) -> Self {
        Self {
            name,
            table,
            alias,
            space_column: None,
            joins: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Scope by `alias.space_id`.
    pub fn scoped(mut self, alias: &'static str, column: &'static str) -> Self {
        self.space_column = Some((alias, column));
        self
    }

    pub fn join(mut self, join: GridJoin) -> Self {
        self.joins.push(join);
        self
    }

    pub fn column(mut self, column: GridColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn find_column(&self, key: &str) -> Option<&GridColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn find_join(&self, alias: &str) -> Option<&GridJoin> {
        self.joins.iter().find(|j| j.alias == alias)
    }

    /// Joins needed to evaluate `columns`, in declaration order, including
    /// joins that the referenced ones hang off.
    pub fn joins_for<'a>(&self, columns: impl IntoIterator<Item = &'a GridColumn>) -> Vec<&GridJoin> {
        let mut needed: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = columns.into_iter().flat_map(|c| c.aliases()).collect();
        if let Some((alias, _)) = self.space_column {
            stack.push(alias);
        }
        while let Some(alias) = stack.pop() {
            if alias == self.alias || !needed.insert(alias) {
                continue;
            }
            if let Some(join) = self.find_join(alias) {
                stack.push(join.from_alias);
            }
        }
        self.joins
            .iter()
            .filter(|j| needed.contains(j.alias))
            .collect()
    }

    /// Structural checks: unique column keys and aliases, expressions only
    /// reference declared aliases, joins hang off earlier aliases.
    pub fn validate(&self) -> DomainResult<()> {
        let mut keys = HashSet::new();
        for column in &self.columns {
            if !keys.insert(column.key) {
                return Err(DomainError::invariant(format!(
                    "grid view '{}' declares column '{}' twice",
                    self.name, column.key
                )));
            }
            if column.expression.is_empty() {
                return Err(DomainError::invariant(format!(
                    "grid view '{}' column '{}' has no expression",
                    self.name, column.key
                )));
            }
        }

        let mut aliases = HashSet::from([self.alias]);
        for join in &self.joins {
            if !aliases.contains(join.from_alias) {
                return Err(DomainError::invariant(format!(
                    "grid view '{}' joins '{}' from undeclared alias '{}'",
                    self.name, join.alias, join.from_alias
                )));
            }
            if !aliases.insert(join.alias) {
                return Err(DomainError::invariant(format!(
                    "grid view '{}' declares alias '{}' twice",
                    self.name, join.alias
                )));
            }
        }

        for column in &self.columns {
            if let Some(alias) = column.aliases().into_iter().find(|a| !aliases.contains(a)) {
                return Err(DomainError::invariant(format!(
                    "grid view '{}' column '{}' references unknown alias '{}'",
                    self.name, column.key, alias
                )));
            }
        }
        Ok(())
    }
}

/// Entities exposing one or more grid views.
pub trait Gridded {
    /// Name of the view used when a request does not pick one.
    const DEFAULT_VIEW: &'static str = "list";

    fn grid_views() -> Vec<GridView>;

    fn grid_view(name: &str) -> Option<GridView> {
        Self::grid_views().into_iter().find(|v| v.name == name)
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Identifiers immediately followed by `.` outside string literals.
fn aliases_in(expression: &'static str) -> BTreeSet<&'static str> {
    let mut out = BTreeSet::new();
    let bytes = expression.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' {
            in_string = !in_string;
            i += 1;
            continue;
        }
        if in_string || !(b.is_ascii_alphabetic() || b == b'_') {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
        let preceded_by_dot = start > 0 && bytes[start - 1] == b'.';
        if !preceded_by_dot && i < bytes.len() && bytes[i] == b'.' {
            out.insert(&expression[start..i]);
        }
    }
    out
}
