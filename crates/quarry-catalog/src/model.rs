//! Schema model: tables, columns and foreign-key relations

use serde::{Deserialize, Serialize};

use crate::ident;

/// A table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// Position inside the primary key, 1-based. 0 when the column is not part of it.
    #[serde(default)]
    pub pk_pos: u32,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pk_pos: 0,
            data_type: None,
            nullable: true,
            comment: None,
        }
    }

    /// Mark this column as the `pos`-th primary key column.
    pub fn primary(mut self, pos: u32) -> Self {
        self.pk_pos = pos;
        self.nullable = false;
        self
    }
}

/// A catalog table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            comment: None,
        }
    }

    /// The first primary key column (`pk_pos == 1`).
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.pk_pos == 1)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| ident::same(&c.name, name))
    }
}

/// A foreign-key style relation between two tables.
///
/// `start_columns[i]` of `start_table` equals `end_columns[i]` of `end_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub name: String,
    pub start_table: String,
    pub end_table: String,
    #[serde(default)]
    pub start_columns: Vec<String>,
    #[serde(default)]
    pub end_columns: Vec<String>,
    /// Whether the relation may also be matched with start and end swapped.
    #[serde(default)]
    pub symmetric: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Relation {
    pub fn new(
        name: impl Into<String>,
        start_table: impl Into<String>,
        end_table: impl Into<String>,
        start_columns: Vec<String>,
        end_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            start_table: start_table.into(),
            end_table: end_table.into(),
            start_columns,
            end_columns,
            symmetric: false,
            comment: None,
        }
    }

    pub fn symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /// True when the relation runs from `start` to `end` as declared.
    pub fn is_aligned(&self, start: &str, end: &str) -> bool {
        ident::same(&self.start_table, start) && ident::same(&self.end_table, end)
    }

    /// True when the relation runs from `end` to `start` and is symmetric.
    pub fn is_reversed(&self, start: &str, end: &str) -> bool {
        self.symmetric && self.is_aligned(end, start)
    }

    /// Column pairs `(start column, end column)` in declaration order.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.start_columns
            .iter()
            .zip(self.end_columns.iter())
            .map(|(s, e)| (s.as_str(), e.as_str()))
    }

    /// Columns this relation uses on `table`, or `None` if the table is not an endpoint.
    pub fn columns_of(&self, table: &str) -> Option<&[String]> {
        if ident::same(&self.start_table, table) {
            Some(&self.start_columns)
        } else if ident::same(&self.end_table, table) {
            Some(&self.end_columns)
        } else {
            None
        }
    }
}

/// A complete schema document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}
