//! In-memory catalog with name indexes over a [`Schema`] and its [`Links`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::ident;
use crate::model::{Relation, Schema, Table};

/// Symbolic link names mapped to candidate relation names.
///
/// A link is disambiguated at resolution time by the tables it connects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(BTreeMap<String, Vec<String>>);

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(
        mut self,
        link: impl Into<String>,
        relations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.0
            .insert(link.into(), relations.into_iter().map(Into::into).collect());
        self
    }

    /// Candidate relation names for `link`.
    pub fn get(&self, link: &str) -> Option<&[String]> {
        self.0.get(link).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Immutable schema catalog shared by all translations.
#[derive(Debug, Clone)]
pub struct Catalog {
    schema: Schema,
    links: Links,
    tables: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, validating relation column arity and table names.
    pub fn new(schema: Schema, links: Links) -> CatalogResult<Self> {
        let mut tables = HashMap::with_capacity(schema.tables.len());
        for (idx, table) in schema.tables.iter().enumerate() {
            if tables.insert(ident::key(&table.name), idx).is_some() {
                return Err(CatalogError::DuplicateTable(table.name.clone()));
            }
        }

        for relation in &schema.relations {
            if relation.start_columns.len() != relation.end_columns.len() {
                return Err(CatalogError::ColumnArity {
                    relation: relation.name.clone(),
                    start: relation.start_columns.len(),
                    end: relation.end_columns.len(),
                });
            }
            for endpoint in [&relation.start_table, &relation.end_table] {
                if !tables.contains_key(&ident::key(endpoint)) {
                    warn!(
                        relation = %relation.name,
                        table = %endpoint,
                        "relation refers to a table missing from the schema"
                    );
                }
            }
        }

        debug!(
            tables = schema.tables.len(),
            relations = schema.relations.len(),
            links = links.len(),
            "catalog loaded"
        );

        Ok(Self {
            schema,
            links,
            tables,
        })
    }

    /// Parse the schema JSON and, optionally, the links JSON.
    pub fn from_json(schema: &str, links: Option<&str>) -> CatalogResult<Self> {
        let schema: Schema = serde_json::from_str(schema)?;
        let links = match links {
            Some(json) => serde_json::from_str(json)?,
            None => Links::default(),
        };
        Self::new(schema, links)
    }

    /// Read and parse catalog files from disk.
    pub fn load(schema_path: impl AsRef<Path>, links_path: Option<&Path>) -> CatalogResult<Self> {
        let schema_path = schema_path.as_ref();
        let schema = fs::read_to_string(schema_path)
            .map_err(|e| CatalogError::io(schema_path, e))?;
        let links = links_path
            .map(|path| fs::read_to_string(path).map_err(|e| CatalogError::io(path, e)))
            .transpose()?;
        Self::from_json(&schema, links.as_deref())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn tables(&self) -> &[Table] {
        &self.schema.tables
    }

    pub fn relations(&self) -> &[Relation] {
        &self.schema.relations
    }

    /// Look a table up by name, ignoring quotes and case.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .get(&ident::key(name))
            .map(|&idx| &self.schema.tables[idx])
    }

    pub fn is_table_in_database(&self, name: &str) -> bool {
        self.tables.contains_key(&ident::key(name))
    }

    /// Relations with the given name, in declaration order.
    pub fn relations_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Relation> {
        self.schema
            .relations
            .iter()
            .filter(move |r| ident::same(&r.name, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn schema() -> Schema {
        Schema {
            name: Some("shop".into()),
            tables: vec![
                Table::new("orders", vec![Column::new("id").primary(1), Column::new("customer_id")]),
                Table::new("customers", vec![Column::new("id").primary(1)]),
            ],
            relations: vec![Relation::new(
                "placed",
                "orders",
                "customers",
                vec!["customer_id".into()],
                vec!["id".into()],
            )],
        }
    }

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let catalog = Catalog::new(schema(), Links::new()).unwrap();
        assert!(catalog.is_table_in_database("\"ORDERS\""));
        assert_eq!(catalog.table("Customers").unwrap().name, "customers");
        assert!(catalog.table("products").is_none());
    }

    #[test]
    fn test_rejects_mismatched_relation_columns() {
        let mut schema = schema();
        schema.relations[0].end_columns.push("extra".into());
        let err = Catalog::new(schema, Links::new()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::ColumnArity { start: 1, end: 2, .. }
        ));
    }

    #[test]
    fn test_rejects_duplicate_tables() {
        let mut schema = schema();
        schema.tables.push(Table::new("Orders", vec![]));
        let err = Catalog::new(schema, Links::new()).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTable(name) if name == "Orders"));
    }

    #[test]
    fn test_links_from_json() {
        let catalog = Catalog::from_json(
            &serde_json::to_string(&schema()).unwrap(),
            Some(r#"{ "buys": ["placed"] }"#),
        )
        .unwrap();
        assert_eq!(catalog.links().get("buys").unwrap(), ["placed".to_string()]);
        assert_eq!(catalog.relations_named("PLACED").count(), 1);
    }
}
