use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::Field;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Already Exists: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid identifier `{0}`, expected `project.dataset.table`")]
    InvalidIdentifier(String),
    #[error("Cannot access catalog file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON catalog {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub dataset: String,
    pub table_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub kind: TableKind,
    /// `None` when the catalog does not know the size of the table.
    pub num_rows: Option<u64>,
}

/// Fully qualified `project.dataset.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl ViewId {
    pub fn new(project: &str, dataset: &str, table: &str) -> Self {
        Self {
            project: project.to_owned(),
            dataset: dataset.to_owned(),
            table: table.to_owned(),
        }
    }
}

impl Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

impl FromStr for ViewId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(ViewId::new(project, dataset, table))
            }
            _ => Err(CatalogError::InvalidIdentifier(s.to_owned())),
        }
    }
}

/// The service holding datasets, table schemas and views.
pub trait Catalog {
    /// Project that tables are read from and views are created in.
    fn current_project(&self) -> &str;

    fn list_tables(&self, dataset: &str) -> Result<Vec<TableRef>, CatalogError>;

    fn get_table_schema(&self, dataset: &str, table: &str) -> Result<Vec<Field>, CatalogError>;

    fn table_info(&self, _dataset: &str, _table: &str) -> Result<TableInfo, CatalogError> {
        Ok(TableInfo {
            kind: TableKind::Table,
            num_rows: None,
        })
    }

    /// Creates a view defined by `query`, failing with [`CatalogError::Conflict`]
    /// when `view_id` already exists.
    fn create_view(&mut self, view_id: &ViewId, query: &str) -> Result<(), CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    Table {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        num_rows: Option<u64>,
        #[serde(default)]
        schema: Vec<Field>,
    },
    View {
        query: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        schema: Vec<Field>,
    },
}

impl CatalogEntry {
    fn kind(&self) -> TableKind {
        match self {
            CatalogEntry::Table { .. } => TableKind::Table,
            CatalogEntry::View { .. } => TableKind::View,
        }
    }
}

/// A catalog kept in a JSON file.
///
/// ```json
/// {
///   "project": "my-project",
///   "datasets": {
///     "sales": {
///       "orders": {"kind": "table", "num_rows": 10, "schema": [{"name": "id", "type": "INTEGER"}]}
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCatalog {
    project: String,
    #[serde(default)]
    datasets: IndexMap<String, IndexMap<String, CatalogEntry>>,
}

impl JsonCatalog {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_owned(),
            datasets: IndexMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_owned(),
            source,
        })?;
        let catalog: JsonCatalog =
            serde_json::from_str(&content).map_err(|source| CatalogError::Json {
                path: path.to_owned(),
                source,
            })?;
        log::debug!(
            "Loaded catalog of project {} with {} datasets from {}",
            catalog.project,
            catalog.datasets.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| CatalogError::Json {
            path: path.to_owned(),
            source,
        })?;
        std::fs::write(path, content).map_err(|source| CatalogError::Io {
            path: path.to_owned(),
            source,
        })
    }

    pub fn set_project(&mut self, project: &str) {
        self.project = project.to_owned();
    }

    pub fn add_table(
        &mut self,
        dataset: &str,
        table: &str,
        schema: Vec<Field>,
        num_rows: Option<u64>,
    ) {
        self.datasets
            .entry(dataset.to_owned())
            .or_default()
            .insert(table.to_owned(), CatalogEntry::Table { num_rows, schema });
    }

    pub fn entry(&self, dataset: &str, table: &str) -> Option<&CatalogEntry> {
        self.datasets.get(dataset)?.get(table)
    }

    pub fn view_query(&self, dataset: &str, view: &str) -> Option<&str> {
        match self.entry(dataset, view)? {
            CatalogEntry::View { query, .. } => Some(query.as_str()),
            CatalogEntry::Table { .. } => None,
        }
    }

    fn dataset(&self, dataset: &str) -> Result<&IndexMap<String, CatalogEntry>, CatalogError> {
        self.datasets.get(dataset).ok_or_else(|| {
            CatalogError::NotFound(format!("Dataset {}:{}", self.project, dataset))
        })
    }

    fn table(&self, dataset: &str, table: &str) -> Result<&CatalogEntry, CatalogError> {
        self.dataset(dataset)?.get(table).ok_or_else(|| {
            CatalogError::NotFound(format!("Table {}:{}.{}", self.project, dataset, table))
        })
    }
}

impl Catalog for JsonCatalog {
    fn current_project(&self) -> &str {
        &self.project
    }

    fn list_tables(&self, dataset: &str) -> Result<Vec<TableRef>, CatalogError> {
        Ok(self
            .dataset(dataset)?
            .keys()
            .map(|table_name| TableRef {
                dataset: dataset.to_owned(),
                table_name: table_name.clone(),
            })
            .collect())
    }

    fn get_table_schema(&self, dataset: &str, table: &str) -> Result<Vec<Field>, CatalogError> {
        match self.table(dataset, table)? {
            CatalogEntry::Table { schema, .. } | CatalogEntry::View { schema, .. } => {
                Ok(schema.clone())
            }
        }
    }

    fn table_info(&self, dataset: &str, table: &str) -> Result<TableInfo, CatalogError> {
        let entry = self.table(dataset, table)?;
        Ok(TableInfo {
            kind: entry.kind(),
            num_rows: match entry {
                CatalogEntry::Table { num_rows, .. } => *num_rows,
                CatalogEntry::View { .. } => None,
            },
        })
    }

    fn create_view(&mut self, view_id: &ViewId, query: &str) -> Result<(), CatalogError> {
        if view_id.project != self.project {
            return Err(CatalogError::NotFound(format!("Project {}", view_id.project)));
        }
        let tables = self.datasets.get_mut(&view_id.dataset).ok_or_else(|| {
            CatalogError::NotFound(format!("Dataset {}:{}", view_id.project, view_id.dataset))
        })?;
        if tables.contains_key(&view_id.table) {
            return Err(CatalogError::Conflict(format!(
                "Table {}:{}.{}",
                view_id.project, view_id.dataset, view_id.table
            )));
        }
        tables.insert(
            view_id.table.clone(),
            CatalogEntry::View {
                query: query.to_owned(),
                schema: vec![],
            },
        );
        log::debug!("Created view {}", view_id);
        Ok(())
    }
}
