use std::fmt::Display;

use anyhow::anyhow;

use crate::{
    catalog::{Catalog, CatalogError, TableKind, TableRef, ViewId},
    expand::expand_table,
    query::{create_view_statement, flatten_table_query},
};

pub const FLATTEN_SUFFIX: &str = "_flatten";

#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Dataset receiving the views, the source dataset when `None`.
    pub output_dataset: Option<String>,
    pub suffix: String,
    /// Build the statements without creating any view.
    pub dry_run: bool,
    /// Skip tables the catalog reports as having no rows.
    pub skip_empty: bool,
    /// In dataset mode, skip entries the catalog reports as views.
    pub skip_views: bool,
    /// In dataset mode, skip tables already named with `suffix` when the views
    /// land in the source dataset.
    pub skip_flattened: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            output_dataset: None,
            suffix: FLATTEN_SUFFIX.to_owned(),
            dry_run: false,
            skip_empty: false,
            skip_views: false,
            skip_flattened: false,
        }
    }
}

#[derive(Debug)]
pub enum TableOutcome {
    Created(ViewId),
    AlreadyExists { view_id: ViewId, error: CatalogError },
    DryRun(ViewId),
    SkippedEmpty,
    SkippedView,
    SkippedFlattened,
    Failed(anyhow::Error),
}

impl TableOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TableOutcome::Failed(_))
    }
}

impl Display for TableOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableOutcome::Created(view_id) => {
                write!(f, "Query results loaded to the table {}", view_id)
            }
            TableOutcome::AlreadyExists { view_id, error } => write!(
                f,
                "Failed to create view for table {}. Exception received: {}",
                view_id, error
            ),
            TableOutcome::DryRun(view_id) => write!(f, "Dry run, view {} not created", view_id),
            TableOutcome::SkippedEmpty => write!(f, "Skipped, table is empty"),
            TableOutcome::SkippedView => write!(f, "Skipped, table is a view"),
            TableOutcome::SkippedFlattened => write!(f, "Skipped, table is already flattened"),
            TableOutcome::Failed(err) => write!(f, "Failed: {:#}", err),
        }
    }
}

#[derive(Debug)]
pub struct TableReport {
    pub table: TableRef,
    /// `CREATE VIEW` statement, when one was built.
    pub statement: Option<String>,
    pub outcome: TableOutcome,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub tables: Vec<TableReport>,
}

impl BatchReport {
    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, TableOutcome::Created(_)))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|outcome| matches!(outcome, TableOutcome::AlreadyExists { .. }))
    }

    pub fn dry_runs(&self) -> usize {
        self.count(|outcome| matches!(outcome, TableOutcome::DryRun(_)))
    }

    pub fn failures(&self) -> usize {
        self.count(TableOutcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                TableOutcome::SkippedEmpty
                    | TableOutcome::SkippedView
                    | TableOutcome::SkippedFlattened
            )
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    fn count(&self, predicate: impl Fn(&TableOutcome) -> bool) -> usize {
        self.tables
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tables: {} created, {} already existing, {} dry run, {} skipped, {} failed",
            self.tables.len(),
            self.created(),
            self.conflicts(),
            self.dry_runs(),
            self.skipped(),
            self.failures()
        )
    }
}

/// Creates flattened views of catalog tables.
#[derive(Debug, Clone)]
pub struct Flattener {
    project_id: String,
    options: FlattenOptions,
}

impl Flattener {
    pub fn new(project_id: &str, options: FlattenOptions) -> Self {
        Self {
            project_id: project_id.to_owned(),
            options,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn view_id(&self, dataset: &str, table: &str) -> ViewId {
        let output_dataset = self.options.output_dataset.as_deref().unwrap_or(dataset);
        ViewId::new(
            &self.project_id,
            output_dataset,
            &format!("{}{}", table, self.options.suffix),
        )
    }

    /// Builds the query flattening `dataset.table`.
    pub fn flatten_query(
        &self,
        catalog: &impl Catalog,
        dataset: &str,
        table: &str,
    ) -> anyhow::Result<String> {
        log::info!("Extract schema of {}.{}.{}", self.project_id, dataset, table);
        let schema = catalog.get_table_schema(dataset, table).map_err(|err| {
            anyhow!(
                "Could not extract schema of table {}.{}: {}",
                dataset,
                table,
                err
            )
        })?;

        log::info!("Build flattening query");
        let flattening = expand_table(&schema);
        if flattening.is_empty() {
            return Err(anyhow!(
                "Table {}.{} has no columns to flatten",
                dataset,
                table
            ));
        }
        let collisions = flattening.alias_collisions();
        if !collisions.is_empty() {
            log::warn!(
                "Flattening {}.{} produces duplicate columns: {}",
                dataset,
                table,
                collisions.join(", ")
            );
        }
        Ok(flatten_table_query(
            &self.project_id,
            dataset,
            table,
            &flattening,
        ))
    }

    /// Flattens `dataset.table` into a view named after it.
    ///
    /// A view that already exists is reported as an outcome, any other catalog
    /// failure as an error.
    pub fn flatten_table(
        &self,
        catalog: &mut impl Catalog,
        dataset: &str,
        table: &str,
    ) -> anyhow::Result<TableReport> {
        let table_ref = TableRef {
            dataset: dataset.to_owned(),
            table_name: table.to_owned(),
        };

        if self.options.skip_empty {
            let info = catalog.table_info(dataset, table).map_err(|err| {
                anyhow!(
                    "Could not get metadata of table {}.{}: {}",
                    dataset,
                    table,
                    err
                )
            })?;
            if info.num_rows == Some(0) {
                log::info!("Skipping empty table {}.{}", dataset, table);
                return Ok(TableReport {
                    table: table_ref,
                    statement: None,
                    outcome: TableOutcome::SkippedEmpty,
                });
            }
        }

        let query = self.flatten_query(&*catalog, dataset, table)?;
        let view_id = self.view_id(dataset, table);
        let statement = create_view_statement(&view_id.dataset, &view_id.table, &query);
        log::info!("Query to be run:\n{}", statement);

        let outcome = if self.options.dry_run {
            TableOutcome::DryRun(view_id)
        } else {
            log::info!("Create view {}", view_id);
            match catalog.create_view(&view_id, &query) {
                Ok(()) => TableOutcome::Created(view_id),
                Err(error @ CatalogError::Conflict(_)) => {
                    log::warn!("Failed to create view {}: {}", view_id, error);
                    TableOutcome::AlreadyExists { view_id, error }
                }
                Err(err) => {
                    return Err(anyhow!("Failed to create view {}: {}", view_id, err));
                }
            }
        };

        Ok(TableReport {
            table: table_ref,
            statement: Some(statement),
            outcome,
        })
    }

    /// Flattens every table of `dataset`, one after the other.
    ///
    /// A failing table is recorded in the report and does not stop the run.
    /// `on_table` is called as soon as each table is done.
    pub fn flatten_dataset(
        &self,
        catalog: &mut impl Catalog,
        dataset: &str,
        mut on_table: impl FnMut(&TableReport),
    ) -> anyhow::Result<BatchReport> {
        let tables = catalog
            .list_tables(dataset)
            .map_err(|err| anyhow!("Could not list tables of dataset {}: {}", dataset, err))?;
        log::info!("Found {} tables in dataset {}", tables.len(), dataset);

        let mut report = BatchReport::default();
        for table in tables {
            let table_report = match self.skip_reason(&*catalog, &table) {
                Some(outcome) => TableReport {
                    table,
                    statement: None,
                    outcome,
                },
                None => self
                    .flatten_table(catalog, &table.dataset, &table.table_name)
                    .unwrap_or_else(|err| {
                        log::error!(
                            "Could not flatten table {}.{}: {:#}",
                            table.dataset,
                            table.table_name,
                            err
                        );
                        TableReport {
                            table,
                            statement: None,
                            outcome: TableOutcome::Failed(err),
                        }
                    }),
            };
            on_table(&table_report);
            report.tables.push(table_report);
        }
        Ok(report)
    }

    fn skip_reason(&self, catalog: &impl Catalog, table: &TableRef) -> Option<TableOutcome> {
        let in_source_dataset = self
            .options
            .output_dataset
            .as_deref()
            .is_none_or(|output_dataset| output_dataset == table.dataset);
        if self.options.skip_flattened
            && in_source_dataset
            && table.table_name.ends_with(&self.options.suffix)
        {
            return Some(TableOutcome::SkippedFlattened);
        }
        if !self.options.skip_views {
            return None;
        }
        match catalog.table_info(&table.dataset, &table.table_name) {
            Ok(info) if info.kind == TableKind::View => {
                log::info!(
                    "Skipping {}.{}, it is a {}",
                    table.dataset,
                    table.table_name,
                    info.kind
                );
                Some(TableOutcome::SkippedView)
            }
            // Lookup failures surface again in flatten_table.
            _ => None,
        }
    }
}
