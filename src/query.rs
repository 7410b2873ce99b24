use crate::expand::{Flattening, ROOT_ALIAS};

const SELECT_SEPARATOR: &str = ",\n    ";

/// Builds the query selecting every flattened column of
/// `project.dataset.table`.
pub fn flatten_table_query(
    project: &str,
    dataset: &str,
    table: &str,
    flattening: &Flattening,
) -> String {
    assemble(project, dataset, table, &flattening.selects, &flattening.joins)
}

pub fn assemble(
    project: &str,
    dataset: &str,
    table: &str,
    selects: &[String],
    joins: &[String],
) -> String {
    format!(
        "SELECT {}\nFROM `{}.{}.{}` AS {}{}",
        selects.join(SELECT_SEPARATOR),
        project,
        dataset,
        table,
        ROOT_ALIAS,
        joins.concat()
    )
}

/// DDL statement creating `dataset.view` from `query`.
pub fn create_view_statement(dataset: &str, view: &str, query: &str) -> String {
    format!("CREATE VIEW {}.{} AS \n{}", dataset, view, query)
}
