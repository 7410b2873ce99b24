//! # bqflatten
//!
//! A library for flattening nested and repeated BigQuery tables into flat views.
//!
//! # Features
//!
//! - Expand a table schema into the columns and `LEFT JOIN`s of a flattening query.
//! - Unnest repeated records and repeated scalars, inline non-repeated records.
//! - Deterministic column aliases derived from the field paths (`addr.city` becomes `addr_city`).
//! - Create one `<table>_flatten` view per table of a dataset through a [`catalog::Catalog`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bqflatten::{
//!     catalog::{Catalog, JsonCatalog},
//!     expand::expand_table,
//!     flatten::{FlattenOptions, Flattener},
//!     query::flatten_table_query,
//!     schema::{Field, FieldMode, FieldType},
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     env_logger::init();
//!
//!     let schema = vec![
//!         Field::new("id", FieldType::Int64, FieldMode::Required),
//!         Field::record(
//!             "items",
//!             FieldMode::Repeated,
//!             vec![Field::new("sku", FieldType::String, FieldMode::Nullable)],
//!         ),
//!     ];
//!     let flattening = expand_table(&schema);
//!     println!("{}", flatten_table_query("project", "sales", "orders", &flattening));
//!
//!     let mut catalog = JsonCatalog::new("project");
//!     catalog.add_table("sales", "orders", schema, None);
//!     let flattener = Flattener::new(catalog.current_project(), FlattenOptions::default());
//!     let report = flattener.flatten_dataset(&mut catalog, "sales", |table| {
//!         println!("{}: {}", table.table.table_name, table.outcome)
//!     })?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
pub mod catalog;
pub mod expand;
pub mod flatten;
pub mod query;
pub mod schema;
