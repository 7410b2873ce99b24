use std::path::PathBuf;
use std::time::Instant;

use anyhow::anyhow;
use bqflatten::catalog::{Catalog, JsonCatalog};
use bqflatten::flatten::{FLATTEN_SUFFIX, FlattenOptions, Flattener, TableOutcome, TableReport};
use clap::Parser as ClapParser;
use clap::error::ErrorKind;

const TABLE_SEPARATOR: &str = "==================================";

#[derive(clap::Parser)]
#[command(name = "bqflatten", version)]
#[command(about = "Flatten nested and repeated BigQuery tables into views", long_about = None)]
struct Cli {
    /// Dataset containing the tables to flatten.
    dataset: String,
    /// Flatten only this table instead of the whole dataset.
    table: Option<String>,
    /// Path to the JSON catalog holding datasets, schemas and views.
    #[arg(short, long, env = "BQFLATTEN_CATALOG", default_value = "catalog.json")]
    catalog: PathBuf,
    /// Project id, overriding the one of the catalog.
    #[arg(short, long)]
    project: Option<String>,
    /// Dataset receiving the views, the source dataset by default.
    #[arg(short, long)]
    output_dataset: Option<String>,
    /// Suffix appended to the table name to name its view.
    #[arg(long, default_value = FLATTEN_SUFFIX)]
    suffix: String,
    /// Log progress and the statement creating each view before it is run.
    #[arg(short, long)]
    verbose: bool,
    /// Print the statements without creating any view.
    #[arg(long)]
    dry_run: bool,
    /// Skip tables without rows.
    #[arg(long)]
    skip_empty: bool,
    /// Skip views when flattening a whole dataset.
    #[arg(long)]
    skip_views: bool,
    /// Skip tables already ending with the suffix when flattening a whole
    /// dataset into itself.
    #[arg(long)]
    skip_flattened: bool,
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(1);
            }
        },
    }
}

fn init_logger(cli: &Cli) {
    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose && std::env::var_os("RUST_LOG").is_none() {
        builder.filter_module("bqflatten", log::LevelFilter::Info);
    }
    builder.init();
}

fn print_table_report(cli: &Cli, project_id: &str, report: &TableReport) {
    println!(
        "{}.{}.{}",
        project_id, report.table.dataset, report.table.table_name
    );
    if let Some(statement) = &report.statement {
        if cli.dry_run {
            println!("Query to be run:\n{}\n", statement);
        }
    }
    println!("{}", report.outcome);
}

fn main() -> anyhow::Result<()> {
    let now = Instant::now();

    let cli = parse_cli();
    init_logger(&cli);

    let mut catalog = JsonCatalog::load(&cli.catalog)?;
    if let Some(project) = &cli.project {
        catalog.set_project(project);
    }
    let project_id = catalog.current_project().to_owned();
    let flattener = Flattener::new(
        &project_id,
        FlattenOptions {
            output_dataset: cli.output_dataset.clone(),
            suffix: cli.suffix.clone(),
            dry_run: cli.dry_run,
            skip_empty: cli.skip_empty,
            skip_views: cli.skip_views,
            skip_flattened: cli.skip_flattened,
        },
    );

    let (created, failures) = match &cli.table {
        Some(table) => {
            let report = flattener.flatten_table(&mut catalog, &cli.dataset, table)?;
            print_table_report(&cli, &project_id, &report);
            (matches!(report.outcome, TableOutcome::Created(_)) as usize, 0)
        }
        None => {
            let report = flattener.flatten_dataset(&mut catalog, &cli.dataset, |report| {
                print_table_report(&cli, &project_id, report);
                println!("{}", TABLE_SEPARATOR);
            })?;
            println!("{}", report);
            (report.created(), report.failures())
        }
    };

    if created > 0 {
        catalog.save(&cli.catalog)?;
        log::info!("Saved {} new views to {}", created, cli.catalog.display());
    }

    let elapsed = now.elapsed();
    log::info!("Elapsed: {:.2?}", elapsed);

    if failures > 0 {
        return Err(anyhow!(
            "Could not flatten {} tables of dataset {}",
            failures,
            cli.dataset
        ));
    }
    println!("All done!");
    Ok(())
}
