use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlaudit::model::Table;
use sqlaudit::{analyzer, ingest, report, run_audit, AuditOptions};

#[derive(Parser)]
#[command(name = "sqlaudit")]
#[command(author, version, about = "Analyze SQL query logs for unused tables and columns")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full audit: frequencies plus unused tables and columns
    Audit {
        /// Path to the query log CSV (QUERY_TEXT, START_TIME, END_TIME)
        #[arg(short, long)]
        queries: PathBuf,

        /// Path to the flat schema description CSV
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Database to audit when the schema describes several
        #[arg(short, long)]
        database: Option<String>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Count table/column/query occurrences across the log
    Frequencies {
        /// Path to the query log CSV
        #[arg(short, long)]
        queries: PathBuf,

        /// Leave the tables mapping empty
        #[arg(long)]
        no_tables: bool,

        /// Leave the columns mapping empty
        #[arg(long)]
        no_columns: bool,
    },

    /// List schema tables the query log never references
    UnusedTables {
        /// Path to the query log CSV
        #[arg(short, long)]
        queries: PathBuf,

        /// Path to the flat schema description CSV
        #[arg(short, long)]
        schema: PathBuf,

        /// Database to audit when the schema describes several
        #[arg(short, long)]
        database: Option<String>,
    },

    /// List declared columns the query log never uses, per referenced table
    UnusedColumns {
        /// Path to the query log CSV
        #[arg(short, long)]
        queries: PathBuf,

        /// Path to the flat schema description CSV
        #[arg(short, long)]
        schema: PathBuf,

        /// Database to audit when the schema describes several
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Report wall-clock time per query, slowest first
    TimeSpent {
        /// Path to the query log CSV
        #[arg(short, long)]
        queries: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlaudit=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Audit {
            queries,
            schema,
            database,
            verbose,
        } => {
            let options = AuditOptions {
                queries_path: queries,
                schema_path: schema,
                database,
                verbose,
            };

            let audit = run_audit(options)?;
            print!("{}", report::render_frequencies(&audit.frequencies));
            if let Some(database) = &audit.database {
                print!("{}", report::render_unused_tables(&audit.unused_tables, database));
                println!();
                print!("{}", report::render_unused_columns(&audit.unused_columns));
            }
        }
        Commands::Frequencies {
            queries,
            no_tables,
            no_columns,
        } => {
            let records = ingest::load_queries_csv(&queries)?;
            let options = analyzer::FrequencyOptions {
                include_tables: !no_tables,
                include_columns: !no_columns,
            };
            let frequencies = analyzer::get_frequencies(&records, &options);
            print!("{}", report::render_frequencies(&frequencies));
        }
        Commands::UnusedTables {
            queries,
            schema,
            database,
        } => {
            let records = ingest::load_queries_csv(&queries)?;
            let frequencies =
                analyzer::get_frequencies(&records, &analyzer::FrequencyOptions::default());
            let databases = ingest::load_schema_csv(&schema)?;
            let database = ingest::select_database(databases, database.as_deref())
                .ok_or_else(|| anyhow!("no matching database in {}", schema.display()))?;
            let unused = analyzer::find_unused_tables(&frequencies, &database);
            print!("{}", report::render_unused_tables(&unused, &database));
        }
        Commands::UnusedColumns {
            queries,
            schema,
            database,
        } => {
            let records = ingest::load_queries_csv(&queries)?;
            let databases = ingest::load_schema_csv(&schema)?;
            let database = ingest::select_database(databases, database.as_deref())
                .ok_or_else(|| anyhow!("no matching database in {}", schema.display()))?;
            let tables: Vec<Table> = database.tables().cloned().collect();
            let unused = analyzer::find_unused_columns(&records, &tables);
            print!("{}", report::render_unused_columns(&unused));
        }
        Commands::TimeSpent { queries } => {
            let records = ingest::load_queries_csv(&queries)?;
            let time_spent = analyzer::get_time_spent(&records);
            print!("{}", report::render_time_spent(&time_spent));
        }
    }

    Ok(())
}
