//! Tabula CLI: OData requests against a SQLite database.
//!
//! ```bash
//! tabula --database shop.db --collections collections.toml sql sales/orders '$expand=Customer&$top=5'
//! tabula --database shop.db --collections collections.toml query /sales/customers(1)/Orders
//! tabula --database shop.db --collections collections.toml metadata sales
//! ```
//!
//! See `tabula --help` for all available commands and options.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tabula_core::logging::{init_logging, LogLevel};
use tabula_core::TabulaConfig;

#[derive(Parser)]
#[command(
    name = "tabula",
    about = "Read-only OData v4 over SQLite collections",
    version,
    after_help = "Collections are declared in a TOML file with one [[collection]] table per entity set."
)]
struct Cli {
    /// SQLite database file
    #[arg(long, short = 'd')]
    database: PathBuf,

    /// Collection declarations
    #[arg(long, short = 'c', default_value = "collections.toml")]
    collections: PathBuf,

    /// Service configuration (tabula.toml); TABULA_* variables still apply
    #[arg(long, default_value = "tabula.toml")]
    config: PathBuf,

    /// Log generated SQL and cache activity to stderr
    #[arg(long, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL a collection request translates to
    Sql {
        /// GROUP/COLLECTION
        path: String,

        /// Query string, e.g. '$filter=city eq '\''Paris'\''&$top=10'
        #[arg(default_value = "")]
        query: String,
    },
    /// Run a request and print the JSON response
    Query {
        /// /GROUP/COLLECTION, /GROUP/COLLECTION(key) or /GROUP/COLLECTION(key)/Navigation
        path: String,

        #[arg(default_value = "")]
        query: String,

        /// Accept header, e.g. 'application/json;odata.metadata=none'
        #[arg(long)]
        accept: Option<String>,
    },
    /// Print the CSDL metadata document of a group
    Metadata {
        group: String,
    },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = TabulaConfig::load_from(&cli.config)?;
    if cli.verbose {
        config.logging.level = LogLevel::Debug;
    }
    init_logging(&config.logging)?;

    let service = commands::service(&cli.database, &cli.collections, config)?;
    match cli.command {
        Commands::Sql { path, query } => commands::sql(&service, &path, &query),
        Commands::Query { path, query, accept } => {
            commands::query(&service, &path, &query, accept.as_deref())
        }
        Commands::Metadata { group } => commands::metadata(&service, &group),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
