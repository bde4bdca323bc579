use anyhow::Context;
use clap::{Parser, Subcommand};
use dbkup_core::{DbkupConfig, DumpRequest};
use dbkup_dump::{BackupStore, DumpOrchestrator, PreviewReader};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "dbkup")]
#[command(version)]
#[command(about = "Dump database tables to SQL files")]
#[command(long_about = "dbkup - dump MySQL/MariaDB or SQLite tables to plain SQL files

CONFIGURATION:
  Settings are read from dbkup.toml in the current directory or a parent.
  Without a file, DB_SERVER, DB_PORT, DB_USERNAME, DB_PASSWORD and DB_NAME
  (or DATABASE_URL) are used. A .env file is loaded first.

EXAMPLES:
  dbkup tables
  dbkup preview users
  dbkup dump --table users --table orders --schema --label nightly
  dbkup serve")]
struct Args {
    /// Configuration file (defaults to the nearest dbkup.toml)
    #[arg(short, long, value_name = "FILE", env = "DBKUP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// List tables with their row counts
    Tables,
    /// Print the first rows of a table as JSON
    Preview {
        table: String,
    },
    /// Dump tables to a new file in the backup directory
    Dump {
        /// Table to dump, repeat for several (dumped in the given order)
        #[arg(short, long = "table", value_name = "TABLE", required = true)]
        tables: Vec<String>,

        /// Write each table's CREATE TABLE statement before its rows
        #[arg(short, long)]
        schema: bool,

        /// Label embedded in the file name
        #[arg(short, long, default_value = "")]
        label: String,
    },
    /// List stored dump files
    Backups,
    /// Print a stored dump file
    Show {
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DbkupConfig::load_from(path)?,
        None => DbkupConfig::load()?,
    };

    dbkup_telemetry::init_telemetry(&config.observability);

    std::fs::create_dir_all(&config.backup.dir).with_context(|| {
        format!("Failed to create backup directory: {:?}", config.backup.dir)
    })?;
    let store = BackupStore::new(&config.backup.dir);

    // Reading stored dumps needs no database connection
    match &args.command {
        Command::Backups => {
            let backups = store.list().await?;
            print_json(&backups)?;
            return Ok(());
        }
        Command::Show { file } => {
            match store.read(file).await? {
                Some(contents) => print!("{}", contents),
                None => anyhow::bail!("Backup file not found: {}", file),
            }
            return Ok(());
        }
        _ => {}
    }

    let source = dbkup_source::connect(&config.database).await?;
    let orchestrator = Arc::new(
        DumpOrchestrator::new(source.clone(), store.clone())
            .with_default_label(config.backup.default_label.clone()),
    );
    let reader = Arc::new(PreviewReader::new(source, store));

    match args.command {
        Command::Serve => {
            let router = dbkup_server::create_router(orchestrator, reader);
            dbkup_server::serve(router, &config.server.bind_address()).await?;
        }
        Command::Tables => {
            for table in reader.list_tables().await? {
                println!("{}\t{}", table.name, table.row_count);
            }
        }
        Command::Preview { table } => {
            print_json(&reader.preview_table(&table).await?)?;
        }
        Command::Dump {
            tables,
            schema,
            label,
        } => {
            let request = DumpRequest::new(tables).with_schema(schema).with_label(label);
            let report = orchestrator.run(&request).await?;

            for table in &report.tables {
                match &table.error {
                    Some(error) => eprintln!("{}: {}", table.table, error),
                    None => tracing::info!(table = %table.table, rows = table.rows, "Dumped"),
                }
            }
            println!("{}", report.path.display());

            let failed = report.failed_tables().count();
            if failed > 0 {
                anyhow::bail!("{} of {} tables failed", failed, report.tables.len());
            }
        }
        Command::Backups | Command::Show { .. } => {}
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
