//! propman-dbinit CLI
//!
//! Command-line tool that bootstraps the application database.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use propman_dbinit::prelude::*;

/// Bootstraps the property-management MySQL schema from SQL files.
#[derive(Parser)]
#[command(name = "propman-dbinit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database server host.
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    host: String,

    /// Database server port.
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    port: u16,

    /// Database user.
    #[arg(short, long, env = "DB_USER", default_value = "root")]
    user: String,

    /// Database password.
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Directory holding the SQL files.
    #[arg(short, long, env = "DB_INIT_DIR")]
    base_dir: Option<PathBuf>,

    /// JSON file overriding the built-in file plan.
    #[arg(short, long)]
    plan: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database (default).
    Run {
        /// Print statements without connecting or executing.
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON on stdout (dry-run SQL goes to stderr).
        #[arg(long)]
        json: bool,
    },

    /// Print the root file with all includes inlined.
    Expand {
        /// File to expand (plan root if not specified).
        file: Option<PathBuf>,
    },

    /// Print the statements the root file splits into.
    Split {
        /// File to split (plan root if not specified).
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut plan = match &cli.plan {
        Some(path) => InitPlan::from_json_file(path)?,
        None => InitPlan::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        plan = plan.with_base_dir(base_dir);
    }

    let command = cli.command.unwrap_or(Commands::Run {
        dry_run: false,
        json: false,
    });

    match command {
        Commands::Expand { file } => {
            let file = file.unwrap_or_else(|| plan.root_path());
            println!("{}", expand_file(&file)?);
        }

        Commands::Split { file } => {
            let file = file.unwrap_or_else(|| plan.root_path());
            let statements = split_statements(&expand_file(&file)?);
            for statement in &statements {
                println!("-- line {}", statement.line);
                println!("{}", statement.sql);
                println!();
            }
            info!(statements = statements.len(), "Split complete");
        }

        Commands::Run { dry_run, json } => {
            let initializer = Initializer::new(plan);

            let report = if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
                if json {
                    let mut executor = DryRunExecutor::with_writer(std::io::stderr());
                    initializer.run(&mut executor).await?
                } else {
                    initializer.run(&mut DryRunExecutor::new()).await?
                }
            } else {
                let settings = ConnectionSettings {
                    host: cli.host,
                    port: cli.port,
                    user: cli.user,
                    password: cli.password,
                };
                info!(
                    host = %settings.host,
                    port = settings.port,
                    user = %settings.user,
                    "Connecting to database server"
                );

                let mut conn = match settings.connect().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "Could not connect to database server");
                        return Err(e).context("connecting to database server");
                    }
                };

                let result = initializer.run(&mut conn).await;
                close(conn).await;
                result?
            };

            if json {
                println!("{}", report.to_json()?);
            }
        }
    }

    Ok(())
}
