//! Rollbook CLI - serve and inspect the student records store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "rollbook")]
#[command(version)]
#[command(about = "Student records backend - students, marks, guardians and messages over SQLite")]
#[command(long_about = r#"
Rollbook keeps students, their marks, guardian contacts and a message log in
SQLite and serves them over a JSON HTTP API.

Example usage:
  rollbook init --seed
  rollbook serve --port 4000
  rollbook marks S001 85 92 88 79 90
  rollbook show S001
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a rollbook.toml config file
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// HTTP port
        #[arg(short, long)]
        port: Option<u16>,

        /// Seed sample students when serving an empty database
        #[arg(long)]
        seed: bool,

        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Start the HTTP API
    Serve {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// HTTP port
        #[arg(short, long)]
        port: Option<u16>,

        /// Seed sample students if the database is empty
        #[arg(long)]
        seed: bool,
    },

    /// Insert sample students into an empty database
    Seed {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List students with their marks
    Students {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show one student with marks and parents
    Show {
        /// Roll number
        rollno: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Set a student's five subject scores
    Marks {
        /// Roll number
        rollno: String,

        /// Scores in order: tamil english maths science social
        #[arg(num_args = 0..=5)]
        scores: Vec<String>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List messages for a student
    Messages {
        /// Roll number
        rollno: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show row counts per table
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

/// Print a success envelope in JSON mode
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(e) = run(cli, output_mode) {
        if output_mode.is_human() {
            rollbook::ui::error(&format!("{:#}", e));
        } else {
            let kind = e
                .downcast_ref::<rollbook::Error>()
                .map(|err| err.kind())
                .unwrap_or("error");
            let envelope = serde_json::json!({
                "ok": false,
                "error": { "kind": kind, "message": format!("{:#}", e) },
            });
            println!("{}", envelope);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = rollbook::config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Init { database, port, seed, force } => {
            let path = cli.config.unwrap_or_else(rollbook::config::default_config_path);
            commands::run_init(output_mode, &path, database, port, seed, force)
        }
        Commands::Serve { database, port, seed } => {
            commands::run_serve(output_mode, &config, database, port, seed)
        }
        Commands::Seed { database } => commands::run_seed(output_mode, &config, database),
        Commands::Students { database } => commands::run_students(output_mode, &config, database),
        Commands::Show { rollno, database } => {
            commands::run_show(output_mode, &config, database, &rollno)
        }
        Commands::Marks { rollno, scores, database } => {
            commands::run_marks(output_mode, &config, database, &rollno, &scores)
        }
        Commands::Messages { rollno, database } => {
            commands::run_messages(output_mode, &config, database, &rollno)
        }
        Commands::Stats { database } => commands::run_stats(output_mode, &config, database),
    }
}
