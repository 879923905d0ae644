use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use logbook::{CallSite, Config, LogFileSummary, LogLevel};

/// Inspect and manage logbook log files
#[derive(Parser, Debug)]
#[command(name = "logbook")]
#[command(about = "Inspect and manage logbook log files")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory; log files live in its `logging` subdirectory
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List log files with per-level entry counts
    List,
    /// Print the entries of one log file
    Show {
        identifier: String,
        /// Hide entries below this level
        #[arg(long, default_value = "debug")]
        min_level: LogLevel,
        /// Print raw JSON instead of one line per entry
        #[arg(long)]
        json: bool,
    },
    /// Print file count and total size
    Stats,
    /// Delete one log file
    Delete { identifier: String },
    /// Delete every log file
    Clear,
    /// Append a message to a log file
    Log {
        identifier: String,
        message: String,
        #[arg(long, default_value = "info")]
        level: LogLevel,
    },
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "logbook=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = args.storage_dir {
        config = Config::with_storage_dir(dir);
    }

    let book = logbook::init(config).context("Failed to initialise logbook")?;
    tracing::debug!("Using logging root {}", book.root().display());

    match args.command {
        Command::List => {
            let files = logbook::list_log_files().context("Failed to list log files")?;
            if files.is_empty() {
                println!("No log files");
            }
            for file in &files {
                println!("{}", format_summary(file));
            }
        }
        Command::Show {
            identifier,
            min_level,
            json,
        } => {
            let entries = book
                .load_log_entries_filtered(&identifier, min_level)
                .with_context(|| format!("Failed to load log file '{}'", identifier))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let marker = if entry.is_snapshot { " [snapshot]" } else { "" };
                    println!(
                        "{} {:<8} {}:{} {}{}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                        entry.level,
                        entry.function,
                        entry.line,
                        entry.message,
                        marker
                    );
                }
            }
        }
        Command::Stats => {
            let stats = logbook::log_file_stats().context("Failed to compute log stats")?;
            println!(
                "{} file(s), {}",
                stats.file_count,
                format_size(stats.total_size)
            );
        }
        Command::Delete { identifier } => {
            logbook::delete_log_file(&identifier)
                .with_context(|| format!("Failed to delete log file '{}'", identifier))?;
            println!("Deleted {}", identifier);
        }
        Command::Clear => {
            let removed = logbook::clear_logs().context("Failed to clear log files")?;
            println!("Deleted {} log file(s)", removed);
        }
        Command::Log {
            identifier,
            message,
            level,
        } => {
            let call_site = CallSite::new(identifier, "logbook::cli", 0);
            let outcome = book.log_at(call_site, message, None, level)?;
            println!(
                "Appended to {} ({} entries, {})",
                outcome.identifier,
                outcome.entries,
                format_size(outcome.bytes)
            );
        }
    }

    Ok(())
}

fn format_summary(file: &LogFileSummary) -> String {
    let counts = match &file.decode_error {
        Some(e) => format!("corrupt: {}", e),
        None => LogLevel::ALL
            .iter()
            .filter(|level| file.count(**level) > 0)
            .map(|level| format!("{}={}", level, file.count(*level)))
            .collect::<Vec<_>>()
            .join(" "),
    };

    format!(
        "{:<24} {:>10}  {}  {}",
        file.identifier(),
        format_size(file.size),
        file.last_modified.format("%Y-%m-%d %H:%M:%S"),
        counts
    )
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
