use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use humansize::{format_size, BINARY};
use std::path::PathBuf;
use std::process::ExitCode;

use decruft::ops::BatchRequest;
use decruft::scan::{CruftItem, ScanResult};
use decruft::{paths, Config, OpReport, Session, ToolStatus};

#[derive(Parser)]
#[command(
    name = "decruft",
    version,
    about = "Find and safely reclaim developer disk cruft"
)]
struct Cli {
    /// Path to a settings file (defaults to .decruft.toml in cwd or home)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan for reclaimable cruft (read-only)
    Scan {
        /// Minimum size in MB to report
        #[arg(long)]
        min_size: Option<u64>,

        /// Skip the virtual-environment search
        #[arg(long)]
        no_venvs: bool,

        /// Skip the dependency-tree search
        #[arg(long)]
        no_deps: bool,

        /// Number of parallel scan workers
        #[arg(long)]
        workers: Option<usize>,

        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Measure the size of one directory
    Size { path: PathBuf },

    /// List a directory's children with sizes, largest first
    Ls {
        path: PathBuf,

        /// Maximum number of children to list
        #[arg(long, default_value_t = 20)]
        max: usize,
    },

    /// Check whether a command-line tool is installed
    Probe { tool: String },

    /// Delete one path. Without --reason, a scan runs first and the path
    /// must appear in its results.
    Delete {
        path: PathBuf,

        /// Approve the path explicitly instead of requiring a scan hit
        #[arg(long)]
        reason: Option<String>,

        /// Delete through an elevated (sudo) subprocess
        #[arg(long)]
        elevated: bool,

        /// Override the default path protections (the ancestor-of-home
        /// check still applies)
        #[arg(long)]
        force: bool,

        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan, then delete everything found
    Clean {
        /// Actually delete. Without this flag, only the scan report prints.
        #[arg(long)]
        confirm: bool,

        /// Delete through an elevated (sudo) subprocess
        #[arg(long)]
        elevated: bool,
    },

    /// Inspect or clear the size-measurement cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    Stats,
    Clear,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path).context("failed to load settings")?,
        None => {
            let home = paths::home_dir()?;
            Config::load_default(&home).context("failed to load settings")?
        }
    };
    let mut session = Session::new(config).context("failed to initialize session")?;

    match cli.command {
        Command::Scan {
            min_size,
            no_venvs,
            no_deps,
            workers,
            json,
        } => {
            let mut options = session.scan_options();
            if let Some(min_size) = min_size {
                options.min_size_mb = min_size;
            }
            if let Some(workers) = workers {
                options.workers = workers;
            }
            options.include_venvs = options.include_venvs && !no_venvs;
            options.include_dependency_trees = options.include_dependency_trees && !no_deps;
            options.show_progress = !json;

            let result = session.scan(&options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_scan_report(&result, &session);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Size { path } => {
            let size = session.measure_size(&path)?;
            println!("{}  {}", format_size(size, BINARY).yellow(), path.display());
            session.save_cache();
            Ok(ExitCode::SUCCESS)
        }

        Command::Ls { path, max } => {
            let children = session.list_children(&path, max)?;
            println!("{}", format!("Contents of {}:", path.display()).bold());
            for child in &children {
                println!(
                    "  {:>10}  {}",
                    format_size(child.size_bytes, BINARY).yellow(),
                    child.name
                );
            }
            session.save_cache();
            Ok(ExitCode::SUCCESS)
        }

        Command::Probe { tool } => {
            let (status, location) = session.probe_tool(&tool);
            match status {
                ToolStatus::Installed => {
                    let at = location.unwrap_or_default();
                    println!("{}: {} {}", tool, "installed".green(), at.dimmed());
                }
                ToolStatus::NotInstalled => println!("{}: {}", tool, "not installed".red()),
                ToolStatus::Unknown => println!("{}: {}", tool, "unknown (probe failed)".yellow()),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Delete {
            path,
            reason,
            elevated,
            force,
            json,
        } => {
            if let Some(reason) = reason {
                let approval = session.approve_for_deletion(&path, &reason);
                if !approval.success {
                    print_report(&approval, json)?;
                    return Ok(ExitCode::FAILURE);
                }
            } else {
                // Authorization comes from scan results only.
                let mut options = session.scan_options();
                options.show_progress = !json;
                session.scan(&options)?;
            }

            let report = session.delete(&path, elevated, force);
            session.save_cache();
            print_report(&report, json)?;
            Ok(if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Clean { confirm, elevated } => {
            let mut options = session.scan_options();
            options.show_progress = true;
            let result = session.scan(&options)?;
            print_scan_report(&result, &session);

            if !confirm {
                println!(
                    "{}",
                    "No --confirm flag provided; nothing was deleted."
                        .yellow()
                        .bold()
                );
                return Ok(ExitCode::SUCCESS);
            }

            match session.delete_all_authorized(true, elevated) {
                BatchRequest::Ran(batch) => {
                    session.save_cache();
                    println!(
                        "{} deleted {} items, freed {}",
                        "Done:".green().bold(),
                        batch.deleted.len(),
                        format_size(batch.total_freed_bytes, BINARY).green()
                    );
                    for failure in &batch.failed {
                        println!(
                            "  {} {}: {:?}",
                            "failed".red(),
                            failure.path.display(),
                            failure.outcome
                        );
                    }
                    if batch.retry_with_elevation {
                        println!(
                            "{}",
                            "Some failures look permission-related; retry with --elevated."
                                .yellow()
                        );
                    }
                    Ok(if batch.failed.is_empty() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    })
                }
                BatchRequest::NothingAuthorized => {
                    println!("Nothing to delete.");
                    Ok(ExitCode::SUCCESS)
                }
                BatchRequest::ConfirmationRequired => unreachable!("confirm was passed"),
            }
        }

        Command::Cache { action } => {
            match action {
                CacheAction::Stats => {
                    let stats = session.cache_stats();
                    println!("{}", "Size cache".bold());
                    println!("  file:          {}", stats.cache_file.display());
                    println!("  ttl:           {}s", stats.ttl_seconds);
                    println!("  entries:       {}", stats.total_entries);
                    println!("  existing:      {}", stats.exists_count);
                    println!("  errors:        {}", stats.error_count);
                    println!(
                        "  cached bytes:  {}",
                        format_size(stats.total_cached_bytes, BINARY)
                    );
                }
                CacheAction::Clear => {
                    session.clear_cache();
                    println!("Cache cleared.");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(report: &OpReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if report.success {
        println!("{} {}", "OK".green().bold(), report.message);
    } else {
        println!("{} {}", "Error:".red().bold(), report.message);
        if let Some(suggestion) = &report.suggestion {
            println!("  {} {}", "hint:".cyan(), suggestion);
        }
    }
    Ok(())
}

fn print_scan_report(result: &ScanResult, session: &Session) {
    let home = session.home();

    if !result.items.is_empty() {
        println!("{}", "=== Known Cruft Locations ===".bold());
        for item in &result.items {
            print_item(item, home, true);
        }
        println!();
    }
    if !result.venvs.is_empty() {
        println!("{}", "=== Python Virtual Environments ===".bold());
        for item in &result.venvs {
            print_item(item, home, false);
        }
        println!();
    }
    if !result.dependency_trees.is_empty() {
        println!("{}", "=== Dependency Trees ===".bold());
        for item in &result.dependency_trees {
            print_item(item, home, false);
        }
        println!();
    }

    for error in &result.errors {
        println!("{} {}", "Warning:".yellow().bold(), error);
    }

    if result.item_count() == 0 {
        println!("No cruft found above the size threshold.");
    } else {
        println!(
            "{} {} across {} items",
            "Total reclaimable:".bold(),
            format_size(result.total_bytes(), BINARY).green().bold(),
            result.item_count()
        );
    }
}

fn print_item(item: &CruftItem, home: &std::path::Path, annotate: bool) {
    let mut notes = String::new();
    if annotate {
        notes.push_str(if item.safe { " [safe]" } else { " [caution]" });
        match item.tool {
            ToolStatus::NotInstalled => notes.push_str(" [orphaned - tool not installed]"),
            ToolStatus::Installed => notes.push_str(" [tool installed]"),
            ToolStatus::Unknown => {}
        }
    }
    println!(
        "  {:>10}  {} - {}{}",
        item.size_human().yellow(),
        paths::display_path(&item.path, home).dimmed(),
        item.description,
        notes.cyan()
    );
}
