//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs logging
//! - loads the selected spreadsheets
//! - prints reports/plots or launches the dashboard
//! - writes optional exports

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ExportArgs, FilesArgs, RunArgs, SummaryArgs};
use crate::error::AppError;

pub mod pipeline;
pub mod state;

/// Entry point for the `trends` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` may set TRENDS_DATA_DIR / RUST_LOG; a missing file is fine.
    dotenvy::dotenv().ok();

    // We want `trends` and `trends -f sales.xlsx` to behave like `trends tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let log_target = match cli.command {
        Command::Tui(_) => LogTarget::File(std::env::temp_dir().join("house-trends.log")),
        _ => LogTarget::Stderr,
    };
    init_logging(cli.verbose, log_target);
    info!(version = env!("CARGO_PKG_VERSION"), "house-trends starting");

    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Export(args) => handle_export(args),
        Command::Files(args) => handle_files(args),
        Command::Tui(args) => handle_tui(args),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    /// The TUI owns the terminal, so logs go to a file.
    File(PathBuf),
}

fn init_logging(verbose: u8, target: LogTarget) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // A subscriber may already be installed (e.g. when embedded); keep it.
    let _ = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => match File::create(&path) {
            Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
            Err(_) => return,
        },
    };
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let loaded = pipeline::load_session(&args.run, pipeline::Fallback::Prompt)?;
    let session = &loaded.session;
    let summaries = session.summaries();

    if args.json {
        let json = crate::io::summaries_json(
            &summaries,
            session.config(),
            session.table().rows_used(),
            session.table().rows_skipped(),
        )?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "{}",
        crate::report::format_run_header(session.table(), session.config(), session.filters())
    );
    print!("{}", crate::report::format_summary_table(&summaries, session.config()));

    if args.plot {
        println!();
        print!(
            "{}",
            crate::plot::render_bar_chart(&summaries, args.plot_metric, args.width)
        );
    }
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let loaded = pipeline::load_session(&args.run, pipeline::Fallback::Prompt)?;
    let summaries = loaded.session.summaries();
    crate::io::write_summaries_csv(&args.out, &summaries, loaded.session.config())?;
    info!(path = %args.out.display(), periods = summaries.len(), "exported summaries");
    println!("Wrote {} period(s) to {}", summaries.len(), args.out.display());
    Ok(())
}

fn handle_files(args: FilesArgs) -> Result<(), AppError> {
    let files = crate::cli::picker::discover_bundled(&args.data_dir)?;
    if files.is_empty() {
        println!("No yearly files in {}", args.data_dir.display());
        return Ok(());
    }
    for f in files {
        println!("{}  {}", f.year, crate::cli::picker::pretty_path(&f.path));
    }
    Ok(())
}

fn handle_tui(args: RunArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

/// Rewrite argv so `trends` defaults to `trends tui`.
///
/// Rules:
/// - `trends`                     -> `trends tui`
/// - `trends -f a.xlsx ...`       -> `trends tui -f a.xlsx ...`
/// - `trends --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "summary" | "export" | "files" | "tui");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
