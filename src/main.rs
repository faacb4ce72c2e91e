//! Dojo - Activity progression engine for gamified coding lessons
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dojo::catalog::{load_templates, LessonCatalog};
use dojo::cli::{ConfigCommand, LessonsCommand, OutputOptions, PlayCommand, ShowCommand};
use dojo::config::{dojo_home, Config};
use dojo::error::exit_codes;

// =============================================================================
// CLI Definition
// =============================================================================

/// Dojo - gamified coding lessons in the terminal
#[derive(Parser)]
#[command(name = "dojo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Lesson file or directory to use instead of the configured catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available lessons
    Lessons {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show a lesson's activities and their statuses
    Show {
        /// Lesson ID
        lesson: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Replay a scripted run through a lesson
    Play {
        /// Lesson ID
        lesson: String,
        /// TOML file with `[[steps]]` to replay
        #[arg(long, short)]
        script: PathBuf,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to .dojo/config.toml
        #[arg(long)]
        save: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("dojo error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Log to stderr, filtered by `DOJO_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOJO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Set up the global panic handler.
///
/// On panic, appends to ~/.dojo/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("dojo panic: {}", info);

        if let Some(home) = dojo_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let mut config = Config::load_from_cwd(&cwd);
    if let Some(catalog) = cli.catalog {
        config.catalog.lessons_dir = Some(catalog);
    }

    match cli.command {
        Commands::Lessons { json, quiet } => run_lessons(&config, OutputOptions { json, quiet }),
        Commands::Show {
            lesson,
            json,
            quiet,
        } => run_show(&lesson, config, OutputOptions { json, quiet }),
        Commands::Play {
            lesson,
            script,
            json,
            quiet,
        } => run_play(&lesson, &script, config, OutputOptions { json, quiet }),
        Commands::Config { save, json, quiet } => {
            let cmd = ConfigCommand::new(config);
            let output = cmd.run(save.then_some(cwd.as_path()));
            print_output(&cmd.format_output(&output, OutputOptions { json, quiet }));
            Ok(success_to_exit_code(output.success))
        }
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_lessons(
    config: &Config,
    options: OutputOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let catalog = LessonCatalog::from_config(&config.catalog)?;
    let cmd = LessonsCommand::new(catalog);
    let output = cmd.run();
    print_output(&cmd.format_output(&output, options));
    Ok(success_to_exit_code(output.success))
}

fn run_show(
    lesson: &str,
    config: Config,
    options: OutputOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let catalog = LessonCatalog::from_config(&config.catalog)?;
    let cmd = ShowCommand::new(catalog, config);
    let output = cmd.run(lesson);
    print_output(&cmd.format_output(&output, options));

    if output.not_found {
        return Ok(ExitCode::from(exit_codes::NOT_FOUND as u8));
    }
    Ok(success_to_exit_code(output.success))
}

fn run_play(
    lesson: &str,
    script: &std::path::Path,
    config: Config,
    options: OutputOptions,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let catalog = LessonCatalog::from_config(&config.catalog)?;
    let selector = load_templates(&config.catalog);
    let cmd = PlayCommand::new(catalog, selector, config);
    let output = cmd.run(lesson, script);
    print_output(&cmd.format_output(&output, options));

    if output.not_found {
        return Ok(ExitCode::from(exit_codes::NOT_FOUND as u8));
    }
    Ok(success_to_exit_code(output.success && output.rejected == 0))
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn print_output(text: &str) {
    if !text.is_empty() {
        print!("{}", text);
        if !text.ends_with('\n') {
            println!();
        }
    }
}
