//! LeanChat CLI
//!
//! Developer tools: a transcript simulator for the trim engine, a preset
//! table dump, and TypeScript bindings export for the extension side.

mod sim;

use clap::{Parser, Subcommand};
use ts_rs::TS;

use lc_core::{Command as EngineCommand, OptimizationLevel, Preset, Response, StoredSettings};

#[derive(Parser)]
#[command(name = "lc-cli")]
#[command(about = "LeanChat engine simulator and tools")]
struct Cli {
    /// Show engine debug logging (per-removal detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a growing conversation against the engine
    Simulate {
        /// Conversation turns to append
        #[arg(short, long, default_value_t = 30)]
        turns: u32,

        /// Milliseconds between appended turns
        #[arg(short, long, default_value_t = 800)]
        interval: u64,

        /// Optimization level (light, medium, aggressive, ultra)
        #[arg(short, long, default_value = "medium")]
        level: String,

        /// Retention limit override; defaults to the level's own
        #[arg(short = 'n', long)]
        limit: Option<u32>,

        /// Emit the final status as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the preset table
    Presets {
        /// Emit as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write TypeScript definitions for the wire types
    Bindings {
        /// Output directory
        #[arg(short, long, default_value = "bindings")]
        out: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Simulate {
            turns,
            interval,
            level,
            limit,
            json,
        } => sim::run(&sim::SimOptions {
            turns,
            interval_ms: interval,
            level,
            limit,
            json,
        }),
        Commands::Presets { json } => cmd_presets(json),
        Commands::Bindings { out } => cmd_bindings(&out),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_presets(json: bool) -> Result<(), String> {
    if json {
        let rows: Vec<serde_json::Value> = OptimizationLevel::ALL
            .iter()
            .map(|&level| {
                let preset = Preset::of(level);
                serde_json::json!({
                    "name": level.as_str(),
                    "retentionLimit": preset.default_retention_limit,
                    "debounceMs": preset.debounce_window_ms(),
                    "aggressive": preset.aggressive(),
                    "suppressAnimations": preset
                        .flags
                        .contains(lc_core::CosmeticFlags::SUPPRESS_ANIMATIONS),
                    "optimizeScroll": preset
                        .flags
                        .contains(lc_core::CosmeticFlags::OPTIMIZE_SCROLL),
                    "stripHighlighting": preset
                        .flags
                        .contains(lc_core::CosmeticFlags::STRIP_HIGHLIGHTING),
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&rows).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    println!("{:<12} {:>6} {:>10}  flags", "level", "limit", "debounce");
    for &level in &OptimizationLevel::ALL {
        let preset = Preset::of(level);
        println!(
            "{:<12} {:>6} {:>8}ms  {:?}",
            level.as_str(),
            preset.default_retention_limit,
            preset.debounce_window_ms(),
            preset.flags
        );
    }
    Ok(())
}

fn cmd_bindings(out: &str) -> Result<(), String> {
    EngineCommand::export_all_to(out).map_err(|e| e.to_string())?;
    Response::export_all_to(out).map_err(|e| e.to_string())?;
    StoredSettings::export_all_to(out).map_err(|e| e.to_string())?;
    println!("TypeScript bindings written to {out}/");
    Ok(())
}

// =============================================================================
// Logging
// =============================================================================

struct StderrLogger {
    max_level: log::LevelFilter,
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: bool) {
    let max_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let logger = Box::leak(Box::new(StderrLogger { max_level }));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(max_level);
    }
}
