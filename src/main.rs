//! Shift Proof command line
//!
//! Reads clock times from shift photos and reports the hours worked.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use shiftproof::ocr::terminate_global_engine;
use shiftproof::{
    compute_from_fields, load_config, logging, paths, ClockSide, ExtractionResult,
    ExtractorConfig, ShiftEntry, TimestampExtractor,
};

#[derive(Parser)]
#[command(name = "shiftproof", version, about = "Photo-verified shift hours")]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the clock time from a photo
    Extract {
        image: PathBuf,
        /// Skip EXIF metadata and always run OCR
        #[arg(long)]
        optical_only: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute hours from two HH:MM times
    Hours {
        time_in: String,
        time_out: String,
        #[arg(long, default_value_t = 0.0)]
        overtime: f64,
    },
    /// Build a shift entry from clock-in and clock-out photos
    Entry {
        #[arg(long)]
        name: String,
        #[arg(long)]
        in_photo: PathBuf,
        #[arg(long)]
        out_photo: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        overtime: f64,
    },
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        log::error!("[PANIC]{} {}", location, msg);
        eprintln!("[PANIC]{} {}", location, msg);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    install_panic_hook();
    if let Err(e) = paths::ensure_directories() {
        eprintln!("Warning: failed to create log directory: {}", e);
    }
    logging::init(&cli.log_level);

    let config = load_config(cli.config.as_deref());

    let outcome = match cli.command {
        Command::Extract {
            image,
            optical_only,
            json,
        } => run_extract(&image, optical_only, json, config).await,
        Command::Hours {
            time_in,
            time_out,
            overtime,
        } => run_hours(&time_in, &time_out, overtime),
        Command::Entry {
            name,
            in_photo,
            out_photo,
            overtime,
        } => run_entry(name, &in_photo, &out_photo, overtime, config).await,
    };

    terminate_global_engine().await;
    outcome
}

async fn read_photo(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn run_extract(image: &Path, optical_only: bool, json: bool, mut config: ExtractorConfig) -> Result<()> {
    if optical_only {
        config.metadata_fast_path = false;
    }
    let bytes = read_photo(image).await?;
    let extractor = TimestampExtractor::new(config);
    let result = extractor.extract(&bytes).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result(image, &result);
    Ok(())
}

fn print_result(image: &Path, result: &ExtractionResult) {
    match result {
        ExtractionResult::Success {
            time,
            date,
            matched_span,
            source,
            ..
        } => {
            println!(
                "{}: {} on {} ({}, from {:?} via {:?})",
                image.display(),
                time.to_naive_time().format("%H:%M:%S"),
                date,
                time.to_12h_string(),
                matched_span,
                source
            );
        }
        ExtractionResult::Failure { reason, raw_text } => {
            println!("{}: {}", image.display(), reason);
            if let Some(text) = raw_text {
                println!("  recognized text: {:?}", text);
            }
        }
    }
}

fn run_hours(time_in: &str, time_out: &str, overtime: f64) -> Result<()> {
    if overtime < 0.0 {
        return Err(anyhow!("Overtime cannot be negative: {}", overtime));
    }
    let hours = compute_from_fields(time_in, time_out, overtime);
    println!("{}", hours);
    Ok(())
}

async fn run_entry(
    name: String,
    in_photo: &Path,
    out_photo: &Path,
    overtime: f64,
    config: ExtractorConfig,
) -> Result<()> {
    let extractor = TimestampExtractor::new(config);
    let mut entry = ShiftEntry::new(name);
    entry.manual_overtime_hours = overtime;

    for (side, path) in [(ClockSide::In, in_photo), (ClockSide::Out, out_photo)] {
        let bytes = read_photo(path).await?;
        let result = extractor.extract(&bytes).await;
        print_result(path, &result);
        entry.attach_photo(side, path.display().to_string());
        if !entry.apply_extraction(side, &result) && !result.is_success() {
            println!("  time {} left blank", side);
        }
    }

    let issues = entry.validate();
    if !issues.is_empty() {
        for issue in &issues {
            println!("Cannot record entry: {}", issue);
        }
        return Err(anyhow!("Entry incomplete ({} issue(s))", issues.len()));
    }

    println!(
        "{} on {}: {} - {}",
        entry.employee_name,
        entry.date,
        entry.time_in.map(|t| t.to_12h_string()).unwrap_or_default(),
        entry.time_out.map(|t| t.to_12h_string()).unwrap_or_default()
    );
    println!("{}", entry.hours());
    Ok(())
}
