use crate::config::StageContext;
use env_logger::{Builder, Env};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, info, log_enabled};
use std::time::Duration;

/// Initializes `env_logger`. `RUST_LOG` applies unless a flag overrides it.
pub fn init_logging(verbose: bool, quiet: bool) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if quiet {
        builder.filter_level(LevelFilter::Error);
    }
    builder.format_timestamp_secs();
    builder.try_init().ok();
}

pub fn show_greeting(command: &str) {
    info!("=== Fire Weather Summary Statistics ===");
    info!("Running: {}", command);
}

pub fn config_echo(ctx: &StageContext) {
    let config = &ctx.config;
    info!("Configuration:");
    info!("  Dataset version: {}", ctx.version());
    info!("  Output data: {}", config.output_data.display());
    info!("  Input data: {}", config.input_data.display());
    if let Some(working) = &config.working_data {
        info!("  Working data: {}", working.display());
    }
    info!("  Ensemble size: {}", config.ensemble_size);
    info!("  Latitude rows per read: {}", config.lat_chunk);
    info!("  Git revision: {}", ctx.git_revision);
    if ctx.dry_run {
        info!("  Dry run: inputs are discovered but nothing is written");
    }
}

/// Progress bar over files, hidden when info logging is off
pub fn progress_bar(len: u64, prefix: &str) -> ProgressBar {
    if !log_enabled!(Level::Info) {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::default_bar()
        .template("{prefix:>20} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    ProgressBar::new(len).with_style(style).with_prefix(prefix.to_string())
}

pub fn show_farewell_with_timing(elapsed: Duration, written: usize) {
    info!("Wrote {} files", written);
    info!("=== Completed in {:.2}s ===", elapsed.as_secs_f64());
}
