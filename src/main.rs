use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use fwistats::catalog::FsCatalog;
use fwistats::cli::{Cli, Commands, resolve_config, selected_metrics};
use fwistats::config::StageContext;
use fwistats::log::{config_echo, init_logging, show_farewell_with_timing, show_greeting};
use fwistats::{StageRequest, run_stage};
use std::env;
use std::fs::File;
use std::io;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let request = match &cli.command {
        Commands::Completions { shell, output } => {
            let mut cmd = Cli::command();
            match output {
                Some(path) => {
                    let mut file = File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    generate(*shell, &mut cmd, "fwistats", &mut file);
                }
                None => generate(*shell, &mut cmd, "fwistats", &mut io::stdout()),
            }
            return Ok(());
        }
        Commands::SeasonalMean { ens_group, .. } => StageRequest::SeasonalMean { ens_group: *ens_group },
        Commands::FireSeasonLength { .. } => StageRequest::FireSeasonLength,
        Commands::EnsembleStats { scenario, metrics, .. } => StageRequest::EnsembleStats {
            scenario: *scenario,
            metrics: selected_metrics(metrics),
        },
    };
    let forcing = cli
        .command
        .forcing()
        .context("Command does not select a forcing dataset")?;

    let start_time = Instant::now();
    let invocation = env::args().collect::<Vec<_>>().join(" ");
    show_greeting(&invocation);

    let config = resolve_config(&cli).context("Failed to load configuration")?;
    let mut ctx = StageContext::new(config, forcing, invocation);
    ctx.dry_run = cli.dry_run;
    config_echo(&ctx);

    let written = run_stage(&ctx, &FsCatalog, &request)
        .with_context(|| format!("Stage {:?} failed for {}", request, ctx.version()))?;

    show_farewell_with_timing(start_time.elapsed(), written.len());
    Ok(())
}
