use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hwsurvey_scraping::{
    config::Config,
    runner::{Runner, Survey},
    schedule::{ensure_scheduled_on_host, Cadence, JobSpec},
};
use itertools::Itertools;
use log::{info, warn};
use strum::IntoEnumIterator;

/// Scrapes the Steam hardware survey into `;`-separated files and keeps
/// itself scheduled to do so again.
#[derive(Parser)]
struct Opts {
    /// TOML file overriding the built-in settings.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    cadence: Option<Cadence>,
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// Do not check for or install the recurring job.
    #[arg(long)]
    no_schedule: bool,
    /// Scrape a single survey instead of both.
    #[arg(long, value_enum)]
    only: Option<Survey>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let mut config = Config::load(opts.config.as_deref())?;
    if let Some(cadence) = opts.cadence {
        config.cadence = cadence;
    }
    if let Some(export_dir) = &opts.export_dir {
        config.export_dir = Some(export_dir.clone());
    }

    if opts.no_schedule {
        info!("Skipping scheduler registration.");
    } else if let Err(e) = schedule_self(&opts, &config) {
        warn!("Failed to register the recurring job: {e:#}");
    }

    let surveys = match opts.only {
        Some(survey) => vec![survey],
        None => Survey::iter().collect_vec(),
    };
    Runner::new(config)?.run(&surveys).await
}

/// The scheduled command repeats the options that change what a run does,
/// so that unattended runs behave like this one.
fn schedule_self(opts: &Opts, config: &Config) -> anyhow::Result<()> {
    let program = std::env::current_exe().context("Failed to locate the running executable")?;
    let mut args = vec![];
    if let Some(path) = &opts.config {
        args.push("--config".to_owned());
        args.push(fs_err::canonicalize(path)?.display().to_string());
    }
    if let Some(dir) = &opts.export_dir {
        args.push("--export-dir".to_owned());
        args.push(dir.display().to_string());
    }
    let job = JobSpec::builder()
        .program(program)
        .args(args)
        .task_name(config.task_name.clone())
        .cadence(config.cadence)
        .build();
    ensure_scheduled_on_host(&job)?;
    Ok(())
}
