use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, ValueEnum};
use clipcat_plan::{
    load_records, plan, summarize, write_run, DistributionSpec, PlanConfig, ReuseMode,
    RunManifest,
};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// JSON array of clip metadata (`video_name`, `duration_sec`, `video_path`).
    #[arg(long)]
    pub metadata: PathBuf,
    /// Output directory for the plan, manifest and distribution report.
    #[arg(long)]
    pub out: PathBuf,
    /// Optional YAML configuration; the flags below override its fields.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Master seed for the run.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of concatenation units to plan.
    #[arg(long)]
    pub total_concats: Option<usize>,
    /// Use every clip at most once across the plan.
    #[arg(long)]
    pub no_reuse: bool,
    /// Reuse strategy when clips may repeat.
    #[arg(long, value_enum)]
    pub reuse_mode: Option<ReuseModeArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ReuseModeArg {
    Balanced,
    Random,
}

impl From<ReuseModeArg> for ReuseMode {
    fn from(value: ReuseModeArg) -> Self {
        match value {
            ReuseModeArg::Balanced => ReuseMode::Balanced,
            ReuseModeArg::Random => ReuseMode::Random,
        }
    }
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(args)?;
    let records = load_records(&args.metadata)?;
    let outcome = plan(&config, records.clone())?;

    let report = summarize(&outcome.units, &DistributionSpec::from_config(&config));
    let manifest = RunManifest::new(&config, &records, &outcome, Utc::now().to_rfc3339())?;
    let artifacts = write_run(&args.out, &outcome, &manifest, &report)?;

    // Persist the effective configuration for reproducibility.
    fs::write(args.out.join("config.yaml"), config.to_yaml_string()?)?;

    if !report.is_compliant() {
        warn!(
            out_of_window = report.out_of_window,
            outside_member_range = report.outside_member_range,
            "plan contains units outside the target windows"
        );
    }
    info!(
        plan = %artifacts.plan.display(),
        units = outcome.summary.accepted,
        shortfall = outcome.summary.shortfall,
        plan_hash = %manifest.provenance.plan_hash,
        "wrote concatenation plan"
    );
    Ok(())
}

fn resolve_config(args: &PlanArgs) -> Result<PlanConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => PlanConfig::load(path)?,
        None => PlanConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(total) = args.total_concats {
        config.total_concats = total;
    }
    if args.no_reuse {
        config.allow_reuse = false;
    }
    if let Some(mode) = args.reuse_mode {
        config.reuse_mode = mode.into();
    }
    Ok(config)
}
