use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use clipcat_core::errors::{ClipcatError, ErrorInfo};
use clipcat_plan::manifest::write_report;
use clipcat_plan::{load_plan, summarize, DistributionSpec, PlanConfig};
use tracing::info;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Plan file (`concat_metadata.json`) to analyse.
    #[arg(long)]
    pub plan: PathBuf,
    /// Comma separated upper edges of the duration bins.
    #[arg(long, value_delimiter = ',')]
    pub bin_edges: Option<Vec<f64>>,
    /// Smallest expected member count.
    #[arg(long)]
    pub min_videos: Option<usize>,
    /// Largest expected member count.
    #[arg(long)]
    pub max_videos: Option<usize>,
    /// Lower bound of the target duration window, in seconds.
    #[arg(long)]
    pub duration_min: Option<f64>,
    /// Upper bound of the target duration window, in seconds.
    #[arg(long)]
    pub duration_max: Option<f64>,
    /// Also write the report to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &StatsArgs) -> Result<(), Box<dyn Error>> {
    let spec = distribution_spec(args)?;
    let units = load_plan(&args.plan)?;
    let report = summarize(&units, &spec);

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(path) = &args.out {
        write_report(path, &report)?;
        info!(path = %path.display(), "wrote distribution report");
    }
    Ok(())
}

fn distribution_spec(args: &StatsArgs) -> Result<DistributionSpec, ClipcatError> {
    let mut spec = DistributionSpec::from_config(&PlanConfig::default());
    if let Some(min) = args.min_videos {
        spec.min_videos = min;
    }
    if let Some(max) = args.max_videos {
        spec.max_videos = max;
    }
    if let Some(min) = args.duration_min {
        spec.duration_min = min;
    }
    if let Some(max) = args.duration_max {
        spec.duration_max = max;
    }
    if spec.min_videos > spec.max_videos || spec.duration_min > spec.duration_max {
        return Err(ClipcatError::Configuration(
            ErrorInfo::new("report-window", "report bounds are inverted")
                .with_context("videos", format!("{}..={}", spec.min_videos, spec.max_videos))
                .with_context(
                    "duration",
                    format!("{}..={}", spec.duration_min, spec.duration_max),
                ),
        ));
    }
    match &args.bin_edges {
        Some(edges) => spec.with_bin_edges(edges.clone()),
        None => Ok(spec),
    }
}
