use std::collections::BTreeMap;

use clipcat_core::errors::{ClipcatError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::config::PlanConfig;
use crate::unit::ConcatUnit;

/// Default duration bin edges: 0-30s, 30-60s, 60-90s, 90-120s, 120s+.
pub const DEFAULT_BIN_EDGES: [f64; 4] = [30.0, 60.0, 90.0, 120.0];

/// Finer bins up to 240s+, matching the long-form analysis report.
pub const EXTENDED_BIN_EDGES: [f64; 8] = [30.0, 60.0, 90.0, 120.0, 150.0, 180.0, 210.0, 240.0];

/// Bounds a plan is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    /// Smallest expected member count.
    pub min_videos: usize,
    /// Largest expected member count.
    pub max_videos: usize,
    /// Lower bound of the target duration window.
    pub duration_min: f64,
    /// Upper bound of the target duration window.
    pub duration_max: f64,
    /// Strictly increasing upper edges of the duration bins; a final open bin
    /// collects everything at or above the last edge.
    pub bin_edges: Vec<f64>,
}

impl DistributionSpec {
    /// Bounds taken from a planner configuration with the default bins.
    pub fn from_config(config: &PlanConfig) -> Self {
        Self {
            min_videos: config.min_videos_per_concat,
            max_videos: config.max_videos_per_concat,
            duration_min: config.target_duration_min,
            duration_max: config.target_duration_max,
            bin_edges: DEFAULT_BIN_EDGES.to_vec(),
        }
    }

    /// Replaces the duration bin edges.
    pub fn with_bin_edges(mut self, edges: Vec<f64>) -> Result<Self, ClipcatError> {
        let increasing = edges.windows(2).all(|pair| pair[0] < pair[1]);
        let positive = edges.iter().all(|edge| edge.is_finite() && *edge > 0.0);
        if !increasing || !positive {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("bin-edges", "bin edges must be positive and strictly increasing")
                    .with_context("edges", format!("{edges:?}")),
            ));
        }
        self.bin_edges = edges;
        Ok(self)
    }
}

/// One duration histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationBin {
    /// Human readable label such as `30-60s` or `120s+`.
    pub label: String,
    /// Inclusive lower edge.
    pub lower: f64,
    /// Exclusive upper edge; `None` for the open last bin.
    pub upper: Option<f64>,
    /// Units whose total duration falls into the bin.
    pub count: usize,
}

/// Summary statistics over a set of durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    /// Number of observations.
    pub count: usize,
    /// Sum of all observations.
    pub sum: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Smallest observation.
    pub min: f64,
    /// Largest observation.
    pub max: f64,
    /// Median (mean of the two middle values for even counts).
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

impl DurationStats {
    /// Statistics of an empty sample.
    pub fn empty() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            mean: 0.0,
            min: 0.0,
            max: 0.0,
            median: 0.0,
            std_dev: 0.0,
        }
    }

    /// Computes statistics over `values`.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::empty();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let count = sorted.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let variance = values
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / count as f64;
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };
        Self {
            count,
            sum,
            mean,
            min: sorted[0],
            max: sorted[count - 1],
            median,
            std_dev: variance.sqrt(),
        }
    }
}

/// How often clips were reused across the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Clips appearing at least once.
    pub distinct_clips: usize,
    /// Total member slots across all units.
    pub placements: usize,
    /// Fewest uses of any clip that appears in the plan.
    pub min_uses: usize,
    /// Most uses of any clip.
    pub max_uses: usize,
    /// Mean uses per distinct clip.
    pub mean_uses: f64,
}

/// Post-hoc distribution report over a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    /// Units in the plan.
    pub units: usize,
    /// Units per member count; every count of the expected range is present.
    pub member_counts: BTreeMap<usize, usize>,
    /// Units whose member count lies outside the expected range.
    pub outside_member_range: usize,
    /// Duration histogram.
    pub duration_bins: Vec<DurationBin>,
    /// Units whose total duration lies outside the target window.
    pub out_of_window: usize,
    /// Statistics of unit total durations.
    pub total_duration: DurationStats,
    /// Statistics of individual clip segments.
    pub clip_duration: DurationStats,
    /// Clip reuse across the plan.
    pub usage: UsageStats,
}

impl DistributionReport {
    /// True when every unit respects both the member and duration windows.
    pub fn is_compliant(&self) -> bool {
        self.out_of_window == 0 && self.outside_member_range == 0
    }
}

/// Computes the distribution report. Never mutates the plan.
pub fn summarize(units: &[ConcatUnit], spec: &DistributionSpec) -> DistributionReport {
    let mut member_counts: BTreeMap<usize, usize> =
        (spec.min_videos..=spec.max_videos).map(|count| (count, 0)).collect();
    let mut outside_member_range = 0usize;
    let mut out_of_window = 0usize;
    let mut totals = Vec::with_capacity(units.len());
    let mut segments = Vec::new();
    let mut uses = BTreeMap::<&str, usize>::new();

    for unit in units {
        let count = unit.member_count();
        if count < spec.min_videos || count > spec.max_videos {
            outside_member_range += 1;
        } else {
            *member_counts.entry(count).or_insert(0) += 1;
        }
        if unit.total_duration < spec.duration_min || unit.total_duration > spec.duration_max {
            out_of_window += 1;
        }
        totals.push(unit.total_duration);
        for boundary in &unit.boundaries {
            segments.push(boundary.end_time - boundary.start_time);
        }
        for member in &unit.members {
            *uses.entry(member.as_str()).or_insert(0) += 1;
        }
    }

    DistributionReport {
        units: units.len(),
        member_counts,
        outside_member_range,
        duration_bins: duration_histogram(&totals, &spec.bin_edges),
        out_of_window,
        total_duration: DurationStats::from_values(&totals),
        clip_duration: DurationStats::from_values(&segments),
        usage: usage_stats(&uses),
    }
}

fn duration_histogram(values: &[f64], edges: &[f64]) -> Vec<DurationBin> {
    let mut bins = Vec::with_capacity(edges.len() + 1);
    let mut lower = 0.0;
    for &edge in edges {
        bins.push(DurationBin {
            label: format!("{lower}-{edge}s"),
            lower,
            upper: Some(edge),
            count: 0,
        });
        lower = edge;
    }
    bins.push(DurationBin {
        label: format!("{lower}s+"),
        lower,
        upper: None,
        count: 0,
    });
    for &value in values {
        let slot = edges
            .iter()
            .position(|&edge| value < edge)
            .unwrap_or(edges.len());
        bins[slot].count += 1;
    }
    bins
}

fn usage_stats(uses: &BTreeMap<&str, usize>) -> UsageStats {
    let placements: usize = uses.values().sum();
    let distinct_clips = uses.len();
    UsageStats {
        distinct_clips,
        placements,
        min_uses: uses.values().copied().min().unwrap_or(0),
        max_uses: uses.values().copied().max().unwrap_or(0),
        mean_uses: if distinct_clips == 0 {
            0.0
        } else {
            placements as f64 / distinct_clips as f64
        },
    }
}
