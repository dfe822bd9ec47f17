use std::fs;
use std::path::Path;

use clipcat_core::errors::{ClipcatError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Number of concatenation units requested.
    #[serde(default = "default_total_concats")]
    pub total_concats: usize,
    /// Minimum number of clips per unit (hard floor).
    #[serde(default = "default_min_videos")]
    pub min_videos_per_concat: usize,
    /// Maximum number of clips per unit.
    #[serde(default = "default_max_videos")]
    pub max_videos_per_concat: usize,
    /// Lower bound of the target duration window, in seconds.
    #[serde(default = "default_duration_min")]
    pub target_duration_min: f64,
    /// Upper bound of the target duration window, in seconds.
    #[serde(default = "default_duration_max")]
    pub target_duration_max: f64,
    /// Whether a clip may appear in more than one unit.
    #[serde(default = "default_allow_reuse")]
    pub allow_reuse: bool,
    /// Reuse strategy applied when `allow_reuse` is set.
    #[serde(default)]
    pub reuse_mode: ReuseMode,
    /// Per-clip usage cap expressed as a ratio of `total_concats`.
    #[serde(default = "default_max_usage_ratio")]
    pub max_usage_ratio: f64,
    /// Master seed for every random decision of the run.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Builder attempts per slot before the slot is reported as unfilled.
    #[serde(default = "default_max_attempts_per_slot")]
    pub max_attempts_per_slot: usize,
    /// Upper bound on growth steps for a single unit.
    #[serde(default = "default_max_steps_per_unit")]
    pub max_steps_per_unit: usize,
    /// Clips shorter than this are dropped when the pool is loaded.
    #[serde(default)]
    pub min_clip_duration: Option<f64>,
    /// Relaxation cascade tuning.
    #[serde(default)]
    pub relaxation: RelaxationConfig,
}

fn default_total_concats() -> usize {
    500
}

fn default_min_videos() -> usize {
    2
}

fn default_max_videos() -> usize {
    4
}

fn default_duration_min() -> f64 {
    20.0
}

fn default_duration_max() -> f64 {
    60.0
}

fn default_allow_reuse() -> bool {
    true
}

fn default_max_usage_ratio() -> f64 {
    2.0
}

fn default_seed() -> u64 {
    42
}

fn default_max_attempts_per_slot() -> usize {
    5
}

fn default_max_steps_per_unit() -> usize {
    100
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            total_concats: default_total_concats(),
            min_videos_per_concat: default_min_videos(),
            max_videos_per_concat: default_max_videos(),
            target_duration_min: default_duration_min(),
            target_duration_max: default_duration_max(),
            allow_reuse: default_allow_reuse(),
            reuse_mode: ReuseMode::default(),
            max_usage_ratio: default_max_usage_ratio(),
            seed: default_seed(),
            max_attempts_per_slot: default_max_attempts_per_slot(),
            max_steps_per_unit: default_max_steps_per_unit(),
            min_clip_duration: None,
            relaxation: RelaxationConfig::default(),
        }
    }
}

/// Reuse strategy used when clips may appear in several units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReuseMode {
    /// Prefer the least used clips.
    #[default]
    Balanced,
    /// Ignore usage counts apart from the hard cap.
    Random,
}

/// Effective selection policy derived from `allow_reuse` and `reuse_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReusePolicy {
    /// Minimum-usage candidates only, ties broken at random.
    Balanced,
    /// Uniform over all candidates under the cap.
    Random,
    /// Every clip is used at most once across the whole plan.
    NoReuse,
}

impl ReusePolicy {
    /// Whether the policy admits clips that were already used.
    pub fn allows_reuse(&self) -> bool {
        !matches!(self, ReusePolicy::NoReuse)
    }
}

/// Smallest non-zero `usage_ratio_step` accepted by validation.
pub const MIN_USAGE_RATIO_STEP: f64 = 1e-3;

/// Parameters of the relaxation cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxationConfig {
    /// Duration widening only fires while the unit is below this fraction of
    /// `target_duration_min`.
    #[serde(default = "default_early_fill_ratio")]
    pub early_fill_ratio: f64,
    /// Allowed overshoot of `target_duration_max`, as a fraction of it.
    #[serde(default = "default_overshoot_tolerance")]
    pub overshoot_tolerance: f64,
    /// Increment added to the usage ratio on each cap-widening retry.
    #[serde(default = "default_usage_ratio_step")]
    pub usage_ratio_step: f64,
    /// Upper bound of cap widening, as a multiple of `max_usage_ratio`.
    #[serde(default = "default_max_usage_relaxation")]
    pub max_usage_relaxation: f64,
}

fn default_early_fill_ratio() -> f64 {
    0.5
}

fn default_overshoot_tolerance() -> f64 {
    0.1
}

fn default_usage_ratio_step() -> f64 {
    0.5
}

fn default_max_usage_relaxation() -> f64 {
    2.0
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            early_fill_ratio: default_early_fill_ratio(),
            overshoot_tolerance: default_overshoot_tolerance(),
            usage_ratio_step: default_usage_ratio_step(),
            max_usage_relaxation: default_max_usage_relaxation(),
        }
    }
}

impl PlanConfig {
    /// Loads a configuration from a YAML file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ClipcatError> {
        let contents = fs::read(path).map_err(|err| {
            ClipcatError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_slice(&contents).map_err(|err| match err {
            ClipcatError::Serde(info) => {
                ClipcatError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Parses a configuration from YAML bytes.
    pub fn from_yaml_slice(data: &[u8]) -> Result<Self, ClipcatError> {
        serde_yaml::from_slice(data)
            .map_err(|err| ClipcatError::Serde(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Serializes the configuration to YAML.
    pub fn to_yaml_string(&self) -> Result<String, ClipcatError> {
        serde_yaml::to_string(self)
            .map_err(|err| ClipcatError::Serde(ErrorInfo::new("config-serialize", err.to_string())))
    }

    /// Effective selection policy for this run.
    pub fn reuse_policy(&self) -> ReusePolicy {
        match (self.allow_reuse, self.reuse_mode) {
            (false, _) => ReusePolicy::NoReuse,
            (true, ReuseMode::Balanced) => ReusePolicy::Balanced,
            (true, ReuseMode::Random) => ReusePolicy::Random,
        }
    }

    /// Hard per-clip usage cap: `ceil(max_usage_ratio * total_concats)`.
    pub fn usage_cap(&self) -> usize {
        usage_cap_for_ratio(self.max_usage_ratio, self.total_concats)
    }

    /// Duration ceiling granted to units that used duration widening.
    pub fn relaxed_duration_max(&self) -> f64 {
        self.target_duration_max * (1.0 + self.relaxation.overshoot_tolerance)
    }

    /// Rejects configurations that cannot describe a valid run.
    pub fn validate(&self) -> Result<(), ClipcatError> {
        if self.total_concats == 0 {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("zero-concats", "total_concats must be positive")
                    .with_hint("request at least one concatenation unit"),
            ));
        }
        if self.min_videos_per_concat == 0 {
            return Err(ClipcatError::config(
                "zero-min-videos",
                "min_videos_per_concat must be at least 1",
            ));
        }
        if self.min_videos_per_concat > self.max_videos_per_concat {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new(
                    "member-window",
                    "min_videos_per_concat exceeds max_videos_per_concat",
                )
                .with_context("min", self.min_videos_per_concat.to_string())
                .with_context("max", self.max_videos_per_concat.to_string()),
            ));
        }
        if !self.target_duration_min.is_finite()
            || !self.target_duration_max.is_finite()
            || self.target_duration_min < 0.0
            || self.target_duration_max <= 0.0
        {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("duration-bounds", "duration bounds must be finite and positive")
                    .with_context("min", self.target_duration_min.to_string())
                    .with_context("max", self.target_duration_max.to_string()),
            ));
        }
        if self.target_duration_min > self.target_duration_max {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new(
                    "duration-window",
                    "target_duration_min exceeds target_duration_max",
                )
                .with_context("min", self.target_duration_min.to_string())
                .with_context("max", self.target_duration_max.to_string()),
            ));
        }
        if self.allow_reuse && !(self.max_usage_ratio.is_finite() && self.max_usage_ratio > 0.0) {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("usage-ratio", "max_usage_ratio must be positive when reuse is on")
                    .with_context("max_usage_ratio", self.max_usage_ratio.to_string()),
            ));
        }
        if self.max_attempts_per_slot == 0 || self.max_steps_per_unit == 0 {
            return Err(ClipcatError::config(
                "zero-budget",
                "max_attempts_per_slot and max_steps_per_unit must be positive",
            ));
        }
        if let Some(min_clip) = self.min_clip_duration {
            if !min_clip.is_finite() || min_clip < 0.0 {
                return Err(ClipcatError::Configuration(
                    ErrorInfo::new("min-clip-duration", "min_clip_duration must be non-negative")
                        .with_context("min_clip_duration", min_clip.to_string()),
                ));
            }
        }
        self.relaxation.validate()
    }
}

impl RelaxationConfig {
    fn validate(&self) -> Result<(), ClipcatError> {
        let fields = [
            ("early_fill_ratio", self.early_fill_ratio),
            ("overshoot_tolerance", self.overshoot_tolerance),
            ("usage_ratio_step", self.usage_ratio_step),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ClipcatError::Configuration(
                    ErrorInfo::new("relaxation", "relaxation parameters must be non-negative")
                        .with_context("field", name)
                        .with_context("value", value.to_string()),
                ));
            }
        }
        if self.usage_ratio_step > 0.0 && self.usage_ratio_step < MIN_USAGE_RATIO_STEP {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("relaxation", "usage_ratio_step is too small to widen the cap")
                    .with_context("value", self.usage_ratio_step.to_string())
                    .with_hint("use 0 to disable usage-cap widening"),
            ));
        }
        if !self.max_usage_relaxation.is_finite() || self.max_usage_relaxation < 1.0 {
            return Err(ClipcatError::Configuration(
                ErrorInfo::new("relaxation", "max_usage_relaxation must be at least 1.0")
                    .with_context("value", self.max_usage_relaxation.to_string()),
            ));
        }
        Ok(())
    }
}

/// Converts a usage ratio into an absolute per-clip cap.
pub fn usage_cap_for_ratio(ratio: f64, total_concats: usize) -> usize {
    // Absorb representation error so 0.3 * 10 yields 3, not 4.
    (ratio * total_concats as f64 - 1e-9).ceil().max(0.0) as usize
}
