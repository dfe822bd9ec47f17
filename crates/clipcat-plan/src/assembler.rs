use std::collections::BTreeMap;

use clipcat_core::errors::ClipcatError;
use clipcat_core::RngHandle;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::builder::{BuiltUnit, UnitBuilder, UnitOutcome};
use crate::config::{PlanConfig, ReusePolicy};
use crate::metadata::{filter_short_clips, ClipRecord};
use crate::pool::ClipPool;
use crate::relax::{RelaxationController, RelaxationKind};
use crate::unit::ConcatUnit;

const PROGRESS_INTERVAL: usize = 100;

/// Minimum and maximum usage count across the pool at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSpread {
    /// Smallest usage count of any clip (unused clips count as zero).
    pub min: usize,
    /// Largest usage count of any clip.
    pub max: usize,
}

impl UsageSpread {
    /// `max - min`.
    pub fn width(&self) -> usize {
        self.max - self.min
    }
}

/// Run-level diagnostics returned next to the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Units requested by the configuration.
    pub requested: usize,
    /// Units accepted into the plan.
    pub accepted: usize,
    /// `requested - accepted`.
    pub shortfall: usize,
    /// Slots that stayed empty after every retry.
    pub unfilled_slots: Vec<usize>,
    /// Builder runs that ended in abandonment.
    pub abandoned_attempts: usize,
    /// Abandonments grouped by reason.
    pub abandon_reasons: BTreeMap<String, usize>,
    /// Accepted units that used duration widening.
    pub duration_relaxations: usize,
    /// Accepted units that used usage-cap widening.
    pub usage_relaxations: usize,
    /// Effective selection policy.
    pub reuse_policy: ReusePolicy,
    /// Hard per-clip usage cap of the run.
    pub usage_cap: usize,
    /// Clips available to the planner.
    pub pool_size: usize,
    /// Final usage spread over the pool.
    pub usage_spread: UsageSpread,
}

/// Plan entries together with the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    /// Accepted units in emission order.
    pub units: Vec<ConcatUnit>,
    /// Diagnostics for the run.
    pub summary: PlanSummary,
    /// Usage counter of every clip at the end of the run, in pool order.
    pub usage: Vec<(String, usize)>,
}

/// Runs the planner end to end: validates the configuration, builds the pool
/// from `records` and assembles `total_concats` units from a generator seeded
/// with `config.seed`.
pub fn plan(config: &PlanConfig, records: Vec<ClipRecord>) -> Result<PlanOutcome, ClipcatError> {
    config.validate()?;
    let records = match config.min_clip_duration {
        Some(min_duration) => filter_short_clips(records, min_duration),
        None => records,
    };
    let mut pool = ClipPool::load(records)?;
    let mut rng = RngHandle::from_seed(config.seed);
    assemble(config, &mut pool, &mut rng)
}

/// Assembles a plan over an existing pool with the standard relaxation
/// cascade.
pub fn assemble(
    config: &PlanConfig,
    pool: &mut ClipPool,
    rng: &mut RngHandle,
) -> Result<PlanOutcome, ClipcatError> {
    let controller = RelaxationController::from_config(config);
    assemble_with(config, &controller, pool, rng)
}

/// Assembles a plan with a caller-supplied relaxation controller.
///
/// Slots are filled strictly in sequence; every unit is accepted or rolled
/// back before the next one starts. A slot whose attempts are all abandoned
/// is recorded in the summary and skipped.
pub fn assemble_with(
    config: &PlanConfig,
    controller: &RelaxationController,
    pool: &mut ClipPool,
    rng: &mut RngHandle,
) -> Result<PlanOutcome, ClipcatError> {
    config.validate()?;
    let builder = UnitBuilder::new(config, controller);
    let policy = builder.policy();
    info!(
        clips = pool.len(),
        total_concats = config.total_concats,
        policy = ?policy.policy,
        usage_cap = policy.usage_cap,
        seed = config.seed,
        "planning concatenation units"
    );

    let mut units = Vec::with_capacity(config.total_concats);
    let mut unfilled_slots = Vec::new();
    let mut abandoned_attempts = 0usize;
    let mut abandon_reasons = BTreeMap::<String, usize>::new();
    let mut duration_relaxations = 0usize;
    let mut usage_relaxations = 0usize;

    for slot in 0..config.total_concats {
        let mut accepted: Option<BuiltUnit> = None;
        for _attempt in 0..config.max_attempts_per_slot {
            match builder.build(pool, rng)? {
                UnitOutcome::Accepted(unit) => {
                    accepted = Some(unit);
                    break;
                }
                UnitOutcome::Abandoned { reason, .. } => {
                    abandoned_attempts += 1;
                    *abandon_reasons.entry(reason.as_str().to_string()).or_insert(0) += 1;
                }
            }
        }

        match accepted {
            Some(unit) => {
                if unit.relaxations.contains(&RelaxationKind::DurationWidening) {
                    duration_relaxations += 1;
                }
                if unit.relaxations.contains(&RelaxationKind::UsageCapWidening) {
                    usage_relaxations += 1;
                }
                let clips = unit
                    .members
                    .iter()
                    .filter_map(|&index| pool.get(index))
                    .map(|clip| (clip.id.as_str(), clip.duration));
                units.push(ConcatUnit::from_clips(units.len(), clips));
            }
            None => {
                warn!(
                    slot,
                    attempts = config.max_attempts_per_slot,
                    "no unit could be assembled for slot, skipping"
                );
                unfilled_slots.push(slot);
            }
        }

        if (slot + 1) % PROGRESS_INTERVAL == 0 {
            info!(
                "processed {}/{} slots ({} units accepted)",
                slot + 1,
                config.total_concats,
                units.len()
            );
        }
    }

    let (min, max) = pool.usage_spread();
    let summary = PlanSummary {
        requested: config.total_concats,
        accepted: units.len(),
        shortfall: config.total_concats - units.len(),
        unfilled_slots,
        abandoned_attempts,
        abandon_reasons,
        duration_relaxations,
        usage_relaxations,
        reuse_policy: policy.policy,
        usage_cap: policy.usage_cap,
        pool_size: pool.len(),
        usage_spread: UsageSpread { min, max },
    };
    if summary.shortfall > 0 {
        warn!(
            requested = summary.requested,
            accepted = summary.accepted,
            shortfall = summary.shortfall,
            "plan is short of the requested unit count"
        );
    }
    info!(
        accepted = summary.accepted,
        requested = summary.requested,
        "generated concatenation plan"
    );

    Ok(PlanOutcome {
        units,
        summary,
        usage: pool.usage_counts(),
    })
}
