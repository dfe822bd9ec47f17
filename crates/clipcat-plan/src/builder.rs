use clipcat_core::errors::ClipcatError;
use clipcat_core::RngHandle;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PlanConfig;
use crate::policy::{SelectionContext, SelectionPolicy};
use crate::pool::{ClipIndex, ClipPool};
use crate::relax::{RelaxationController, RelaxationKind, RelaxationOutcome, RelaxationRequest};

/// Lifecycle of a unit under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitState {
    /// No clip placed yet.
    Empty,
    /// At least one clip placed, targets not met.
    Growing,
    /// Unit satisfied every bound and was kept.
    Accepted,
    /// Unit was discarded and its usage increments rolled back.
    Abandoned,
}

/// Why a unit was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbandonReason {
    /// No clip was eligible even after every relaxation.
    NoCandidate,
    /// Member ceiling reached while the duration was still under the minimum.
    BelowMinimumDuration,
    /// Growth stopped with fewer than the minimum number of members.
    TooFewMembers,
    /// The per-unit step budget ran out.
    StepBudgetExhausted,
}

impl AbandonReason {
    /// Stable label used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            AbandonReason::NoCandidate => "no-candidate",
            AbandonReason::BelowMinimumDuration => "below-minimum-duration",
            AbandonReason::TooFewMembers => "too-few-members",
            AbandonReason::StepBudgetExhausted => "step-budget-exhausted",
        }
    }
}

/// A unit that reached the `Accepted` state. Its members' usage counters are
/// already incremented in the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltUnit {
    /// Members in placement order.
    pub members: Vec<ClipIndex>,
    /// Sum of member durations.
    pub total_duration: f64,
    /// Ceiling the unit was held to (relaxed if duration widening fired).
    pub ceiling: f64,
    /// Member count drawn for the unit.
    pub target_members: usize,
    /// Relaxations used while growing, in order.
    pub relaxations: Vec<RelaxationKind>,
}

/// Terminal result of one builder run.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// The unit was kept.
    Accepted(BuiltUnit),
    /// The unit was discarded; the pool is unchanged.
    Abandoned {
        /// Cause of the abandonment.
        reason: AbandonReason,
        /// Member count drawn for the unit.
        target_members: usize,
        /// Relaxations used before giving up.
        relaxations: Vec<RelaxationKind>,
    },
}

impl UnitOutcome {
    /// Terminal state of the unit.
    pub fn state(&self) -> UnitState {
        match self {
            UnitOutcome::Accepted(_) => UnitState::Accepted,
            UnitOutcome::Abandoned { .. } => UnitState::Abandoned,
        }
    }

    /// Relaxations the unit went through.
    pub fn relaxations(&self) -> &[RelaxationKind] {
        match self {
            UnitOutcome::Accepted(unit) => &unit.relaxations,
            UnitOutcome::Abandoned { relaxations, .. } => relaxations,
        }
    }
}

struct GrowingUnit {
    members: Vec<ClipIndex>,
    total: f64,
    ceiling: f64,
    relaxations: Vec<RelaxationKind>,
}

impl GrowingUnit {
    fn in_window(&self, window_min: f64) -> bool {
        self.total >= window_min && self.total <= self.ceiling
    }

    fn acceptable(&self, config: &PlanConfig) -> bool {
        let count = self.members.len();
        self.in_window(config.target_duration_min)
            && count >= config.min_videos_per_concat
            && count <= config.max_videos_per_concat
    }

    fn deficiency(&self, config: &PlanConfig) -> AbandonReason {
        if self.members.len() < config.min_videos_per_concat {
            AbandonReason::TooFewMembers
        } else {
            AbandonReason::BelowMinimumDuration
        }
    }
}

/// Grows a single concatenation unit.
///
/// The builder draws a member target in `[min_videos, max_videos]`, then adds
/// clips picked by the [`SelectionPolicy`] until the target is met with the
/// duration inside the window. When strict selection runs dry it seals the
/// unit if it already satisfies every bound, and otherwise consults the
/// [`RelaxationController`]. Units that cannot be completed are rolled back.
#[derive(Debug)]
pub struct UnitBuilder<'a> {
    config: &'a PlanConfig,
    policy: SelectionPolicy,
    controller: &'a RelaxationController,
}

impl<'a> UnitBuilder<'a> {
    /// Creates a builder for the run described by `config`.
    pub fn new(config: &'a PlanConfig, controller: &'a RelaxationController) -> Self {
        Self {
            config,
            policy: SelectionPolicy::new(config.reuse_policy(), config.usage_cap()),
            controller,
        }
    }

    /// Strict selection policy used by the builder.
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Builds one unit, mutating `pool` only if the unit is accepted.
    pub fn build(
        &self,
        pool: &mut ClipPool,
        rng: &mut RngHandle,
    ) -> Result<UnitOutcome, ClipcatError> {
        let config = self.config;
        let target =
            rng.gen_range(config.min_videos_per_concat..=config.max_videos_per_concat);
        let mut unit = GrowingUnit {
            members: Vec::with_capacity(config.max_videos_per_concat),
            total: 0.0,
            ceiling: config.target_duration_max,
            relaxations: Vec::new(),
        };

        let mut steps = 0usize;
        let stop = loop {
            let count = unit.members.len();
            if count >= target && unit.in_window(config.target_duration_min) {
                break None;
            }
            if count >= config.max_videos_per_concat {
                break None;
            }
            if steps >= config.max_steps_per_unit {
                break Some(AbandonReason::StepBudgetExhausted);
            }
            steps += 1;

            let ctx = SelectionContext {
                members: &unit.members,
                current_duration: unit.total,
                window_min: config.target_duration_min,
                ceiling: unit.ceiling,
                closing: count + 1 >= target,
            };
            let (clip, relaxed) = match self.policy.pick(pool, &ctx, rng) {
                Some(clip) => (clip, None),
                None if unit.acceptable(config) => break None,
                None => {
                    let request = RelaxationRequest {
                        ctx,
                        policy: self.policy,
                    };
                    match self.controller.relax(&request, pool, rng) {
                        RelaxationOutcome::Candidate(pick) => (pick.clip, Some(pick)),
                        RelaxationOutcome::Exhausted => break Some(AbandonReason::NoCandidate),
                    }
                }
            };

            if let Some(pick) = relaxed {
                unit.relaxations.push(pick.kind);
                if let Some(ceiling) = pick.ceiling {
                    unit.ceiling = unit.ceiling.max(ceiling);
                }
            }
            let duration = pool.get(clip).map_or(0.0, |clip| clip.duration);
            pool.increment_at(clip)?;
            unit.members.push(clip);
            unit.total += duration;
        };

        if unit.acceptable(config) {
            return Ok(UnitOutcome::Accepted(BuiltUnit {
                members: unit.members,
                total_duration: unit.total,
                ceiling: unit.ceiling,
                target_members: target,
                relaxations: unit.relaxations,
            }));
        }

        let reason = stop.unwrap_or_else(|| unit.deficiency(config));
        for &clip in unit.members.iter().rev() {
            pool.revert_at(clip)?;
        }
        debug!(
            reason = reason.as_str(),
            members = unit.members.len(),
            total = unit.total,
            target,
            "unit abandoned and rolled back"
        );
        Ok(UnitOutcome::Abandoned {
            reason,
            target_members: target,
            relaxations: unit.relaxations,
        })
    }
}
