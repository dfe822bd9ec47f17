use std::fmt::Debug;

use clipcat_core::RngHandle;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{usage_cap_for_ratio, PlanConfig};
use crate::policy::{SelectionContext, SelectionPolicy};
use crate::pool::{ClipIndex, ClipPool};

/// Relaxation strategies known to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelaxationKind {
    /// Admit a clip that overshoots the duration maximum slightly.
    DurationWidening,
    /// Retry selection under a raised usage cap.
    UsageCapWidening,
}

impl RelaxationKind {
    /// Stable label used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelaxationKind::DurationWidening => "duration-widening",
            RelaxationKind::UsageCapWidening => "usage-cap-widening",
        }
    }
}

/// A clip granted by a relaxation strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxedPick {
    /// Chosen clip.
    pub clip: ClipIndex,
    /// Strategy that produced the clip.
    pub kind: RelaxationKind,
    /// New duration ceiling the unit must honour from now on, if widened.
    pub ceiling: Option<f64>,
    /// Usage cap the pick was made under, if widened.
    pub usage_cap: Option<usize>,
}

/// Result of one relaxation strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelaxationOutcome {
    /// The strategy found a clip.
    Candidate(RelaxedPick),
    /// The strategy does not apply or found nothing.
    Exhausted,
}

/// State handed to relaxation strategies.
#[derive(Debug, Clone, Copy)]
pub struct RelaxationRequest<'a> {
    /// Unit being grown.
    pub ctx: SelectionContext<'a>,
    /// Strict selection policy of the run.
    pub policy: SelectionPolicy,
}

/// One step of the relaxation cascade.
pub trait Relaxation: Debug + Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> RelaxationKind;

    /// Tries to produce a clip for the unit described by `request`.
    fn attempt(
        &self,
        request: &RelaxationRequest<'_>,
        pool: &ClipPool,
        rng: &mut RngHandle,
    ) -> RelaxationOutcome;
}

/// Lets a unit that is still far below the minimum take a clip overshooting
/// the maximum by a bounded tolerance.
///
/// Only fires while the unit holds fewer than `min_members` clips and its
/// duration is below `early_fill_ratio * window_min`. The clip with the
/// smallest overshoot wins; ties go to the clip inserted first.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationWidening {
    /// Fraction of the window minimum below which widening is allowed.
    pub early_fill_ratio: f64,
    /// Unrelaxed duration maximum.
    pub window_max: f64,
    /// Ceiling granted to the unit once widening is used.
    pub relaxed_ceiling: f64,
    /// Member-count floor of a unit.
    pub min_members: usize,
}

impl Relaxation for DurationWidening {
    fn kind(&self) -> RelaxationKind {
        RelaxationKind::DurationWidening
    }

    fn attempt(
        &self,
        request: &RelaxationRequest<'_>,
        pool: &ClipPool,
        _rng: &mut RngHandle,
    ) -> RelaxationOutcome {
        let ctx = &request.ctx;
        let early = ctx.current_duration < self.early_fill_ratio * ctx.window_min;
        if !early || ctx.members.len() >= self.min_members {
            return RelaxationOutcome::Exhausted;
        }
        let widened: Vec<ClipIndex> = pool
            .clips()
            .enumerate()
            .filter(|(index, clip)| {
                !ctx.contains(*index) && ctx.current_duration + clip.duration <= self.relaxed_ceiling
            })
            .map(|(index, _)| index)
            .collect();
        let admissible = request.policy.usage_filter(pool, &widened);
        let best = admissible
            .into_iter()
            .filter_map(|index| pool.get(index).map(|clip| (index, clip.duration)))
            .map(|(index, duration)| {
                let overshoot = (ctx.current_duration + duration - self.window_max).max(0.0);
                (index, overshoot)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        match best {
            Some((clip, _)) => RelaxationOutcome::Candidate(RelaxedPick {
                clip,
                kind: self.kind(),
                ceiling: Some(self.relaxed_ceiling),
                usage_cap: None,
            }),
            None => RelaxationOutcome::Exhausted,
        }
    }
}

/// Retries strict selection under progressively raised usage caps.
///
/// The caps are absolute and fixed at construction: they start one ratio
/// step above the base cap, advance by at least one use per level and stop
/// at the cap of `max_ratio`. A clip is placed at most once per unit, so no
/// cap exceeds `total_concats`. Never applies to runs without reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCapWidening {
    caps: Vec<usize>,
}

impl UsageCapWidening {
    /// Derives the cap ladder from ratios scaled by `total_concats`.
    pub fn new(base_ratio: f64, step: f64, max_ratio: f64, total_concats: usize) -> Self {
        let base_cap = usage_cap_for_ratio(base_ratio, total_concats);
        let max_cap = usage_cap_for_ratio(max_ratio, total_concats).min(total_concats);
        let mut caps = Vec::new();
        if step > 0.0 && max_cap > base_cap {
            let stride = usage_cap_for_ratio(step, total_concats).max(1);
            let mut cap = base_cap.saturating_add(stride);
            while cap < max_cap {
                caps.push(cap);
                cap = cap.saturating_add(stride);
            }
            caps.push(max_cap);
        }
        Self { caps }
    }

    /// Absolute caps tried by this strategy, in order.
    pub fn caps(&self) -> &[usize] {
        &self.caps
    }
}

impl Relaxation for UsageCapWidening {
    fn kind(&self) -> RelaxationKind {
        RelaxationKind::UsageCapWidening
    }

    fn attempt(
        &self,
        request: &RelaxationRequest<'_>,
        pool: &ClipPool,
        rng: &mut RngHandle,
    ) -> RelaxationOutcome {
        if !request.policy.policy.allows_reuse() {
            return RelaxationOutcome::Exhausted;
        }
        for &cap in &self.caps {
            let widened = request.policy.with_cap(cap);
            if let Some(clip) = widened.pick(pool, &request.ctx, rng) {
                return RelaxationOutcome::Candidate(RelaxedPick {
                    clip,
                    kind: self.kind(),
                    ceiling: None,
                    usage_cap: Some(cap),
                });
            }
        }
        RelaxationOutcome::Exhausted
    }
}

/// Ordered fallback chain consulted when strict selection finds nothing.
#[derive(Debug)]
pub struct RelaxationController {
    steps: Vec<Box<dyn Relaxation>>,
}

impl RelaxationController {
    /// Standard cascade: duration widening, then usage-cap widening.
    pub fn from_config(config: &PlanConfig) -> Self {
        let relaxation = &config.relaxation;
        Self::with_steps(vec![
            Box::new(DurationWidening {
                early_fill_ratio: relaxation.early_fill_ratio,
                window_max: config.target_duration_max,
                relaxed_ceiling: config.relaxed_duration_max(),
                min_members: config.min_videos_per_concat,
            }),
            Box::new(UsageCapWidening::new(
                config.max_usage_ratio,
                relaxation.usage_ratio_step,
                config.max_usage_ratio * relaxation.max_usage_relaxation,
                config.total_concats,
            )),
        ])
    }

    /// Cascade with explicit steps, tried in the given order.
    pub fn with_steps(steps: Vec<Box<dyn Relaxation>>) -> Self {
        Self { steps }
    }

    /// A controller that never relaxes anything.
    pub fn disabled() -> Self {
        Self::with_steps(Vec::new())
    }

    /// Strategies in the order they are tried.
    pub fn kinds(&self) -> Vec<RelaxationKind> {
        self.steps.iter().map(|step| step.kind()).collect()
    }

    /// Runs the cascade; the first strategy producing a clip wins.
    pub fn relax(
        &self,
        request: &RelaxationRequest<'_>,
        pool: &ClipPool,
        rng: &mut RngHandle,
    ) -> RelaxationOutcome {
        for step in &self.steps {
            if let RelaxationOutcome::Candidate(pick) = step.attempt(request, pool, rng) {
                debug!(
                    strategy = pick.kind.as_str(),
                    clip = pick.clip,
                    current = request.ctx.current_duration,
                    members = request.ctx.members.len(),
                    "relaxation produced a candidate"
                );
                return RelaxationOutcome::Candidate(pick);
            }
        }
        RelaxationOutcome::Exhausted
    }
}
