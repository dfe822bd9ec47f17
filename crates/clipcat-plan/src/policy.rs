use clipcat_core::RngHandle;
use rand::seq::SliceRandom;

use crate::config::ReusePolicy;
use crate::pool::{ClipIndex, ClipPool};

/// Snapshot of the unit being grown, as seen by candidate filtering.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Clips already placed in the unit, in placement order.
    pub members: &'a [ClipIndex],
    /// Accumulated duration of `members`.
    pub current_duration: f64,
    /// Lower bound of the target duration window.
    pub window_min: f64,
    /// Duration the unit may not exceed.
    pub ceiling: f64,
    /// Whether the next clip completes the unit's drawn member target.
    pub closing: bool,
}

impl SelectionContext<'_> {
    /// Whether appending a clip of `duration` keeps the unit under its ceiling.
    pub fn fits(&self, duration: f64) -> bool {
        self.current_duration + duration <= self.ceiling
    }

    /// Whether appending a clip of `duration` lands the unit inside the window.
    pub fn lands(&self, duration: f64) -> bool {
        self.fits(duration) && self.current_duration + duration >= self.window_min
    }

    /// Whether the clip is already part of the unit.
    pub fn contains(&self, index: ClipIndex) -> bool {
        self.members.contains(&index)
    }
}

/// Clips that are not yet in the unit and fit the remaining duration budget.
pub fn duration_candidates(pool: &ClipPool, ctx: &SelectionContext<'_>) -> Vec<ClipIndex> {
    pool.clips()
        .enumerate()
        .filter(|(index, clip)| !ctx.contains(*index) && ctx.fits(clip.duration))
        .map(|(index, _)| index)
        .collect()
}

/// Chooses the next clip of a unit according to the reuse policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Reuse policy of the run.
    pub policy: ReusePolicy,
    /// Hard per-clip usage cap; ignored by [`ReusePolicy::NoReuse`].
    pub usage_cap: usize,
}

impl SelectionPolicy {
    /// Creates a policy with the run's hard usage cap.
    pub fn new(policy: ReusePolicy, usage_cap: usize) -> Self {
        Self { policy, usage_cap }
    }

    /// Same policy with a different usage cap.
    pub fn with_cap(&self, usage_cap: usize) -> Self {
        Self {
            policy: self.policy,
            usage_cap,
        }
    }

    /// Picks the next clip under the strict duration budget.
    ///
    /// When the pick completes the unit, candidates that land the total in the
    /// target window are preferred; the full fitting set is the fallback.
    /// Returns `None` when nothing survives filtering.
    pub fn pick(
        &self,
        pool: &ClipPool,
        ctx: &SelectionContext<'_>,
        rng: &mut RngHandle,
    ) -> Option<ClipIndex> {
        let candidates = duration_candidates(pool, ctx);
        if candidates.is_empty() {
            return None;
        }
        if ctx.closing {
            let landing: Vec<ClipIndex> = candidates
                .iter()
                .copied()
                .filter(|&index| pool.get(index).is_some_and(|clip| ctx.lands(clip.duration)))
                .collect();
            if let Some(choice) = self.select(pool, &landing, rng) {
                return Some(choice);
            }
        }
        self.select(pool, &candidates, rng)
    }

    /// Applies the reuse filter to `candidates` and draws one of the survivors.
    pub fn select(
        &self,
        pool: &ClipPool,
        candidates: &[ClipIndex],
        rng: &mut RngHandle,
    ) -> Option<ClipIndex> {
        let eligible = self.usage_filter(pool, candidates);
        match self.policy {
            ReusePolicy::Balanced => pool.least_used_set(&eligible).choose(rng).copied(),
            ReusePolicy::Random | ReusePolicy::NoReuse => eligible.choose(rng).copied(),
        }
    }

    /// Candidates still admissible under the usage rules of the policy.
    pub fn usage_filter(&self, pool: &ClipPool, candidates: &[ClipIndex]) -> Vec<ClipIndex> {
        candidates
            .iter()
            .copied()
            .filter(|&index| match self.policy {
                ReusePolicy::NoReuse => pool.usage_at(index) == 0,
                ReusePolicy::Balanced | ReusePolicy::Random => {
                    pool.usage_at(index) < self.usage_cap
                }
            })
            .collect()
    }
}
