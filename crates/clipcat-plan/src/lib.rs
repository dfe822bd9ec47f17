#![deny(missing_docs)]

//! Constrained concatenation planner: groups short clips into units that
//! respect member-count and duration windows under a clip reuse policy.

/// Planning loop over all requested slots.
pub mod assembler;
/// Single-unit growth state machine.
pub mod builder;
/// YAML configuration schema and defaults.
pub mod config;
/// Plan, manifest and report serialization.
pub mod manifest;
/// Clip metadata records and loading.
pub mod metadata;
/// Candidate filtering and reuse policies.
pub mod policy;
/// Clip pool and usage accounting.
pub mod pool;
/// Fallback strategies for stalled units.
pub mod relax;
/// Plan entries and their timelines.
pub mod unit;
/// Post-hoc distribution report.
pub mod validate;

pub use assembler::{assemble, assemble_with, plan, PlanOutcome, PlanSummary, UsageSpread};
pub use builder::{AbandonReason, BuiltUnit, UnitBuilder, UnitOutcome, UnitState};
pub use config::{PlanConfig, RelaxationConfig, ReuseMode, ReusePolicy};
pub use manifest::{load_plan, write_plan, write_run, RunArtifacts, RunManifest};
pub use metadata::{filter_short_clips, load_records, ClipRecord};
pub use policy::{SelectionContext, SelectionPolicy};
pub use pool::{Clip, ClipIndex, ClipPool};
pub use relax::{
    DurationWidening, Relaxation, RelaxationController, RelaxationKind, RelaxationOutcome,
    UsageCapWidening,
};
pub use unit::{Boundary, ConcatUnit};
pub use validate::{summarize, DistributionReport, DistributionSpec};
