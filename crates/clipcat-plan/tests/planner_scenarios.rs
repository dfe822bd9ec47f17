use std::collections::BTreeSet;

use clipcat_core::RngHandle;
use clipcat_plan::config::usage_cap_for_ratio;
use clipcat_plan::manifest::plan_to_json_bytes;
use clipcat_plan::{
    assemble_with, plan, AbandonReason, ClipPool, ClipRecord, PlanConfig, RelaxationController,
    RelaxationKind, ReuseMode, UnitBuilder, UnitOutcome, UnitState,
};

fn records(durations: &[f64]) -> Vec<ClipRecord> {
    durations
        .iter()
        .enumerate()
        .map(|(idx, &duration)| ClipRecord::new(format!("clip_{idx:03}"), duration))
        .collect()
}

fn single_unit_config() -> PlanConfig {
    PlanConfig {
        total_concats: 1,
        min_videos_per_concat: 2,
        max_videos_per_concat: 3,
        target_duration_min: 20.0,
        target_duration_max: 60.0,
        allow_reuse: false,
        ..PlanConfig::default()
    }
}

#[test]
fn three_clip_pool_yields_one_bounded_unit() {
    let config = single_unit_config();
    for seed in 0..16 {
        let config = PlanConfig { seed, ..config.clone() };
        let outcome = plan(&config, records(&[10.0, 15.0, 50.0])).unwrap();

        assert_eq!(outcome.units.len(), 1, "seed {seed}");
        assert_eq!(outcome.summary.shortfall, 0);
        let unit = &outcome.units[0];
        assert!(unit.is_well_formed());
        assert!((2..=3).contains(&unit.member_count()));
        assert!(unit.total_duration >= 20.0 && unit.total_duration <= 60.0);
        assert_eq!(unit.boundaries[0].start_time, 0.0);
        assert_eq!(
            unit.boundaries.last().unwrap().end_time,
            unit.total_duration
        );
        assert_eq!(unit.concat_video, "concat_00000.mp4");
    }
}

#[test]
fn infeasible_pool_reports_every_slot_as_unfilled() {
    let config = PlanConfig {
        total_concats: 5,
        target_duration_min: 20.0,
        allow_reuse: false,
        ..PlanConfig::default()
    };
    let outcome = plan(&config, records(&[5.0])).expect("infeasibility is not an error");

    assert!(outcome.units.is_empty());
    assert_eq!(outcome.summary.shortfall, 5);
    assert_eq!(outcome.summary.unfilled_slots, vec![0, 1, 2, 3, 4]);
    assert_eq!(
        outcome.summary.abandoned_attempts,
        5 * config.max_attempts_per_slot
    );
    assert_eq!(outcome.usage, vec![("clip_000".to_string(), 0)]);
}

#[test]
fn abandoned_unit_leaves_pool_untouched() {
    let config = PlanConfig {
        allow_reuse: false,
        ..PlanConfig::default()
    };
    let controller = RelaxationController::from_config(&config);
    let builder = UnitBuilder::new(&config, &controller);
    let mut pool = ClipPool::load(records(&[5.0])).unwrap();
    let mut rng = RngHandle::from_seed(3);

    let outcome = builder.build(&mut pool, &mut rng).unwrap();
    assert_eq!(outcome.state(), UnitState::Abandoned);
    match outcome {
        UnitOutcome::Abandoned { reason, .. } => assert_eq!(reason, AbandonReason::NoCandidate),
        UnitOutcome::Accepted(_) => panic!("a single short clip cannot form a unit"),
    }
    assert_eq!(pool.usage_of("clip_000"), Some(0));
}

#[test]
fn duration_widening_admits_bounded_overshoot() {
    let config = single_unit_config();
    let outcome = plan(&config, records(&[4.0, 61.0, 90.0])).unwrap();

    assert_eq!(outcome.units.len(), 1);
    let unit = &outcome.units[0];
    assert_eq!(unit.members, vec!["clip_000", "clip_001"]);
    assert_eq!(unit.total_duration, 65.0);
    assert!(unit.total_duration <= config.relaxed_duration_max());
    assert_eq!(outcome.summary.duration_relaxations, 1);
}

#[test]
fn widening_is_unavailable_without_the_cascade() {
    let config = single_unit_config();
    let mut pool = ClipPool::load(records(&[4.0, 61.0, 90.0])).unwrap();
    let mut rng = RngHandle::from_seed(config.seed);
    let outcome =
        assemble_with(&config, &RelaxationController::disabled(), &mut pool, &mut rng).unwrap();

    assert!(outcome.units.is_empty());
    assert_eq!(outcome.summary.unfilled_slots, vec![0]);
    assert_eq!(outcome.summary.abandon_reasons.get("no-candidate"), Some(&5));
}

#[test]
fn same_seed_reproduces_plan_bytes() {
    let durations: Vec<f64> = (0..40).map(|idx| 5.0 + (idx % 9) as f64 * 2.5).collect();
    let config = PlanConfig {
        total_concats: 60,
        seed: 1234,
        ..PlanConfig::default()
    };

    let first = plan(&config, records(&durations)).unwrap();
    let second = plan(&config, records(&durations)).unwrap();

    assert_eq!(
        plan_to_json_bytes(&first.units).unwrap(),
        plan_to_json_bytes(&second.units).unwrap()
    );
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.usage, second.usage);
}

#[test]
fn no_reuse_never_repeats_a_clip() {
    let durations: Vec<f64> = (0..30).map(|idx| 5.0 + (idx % 4) as f64 * 5.0).collect();
    let config = PlanConfig {
        total_concats: 20,
        allow_reuse: false,
        seed: 9,
        ..PlanConfig::default()
    };
    let outcome = plan(&config, records(&durations)).unwrap();

    let mut seen = BTreeSet::new();
    for unit in &outcome.units {
        assert!(unit.is_well_formed());
        for member in &unit.members {
            assert!(seen.insert(member.clone()), "{member} placed twice");
        }
    }
    assert!(outcome.usage.iter().all(|(_, uses)| *uses <= 1));
    assert_eq!(
        outcome.summary.accepted + outcome.summary.shortfall,
        config.total_concats
    );
}

#[test]
fn balanced_reuse_keeps_usage_even() {
    let config = PlanConfig {
        total_concats: 20,
        target_duration_min: 20.0,
        target_duration_max: 40.0,
        reuse_mode: ReuseMode::Balanced,
        seed: 77,
        ..PlanConfig::default()
    };
    let outcome = plan(&config, records(&[10.0; 20])).unwrap();

    assert_eq!(outcome.units.len(), 20);
    assert!(outcome.summary.usage_spread.width() <= 2);
    assert_eq!(outcome.summary.usage_relaxations, 0);
}

#[test]
fn usage_cap_holds_when_relaxation_is_disabled() {
    let config = PlanConfig {
        total_concats: 4,
        min_videos_per_concat: 2,
        max_videos_per_concat: 2,
        target_duration_min: 20.0,
        target_duration_max: 20.0,
        reuse_mode: ReuseMode::Random,
        max_usage_ratio: 0.5,
        seed: 5,
        ..PlanConfig::default()
    };
    assert_eq!(config.usage_cap(), 2);

    let mut pool = ClipPool::load(records(&[10.0; 4])).unwrap();
    let mut rng = RngHandle::from_seed(config.seed);
    let outcome =
        assemble_with(&config, &RelaxationController::disabled(), &mut pool, &mut rng).unwrap();

    assert!(outcome.usage.iter().all(|(_, uses)| *uses <= 2));
    for unit in &outcome.units {
        assert_eq!(unit.member_count(), 2);
        assert_eq!(unit.total_duration, 20.0);
    }
}

#[test]
fn usage_cap_widening_fills_slots_past_the_base_cap() {
    let config = PlanConfig {
        total_concats: 4,
        min_videos_per_concat: 2,
        max_videos_per_concat: 2,
        target_duration_min: 20.0,
        target_duration_max: 20.0,
        max_usage_ratio: 0.5,
        seed: 13,
        ..PlanConfig::default()
    };
    assert_eq!(config.usage_cap(), 2);
    let outcome = plan(&config, records(&[10.0, 10.0])).unwrap();

    assert_eq!(outcome.units.len(), 4);
    assert_eq!(outcome.summary.shortfall, 0);
    assert!(outcome.summary.usage_relaxations >= 1);
    let widened_cap = usage_cap_for_ratio(
        config.max_usage_ratio * config.relaxation.max_usage_relaxation,
        config.total_concats,
    );
    assert_eq!(widened_cap, 4);
    assert!(outcome.usage.iter().all(|(_, uses)| *uses <= widened_cap));
    assert!(outcome.usage.iter().any(|(_, uses)| *uses > config.usage_cap()));
}

#[test]
fn controller_order_is_duration_then_usage() {
    let controller = RelaxationController::from_config(&PlanConfig::default());
    assert_eq!(
        controller.kinds(),
        vec![
            RelaxationKind::DurationWidening,
            RelaxationKind::UsageCapWidening
        ]
    );
    assert!(RelaxationController::disabled().kinds().is_empty());
}

#[test]
fn unit_ids_follow_emission_order() {
    let config = PlanConfig {
        total_concats: 12,
        seed: 21,
        ..PlanConfig::default()
    };
    let outcome = plan(&config, records(&[12.0; 10])).unwrap();
    for (position, unit) in outcome.units.iter().enumerate() {
        assert_eq!(unit.unit_id, position);
        assert_eq!(unit.concat_video, format!("concat_{position:05}.mp4"));
    }
}
