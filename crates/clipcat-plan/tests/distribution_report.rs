use clipcat_plan::validate::EXTENDED_BIN_EDGES;
use clipcat_plan::{plan, summarize, ClipRecord, ConcatUnit, DistributionSpec, PlanConfig};

fn sample_units() -> Vec<ConcatUnit> {
    vec![
        ConcatUnit::from_clips(0, [("a", 10.0), ("b", 15.0)]),
        ConcatUnit::from_clips(1, [("a", 10.0), ("c", 35.0)]),
        ConcatUnit::from_clips(2, [("a", 10.0), ("b", 15.0), ("d", 45.0)]),
    ]
}

#[test]
fn report_counts_members_bins_and_usage() {
    let spec = DistributionSpec::from_config(&PlanConfig::default());
    let report = summarize(&sample_units(), &spec);

    assert_eq!(report.units, 3);
    assert_eq!(
        report
            .member_counts
            .iter()
            .map(|(members, units)| (*members, *units))
            .collect::<Vec<_>>(),
        vec![(2, 2), (3, 1), (4, 0)]
    );
    assert_eq!(report.outside_member_range, 0);
    assert_eq!(report.out_of_window, 1);
    assert!(!report.is_compliant());

    let labels: Vec<_> = report.duration_bins.iter().map(|bin| bin.label.as_str()).collect();
    assert_eq!(labels, vec!["0-30s", "30-60s", "60-90s", "90-120s", "120s+"]);
    let counts: Vec<_> = report.duration_bins.iter().map(|bin| bin.count).collect();
    assert_eq!(counts, vec![1, 1, 1, 0, 0]);

    assert_eq!(report.total_duration.count, 3);
    assert_eq!(report.total_duration.median, 45.0);
    assert_eq!(report.total_duration.min, 25.0);
    assert_eq!(report.total_duration.max, 70.0);
    assert!((report.total_duration.mean - 140.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.clip_duration.count, 7);

    assert_eq!(report.usage.distinct_clips, 4);
    assert_eq!(report.usage.placements, 7);
    assert_eq!(report.usage.min_uses, 1);
    assert_eq!(report.usage.max_uses, 3);
    assert!((report.usage.mean_uses - 1.75).abs() < 1e-9);
}

#[test]
fn empty_plan_produces_zeroed_report() {
    let spec = DistributionSpec::from_config(&PlanConfig::default());
    let report = summarize(&[], &spec);

    assert_eq!(report.units, 0);
    assert!(report.member_counts.values().all(|count| *count == 0));
    assert!(report.duration_bins.iter().all(|bin| bin.count == 0));
    assert_eq!(report.total_duration.count, 0);
    assert_eq!(report.usage.placements, 0);
    assert!(report.is_compliant());
}

#[test]
fn extended_bins_cover_long_units() {
    let spec = DistributionSpec::from_config(&PlanConfig::default())
        .with_bin_edges(EXTENDED_BIN_EDGES.to_vec())
        .unwrap();
    let units = vec![
        ConcatUnit::from_clips(0, [("a", 100.0), ("b", 100.0)]),
        ConcatUnit::from_clips(1, [("a", 150.0), ("b", 150.0)]),
    ];
    let report = summarize(&units, &spec);

    assert_eq!(report.duration_bins.len(), EXTENDED_BIN_EDGES.len() + 1);
    let last = report.duration_bins.last().unwrap();
    assert_eq!(last.label, "240s+");
    assert_eq!(last.upper, None);
    assert_eq!(last.count, 1);
    assert_eq!(report.duration_bins[6].label, "180-210s");
    assert_eq!(report.duration_bins[6].count, 1);
    assert_eq!(report.out_of_window, 2);
}

#[test]
fn bin_edges_must_increase() {
    let spec = DistributionSpec::from_config(&PlanConfig::default());
    let err = spec.clone().with_bin_edges(vec![60.0, 30.0]).unwrap_err();
    assert_eq!(err.info().code, "bin-edges");
    assert!(spec.with_bin_edges(vec![0.0, 30.0]).is_err());
}

#[test]
fn planned_runs_are_compliant() {
    let config = PlanConfig {
        total_concats: 50,
        seed: 11,
        ..PlanConfig::default()
    };
    let records: Vec<_> = (0..25)
        .map(|idx| ClipRecord::new(format!("clip_{idx}"), 6.0 + (idx % 5) as f64 * 3.0))
        .collect();
    let outcome = plan(&config, records).unwrap();
    let report = summarize(&outcome.units, &DistributionSpec::from_config(&config));

    assert_eq!(report.units, outcome.units.len());
    let binned: usize = report.duration_bins.iter().map(|bin| bin.count).sum();
    assert_eq!(binned, report.units);
    let counted: usize = report.member_counts.values().sum();
    assert_eq!(counted + report.outside_member_range, report.units);
    assert_eq!(report.outside_member_range, 0);
    if outcome.summary.duration_relaxations == 0 {
        assert!(report.is_compliant());
    }
}
