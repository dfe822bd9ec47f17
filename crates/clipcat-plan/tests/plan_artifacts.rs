use std::fs;

use clipcat_plan::manifest::{plan_hash, MANIFEST_FILE, PLAN_FILE, SUMMARY_FILE};
use clipcat_plan::{
    load_plan, load_records, plan, summarize, write_run, ClipRecord, DistributionSpec,
    PlanConfig, RunManifest,
};
use serde_json::Value;
use tempfile::tempdir;

fn sample_records() -> Vec<ClipRecord> {
    (0..12)
        .map(|idx| ClipRecord::new(format!("clip_{idx:02}"), 8.0 + (idx % 4) as f64 * 4.5))
        .collect()
}

#[test]
fn run_directory_roundtrips() {
    let dir = tempdir().unwrap();
    let config = PlanConfig {
        total_concats: 8,
        seed: 3,
        ..PlanConfig::default()
    };
    let records = sample_records();
    let outcome = plan(&config, records.clone()).unwrap();
    let report = summarize(&outcome.units, &DistributionSpec::from_config(&config));
    let manifest = RunManifest::new(
        &config,
        &records,
        &outcome,
        "2024-01-01T00:00:00+00:00".to_string(),
    )
    .unwrap();

    let artifacts = write_run(dir.path(), &outcome, &manifest, &report).unwrap();
    assert_eq!(artifacts.plan, dir.path().join(PLAN_FILE));
    assert_eq!(artifacts.manifest, dir.path().join(MANIFEST_FILE));
    assert!(dir.path().join(SUMMARY_FILE).exists());

    let restored_plan = load_plan(&artifacts.plan).unwrap();
    assert_eq!(restored_plan, outcome.units);

    let restored = RunManifest::load(&artifacts.manifest).unwrap();
    assert_eq!(restored, manifest);
    assert_eq!(restored.provenance.seed, 3);
    assert_eq!(
        restored.provenance.plan_hash,
        plan_hash(&restored_plan).unwrap()
    );
    assert_eq!(restored.provenance.input_hash.len(), 64);
}

#[test]
fn plan_file_uses_downstream_field_names() {
    let dir = tempdir().unwrap();
    let config = PlanConfig {
        total_concats: 2,
        ..PlanConfig::default()
    };
    let outcome = plan(&config, sample_records()).unwrap();
    let path = dir.path().join("nested").join(PLAN_FILE);
    clipcat_plan::write_plan(&path, &outcome.units).unwrap();

    let value: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let first = &value.as_array().unwrap()[0];
    for key in ["unit_id", "concat_video", "total_duration", "boundaries", "videos"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    let boundary = &first["boundaries"][0];
    assert!(boundary.get("video_id").is_some());
    assert_eq!(boundary["start_time"], 0.0);
    assert_eq!(first["concat_video"], "concat_00000.mp4");
}

#[test]
fn metadata_accepts_generator_and_short_field_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metadata.json");
    fs::write(
        &path,
        r#"[
            {"video_name": "a.mp4", "duration_sec": 12.5, "video_path": "/clips/a.mp4", "fps": 30.0},
            {"id": "b.mp4", "duration": 7.0}
        ]"#,
    )
    .unwrap();

    let records = load_records(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "a.mp4");
    assert_eq!(records[0].duration, 12.5);
    assert_eq!(
        records[0].path.as_deref(),
        Some(std::path::Path::new("/clips/a.mp4"))
    );
    assert_eq!(records[1], ClipRecord::new("b.mp4", 7.0));
}

#[test]
fn missing_files_report_their_path() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.json");

    let err = load_records(&missing).unwrap_err();
    assert_eq!(err.info().code, "metadata-read");
    assert_eq!(
        err.info().context.get("path"),
        Some(&missing.display().to_string())
    );

    let err = load_plan(&missing).unwrap_err();
    assert_eq!(err.info().code, "plan-read");

    fs::write(&missing, b"not json").unwrap();
    let err = RunManifest::load(&missing).unwrap_err();
    assert_eq!(err.info().code, "manifest-parse");
}

#[test]
fn short_clips_are_filtered_before_planning() {
    let records = vec![
        ClipRecord::new("tiny", 0.5),
        ClipRecord::new("a", 12.0),
        ClipRecord::new("b", 14.0),
    ];
    let kept = clipcat_plan::filter_short_clips(records, 1.0);
    assert_eq!(
        kept.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b"]
    );

    let config = PlanConfig {
        total_concats: 3,
        min_clip_duration: Some(1.0),
        ..PlanConfig::default()
    };
    let outcome = plan(
        &config,
        vec![
            ClipRecord::new("tiny", 0.5),
            ClipRecord::new("a", 12.0),
            ClipRecord::new("b", 14.0),
        ],
    )
    .unwrap();
    assert_eq!(outcome.summary.pool_size, 2);
    assert!(outcome
        .units
        .iter()
        .all(|unit| !unit.members.iter().any(|member| member == "tiny")));
}
