use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clipcat_core::errors::{ClipcatError, ErrorInfo};
use clipcat_core::provenance::{RunProvenance, SchemaVersion};
use clipcat_core::{from_json_slice, stable_hash_string};
use serde::{Deserialize, Serialize};

use crate::assembler::{PlanOutcome, PlanSummary};
use crate::config::PlanConfig;
use crate::metadata::ClipRecord;
use crate::unit::ConcatUnit;
use crate::validate::DistributionReport;

/// File name of the plan consumed downstream.
pub const PLAN_FILE: &str = "concat_metadata.json";
/// File name of the run manifest.
pub const MANIFEST_FILE: &str = "manifest.json";
/// File name of the distribution report.
pub const SUMMARY_FILE: &str = "summary.json";

/// Current schema of [`RunManifest`].
pub const MANIFEST_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Structured manifest describing a completed planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version of this manifest.
    pub schema_version: SchemaVersion,
    /// Configuration used for the run.
    pub config: PlanConfig,
    /// Hashes, seed and tool versions.
    pub provenance: RunProvenance,
    /// Run diagnostics.
    pub summary: PlanSummary,
    /// Plan file relative to the run directory.
    pub plan_file: PathBuf,
}

impl RunManifest {
    /// Builds the manifest for a finished run.
    pub fn new(
        config: &PlanConfig,
        records: &[ClipRecord],
        outcome: &PlanOutcome,
        created_at: String,
    ) -> Result<Self, ClipcatError> {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Ok(Self {
            schema_version: MANIFEST_SCHEMA,
            config: config.clone(),
            provenance: RunProvenance {
                input_hash: stable_hash_string(&records)?,
                plan_hash: plan_hash(&outcome.units)?,
                seed: config.seed,
                created_at,
                tool_versions,
            },
            summary: outcome.summary.clone(),
            plan_file: PathBuf::from(PLAN_FILE),
        })
    }

    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), ClipcatError> {
        write_json(path, self, "manifest")
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ClipcatError> {
        read_json(path, "manifest")
    }
}

/// Canonical hash of a plan.
pub fn plan_hash(units: &[ConcatUnit]) -> Result<String, ClipcatError> {
    stable_hash_string(&units)
}

/// Serializes a plan exactly as it is written to disk.
pub fn plan_to_json_bytes(units: &[ConcatUnit]) -> Result<Vec<u8>, ClipcatError> {
    serde_json::to_vec_pretty(units)
        .map_err(|err| ClipcatError::Serde(ErrorInfo::new("plan-serialize", err.to_string())))
}

/// Writes the plan to `path` as pretty-printed JSON.
pub fn write_plan(path: &Path, units: &[ConcatUnit]) -> Result<(), ClipcatError> {
    write_json(path, &units, "plan")
}

/// Reads a plan written by [`write_plan`].
pub fn load_plan(path: &Path) -> Result<Vec<ConcatUnit>, ClipcatError> {
    read_json(path, "plan")
}

/// Writes a distribution report.
pub fn write_report(path: &Path, report: &DistributionReport) -> Result<(), ClipcatError> {
    write_json(path, report, "report")
}

/// Paths of the artefacts written by [`write_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    /// Plan file.
    pub plan: PathBuf,
    /// Manifest file.
    pub manifest: PathBuf,
    /// Distribution report.
    pub summary: PathBuf,
}

/// Writes plan, manifest and distribution report into `dir`.
pub fn write_run(
    dir: &Path,
    outcome: &PlanOutcome,
    manifest: &RunManifest,
    report: &DistributionReport,
) -> Result<RunArtifacts, ClipcatError> {
    fs::create_dir_all(dir).map_err(|err| {
        ClipcatError::Serde(
            ErrorInfo::new("run-mkdir", err.to_string())
                .with_context("path", dir.display().to_string()),
        )
    })?;
    let artifacts = RunArtifacts {
        plan: dir.join(PLAN_FILE),
        manifest: dir.join(MANIFEST_FILE),
        summary: dir.join(SUMMARY_FILE),
    };
    write_plan(&artifacts.plan, &outcome.units)?;
    manifest.write(&artifacts.manifest)?;
    write_report(&artifacts.summary, report)?;
    Ok(artifacts)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<(), ClipcatError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            ClipcatError::Serde(
                ErrorInfo::new(format!("{what}-mkdir"), err.to_string())
                    .with_context("path", parent.display().to_string()),
            )
        })?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|err| {
        ClipcatError::Serde(
            ErrorInfo::new(format!("{what}-serialize"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    fs::write(path, json).map_err(|err| {
        ClipcatError::Serde(
            ErrorInfo::new(format!("{what}-write"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T, ClipcatError> {
    let contents = fs::read(path).map_err(|err| {
        ClipcatError::Serde(
            ErrorInfo::new(format!("{what}-read"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    from_json_slice(&contents).map_err(|err| {
        ClipcatError::Serde(
            ErrorInfo::new(format!("{what}-parse"), err.info().message.clone())
                .with_context("path", path.display().to_string()),
        )
    })
}
