//! Overlay generation pipeline
//!
//! tool check → input check → decode into a temporary directory → load both
//! trees → compare → write the differences and cleaned files → optional
//! overlay package. The temporary directory is removed when [`run`] returns,
//! whatever the outcome.

use crate::apktool::Apktool;
use crate::compare::{common, compare, overrides};
use crate::overlay::{read_manifest_package, scaffold, validate_name, OverlaySpec};
use crate::render::{write_resources, RenderOptions};
use crate::resources::load_tree;
use droidtools_cli::progress;
use droidtools_core::config::ApktoolConfig;
use droidtools_core::error::{Error, Result};
use droidtools_telemetry::Timer;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the decoded tree inside the temporary directory
const DECODED_DIR: &str = "decoded";

/// Overlay package to scaffold after the diff
#[derive(Debug, Clone)]
pub struct OverlayRequest {
    pub name: String,
    /// Overrides the `<target>.overlay` default
    pub package: Option<String>,
    pub output_dir: PathBuf,
}

/// One invocation of the overlay pipeline
#[derive(Debug, Clone)]
pub struct OverlayJob {
    /// Archive to decode
    pub archive: PathBuf,
    /// Reference resource tree
    pub reference: PathBuf,
    /// Differences file
    pub output: PathBuf,
    /// Common-keys file
    pub cleaned_output: PathBuf,
    pub overlay: Option<OverlayRequest>,
    pub render: RenderOptions,
}

impl OverlayJob {
    /// Check arguments that can be checked without running anything
    pub fn validate_inputs(&self) -> Result<()> {
        if !self.archive.exists() {
            return Err(Error::file_not_found(&self.archive)
                .with_suggestion("Pass the path of the APK to extract"));
        }
        if !self.reference.is_dir() {
            return Err(Error::directory_not_found(&self.reference)
                .with_suggestion("Pass the AOSP resource directory to compare against"));
        }
        if let Some(request) = &self.overlay {
            validate_name(&request.name)?;
        }
        Ok(())
    }
}

/// What a pipeline run produced
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub reference_entries: usize,
    pub target_entries: usize,
    pub differences: usize,
    /// Keys present only in the decoded archive
    pub additions: usize,
    /// Keys present only in the reference tree
    pub removals: usize,
    /// Entries written to the differences file
    pub overrides: usize,
    /// Entries written to the cleaned file
    pub common: usize,
    pub target_package: Option<String>,
    pub overlay_dir: Option<PathBuf>,
}

/// Run the whole pipeline for `job`
pub fn run(job: &OverlayJob, apktool: &ApktoolConfig) -> Result<JobReport> {
    let tool = Apktool::locate(apktool)?;
    job.validate_inputs()?;

    let workspace = tempfile::Builder::new()
        .prefix("droidtools-")
        .tempdir()
        .map_err(Error::from)
        .map_err(|e| e.with_context("Creating temporary directory"))?;
    let decoded = workspace.path().join(DECODED_DIR);
    debug!(dir = %workspace.path().display(), "Created workspace");

    let timer = Timer::start("decode");
    let spinner = progress::spinner(&format!("Decoding {}...", job.archive.display()));
    match tool.decode(&job.archive, &decoded) {
        Ok(()) => progress::finish_success(&spinner, "Decoded"),
        Err(e) => {
            progress::finish_error(&spinner, "Decoding failed");
            return Err(e);
        }
    }
    timer.stop();

    generate(job, &decoded)
}

/// Everything after decoding, against an already decoded tree
pub fn generate(job: &OverlayJob, decoded: &Path) -> Result<JobReport> {
    let timer = Timer::start("load");
    let reference = load_tree(&job.reference)?;
    let target = load_tree(decoded)?;
    timer.stop();

    let differences = compare(&reference, &target);
    let changed = overrides(&differences);
    let cleaned = common(&reference, &target);

    let mut report = JobReport {
        reference_entries: reference.len(),
        target_entries: target.len(),
        differences: differences.len(),
        additions: differences.values().filter(|d| d.is_addition()).count(),
        removals: differences.values().filter(|d| d.is_removal()).count(),
        overrides: changed.len(),
        common: cleaned.len(),
        ..JobReport::default()
    };

    let timer = Timer::start("render");
    write_resources(&job.output, &changed, &job.render)?;
    write_resources(&job.cleaned_output, &cleaned, &job.render)?;
    timer.stop();
    info!(
        output = %job.output.display(),
        cleaned = %job.cleaned_output.display(),
        differences = report.differences,
        omitted = report.removals,
        common = report.common,
        "Wrote resource files"
    );

    if let Some(request) = &job.overlay {
        let target_package = read_manifest_package(decoded)?;
        let spec = OverlaySpec::new(&request.name, &target_package, request.package.as_deref())?;
        report.overlay_dir = Some(scaffold(&spec, &request.output_dir, &job.cleaned_output)?);
        report.target_package = Some(target_package);
    }

    Ok(report)
}
