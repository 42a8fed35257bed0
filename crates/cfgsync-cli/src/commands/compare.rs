//! Compare command implementation

use std::path::Path;

use cfgsync_content::{CompareOptions, compare_directories};
use cfgsync_fs::NormalizedPath;

use crate::artifacts::copy_artifacts;
use crate::cli::ReportArgs;
use crate::commands::{prepare_artifacts, stage};
use crate::error::Result;
use crate::output::Output;

/// Compare two directories. Returns whether they matched.
pub fn run_compare(
    reference: &Path,
    target: &Path,
    report: &ReportArgs,
    output: &dyn Output,
) -> Result<bool> {
    let reference = NormalizedPath::canonical(reference)?;
    let target = NormalizedPath::canonical(target)?;

    let artifacts = match &report.artifacts {
        Some(dir) => Some(stage(output, "Preparing artifacts directory", || {
            prepare_artifacts(dir, &[&reference, &target])
        })?),
        None => None,
    };

    let issues = stage(output, "Comparing directories", || {
        Ok(compare_directories(&reference, &target, &CompareOptions::default())?)
    })?;

    if issues.is_empty() {
        output.log_info("No issues detected.");
        return Ok(true);
    }

    if let Some(artifacts) = &artifacts {
        stage(output, "Copying artifacts", || {
            let copied = copy_artifacts(&issues, &reference, &target, artifacts)?;
            output.log_info(&format!("Copied {copied} files to {artifacts}"));
            Ok(())
        })?;
    }

    output.log_errors(&issues);
    Ok(false)
}
