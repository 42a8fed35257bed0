//! Consistency check: does a reference repository match the database?
//!
//! Pipeline: open the database, clear the target and artifacts directories,
//! store the database into the target, compare reference against target,
//! copy the files behind each issue into the artifacts directory, report.
//! Each stage runs only if the previous one succeeded.

use std::path::Path;

use cfgsync_content::{CompareOptions, compare_directories};
use cfgsync_core::{CONFIG_FILE_NAME, CancellationToken, RepositoryConfiguration, store_all_job};
use cfgsync_fs::{NormalizedPath, io};

use crate::artifacts::copy_artifacts;
use crate::cli::{ConnectionArgs, ReportArgs};
use crate::commands::{finished, open_database, overlaps, prepare_artifacts, resolve, stage};
use crate::error::{CliError, Result};
use crate::output::Output;

/// Artifacts directory used when none is given
pub const DEFAULT_ARTIFACTS_DIR: &str = "Artifacts";

/// Run the check. Returns whether the repositories matched.
pub fn run_check(
    connection: &ConnectionArgs,
    reference: &Path,
    target: &Path,
    report: &ReportArgs,
    cancel: &CancellationToken,
    output: &dyn Output,
) -> Result<bool> {
    let (database, license) = stage(output, "Connecting to database", || open_database(connection))?;

    let (reference, target, artifacts) = stage(output, "Preparing target repository", || {
        let (reference, target) = resolve_roots(reference, target)?;
        let artifacts = report
            .artifacts
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_ARTIFACTS_DIR));
        let artifacts = prepare_artifacts(artifacts, &[&reference, &target])?;
        clear_target(&target)?;
        Ok((reference, target, artifacts))
    })?;

    stage(output, "Storing database into target repository", || {
        let config = RepositoryConfiguration::load(reference.clone())?;
        let config = RepositoryConfiguration {
            root: target.clone(),
            ..config
        };
        let job = store_all_job(config, database.catalog(), database.store(), license);
        let outcome = job.run(cancel)?;
        finished(output, outcome)
    })?;

    let issues = stage(output, "Comparing repositories", || {
        let mut options = CompareOptions::default();
        options.ignored_file_names.push(CONFIG_FILE_NAME.to_string());
        Ok(compare_directories(&reference, &target, &options)?)
    })?;

    if issues.is_empty() {
        output.log_info("No issues detected.");
        return Ok(true);
    }

    stage(output, "Copying artifacts", || {
        let copied = copy_artifacts(&issues, &reference, &target, &artifacts)?;
        output.log_info(&format!("Copied {copied} files to {artifacts}"));
        Ok(())
    })?;

    output.log_errors(&issues);
    Ok(false)
}

/// Resolve both roots. The target may not exist yet and must not overlap
/// the reference, since it is deleted.
fn resolve_roots(reference: &Path, target: &Path) -> Result<(NormalizedPath, NormalizedPath)> {
    let reference = NormalizedPath::canonical(reference)?;
    if !reference.is_dir() {
        return Err(CliError::user(format!(
            "Reference repository {reference} is not a directory"
        )));
    }

    let target = resolve(target)?;
    if overlaps(&reference, &target) {
        return Err(CliError::user(format!(
            "Target {target} overlaps the reference repository {reference}"
        )));
    }
    Ok((reference, target))
}

/// Replace the target with an empty directory.
fn clear_target(target: &NormalizedPath) -> Result<()> {
    io::remove_dir_all(target)?;
    std::fs::create_dir_all(target.to_native())?;
    tracing::debug!(root = %target, "Prepared target repository");
    Ok(())
}
