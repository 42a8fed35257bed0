//! Command implementations for cfgsync-cli

pub mod check;
pub mod compare;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use cfgsync_core::{JobOutcome, LicenseCheck, LicenseKey, RunSummary};
use cfgsync_fs::{NormalizedPath, io};
use cfgsync_meta::{ConnectionString, Database};

use crate::cli::ConnectionArgs;
use crate::error::{CliError, Result};
use crate::output::Output;

pub use check::run_check;
pub use compare::run_compare;
pub use sync::{run_restore, run_store};

/// Run one pipeline stage, announcing it first and reporting its failure
/// through `output`, followed by a closing summary line.
pub(crate) fn stage<T>(
    output: &dyn Output,
    name: &'static str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    output.log_info(&format!("{name}..."));
    f().map_err(|e| {
        let error = CliError::stage(name, e);
        output.log_failure(&error.to_string());
        output.log_info(&format!("Aborted at stage '{name}'; remaining stages skipped."));
        error
    })
}

/// Open the database named by the connection arguments.
pub(crate) fn open_database(args: &ConnectionArgs) -> Result<(Database, Arc<dyn LicenseCheck>)> {
    let connection = ConnectionString::parse(&args.connection)?;
    tracing::debug!(connection = %connection, "Opening database");
    let database = Database::open(&connection)?;
    let key = connection.license.clone().or_else(|| args.license.clone());
    Ok((database, Arc::new(LicenseKey::new(key))))
}

/// Unwrap a finished job, turning cancellation and failure into errors and
/// reporting skipped objects.
pub(crate) fn finished(
    output: &dyn Output,
    outcome: JobOutcome<RunSummary>,
) -> Result<RunSummary> {
    match outcome {
        JobOutcome::Completed(summary) => {
            for error in &summary.errors {
                output.log_info(&format!("Skipped {error}"));
            }
            output.log_info(&format!("Done: {summary}"));
            Ok(summary)
        }
        JobOutcome::Canceled => Err(CliError::user("Operation cancelled")),
        JobOutcome::Failed(message) => Err(CliError::user(message)),
    }
}

/// Canonical form of a path that may not exist yet.
///
/// The deepest existing ancestor is canonicalized and the missing
/// components are appended, so nothing is created on disk.
pub(crate) fn resolve(path: &Path) -> Result<NormalizedPath> {
    let absolute = std::path::absolute(path)?;
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_string_lossy().into_owned());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = NormalizedPath::canonical(existing)?;
    for name in missing.iter().rev() {
        resolved = resolved.join(name);
    }
    Ok(resolved)
}

/// Whether one path equals, contains or lies inside the other.
pub(crate) fn overlaps(a: &NormalizedPath, b: &NormalizedPath) -> bool {
    a.relative_to(b).is_some() || b.relative_to(a).is_some()
}

/// Resolve the artifacts directory and clear it.
///
/// Refused when it overlaps any of `roots`, since it is deleted.
pub(crate) fn prepare_artifacts(dir: &Path, roots: &[&NormalizedPath]) -> Result<NormalizedPath> {
    let artifacts = resolve(dir)?;
    if let Some(root) = roots.iter().find(|root| overlaps(&artifacts, root)) {
        return Err(CliError::user(format!(
            "Artifacts directory {artifacts} overlaps repository {root}"
        )));
    }
    io::remove_dir_all(&artifacts)?;
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    use cfgsync_content::Issue;

    /// Output keeping every line it was given.
    #[derive(Default)]
    struct Recorded(Mutex<Vec<String>>);

    impl Output for Recorded {
        fn log_info(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }

        fn log_errors(&self, issues: &[Issue]) {
            self.0.lock().unwrap().push(format!("{} issues", issues.len()));
        }

        fn log_failure(&self, text: &str) {
            self.0.lock().unwrap().push(format!("failure: {text}"));
        }
    }

    #[test]
    fn failed_stage_closes_with_summary() {
        let output = Recorded::default();

        let result: Result<()> = stage(&output, "Storing objects", || Err(CliError::user("disk full")));

        assert!(matches!(result, Err(CliError::Stage { stage: "Storing objects", .. })));
        assert_eq!(
            output.0.into_inner().unwrap(),
            [
                "Storing objects...",
                "failure: Storing objects failed: disk full",
                "Aborted at stage 'Storing objects'; remaining stages skipped.",
            ]
        );
    }

    #[test]
    fn successful_stage_only_announces_itself() {
        let output = Recorded::default();

        let value = stage(&output, "Comparing repositories", || Ok(3)).unwrap();

        assert_eq!(value, 3);
        assert_eq!(output.0.into_inner().unwrap(), ["Comparing repositories..."]);
    }

    #[test]
    fn overlap_covers_both_directions_but_not_siblings() {
        let root = NormalizedPath::new("/srv/repo");
        assert!(overlaps(&root, &root));
        assert!(overlaps(&NormalizedPath::new("/srv/repo/out"), &root));
        assert!(overlaps(&NormalizedPath::new("/srv"), &root));
        assert!(!overlaps(&NormalizedPath::new("/srv/repository"), &root));
        assert!(!overlaps(&NormalizedPath::new("/srv/other"), &root));
    }

    #[test]
    fn resolve_does_not_create_missing_components() {
        let dir = tempfile::tempdir().unwrap();
        let wanted = dir.path().join("a/b");

        let resolved = resolve(&wanted).unwrap();

        let base = NormalizedPath::canonical(dir.path()).unwrap();
        assert_eq!(resolved, base.join("a/b"));
        assert!(!dir.path().join("a").exists());
    }

    #[test]
    fn artifacts_inside_a_repository_are_refused_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("ref");
        fs::create_dir_all(repo.join("cms.site")).unwrap();
        fs::write(repo.join("cms.site/main.toml"), "x").unwrap();
        let repo = NormalizedPath::canonical(&repo).unwrap();

        for candidate in [repo.to_native(), repo.to_native().join("Artifacts"), dir.path().to_path_buf()] {
            assert!(prepare_artifacts(&candidate, &[&repo]).is_err(), "{candidate:?}");
        }
        assert!(repo.join("cms.site/main.toml").is_file());
    }

    #[test]
    fn artifacts_outside_repositories_are_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("ref");
        fs::create_dir_all(&repo).unwrap();
        let repo = NormalizedPath::canonical(&repo).unwrap();
        fs::create_dir_all(dir.path().join("Artifacts/target")).unwrap();
        fs::write(dir.path().join("Artifacts/target/old.toml"), "stale").unwrap();

        let artifacts = prepare_artifacts(&dir.path().join("Artifacts"), &[&repo]).unwrap();

        assert!(!artifacts.exists());
    }
}
