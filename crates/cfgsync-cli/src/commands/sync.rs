//! Store and restore command implementations
//!
//! Both run a batch job against the database named by the connection
//! string. Restore saves the database snapshot afterwards.

use std::path::Path;

use cfgsync_core::{CancellationToken, RepositoryConfiguration, restore_all_job, store_all_job};

use crate::cli::ConnectionArgs;
use crate::commands::{finished, open_database, stage};
use crate::error::{CliError, Result};
use crate::output::Output;

/// Run the store command. Returns whether every object was stored.
pub fn run_store(
    connection: &ConnectionArgs,
    repository: &Path,
    bindings: bool,
    workers: Option<usize>,
    cancel: &CancellationToken,
    output: &dyn Output,
) -> Result<bool> {
    let (database, license) = stage(output, "Connecting to database", || open_database(connection))?;

    let summary = stage(output, "Storing objects", || {
        std::fs::create_dir_all(repository)?;
        let mut config = RepositoryConfiguration::load(repository)?;
        config.include_bindings |= bindings;
        if let Some(workers) = workers {
            config = config.with_workers(workers);
        }
        let job = store_all_job(config, database.catalog(), database.store(), license);
        finished(output, job.run(cancel)?)
    })?;

    Ok(summary.is_clean())
}

/// Run the restore command. Returns whether every object was restored.
pub fn run_restore(
    connection: &ConnectionArgs,
    repository: &Path,
    bindings: bool,
    cancel: &CancellationToken,
    output: &dyn Output,
) -> Result<bool> {
    let (database, license) = stage(output, "Connecting to database", || open_database(connection))?;

    let summary = stage(output, "Restoring objects", || {
        if !repository.is_dir() {
            return Err(CliError::user(format!(
                "Repository {} is not a directory",
                repository.display()
            )));
        }
        let mut config = RepositoryConfiguration::load(repository)?;
        config.include_bindings |= bindings;
        let job = restore_all_job(config, database.catalog(), database.store(), license);
        finished(output, job.run(cancel)?)
    })?;

    stage(output, "Saving database", || Ok(database.save()?))?;
    Ok(summary.is_clean())
}
