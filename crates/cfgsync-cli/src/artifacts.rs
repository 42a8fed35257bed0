//! Copies of the files behind each issue, for inspection after a failed check

use cfgsync_content::Issue;
use cfgsync_fs::{NormalizedPath, io};

use crate::error::Result;

/// Subdirectory receiving files from the reference repository
pub const REFERENCE_DIR: &str = "reference";
/// Subdirectory receiving files from the target repository
pub const TARGET_DIR: &str = "target";

/// Copy every file named by `issues` from both roots into `artifacts`.
///
/// Files land in `<artifacts>/reference/<path>` and
/// `<artifacts>/target/<path>`. A side where the file does not exist (added
/// or removed files) is skipped. Returns the number of files copied.
pub fn copy_artifacts(
    issues: &[Issue],
    reference: &NormalizedPath,
    target: &NormalizedPath,
    artifacts: &NormalizedPath,
) -> Result<usize> {
    let mut copied = 0;
    for issue in issues {
        for (root, side) in [(reference, REFERENCE_DIR), (target, TARGET_DIR)] {
            let source = root.join(&issue.path);
            if !source.is_file() {
                continue;
            }
            let destination = artifacts.join(side).join(&issue.path);
            io::copy_file(&source, &destination)?;
            tracing::debug!(from = %source, to = %destination, "Copied artifact");
            copied += 1;
        }
    }
    Ok(copied)
}
