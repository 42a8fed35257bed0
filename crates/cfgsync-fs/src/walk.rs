//! Deterministic directory walking

use std::collections::BTreeSet;
use std::fs;

use crate::{Error, NormalizedPath, Result};

/// Files found below a root, as sorted root-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    /// Relative paths using forward slashes, in lexicographic order
    pub files: BTreeSet<String>,
    /// Entries below the root that could not be read, with the reason
    pub unreadable: Vec<(String, String)>,
}

/// List every regular file below `root`.
///
/// A missing or unreadable root is an error; anything unreadable further
/// down is recorded in [`FileListing::unreadable`] and the walk continues.
/// A symlink to a file counts as a file. Dangling symlinks, symlinks to
/// directories and other special entries are recorded as unreadable.
pub fn list_files(root: &NormalizedPath) -> Result<FileListing> {
    let native = root.to_native();
    let entries = fs::read_dir(&native).map_err(|e| Error::io(&native, e))?;

    let mut listing = FileListing::default();
    let mut pending = vec![(String::new(), entries)];

    while let Some((prefix, entries)) = pending.pop() {
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    listing.unreadable.push((prefix.clone(), e.to_string()));
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    listing.unreadable.push((relative, e.to_string()));
                    continue;
                }
            };

            if file_type.is_dir() {
                match fs::read_dir(entry.path()) {
                    Ok(children) => pending.push((relative, children)),
                    Err(e) => listing.unreadable.push((relative, e.to_string())),
                }
            } else if file_type.is_file() {
                listing.files.insert(relative);
            } else {
                match fs::metadata(entry.path()) {
                    Ok(target) if target.is_file() => {
                        listing.files.insert(relative);
                    }
                    Ok(target) if target.is_dir() => listing
                        .unreadable
                        .push((relative, "symlinked directory is not followed".to_string())),
                    Ok(_) => listing
                        .unreadable
                        .push((relative, "not a regular file".to_string())),
                    Err(e) => listing.unreadable.push((relative, e.to_string())),
                }
            }
        }
    }

    listing.unreadable.sort();
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_nested_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/inner")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("b/inner/z.txt"), "z").unwrap();
        fs::write(dir.path().join("a/y.txt"), "y").unwrap();
        fs::write(dir.path().join("root.txt"), "r").unwrap();

        let listing = list_files(&NormalizedPath::new(dir.path())).unwrap();
        let files: Vec<_> = listing.files.into_iter().collect();

        assert_eq!(files, vec!["a/y.txt", "b/inner/z.txt", "root.txt"]);
        assert!(listing.unreadable.is_empty());
    }

    #[test]
    fn empty_directories_produce_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/deeper")).unwrap();

        let listing = list_files(&NormalizedPath::new(dir.path())).unwrap();
        assert!(listing.files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_resolve_or_are_unreadable() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cms.site")).unwrap();
        fs::write(dir.path().join("cms.site/main.toml"), "x").unwrap();
        symlink(dir.path().join("cms.site/main.toml"), dir.path().join("alias.toml")).unwrap();
        symlink(dir.path().join("missing.toml"), dir.path().join("dangling.toml")).unwrap();
        symlink(dir.path().join("cms.site"), dir.path().join("linked")).unwrap();

        let listing = list_files(&NormalizedPath::new(dir.path())).unwrap();
        let files: Vec<_> = listing.files.into_iter().collect();
        let unreadable: Vec<_> = listing.unreadable.iter().map(|(p, _)| p.as_str()).collect();

        assert_eq!(files, vec!["alias.toml", "cms.site/main.toml"]);
        assert_eq!(unreadable, vec!["dangling.toml", "linked"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = list_files(&NormalizedPath::new(dir.path().join("nope")));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
