//! SHA-256 content fingerprints
//!
//! Rendered as `sha256:<hex>`. Used to skip rewriting object files whose
//! content is unchanged and to describe binary differences.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::io;
use crate::path::NormalizedPath;

const PREFIX: &str = "sha256:";

/// SHA-256 digest of a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(content.as_ref()));
        Self(digest)
    }

    /// Checksum of a file, or `None` when there is no such file.
    pub fn of_file(path: &NormalizedPath) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Self::of(io::read_bytes(path)?)))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PREFIX)?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_value() {
        assert_eq!(
            Checksum::of("hello world").to_string(),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn text_and_bytes_agree() {
        assert_eq!(Checksum::of("guid = 1\n"), Checksum::of(b"guid = 1\n"));
        assert_ne!(Checksum::of("a"), Checksum::of("b"));
    }

    #[test]
    fn file_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("site.toml"));
        assert_eq!(Checksum::of_file(&path).unwrap(), None);

        std::fs::write(path.to_native(), "name = \"main\"\n").unwrap();
        assert_eq!(
            Checksum::of_file(&path).unwrap(),
            Some(Checksum::of("name = \"main\"\n"))
        );
    }
}
