use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

const DEV_PREFIX: &str = "/dev/";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid device name: {0:?}")]
pub struct InvalidDevice(pub String);

/// Kernel-assigned short name of a drive (e.g. `sr0`).
///
/// Accepts either the bare name or the `/dev/`-prefixed form; both normalize
/// to the same value, so it is safe to use as a map or lock key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceName(String);

impl DeviceName {
    pub fn parse(raw: &str) -> Result<Self, InvalidDevice> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix(DEV_PREFIX).unwrap_or(trimmed);

        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name
                .chars()
                .any(|c| c == '/' || c == '\0' || c.is_whitespace());

        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(InvalidDevice(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Device node under the given device directory (normally `/dev`).
    pub fn node_in(&self, dev_dir: &Path) -> PathBuf {
        dev_dir.join(&self.0)
    }

    pub fn dev_path(&self) -> PathBuf {
        self.node_in(Path::new(DEV_PREFIX))
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_and_prefixed_forms_normalize_together() {
        let bare = DeviceName::parse("sr0").unwrap();
        let prefixed = DeviceName::parse("/dev/sr0").unwrap();
        assert_eq!(bare, prefixed);
        assert_eq!(bare.dev_path(), PathBuf::from("/dev/sr0"));
    }

    #[test]
    fn rejects_traversal_and_nested_paths() {
        for raw in ["", "..", ".", "/dev/", "../sr0", "/dev/block/sr0", "sr 0"] {
            assert!(DeviceName::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn node_in_uses_given_directory() {
        let name = DeviceName::parse("scd1").unwrap();
        assert_eq!(name.node_in(Path::new("/tmp/fake")), PathBuf::from("/tmp/fake/scd1"));
    }
}
