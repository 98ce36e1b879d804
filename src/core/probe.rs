use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};
use tracing::{debug, warn};

use super::device::DeviceName;
use super::models::DriveRecord;

/// Reads per-drive identity from sysfs and checks the device node's permissions.
///
/// Neither check is fatal: missing sysfs attributes leave vendor/model empty,
/// and a node we cannot open read-write is reported as inaccessible.
#[derive(Debug, Clone)]
pub struct DriveProbe {
    sysfs_block: PathBuf,
    dev_dir: PathBuf,
}

impl DriveProbe {
    pub fn new(sysfs_block: impl Into<PathBuf>, dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_block: sysfs_block.into(),
            dev_dir: dev_dir.into(),
        }
    }

    pub fn probe(&self, name: &DeviceName, record: &mut DriveRecord) {
        let device_dir = self.sysfs_block.join(name.as_str()).join("device");
        record.vendor = read_attribute(&device_dir.join("vendor"));
        record.model = read_attribute(&device_dir.join("model"));
        record.accessible = self.is_accessible(name);
    }

    pub fn is_accessible(&self, name: &DeviceName) -> bool {
        let node = name.node_in(&self.dev_dir);
        match check_access(&node) {
            Ok(()) => true,
            Err(e) => {
                debug!(device = %name, path = %node.display(), error = %e, "Drive not accessible");
                false
            }
        }
    }
}

/// Whether the current process may open `path` for reading and writing.
pub fn check_access(path: &Path) -> nix::Result<()> {
    access(path, AccessFlags::R_OK | AccessFlags::W_OK)
}

fn read_attribute(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(value) => value.trim().to_string(),
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read drive attribute");
            String::new()
        }
    }
}
