//! The authoritative list of usable drives.
//!
//! A drive makes it into the list when its node exists under the device
//! directory, it is not excluded, and the kernel capability table knows it.
//! The list is rebuilt from scratch on every refresh and published as a
//! whole; readers hold an `Arc` to whichever snapshot was current.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::capabilities::{CapabilityError, parse_capability_table};
use super::device::DeviceName;
use super::models::DeviceList;
use super::probe::DriveProbe;
use crate::config::SourcesConfig;

static OPTICAL_NODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(sr|scd)\d+$").expect("optical node pattern"));

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unsupported capability table: {0}")]
    Capability(#[from] CapabilityError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct DeviceCatalog {
    sources: SourcesConfig,
    excluded: HashSet<DeviceName>,
    snapshot: RwLock<Arc<DeviceList>>,
}

impl DeviceCatalog {
    pub fn new(sources: SourcesConfig, exclude: &[String]) -> Self {
        let excluded = exclude
            .iter()
            .filter_map(|raw| match DeviceName::parse(raw) {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!(error = %e, "Ignoring exclusion entry");
                    None
                }
            })
            .collect();

        Self {
            sources,
            excluded,
            snapshot: RwLock::new(Arc::new(DeviceList::new())),
        }
    }

    /// The most recently published device list.
    pub async fn current(&self) -> Arc<DeviceList> {
        self.snapshot.read().await.clone()
    }

    /// Rebuild the device list and publish it. On error the previous
    /// snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<DeviceList>, CatalogError> {
        let sources = self.sources.clone();
        let excluded = self.excluded.clone();

        let list = tokio::task::spawn_blocking(move || build_device_list(&sources, &excluded))
            .await??;

        let list = Arc::new(list);
        *self.snapshot.write().await = list.clone();

        info!(drives = list.len(), "Device catalog refreshed");
        Ok(list)
    }
}

/// Optical drive nodes present under `dev_dir`, sorted by name.
///
/// A directory we are not allowed to read yields no drives rather than an
/// error, so the service keeps running.
pub fn enumerate_drives(dev_dir: &Path) -> Result<Vec<DeviceName>, CatalogError> {
    let entries = match std::fs::read_dir(dev_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            warn!(path = %dev_dir.display(), error = %e, "Cannot enumerate drives");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(CatalogError::Io {
                path: dev_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut drives: Vec<DeviceName> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| OPTICAL_NODE.is_match(name))
        .filter_map(|name| DeviceName::parse(&name).ok())
        .collect();

    drives.sort();
    Ok(drives)
}

pub fn build_device_list(
    sources: &SourcesConfig,
    excluded: &HashSet<DeviceName>,
) -> Result<DeviceList, CatalogError> {
    let present: Vec<DeviceName> = enumerate_drives(&sources.dev_dir)?
        .into_iter()
        .filter(|name| {
            let skip = excluded.contains(name);
            if skip {
                info!(device = %name, "Excluding drive");
            }
            !skip
        })
        .collect();

    if present.is_empty() {
        return Ok(DeviceList::new());
    }

    let table = std::fs::read_to_string(&sources.cdrom_info).map_err(|source| CatalogError::Io {
        path: sources.cdrom_info.clone(),
        source,
    })?;
    let mut capabilities = parse_capability_table(&table)?;

    let probe = DriveProbe::new(&sources.sysfs_block, &sources.dev_dir);
    let mut list = DeviceList::new();

    for name in present {
        let Some(mut record) = capabilities.remove(name.as_str()) else {
            debug!(device = %name, "No capability data, skipping");
            continue;
        };
        probe.probe(&name, &mut record);
        list.insert(name.to_string(), record);
    }

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::{TempDir, tempdir};

    const TABLE: &str = "CD-ROM information, Id: cdrom.c 3.20 2003/12/17

drive name:\t\tsr2\tsr1\tsr0
drive speed:\t\t8\t40\t24
Can play audio:\t\t1\t1\t0
";

    struct FakeHost {
        _root: TempDir,
        sources: SourcesConfig,
    }

    fn fake_host(nodes: &[&str], table: &str) -> FakeHost {
        let root = tempdir().unwrap();
        let sources = SourcesConfig {
            dev_dir: root.path().join("dev"),
            cdrom_info: root.path().join("cdrom_info"),
            sysfs_block: root.path().join("sys/block"),
        };
        std::fs::create_dir_all(&sources.dev_dir).unwrap();
        for node in nodes {
            std::fs::write(sources.dev_dir.join(node), b"").unwrap();
        }
        std::fs::write(&sources.cdrom_info, table).unwrap();

        let device = sources.sysfs_block.join("sr0/device");
        std::fs::create_dir_all(&device).unwrap();
        std::fs::write(device.join("vendor"), "PLEXTOR\n").unwrap();
        std::fs::write(device.join("model"), "DVDR PX-716A\n").unwrap();

        FakeHost {
            _root: root,
            sources,
        }
    }

    fn excluded(entries: &[&str]) -> HashSet<DeviceName> {
        entries.iter().map(|e| DeviceName::parse(e).unwrap()).collect()
    }

    #[test]
    fn enumerates_only_optical_nodes() {
        let host = fake_host(&["sr0", "sr1", "scd3", "sda", "sr", "tty0", "sr0p1"], TABLE);
        let names: Vec<String> = enumerate_drives(&host.sources.dev_dir)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["scd3", "sr0", "sr1"]);
    }

    #[test]
    fn joins_nodes_with_capabilities_and_probe() {
        let host = fake_host(&["sr0", "sr1"], TABLE);
        let list = build_device_list(&host.sources, &HashSet::new()).unwrap();

        assert_eq!(list.keys().collect::<Vec<_>>(), ["sr0", "sr1"]);
        let sr0 = &list["sr0"];
        assert_eq!(sr0.speed, 24);
        assert!(!sr0.can_play_audio);
        assert_eq!(sr0.vendor, "PLEXTOR");
        assert_eq!(sr0.model, "DVDR PX-716A");
        assert!(sr0.accessible);
        assert_eq!(list["sr1"].vendor, "");
    }

    #[test]
    fn node_without_capability_row_is_dropped() {
        let host = fake_host(&["sr0", "sr7"], TABLE);
        let list = build_device_list(&host.sources, &HashSet::new()).unwrap();
        assert!(list.contains_key("sr0"));
        assert!(!list.contains_key("sr7"));
    }

    #[test]
    fn table_entry_without_node_is_dropped() {
        let host = fake_host(&["sr0"], TABLE);
        let list = build_device_list(&host.sources, &HashSet::new()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list.contains_key("sr2"));
    }

    #[test]
    fn exclusion_works_with_bare_and_prefixed_names() {
        let host = fake_host(&["sr0", "sr1", "sr2"], TABLE);

        let list = build_device_list(&host.sources, &excluded(&["sr1"])).unwrap();
        assert_eq!(list.keys().collect::<Vec<_>>(), ["sr0", "sr2"]);

        let list = build_device_list(&host.sources, &excluded(&["/dev/sr1", "/dev/sr2"])).unwrap();
        assert_eq!(list.keys().collect::<Vec<_>>(), ["sr0"]);
    }

    #[test]
    fn excluding_everything_skips_the_table() {
        let host = fake_host(&["sr0"], "drive name: sr0\nbogus row: 1\n");
        let list = build_device_list(&host.sources, &excluded(&["sr0"])).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn malformed_table_fails_the_build() {
        let host = fake_host(&["sr0"], "drive name: sr0 sr1\ndrive speed: 24\n");
        let err = build_device_list(&host.sources, &HashSet::new()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Capability(CapabilityError::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn missing_dev_dir_is_an_io_error() {
        let host = fake_host(&[], TABLE);
        let sources = SourcesConfig {
            dev_dir: host.sources.dev_dir.join("missing"),
            ..host.sources.clone()
        };
        assert!(matches!(
            build_device_list(&sources, &HashSet::new()),
            Err(CatalogError::Io { .. })
        ));
    }

    #[test]
    fn unreadable_dev_dir_yields_empty_list() {
        if nix::unistd::Uid::effective().is_root() {
            return;
        }
        let host = fake_host(&["sr0", "sr1"], TABLE);
        let dev_dir = &host.sources.dev_dir;
        std::fs::set_permissions(dev_dir, std::fs::Permissions::from_mode(0o000)).unwrap();

        let enumerated = enumerate_drives(dev_dir);
        let built = build_device_list(&host.sources, &HashSet::new());
        std::fs::set_permissions(dev_dir, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(enumerated.unwrap().is_empty());
        assert!(built.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot_and_keeps_it_on_failure() {
        let host = fake_host(&["sr0", "sr1"], TABLE);
        let catalog = DeviceCatalog::new(host.sources.clone(), &["/dev/sr1".to_string()]);

        assert!(catalog.current().await.is_empty());

        let refreshed = catalog.refresh().await.unwrap();
        assert_eq!(refreshed.keys().collect::<Vec<_>>(), ["sr0"]);
        let held = catalog.current().await;
        assert!(Arc::ptr_eq(&refreshed, &held));

        std::fs::write(&host.sources.cdrom_info, "drive name: sr0\nCan fly: 1\n").unwrap();
        assert!(catalog.refresh().await.is_err());
        assert!(Arc::ptr_eq(&held, &catalog.current().await));
    }
}
