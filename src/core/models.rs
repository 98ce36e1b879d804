use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capabilities of a single drive as reported by the kernel, plus what we
/// could learn about it from sysfs and the device node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveRecord {
    pub name: String,
    pub speed: u32,
    pub slots: u32,
    pub can_close_tray: bool,
    pub can_open_tray: bool,
    pub can_lock_tray: bool,
    pub can_change_speed: bool,
    pub can_select_disk: bool,
    pub can_read_multisession: bool,
    pub can_read_mcn: bool,
    pub reports_media_changed: bool,
    pub can_play_audio: bool,
    pub can_write_cd_r: bool,
    pub can_write_cd_rw: bool,
    pub can_read_dvd: bool,
    pub can_write_dvd_r: bool,
    pub can_write_dvd_ram: bool,
    pub can_read_mrw: bool,
    pub can_write_mrw: bool,
    pub can_write_ram: bool,
    pub vendor: String,
    pub model: String,
    pub accessible: bool,
}

impl DriveRecord {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Drives keyed by device name.
pub type DeviceList = BTreeMap<String, DriveRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub number: u32,
    pub offset: u64,
    pub length: u64,
}

/// Table of contents summary for the disc currently in a drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscIdentity {
    pub first_track: u32,
    pub last_track: u32,
    pub sectors: u64,
    pub freedb_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub musicbrainz_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub musicbrainz_url: Option<String>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRip {
    pub track_num: u32,
    pub speed: u32,
    pub output_dir: PathBuf,
    pub filename: String,
    pub wav_file: PathBuf,
    pub log_file: PathBuf,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscRip {
    pub last_track: u32,
    pub speed: u32,
    pub output_dir: PathBuf,
    pub tracks: Vec<TrackRip>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub passed: bool,
    pub last_line: String,
    pub log_file: PathBuf,
}
