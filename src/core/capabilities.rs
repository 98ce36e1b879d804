//! Parser for the kernel's CD-ROM capability table (`/proc/sys/dev/cdrom/info`).
//!
//! The table is column-positional: a `drive name:` row lists the drives, and
//! every following `key: value...` row carries one whitespace-separated token
//! per drive, in header order.
//!
//! ```text
//! CD-ROM information, Id: cdrom.c 3.20 2003/12/17
//!
//! drive name:             sr1     sr0
//! drive speed:            40      24
//! drive # of slots:       1       1
//! Can close tray:         1       1
//! ...
//! ```
//!
//! Anything this parser does not recognise after the header is an error: a
//! changed kernel format must fail loudly instead of yielding half-filled
//! records.

use thiserror::Error;
use tracing::debug;

use super::models::{DeviceList, DriveRecord};

const HEADER_KEY: &str = "drive name";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("line {line}: expected `key: value` row")]
    MalformedRow { line: usize },

    #[error("line {line}: second `drive name` row")]
    DuplicateHeader { line: usize },

    #[error("line {line}: drive {name:?} listed twice in the header")]
    DuplicateDrive { line: usize, name: String },

    #[error("row {key:?} has {found} column(s), header lists {expected} drive(s)")]
    ColumnMismatch {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown capability key {0:?}")]
    UnknownKey(String),

    #[error("row {key:?}: {value:?} is not a base-10 integer")]
    InvalidNumber { key: String, value: String },
}

#[derive(Clone, Copy)]
enum Field {
    Number(fn(&mut DriveRecord) -> &mut u32),
    Flag(fn(&mut DriveRecord) -> &mut bool),
}

/// Lowercased row key to the record field it fills.
const FIELDS: &[(&str, Field)] = &[
    ("drive speed", Field::Number(|r| &mut r.speed)),
    ("drive # of slots", Field::Number(|r| &mut r.slots)),
    ("can close tray", Field::Flag(|r| &mut r.can_close_tray)),
    ("can open tray", Field::Flag(|r| &mut r.can_open_tray)),
    ("can lock tray", Field::Flag(|r| &mut r.can_lock_tray)),
    ("can change speed", Field::Flag(|r| &mut r.can_change_speed)),
    ("can select disk", Field::Flag(|r| &mut r.can_select_disk)),
    ("can read multisession", Field::Flag(|r| &mut r.can_read_multisession)),
    ("can read mcn", Field::Flag(|r| &mut r.can_read_mcn)),
    ("reports media changed", Field::Flag(|r| &mut r.reports_media_changed)),
    ("can play audio", Field::Flag(|r| &mut r.can_play_audio)),
    ("can write cd-r", Field::Flag(|r| &mut r.can_write_cd_r)),
    ("can write cd-rw", Field::Flag(|r| &mut r.can_write_cd_rw)),
    ("can read dvd", Field::Flag(|r| &mut r.can_read_dvd)),
    ("can write dvd-r", Field::Flag(|r| &mut r.can_write_dvd_r)),
    ("can write dvd-ram", Field::Flag(|r| &mut r.can_write_dvd_ram)),
    ("can read mrw", Field::Flag(|r| &mut r.can_read_mrw)),
    ("can write mrw", Field::Flag(|r| &mut r.can_write_mrw)),
    ("can write ram", Field::Flag(|r| &mut r.can_write_ram)),
];

fn lookup(key: &str) -> Option<Field> {
    FIELDS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, field)| *field)
}

impl Field {
    fn apply(self, key: &str, record: &mut DriveRecord, token: &str) -> Result<(), CapabilityError> {
        match self {
            Field::Number(slot) => {
                *slot(record) = token.parse().map_err(|_| CapabilityError::InvalidNumber {
                    key: key.to_string(),
                    value: token.to_string(),
                })?;
            }
            Field::Flag(slot) => *slot(record) = token == "1",
        }
        Ok(())
    }
}

/// Parse the capability table into one record per drive named in the header.
///
/// Rows before the header are ignored. Vendor, model and accessibility are
/// left at their defaults; the catalog fills them in from sysfs.
pub fn parse_capability_table(text: &str) -> Result<DeviceList, CapabilityError> {
    let mut names: Option<Vec<String>> = None;
    let mut records = DeviceList::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let row = raw.trim();
        if row.is_empty() {
            continue;
        }

        let Some((key, value)) = row.split_once(':') else {
            if names.is_none() {
                continue;
            }
            return Err(CapabilityError::MalformedRow { line });
        };
        let key = key.trim().to_lowercase();

        if key.contains(HEADER_KEY) {
            if names.is_some() {
                return Err(CapabilityError::DuplicateHeader { line });
            }
            let header: Vec<String> = value.split_whitespace().map(str::to_string).collect();
            for name in &header {
                if records.insert(name.clone(), DriveRecord::named(name)).is_some() {
                    return Err(CapabilityError::DuplicateDrive {
                        line,
                        name: name.clone(),
                    });
                }
            }
            debug!(drives = ?header, "Capability table header");
            names = Some(header);
            continue;
        }

        let Some(names) = names.as_deref() else {
            continue;
        };

        let tokens: Vec<&str> = value.split_whitespace().collect();
        if tokens.len() != names.len() {
            return Err(CapabilityError::ColumnMismatch {
                key,
                expected: names.len(),
                found: tokens.len(),
            });
        }

        let field = lookup(&key).ok_or_else(|| CapabilityError::UnknownKey(key.clone()))?;

        for (name, token) in names.iter().zip(tokens) {
            if let Some(record) = records.get_mut(name) {
                field.apply(&key, record, token)?;
            }
        }
    }

    Ok(records)
}
