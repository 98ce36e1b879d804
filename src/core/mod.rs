pub mod analyzer;
pub mod capabilities;
pub mod catalog;
pub mod device;
pub mod discid;
pub mod locks;
pub mod models;
pub mod probe;
pub mod process;
pub mod ripper;
pub mod tray;

pub use analyzer::{AnalyzeError, DRIVE_OK_LINE, DriveAnalyzer};
pub use capabilities::{CapabilityError, parse_capability_table};
pub use catalog::{CatalogError, DeviceCatalog};
pub use device::{DeviceName, InvalidDevice};
pub use discid::{DiscIdError, DiscIdentifier};
pub use locks::{DeviceBusy, DeviceGuard, DeviceLocks};
pub use models::{AnalysisResult, DeviceList, DiscIdentity, DiscRip, DriveRecord, Track, TrackRip};
pub use probe::DriveProbe;
pub use process::{Invocation, ToolError, ToolOutput, ToolRunner};
pub use ripper::{DEFAULT_SPEED, RipError, RipOrchestrator, TrackRipRequest};
pub use tray::TrayController;
