use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{
    DeviceCatalog, DeviceLocks, DiscIdentifier, DriveAnalyzer, RipOrchestrator, ToolRunner,
    TrayController,
};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<DeviceCatalog>,
    pub locks: DeviceLocks,
    pub identifier: Arc<DiscIdentifier>,
    pub ripper: Arc<RipOrchestrator>,
    pub analyzer: Arc<DriveAnalyzer>,
    pub tray: Arc<TrayController>,
}

impl AppContext {
    pub fn new(config: AppConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let tools = &config.tools;

        let catalog = DeviceCatalog::new(config.sources.clone(), &config.exclude_drives);
        let identifier = Arc::new(DiscIdentifier::new(runner.clone(), &tools.discid));
        let ripper = RipOrchestrator::new(runner.clone(), &tools.paranoia, identifier.clone());
        let analyzer = DriveAnalyzer::new(runner.clone(), &tools.paranoia, &config.output_dir);
        let tray = TrayController::new(runner, &tools.eject);

        Self {
            catalog: Arc::new(catalog),
            locks: DeviceLocks::new(),
            identifier,
            ripper: Arc::new(ripper),
            analyzer: Arc::new(analyzer),
            tray: Arc::new(tray),
            config: Arc::new(config),
        }
    }
}
