use std::sync::Arc;

use tracing::info;

use super::device::DeviceName;
use super::process::{Invocation, ToolError, ToolRunner};

pub struct TrayController {
    runner: Arc<dyn ToolRunner>,
    program: String,
}

impl TrayController {
    pub fn new(runner: Arc<dyn ToolRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Open the tray. The eject tool is given the bare device name.
    pub async fn eject(&self, device: &DeviceName) -> Result<(), ToolError> {
        let invocation = Invocation::new(&self.program).arg(device.as_str());
        self.runner
            .run(&invocation)
            .await?
            .require_success(&self.program)?;

        info!(device = %device, "Tray ejected");
        Ok(())
    }
}
