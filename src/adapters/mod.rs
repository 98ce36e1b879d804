use std::path::Path;
use std::sync::Arc;

use crate::core::process::ToolRunner;

mod simulated;
mod system;

pub use simulated::{SIMULATED_DISC_JSON, SimulatedRunner};
pub use system::SystemRunner;

pub fn get_runner(simulation: bool, tmp_dir: &Path) -> Arc<dyn ToolRunner> {
    if simulation {
        tracing::warn!("Simulation mode: external tools will not be executed");
        return Arc::new(SimulatedRunner::new());
    }

    Arc::new(SystemRunner::new(tmp_dir.to_path_buf()))
}
