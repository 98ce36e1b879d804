use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::device::DeviceName;
use super::models::AnalysisResult;
use super::process::{Invocation, ToolError, ToolRunner};

/// Final log line cdparanoia writes when every drive test passed.
pub const DRIVE_OK_LINE: &str = "Drive tests OK with Paranoia.";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Non-zero exit with nothing on stderr; the log's last line says why.
    #[error("drive self-test exited with status {}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed { code: Option<i32>, last_line: String },

    #[error("analysis log {}: {source}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn analysis_log_path(output_root: &Path, device: &DeviceName) -> PathBuf {
    output_root.join(format!("{device}-drive-analysis.log"))
}

/// Last line of `text` with anything other than whitespace on it.
pub fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rev().find(|line| !line.is_empty())
}

/// Last non-empty line of a log that may not exist.
async fn read_last_line(path: &Path) -> Option<String> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    last_non_empty_line(&text).map(str::to_string)
}

pub struct DriveAnalyzer {
    runner: Arc<dyn ToolRunner>,
    program: String,
    output_root: PathBuf,
}

impl DriveAnalyzer {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        program: impl Into<String>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            output_root: output_root.into(),
        }
    }

    /// Run the tool's drive self-test. The verdict comes from the log file
    /// the tool writes, not from its console output; the log is kept either
    /// way. Without `speed` the tool picks its own maximum.
    pub async fn analyze(
        &self,
        device: &DeviceName,
        speed: Option<u32>,
    ) -> Result<AnalysisResult, AnalyzeError> {
        let log_file = analysis_log_path(&self.output_root, device);
        let log_error = |source| AnalyzeError::Log {
            path: log_file.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.output_root)
            .await
            .map_err(|source| AnalyzeError::Log {
                path: self.output_root.clone(),
                source,
            })?;

        // A log left over from an earlier run must not decide this one.
        match tokio::fs::remove_file(&log_file).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(log_error(e)),
            _ => {}
        }

        let mut invocation = Invocation::new(&self.program)
            .arg(format!("--force-cdrom-device={}", device.dev_path().display()));
        if let Some(speed) = speed {
            invocation = invocation.arg(format!("--force-read-speed={speed}"));
        }
        let invocation = invocation
            .arg("--analyze-drive")
            .arg("--quiet")
            .arg(format!("--log-summary={}", log_file.display()))
            .arg(format!("--log-debug={}", log_file.display()));

        info!(device = %device, speed = ?speed, log = %log_file.display(), "Analyzing drive");

        let output = self.runner.run(&invocation).await?;
        if !output.exited_ok() && output.stderr.trim().is_empty() {
            if let Some(last_line) = read_last_line(&log_file).await {
                warn!(
                    device = %device,
                    code = ?output.code,
                    last_line = %last_line,
                    "Drive analysis aborted"
                );
                return Err(AnalyzeError::Failed {
                    code: output.code,
                    last_line,
                });
            }
        }
        output.require_success(&self.program)?;

        let text = tokio::fs::read_to_string(&log_file).await.map_err(log_error)?;
        let last_line = last_non_empty_line(&text).unwrap_or_default().to_string();
        let passed = last_line == DRIVE_OK_LINE;

        if passed {
            info!(device = %device, "Drive analysis passed");
        } else {
            warn!(device = %device, last_line = %last_line, "Drive analysis failed");
        }

        Ok(AnalysisResult {
            passed,
            last_line,
            log_file,
        })
    }
}
