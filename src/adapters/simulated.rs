use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use crate::core::analyzer::DRIVE_OK_LINE;
use crate::core::process::{Invocation, ToolError, ToolOutput, ToolRunner};

/// Disc reported by the simulated identification tool.
pub const SIMULATED_DISC_JSON: &str = r#"{
  "first_track": 1,
  "last_track": 3,
  "sectors": 40000,
  "freedb_id": "1e02bc03",
  "musicbrainz_id": "sim.disc.id.NdKZ4-",
  "tracks": [
    {"number": 1, "offset": 150, "length": 13000},
    {"number": 2, "offset": 13150, "length": 14000},
    {"number": 3, "offset": 27150, "length": 12850}
  ]
}"#;

/// Stand-in for the external tools.
///
/// Scripted responses (per program, first in first out) are returned as-is
/// with no side effects. Once a program's script runs dry, the runner
/// imitates the real tool: rips write a silent WAV and a log, analysis
/// writes a passing log, identification reports a three-track disc.
/// Every invocation is recorded.
#[derive(Default)]
pub struct SimulatedRunner {
    scripted: Mutex<HashMap<String, VecDeque<ToolOutput>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl SimulatedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, program: &str, output: ToolOutput) {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(program.to_string())
            .or_default()
            .push_back(output);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn invocations_of(&self, program: &str) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|inv| inv.program == program)
            .collect()
    }

    fn next_scripted(&self, program: &str) -> Option<ToolOutput> {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(program)
            .and_then(VecDeque::pop_front)
    }

    async fn imitate(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        if invocation.has_arg("--analyze-drive") {
            if let Some(log) = invocation.flag_value("--log-summary") {
                write(Path::new(log), format!("Simulated drive analysis\n\n{DRIVE_OK_LINE}\n")).await?;
            }
            return Ok(ToolOutput::success(""));
        }

        if invocation.has_arg("--output-wav") {
            if let Some(log) = invocation.flag_value("--log-summary") {
                write(Path::new(log), "Simulated rip: no errors\n".to_string()).await?;
            }
            if let Some(wav) = invocation.args.last() {
                write_silent_wav(Path::new(wav)).await?;
            }
            return Ok(ToolOutput::success(""));
        }

        if invocation.has_arg("--json") {
            return Ok(ToolOutput::success(SIMULATED_DISC_JSON));
        }

        Ok(ToolOutput::success(""))
    }
}

#[async_trait]
impl ToolRunner for SimulatedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());

        if let Some(output) = self.next_scripted(&invocation.program) {
            return Ok(output);
        }

        info!(command = %invocation, "(Simulated) Running tool");
        self.imitate(invocation).await
    }
}

async fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), ToolError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ToolError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// 16-bit stereo 44.1kHz WAV header with an empty data chunk.
async fn write_silent_wav(path: &Path) -> Result<(), ToolError> {
    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&36u32.to_le_bytes());
    header.extend_from_slice(b"WAVEfmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&2u16.to_le_bytes());
    header.extend_from_slice(&44_100u32.to_le_bytes());
    header.extend_from_slice(&176_400u32.to_le_bytes());
    header.extend_from_slice(&4u16.to_le_bytes());
    header.extend_from_slice(&16u16.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&0u32.to_le_bytes());
    write(path, header).await
}
