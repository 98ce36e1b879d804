//! Audio extraction through cdparanoia.
//!
//! A track rip never accepts skipped sectors: the tool is told to retry
//! forever and to abort the track if it would have to skip. A partial WAV
//! left behind by a failed rip is kept for diagnosis.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

use super::device::DeviceName;
use super::discid::{DiscIdError, DiscIdentifier};
use super::models::{DiscRip, TrackRip};
use super::process::{Invocation, ToolError, ToolRunner};

pub const DEFAULT_SPEED: u32 = 4;

#[derive(Debug, Error)]
pub enum RipError {
    #[error("could not identify disc: {0}")]
    Identify(#[source] DiscIdError),

    #[error("track {track} failed: {source}")]
    Track {
        track: u32,
        #[source]
        source: ToolError,
    },

    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RipError {
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            RipError::Identify(DiscIdError::Tool(e)) | RipError::Track { source: e, .. } => {
                e.diagnostic()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackRipRequest {
    pub device: DeviceName,
    pub track: u32,
    pub speed: u32,
    pub output_dir: PathBuf,
    pub filename: String,
}

/// `<dir>/<filename>.wav` and `<dir>/<filename>.log`.
pub fn artifact_paths(output_dir: &Path, filename: &str) -> (PathBuf, PathBuf) {
    (
        output_dir.join(format!("{filename}.wav")),
        output_dir.join(format!("{filename}.log")),
    )
}

pub struct RipOrchestrator {
    runner: Arc<dyn ToolRunner>,
    program: String,
    identifier: Arc<DiscIdentifier>,
}

impl RipOrchestrator {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        program: impl Into<String>,
        identifier: Arc<DiscIdentifier>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            identifier,
        }
    }

    fn track_invocation(&self, req: &TrackRipRequest, wav: &Path, log: &Path) -> Invocation {
        Invocation::new(&self.program)
            .arg(format!("--force-cdrom-device={}", req.device.dev_path().display()))
            .arg(format!("--force-read-speed={}", req.speed))
            .arg("--never-skip")
            .arg("--abort-on-skip")
            .arg("--quiet")
            .arg(format!("--log-summary={}", log.display()))
            .arg(format!("--log-debug={}", log.display()))
            .arg("--output-wav")
            .arg(req.track.to_string())
            .arg(wav.to_string_lossy())
    }

    pub async fn rip_track(&self, req: &TrackRipRequest) -> Result<TrackRip, RipError> {
        tokio::fs::create_dir_all(&req.output_dir)
            .await
            .map_err(|source| RipError::OutputDir {
                path: req.output_dir.clone(),
                source,
            })?;

        let (wav_file, log_file) = artifact_paths(&req.output_dir, &req.filename);
        let invocation = self.track_invocation(req, &wav_file, &log_file);

        info!(
            device = %req.device,
            track = req.track,
            speed = req.speed,
            wav = %wav_file.display(),
            "Ripping track"
        );

        let started_at = Utc::now();
        let start = Instant::now();

        let outcome = match self.runner.run(&invocation).await {
            Ok(output) => output.require_clean(&self.program).map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(source) = outcome {
            error!(
                device = %req.device,
                track = req.track,
                log = %log_file.display(),
                error = %source,
                "Track rip failed"
            );
            return Err(RipError::Track {
                track: req.track,
                source,
            });
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(device = %req.device, track = req.track, elapsed_ms, "Track ripped");

        Ok(TrackRip {
            track_num: req.track,
            speed: req.speed,
            output_dir: req.output_dir.clone(),
            filename: req.filename.clone(),
            wav_file,
            log_file,
            started_at,
            elapsed_ms,
        })
    }

    /// Rip tracks 1 through the disc's last track, one after another,
    /// stopping at the first failure. Tracks already written stay on disk.
    pub async fn rip_disc(
        &self,
        device: &DeviceName,
        speed: u32,
        output_dir: &Path,
    ) -> Result<DiscRip, RipError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let identity = self
            .identifier
            .identify(device)
            .await
            .map_err(RipError::Identify)?;

        info!(
            device = %device,
            last_track = identity.last_track,
            output_dir = %output_dir.display(),
            "Ripping disc"
        );

        let mut tracks = Vec::with_capacity(identity.last_track as usize);
        for track in 1..=identity.last_track {
            let req = TrackRipRequest {
                device: device.clone(),
                track,
                speed,
                output_dir: output_dir.to_path_buf(),
                filename: track.to_string(),
            };
            tracks.push(self.rip_track(&req).await?);
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(device = %device, tracks = tracks.len(), elapsed_ms, "Disc ripped");

        Ok(DiscRip {
            last_track: identity.last_track,
            speed,
            output_dir: output_dir.to_path_buf(),
            tracks,
            started_at,
            elapsed_ms,
        })
    }
}
