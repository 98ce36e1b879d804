//! Request handlers for the drive API.
//!
//! Input is validated before anything touches a drive. Every operation that
//! runs a tool against a drive holds that drive's lock for its whole
//! duration and runs on its own task, so a client hanging up does not
//! abandon a half-finished rip.

use std::future::Future;
use std::path::{Component, Path as FsPath, PathBuf};

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::HttpError;
use crate::context::AppContext;
use crate::core::{
    DEFAULT_SPEED, DRIVE_OK_LINE, DeviceList, DeviceName, DiscRip, TrackRip, TrackRipRequest,
};

/// Successful response: `{"error": "false", ...body}`.
#[derive(Serialize)]
pub struct ApiOk<T> {
    error: &'static str,
    #[serde(flatten)]
    body: T,
}

fn ok<T: Serialize>(body: T) -> Json<ApiOk<T>> {
    Json(ApiOk {
        error: "false",
        body,
    })
}

#[derive(Serialize)]
pub struct DrivesBody {
    drives: DeviceList,
}

#[derive(Serialize)]
pub struct DiscBody {
    disc: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RipTrackQuery {
    speed: Option<String>,
    output_dir: Option<String>,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RipCdQuery {
    speed: Option<String>,
    output_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    speed: Option<String>,
}

/// Non-negative base-10 integer, digits only.
fn parse_count(name: &str, raw: &str) -> Result<u32, HttpError> {
    let invalid = || HttpError::BadRequest(format!("{name} must be a non-negative integer, got {raw:?}"));
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}

fn parse_speed(raw: Option<&str>) -> Result<Option<u32>, HttpError> {
    raw.map(|s| parse_count("speed", s)).transpose()
}

/// A directory below the output root: relative, no `..`, not empty.
fn relative_dir(raw: &str) -> Result<PathBuf, HttpError> {
    let path = FsPath::new(raw);
    let normal = path.components().all(|c| matches!(c, Component::Normal(_)));
    if raw.is_empty() || !normal {
        return Err(HttpError::BadRequest(format!(
            "outputDir must be a relative path without '..', got {raw:?}"
        )));
    }
    Ok(path.to_path_buf())
}

fn base_filename(raw: &str) -> Result<String, HttpError> {
    if raw.is_empty() || raw == "." || raw == ".." || raw.contains('/') || raw.contains('\0') {
        return Err(HttpError::BadRequest(format!(
            "filename must be a plain file name, got {raw:?}"
        )));
    }
    Ok(raw.to_string())
}

/// Run `job` while holding the drive's lock, on a task of its own.
async fn exclusive<T, F>(ctx: &AppContext, device: &DeviceName, job: F) -> Result<T, HttpError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, HttpError>> + Send + 'static,
{
    let guard = ctx.locks.try_acquire(device)?;
    tokio::spawn(async move {
        let result = job.await;
        debug!(device = %guard.device(), "Releasing drive");
        drop(guard);
        result
    })
    .await
    .map_err(|e| HttpError::internal(format!("Operation task failed: {e}")))?
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn list_drives(State(ctx): State<AppContext>) -> Json<ApiOk<DrivesBody>> {
    let drives = ctx.catalog.current().await;
    ok(DrivesBody {
        drives: drives.as_ref().clone(),
    })
}

pub async fn update_drives(
    State(ctx): State<AppContext>,
) -> Result<Json<ApiOk<DrivesBody>>, HttpError> {
    let drives = ctx.catalog.refresh().await?;
    Ok(ok(DrivesBody {
        drives: drives.as_ref().clone(),
    }))
}

pub async fn disc_id(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ApiOk<DiscBody>>, HttpError> {
    let Path(device) = path?;
    let device = DeviceName::parse(&device)?;
    let identifier = ctx.identifier.clone();
    let target = device.clone();

    let identity = exclusive(&ctx, &device, async move {
        identifier.identify(&target).await.map_err(HttpError::from)
    })
    .await?;

    let disc = identity
        .to_sorted_json()
        .map_err(|e| HttpError::internal(format!("Failed to encode disc identity: {e}")))?;
    Ok(ok(DiscBody { disc }))
}

pub async fn rip_track_missing(path: Result<Path<String>, PathRejection>) -> HttpError {
    match path {
        Ok(Path(device)) => HttpError::BadRequest(format!("Missing track number for {device}")),
        Err(rejection) => rejection.into(),
    }
}

pub async fn rip_track(
    State(ctx): State<AppContext>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<RipTrackQuery>, QueryRejection>,
) -> Result<Json<ApiOk<TrackRip>>, HttpError> {
    let Path((device, track)) = path?;
    let Query(query) = query?;
    let device = DeviceName::parse(&device)?;
    let track = parse_count("track", &track)?;
    let speed = parse_speed(query.speed.as_deref())?.unwrap_or(DEFAULT_SPEED);
    let output_dir = match query.output_dir.as_deref() {
        Some(dir) => relative_dir(dir)?,
        None => PathBuf::from(device.as_str()),
    };
    let filename = match query.filename.as_deref() {
        Some(name) => base_filename(name)?,
        None => track.to_string(),
    };

    let req = TrackRipRequest {
        device: device.clone(),
        track,
        speed,
        output_dir: ctx.config.output_dir.join(output_dir),
        filename,
    };

    let ripper = ctx.ripper.clone();
    let rip = exclusive(&ctx, &device, async move {
        ripper.rip_track(&req).await.map_err(HttpError::from)
    })
    .await?;
    Ok(ok(rip))
}

pub async fn rip_cd(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<RipCdQuery>, QueryRejection>,
) -> Result<Json<ApiOk<DiscRip>>, HttpError> {
    let Path(device) = path?;
    let Query(query) = query?;
    let device = DeviceName::parse(&device)?;
    let speed = parse_speed(query.speed.as_deref())?.unwrap_or(DEFAULT_SPEED);
    let output_dir = match query.output_dir.as_deref() {
        Some(dir) => relative_dir(dir)?,
        None => PathBuf::from(format!("{device}--{}", Uuid::now_v7())),
    };
    let output_dir = ctx.config.output_dir.join(output_dir);

    info!(device = %device, output_dir = %output_dir.display(), "Disc rip requested");

    let ripper = ctx.ripper.clone();
    let target = device.clone();
    let rip = exclusive(&ctx, &device, async move {
        ripper
            .rip_disc(&target, speed, &output_dir)
            .await
            .map_err(HttpError::from)
    })
    .await?;
    Ok(ok(rip))
}

pub async fn eject(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ApiOk<MessageBody>>, HttpError> {
    let Path(device) = path?;
    let device = DeviceName::parse(&device)?;
    let tray = ctx.tray.clone();
    let target = device.clone();

    exclusive(&ctx, &device, async move {
        tray.eject(&target).await.map_err(HttpError::from)
    })
    .await?;

    Ok(ok(MessageBody {
        message: format!("Ejected {device}"),
        log_file: None,
    }))
}

pub async fn analyze(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<AnalyzeQuery>, QueryRejection>,
) -> Result<Json<ApiOk<MessageBody>>, HttpError> {
    let Path(device) = path?;
    let Query(query) = query?;
    let device = DeviceName::parse(&device)?;
    let speed = parse_speed(query.speed.as_deref())?;
    let analyzer = ctx.analyzer.clone();
    let target = device.clone();

    let result = exclusive(&ctx, &device, async move {
        analyzer.analyze(&target, speed).await.map_err(HttpError::from)
    })
    .await?;

    if !result.passed {
        let detail = if result.last_line.is_empty() {
            format!("{} is empty", result.log_file.display())
        } else {
            result.last_line
        };
        return Err(HttpError::Internal {
            message: format!("Drive analysis failed for {device}"),
            detail: Some(detail),
        });
    }

    Ok(ok(MessageBody {
        message: DRIVE_OK_LINE.to_string(),
        log_file: Some(result.log_file),
    }))
}
