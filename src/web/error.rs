//! HTTP error type and mappings from the domain errors.
//!
//! Every failure becomes `{"error": "true", "message": ..., "detail": ...}`,
//! where `detail` carries raw text from the failing tool when there is any.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::core::{
    AnalyzeError, CatalogError, DeviceBusy, DiscIdError, InvalidDevice, RipError, ToolError,
};

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl HttpError {
    pub fn internal(message: impl Into<String>) -> Self {
        HttpError::Internal {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(message: impl Into<String>, detail: Option<&str>) -> Self {
        HttpError::Internal {
            message: message.into(),
            detail: detail.map(str::to_string),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            HttpError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            HttpError::Internal { message, detail } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, detail)
            }
        };

        let body = ErrorBody {
            error: "true",
            message,
            detail,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

impl From<InvalidDevice> for HttpError {
    fn from(err: InvalidDevice) -> Self {
        HttpError::BadRequest(err.to_string())
    }
}

impl From<DeviceBusy> for HttpError {
    fn from(err: DeviceBusy) -> Self {
        HttpError::Conflict(err.to_string())
    }
}

impl From<CatalogError> for HttpError {
    fn from(err: CatalogError) -> Self {
        HttpError::internal(format!("Failed to update drive list: {err}"))
    }
}

impl From<ToolError> for HttpError {
    fn from(err: ToolError) -> Self {
        HttpError::with_detail(err.to_string(), err.diagnostic())
    }
}

impl From<DiscIdError> for HttpError {
    fn from(err: DiscIdError) -> Self {
        match err {
            DiscIdError::NoDisc => HttpError::NotFound("No disc found".to_string()),
            DiscIdError::Tool(tool) => HttpError::with_detail(
                format!("Disc identification failed: {tool}"),
                tool.diagnostic(),
            ),
            DiscIdError::Parse(e) => HttpError::internal(format!("Disc identification failed: {e}")),
        }
    }
}

impl From<RipError> for HttpError {
    fn from(err: RipError) -> Self {
        HttpError::with_detail(format!("Rip failed: {err}"), err.diagnostic())
    }
}

impl From<AnalyzeError> for HttpError {
    fn from(err: AnalyzeError) -> Self {
        match &err {
            AnalyzeError::Tool(tool) => {
                HttpError::with_detail(format!("Drive analysis failed: {err}"), tool.diagnostic())
            }
            AnalyzeError::Failed { last_line, .. } => {
                HttpError::with_detail(format!("Drive analysis failed: {err}"), Some(last_line.as_str()))
            }
            AnalyzeError::Log { .. } => HttpError::internal(format!("Drive analysis failed: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: HttpError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn tool_failure_carries_stderr_as_detail() {
        let err: HttpError = ToolError::ExitStatus {
            program: "eject".to_string(),
            code: Some(1),
            stderr: "eject: sr0: not found\n".to_string(),
        }
        .into();

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "true");
        assert_eq!(body["message"], "eject exited with status 1");
        assert_eq!(body["detail"], "eject: sr0: not found");
    }

    #[tokio::test]
    async fn missing_disc_is_not_found() {
        let (status, body) = body_json(DiscIdError::NoDisc.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "true");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn busy_drive_is_conflict() {
        let (status, _) = body_json(DeviceBusy("sr0".to_string()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
