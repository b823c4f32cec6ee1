use crate::config::ConfigError;
use crate::service::ComplianceServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Compliance(ComplianceServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Compliance(err) => write!(f, "compliance error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Compliance(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Compliance(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Compliance(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Compliance(err) if err.is_timeout() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Compliance(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ComplianceServiceError> for AppError {
    fn from(value: ComplianceServiceError) -> Self {
        Self::Compliance(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReportingWindow;
    use chrono::NaiveDate;

    #[test]
    fn input_errors_map_to_bad_request() {
        let at = NaiveDate::from_ymd_opt(2025, 11, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid timestamp");
        let window_error = ReportingWindow::new(at, at).expect_err("empty window");
        let response = AppError::from(ComplianceServiceError::from(window_error)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_request_maps_to_not_found() {
        let error = ComplianceServiceError::UnknownRequest("2025-9999".to_string());
        let response = AppError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn config_errors_map_to_server_error() {
        let response = AppError::from(ConfigError::InvalidPort).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
