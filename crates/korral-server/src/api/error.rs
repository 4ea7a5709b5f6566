/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! HTTP mapping for the core error types.

use crate::events::store::StoreError;
use crate::exec::ExecError;
use crate::registry::RegistryError;
use crate::resources::ResourceError;
use crate::summary::SummaryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use korral_utils::logging::prelude::*;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Upstream(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::Upstream(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, "{}", self.message());
        }
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ClusterNotFound(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ExecError> for ApiError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::MissingParameter(_)
            | ExecError::UnknownOperation(_)
            | ExecError::MalformedFrame(_) => ApiError::BadRequest(e.to_string()),
            ExecError::Registry(inner) => inner.into(),
            ExecError::Attach { .. } | ExecError::Remote(_) => ApiError::Upstream(e.to_string()),
            ExecError::Io(_) | ExecError::SessionClosed => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<ResourceError> for ApiError {
    fn from(e: ResourceError) -> Self {
        match e {
            ResourceError::List { .. } => ApiError::Upstream(e.to_string()),
            ResourceError::Encode { .. } => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(e: SummaryError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found: ApiError = RegistryError::ClusterNotFound("c9".to_string()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert!(not_found.message().contains("c9"));

        let bad: ApiError = ExecError::MissingParameter("namespace").into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let nested: ApiError =
            ExecError::Registry(RegistryError::ClusterNotFound("c9".to_string())).into();
        assert_eq!(nested.status(), StatusCode::NOT_FOUND);

        let upstream: ApiError = SummaryError::ClusterUnreachable {
            cluster: "c1".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let internal: ApiError = StoreError::Unavailable("down".to_string()).into();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
