//! RFC 9457 problem responses and the `DomainError` mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::error::DomainError;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

pub type ApiResult<T> = Result<T, Problem>;

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// Problem Details body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: StatusCode,
    pub detail: String,
    pub instance: String,
    pub code: String,
    pub trace_id: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.into(),
            status,
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            trace_id: None,
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut resp = axum::Json(self).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

/// Convert `DomainError` to Problem for REST responses.
impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        let trace_id = tracing::Span::current()
            .id()
            .map(|id| id.into_u64().to_string());

        let (status, code, title, detail) = match &e {
            DomainError::InvalidIdentifier(err) => (
                StatusCode::BAD_REQUEST,
                "GATE_VALIDATION",
                "Invalid identifier",
                err.to_string(),
            ),
            DomainError::InvalidEntitlement { message } => (
                StatusCode::BAD_REQUEST,
                "GATE_VALIDATION",
                "Invalid entitlement",
                message.clone(),
            ),
            DomainError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "GATE_VALIDATION",
                "Validation error",
                format!("{field}: {message}"),
            ),
            DomainError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                "GATE_NOT_FOUND",
                "Not found",
                format!("No {entity} with id {id}"),
            ),
            DomainError::AlreadyRevoked { id } => (
                StatusCode::CONFLICT,
                "GATE_CONFLICT",
                "Already revoked",
                format!("Entitlement {id} is already revoked"),
            ),
            DomainError::Conflict { message } => (
                StatusCode::CONFLICT,
                "GATE_CONFLICT",
                "Conflict",
                message.clone(),
            ),
            DomainError::StoreUnavailable { .. }
            | DomainError::Timeout { .. }
            | DomainError::Cancelled { .. } => {
                tracing::error!(error = ?e, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "GATE_STORE_UNAVAILABLE",
                    "Service unavailable",
                    e.to_string(),
                )
            }
        };

        let mut problem = Problem::new(status, title, detail)
            .with_type(format!("https://errors.gate-access.local/{code}"))
            .with_code(code);

        if let Some(id) = trace_id {
            problem = problem.with_trace_id(id);
        }

        problem
    }
}

/// Catch-all for failures outside the domain taxonomy.
pub fn internal(detail: impl Into<String>) -> Problem {
    Problem::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        detail,
    )
    .with_type("https://errors.gate-access.local/GATE_INTERNAL")
    .with_code("GATE_INTERNAL")
}

/// Malformed request bodies keep the problem format.
impl From<JsonRejection> for Problem {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        if status.is_server_error() {
            return internal(rejection.body_text());
        }
        Problem::new(status, "Malformed request body", rejection.body_text())
            .with_type("https://errors.gate-access.local/GATE_VALIDATION")
            .with_code("GATE_VALIDATION")
    }
}

impl From<QueryRejection> for Problem {
    fn from(rejection: QueryRejection) -> Self {
        Problem::new(
            StatusCode::BAD_REQUEST,
            "Malformed query string",
            rejection.body_text(),
        )
        .with_type("https://errors.gate-access.local/GATE_VALIDATION")
        .with_code("GATE_VALIDATION")
    }
}
