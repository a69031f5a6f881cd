use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug};

#[derive(Debug)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

/// Coarse classification handed to the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            1..=99 => ErrorKind::Internal,
            200..=299 => ErrorKind::NotFound,
            _ => ErrorKind::BadRequest,
        }
    }

    pub fn is_not_found_error(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.kind() {
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.message.as_str()),
            ErrorKind::BadRequest => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_input_error(message: impl Into<String>) -> Error {
    Error {
        code: 101,
        message: message.into(),
    }
}

pub fn invalid_coordinate_error(latitude: f64, longitude: f64) -> Error {
    Error {
        code: 102,
        message: format!("invalid coordinate: latitude {latitude}, longitude {longitude}"),
    }
}

pub fn invalid_radius_error() -> Error {
    Error {
        code: 103,
        message: "radius must be greater than zero".into(),
    }
}

pub fn empty_track_error() -> Error {
    Error {
        code: 104,
        message: "track points must not be empty".into(),
    }
}

pub fn not_found_error(what: &str, id: impl fmt::Display) -> Error {
    Error {
        code: 200,
        message: format!("{what} not found: {id}"),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!(error = ?err, "database error");

    Error {
        code: 2,
        message: "database error".into(),
    }
}

pub fn config_error(message: impl Into<String>) -> Error {
    Error {
        code: 3,
        message: message.into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

#[test]
fn error_kind_classification() {
    assert_eq!(database_error("boom").kind(), ErrorKind::Internal);
    assert_eq!(config_error("bad").kind(), ErrorKind::Internal);
    assert_eq!(unexpected_error().kind(), ErrorKind::Internal);
    assert_eq!(invalid_input_error("bad").kind(), ErrorKind::BadRequest);
    assert_eq!(
        invalid_coordinate_error(91.0, 0.0).kind(),
        ErrorKind::BadRequest
    );
    assert_eq!(invalid_radius_error().kind(), ErrorKind::BadRequest);
    assert_eq!(empty_track_error().kind(), ErrorKind::BadRequest);
    assert_eq!(
        not_found_error("place", uuid::Uuid::nil()).kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn error_status_codes() {
    assert_eq!(
        not_found_error("group", 7).into_response().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        empty_track_error().into_response().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        database_error("boom").into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
