//! Response classification.
//!
//! Maps a status code and a fully read body to either a decoded payload, a
//! `Location` (for creations answered without a body) or a typed error.

use crate::error::{Result, StructurizrError};
use crate::types::ApiErrorBody;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Successful outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The body decoded into the expected shape.
    Decoded(T),
    /// The server answered with a `Location` header and no body.
    Location(String),
}

/// Classifies a response.
///
/// * `>= 500` → [`StructurizrError::ServerUnavailable`]
/// * `401` → [`StructurizrError::Unauthorized`]
/// * other `4xx` → [`StructurizrError::BadRequest`]
/// * `2xx`/`3xx` with an empty body and a `Location` → [`Outcome::Location`]
/// * `2xx` → [`Outcome::Decoded`], or [`StructurizrError::Decode`] if the
///   body does not match `T`
pub fn classify<T: DeserializeOwned>(
    status: StatusCode,
    location: Option<&str>,
    body: &[u8],
) -> Result<Outcome<T>> {
    let code = status.as_u16();

    if code >= 500 {
        return Err(StructurizrError::ServerUnavailable {
            status: code,
            message: error_message(status, body),
        });
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(StructurizrError::Unauthorized {
            message: error_message(status, body),
        });
    }
    if status.is_client_error() {
        return Err(StructurizrError::BadRequest {
            status: code,
            message: error_message(status, body),
        });
    }

    if (status.is_success() || status.is_redirection()) && is_blank(body) {
        if let Some(location) = location {
            debug!(%status, location, "returning Location header");
            return Ok(Outcome::Location(location.to_string()));
        }
    }
    if !status.is_success() {
        return Err(StructurizrError::Decode(format!(
            "unexpected status {status} without a Location header"
        )));
    }

    serde_json::from_slice(body).map(Outcome::Decoded).map_err(|e| {
        debug!(%status, error = %e, "failed decoding response body");
        StructurizrError::Decode(e.to_string())
    })
}

/// Extracts the message of an error body; an undecodable body yields an empty message.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    debug!(%status, body = %String::from_utf8_lossy(body), "handling error response");

    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(e) => e.message,
        Err(e) => {
            warn!(%status, error = %e, "error decoding error body");
            String::new()
        }
    }
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}
