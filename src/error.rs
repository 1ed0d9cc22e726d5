//! Error types for the Structurizr client.
//!
//! Every operation returns [`StructurizrError`]. Transport and classification
//! errors propagate unchanged; only the provisioning workflow combines two
//! errors into one ([`StructurizrError::RollbackFailed`]) when a
//! compensating delete fails.

use std::fmt;
use thiserror::Error;

/// Result type for Structurizr operations.
pub type Result<T> = std::result::Result<T, StructurizrError>;

/// Errors that can occur when talking to a Structurizr server.
#[derive(Error, Debug)]
pub enum StructurizrError {
    /// Missing or empty credential / secret for the configured auth strategy.
    #[error("authentication is not configured: {0}")]
    AuthConfig(String),

    /// Invalid client configuration (base URL, environment values).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// HTTP 4xx other than 401.
    #[error("bad request ({status}): {}", details(.message))]
    BadRequest {
        /// HTTP status code.
        status: u16,
        /// Message decoded from the error body, empty if it could not be decoded.
        message: String,
    },

    /// HTTP 401.
    #[error("unauthorized: {}", details(.message))]
    Unauthorized {
        /// Message decoded from the error body, empty if it could not be decoded.
        message: String,
    },

    /// HTTP 5xx.
    #[error("system unavailable ({status}): {}", details(.message))]
    ServerUnavailable {
        /// HTTP status code.
        status: u16,
        /// Message decoded from the error body, empty if it could not be decoded.
        message: String,
    },

    /// A success body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The workspace is absent from the server's workspace list.
    #[error("workspace {0} not found")]
    NotFound(i64),

    /// The external content push failed. `output` is the pusher's combined output.
    #[error("failed to push content into workspace {workspace_id}: {output}")]
    ContentPushFailed {
        /// Target workspace.
        workspace_id: i64,
        /// Combined diagnostic output, verbatim.
        output: String,
    },

    /// The compensating delete failed after a failure that followed creation.
    ///
    /// The workspace may still exist on the server without content.
    #[error(
        "failed to roll back workspace {workspace_id}; the workspace may still exist\n  cause: {cause}\n  rollback: {rollback}"
    )]
    RollbackFailed {
        /// Workspace that could not be deleted.
        workspace_id: i64,
        /// The failure that triggered the rollback (push or read-back).
        cause: Box<StructurizrError>,
        /// The failure of the compensating delete.
        rollback: Box<StructurizrError>,
    },

    /// A delete request returned a success status but `success: false`.
    #[error("deletion of workspace {workspace_id} was not acknowledged: {}", details(.message))]
    DeleteRejected {
        workspace_id: i64,
        /// Message of the delete response.
        message: String,
    },

    /// A workspace was created but its id could not be read from the `Location` header.
    #[error("workspace created at {location:?} but its id is unknown; the workspace may still exist")]
    Untracked {
        /// `Location` header of the create response.
        location: String,
    },

    /// An error raised during a provisioning step, with the step and workspace attached.
    #[error("{stage} failed{}: {source}", workspace(.workspace_id))]
    Stage {
        /// Step of the workflow that failed.
        stage: Stage,
        /// Workspace the step operated on, if one was known.
        workspace_id: Option<i64>,
        /// Underlying error.
        #[source]
        source: Box<StructurizrError>,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete before the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request was aborted by the caller's cancellation token.
    #[error("request cancelled")]
    Cancelled,

    /// Request body serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Local I/O error (spawning the push command).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Steps of the provisioning workflow, used as error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Creating the workspace.
    Create,
    /// Reading the workspace back after creation or push.
    Refresh,
    /// Pushing content into an existing workspace.
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Create => "create",
            Stage::Refresh => "refresh",
            Stage::Update => "update",
        })
    }
}

/// Flat classification of [`StructurizrError`], looking through [`StructurizrError::Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthConfig,
    Config,
    BadRequest,
    Unauthorized,
    ServerUnavailable,
    Decode,
    NotFound,
    ContentPushFailed,
    RollbackFailed,
    DeleteRejected,
    Untracked,
    Transport,
    Timeout,
    Cancelled,
}

fn details(message: &str) -> &str {
    if message.is_empty() {
        "please see the log for error details"
    } else {
        message
    }
}

fn workspace(id: &Option<i64>) -> String {
    id.map(|id| format!(" for workspace {id}")).unwrap_or_default()
}

impl StructurizrError {
    pub(crate) fn at(stage: Stage, workspace_id: Option<i64>, source: StructurizrError) -> Self {
        StructurizrError::Stage {
            stage,
            workspace_id,
            source: Box::new(source),
        }
    }

    /// Returns the error with any [`StructurizrError::Stage`] context removed.
    pub fn root(&self) -> &StructurizrError {
        match self {
            StructurizrError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the kind of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            StructurizrError::AuthConfig(_) => ErrorKind::AuthConfig,
            StructurizrError::Config(_) => ErrorKind::Config,
            StructurizrError::BadRequest { .. } => ErrorKind::BadRequest,
            StructurizrError::Unauthorized { .. } => ErrorKind::Unauthorized,
            StructurizrError::ServerUnavailable { .. } => ErrorKind::ServerUnavailable,
            StructurizrError::Decode(_) | StructurizrError::Serialize(_) => ErrorKind::Decode,
            StructurizrError::NotFound(_) => ErrorKind::NotFound,
            StructurizrError::ContentPushFailed { .. } => ErrorKind::ContentPushFailed,
            StructurizrError::RollbackFailed { .. } => ErrorKind::RollbackFailed,
            StructurizrError::DeleteRejected { .. } => ErrorKind::DeleteRejected,
            StructurizrError::Untracked { .. } => ErrorKind::Untracked,
            StructurizrError::Http(_) | StructurizrError::Io(_) => ErrorKind::Transport,
            StructurizrError::Timeout => ErrorKind::Timeout,
            StructurizrError::Cancelled => ErrorKind::Cancelled,
            StructurizrError::Stage { source, .. } => source.kind(),
        }
    }

    /// Returns true if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unauthorized | ErrorKind::AuthConfig)
    }

    /// Returns true if a workspace may now exist on the server without its content.
    pub fn may_leave_resource(&self) -> bool {
        matches!(self.kind(), ErrorKind::RollbackFailed | ErrorKind::Untracked)
    }

    /// Returns the HTTP status code if available.
    pub fn status_code(&self) -> Option<u16> {
        match self.root() {
            StructurizrError::BadRequest { status, .. }
            | StructurizrError::ServerUnavailable { status, .. } => Some(*status),
            StructurizrError::Unauthorized { .. } => Some(401),
            StructurizrError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
