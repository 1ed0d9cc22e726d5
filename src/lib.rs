//! # Structurizr Rust client
//!
//! Client for the Structurizr workspace API (cloud or on-premises).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use structurizr::{Client, ClientConfig, WorkspaceApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Admin API key authentication
//!     let client = Client::with_admin_key(
//!         "admin-api-key",
//!         ClientConfig {
//!             base_url: Some("https://structurizr.example.com".to_string()),
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     let workspaces = client.workspaces();
//!     let created = workspaces.create().await?;
//!     println!("Created: {:?}", created);
//!
//!     for workspace in workspaces.list().await? {
//!         println!("{}: {}", workspace.id, workspace.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Provisioning with rollback
//!
//! [`Provisioner`] creates a workspace, pushes content into it with the
//! Structurizr CLI and deletes the workspace again if the push fails:
//!
//! ```rust,no_run
//! use structurizr::{CliPusher, Client, ContentSource, ProvisionRequest, Provisioner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::from_env()?;
//!     let provisioner = Provisioner::new(
//!         client.workspaces(),
//!         CliPusher::new("/opt/structurizr-cli"),
//!         client.api_url(),
//!     );
//!
//!     let provisioned = provisioner
//!         .provision(ProvisionRequest {
//!             content: Some(ContentSource::new("workspace.dsl").with_passphrase("secret")),
//!         })
//!         .await?;
//!     println!("{} ({:?})", provisioned.workspace.name, provisioned.state);
//!     Ok(())
//! }
//! ```
//!
//! ## Authentication
//!
//! - **Admin API key** ([`AdminKeyAuth`]): sent verbatim in `X-Authorization`.
//! - **HMAC** ([`HmacAuth`]): per-request signature over method, path, body
//!   MD5, content type and a millisecond nonce, keyed with a workspace secret.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, StructurizrError>`:
//!
//! ```rust,no_run
//! use structurizr::{Client, ErrorKind, WorkspaceApi};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new("admin-api-key").unwrap();
//!
//!     match client.workspaces().list().await {
//!         Ok(workspaces) => println!("Found {} workspaces", workspaces.len()),
//!         Err(e) if e.kind() == ErrorKind::Unauthorized => println!("Invalid API key"),
//!         Err(e) if e.kind() == ErrorKind::ServerUnavailable => println!("Server down, retry later"),
//!         Err(e) => println!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! Nothing is retried: every error is the result of a single attempt.

pub mod auth;
pub mod client;
pub mod error;
pub mod provision;
pub mod push;
pub mod response;
pub mod signing;
pub mod types;
pub mod workspaces;

// Re-export main types at the crate root
pub use auth::{AdminKeyAuth, AuthStrategy, Clock, FixedClock, HmacAuth, SigningRequest, SystemClock};
pub use client::{Client, ClientConfig};
pub use error::{ErrorKind, Result, Stage, StructurizrError};
pub use provision::{ProvisionRequest, ProvisionState, Provisioned, Provisioner};
pub use push::{
    CliPusher, CommandOutput, CommandRunner, ContentPusher, ContentSource, PushOutput,
    PushRequest, TokioCommandRunner,
};
pub use response::Outcome;
pub use types::{GenericResponse, Workspace, Workspaces};
pub use workspaces::{Created, WorkspaceApi, WorkspacesClient};

// Callers pass cancellation tokens to `Client::with_cancellation`.
pub use tokio_util::sync::CancellationToken;
