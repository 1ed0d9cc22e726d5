//! Workspace management operations.
//!
//! This module provides the [`WorkspacesClient`] for listing, creating and
//! deleting workspaces, and the [`WorkspaceApi`] trait the provisioning
//! workflow is written against.

use crate::client::Client;
use crate::error::{Result, StructurizrError};
use crate::response::Outcome;
use crate::types::{GenericResponse, Workspace, Workspaces};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::debug;

const WORKSPACES_PATH: &str = "/api/workspace";

/// Characters escaped in a single path segment, as `url.PathEscape` does.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'|');

/// Result of a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    /// The server returned the new workspace.
    Workspace(Workspace),
    /// The server answered with a `Location` header and no body.
    Location(String),
}

impl Created {
    /// Workspace id carried by a `Location` such as `/api/workspace/5`.
    pub fn location_id(location: &str) -> Option<i64> {
        location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
    }
}

/// Workspace endpoints of a Structurizr server.
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    /// List all workspaces.
    async fn list(&self) -> Result<Vec<Workspace>>;

    /// Create a new workspace. The server assigns every field.
    async fn create(&self) -> Result<Created>;

    /// Delete a workspace.
    async fn delete(&self, id: i64) -> Result<GenericResponse>;

    /// Get a workspace by id.
    ///
    /// The server has no endpoint for a single workspace: this lists every
    /// workspace and scans for `id`, so each call costs a full list request.
    async fn get(&self, id: i64) -> Result<Workspace> {
        let workspaces = Workspaces {
            workspaces: self.list().await?,
        };
        if workspaces.workspaces.is_empty() {
            debug!(id, "no workspaces on remote server");
            return Err(StructurizrError::NotFound(id));
        }
        workspaces
            .find_by_id(id)
            .cloned()
            .ok_or(StructurizrError::NotFound(id))
    }
}

/// Client for workspace management operations.
///
/// Access via `client.workspaces()`.
#[derive(Debug, Clone)]
pub struct WorkspacesClient {
    client: Client,
}

impl WorkspacesClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// The client requests are sent through.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl WorkspaceApi for WorkspacesClient {
    /// List all workspaces.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use structurizr::{Client, WorkspaceApi};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::new("admin-api-key")?;
    ///
    ///     let workspaces = client.workspaces().list().await?;
    ///     println!("Found {} workspaces", workspaces.len());
    ///     Ok(())
    /// }
    /// ```
    async fn list(&self) -> Result<Vec<Workspace>> {
        match self.client.get::<Workspaces>(WORKSPACES_PATH).await? {
            Outcome::Decoded(list) => Ok(list.workspaces),
            Outcome::Location(location) => Err(StructurizrError::Decode(format!(
                "expected a workspace list, got a redirect to {location}"
            ))),
        }
    }

    /// Create a new workspace.
    ///
    /// The request has no body. Servers answering with a `Location` header and
    /// an empty body yield [`Created::Location`].
    async fn create(&self) -> Result<Created> {
        match self.client.post_empty::<Workspace>(WORKSPACES_PATH).await? {
            Outcome::Decoded(workspace) => {
                debug!(id = workspace.id, "workspace created");
                Ok(Created::Workspace(workspace))
            }
            Outcome::Location(location) => {
                debug!(%location, "workspace created, server returned Location");
                Ok(Created::Location(location))
            }
        }
    }

    /// Delete a workspace.
    ///
    /// **Warning:** This operation is irreversible.
    async fn delete(&self, id: i64) -> Result<GenericResponse> {
        match self.client.delete::<GenericResponse>(&workspace_path(id)).await? {
            Outcome::Decoded(response) => Ok(response),
            Outcome::Location(location) => Err(StructurizrError::Decode(format!(
                "expected a delete acknowledgement, got a redirect to {location}"
            ))),
        }
    }
}

fn workspace_path(id: i64) -> String {
    let id = id.to_string();
    format!("{WORKSPACES_PATH}/{}", utf8_percent_encode(&id, PATH_SEGMENT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_path() {
        assert_eq!(workspace_path(1), "/api/workspace/1");
        assert_eq!(workspace_path(-3), "/api/workspace/-3");
        assert_eq!(
            utf8_percent_encode("a b/c", PATH_SEGMENT).to_string(),
            "a%20b%2Fc"
        );
    }

    #[test]
    fn test_location_id() {
        assert_eq!(Created::location_id("/api/workspace/5"), Some(5));
        assert_eq!(
            Created::location_id("https://structurizr.example.com/api/workspace/12/"),
            Some(12)
        );
        assert_eq!(Created::location_id("/workspace/new"), None);
    }

    #[test]
    fn test_workspaces_client_creation() {
        let client = Client::new("test_key").unwrap();
        let workspaces = client.workspaces();
        assert_eq!(workspaces.client().base_url(), client.base_url());
    }
}
