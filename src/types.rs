//! Type definitions for the Structurizr workspace API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A workspace managed by the Structurizr server.
///
/// All fields are assigned by the server on creation. `api_key` and
/// `api_secret` are the workspace's own credentials, used for HMAC signed
/// requests and content pushes; `api_secret` is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Server-assigned identifier.
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Workspace API key.
    #[serde(default)]
    pub api_key: String,
    /// Workspace API secret.
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub public_url: String,
    #[serde(default)]
    pub private_url: String,
    #[serde(default)]
    pub shareable_url: String,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("public_url", &self.public_url)
            .field("private_url", &self.private_url)
            .field("shareable_url", &self.shareable_url)
            .finish()
    }
}

/// Response body of the workspace list endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Workspaces {
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
}

impl Workspaces {
    /// Returns the workspace with the given id, scanning the list linearly.
    pub fn find_by_id(&self, id: i64) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.id == id)
    }
}

/// Generic acknowledgement returned by write operations such as delete.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct GenericResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    /// Workspace revision after the operation, when the server reports one.
    #[serde(default)]
    pub revision: i64,
}

/// Error body of the shape `{"success": false, "message": "..."}`; only the message is kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(id: i64) -> Workspace {
        Workspace {
            id,
            name: format!("Workspace {id}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_workspace_deserialization() {
        let json = r#"{
            "id": 1,
            "name": "Workspace 1",
            "description": "Description",
            "apiKey": "b9ca9ee8-6917-4447-8654-39d8eba0447d",
            "apiSecret": "f17ec048-e92d-48f9-a76e-9b2716da807c",
            "publicUrl": "http://localhost:8080/share/1",
            "privateUrl": "http://localhost:8080/workspace/1",
            "shareableUrl": ""
        }"#;

        let workspace: Workspace = serde_json::from_str(json).unwrap();
        assert_eq!(workspace.id, 1);
        assert_eq!(workspace.name, "Workspace 1");
        assert_eq!(workspace.api_key, "b9ca9ee8-6917-4447-8654-39d8eba0447d");
        assert_eq!(workspace.private_url, "http://localhost:8080/workspace/1");
        assert!(workspace.shareable_url.is_empty());
    }

    #[test]
    fn test_workspace_debug_redacts_secret() {
        let workspace = Workspace {
            id: 1,
            api_secret: "f17ec048".to_string(),
            ..Default::default()
        };
        assert!(!format!("{workspace:?}").contains("f17ec048"));
    }

    #[test]
    fn test_find_by_id() {
        let empty = Workspaces::default();
        assert!(empty.find_by_id(1).is_none());

        let list = Workspaces {
            workspaces: vec![workspace(1), workspace(2), workspace(3)],
        };
        assert_eq!(list.find_by_id(2).map(|w| w.name.as_str()), Some("Workspace 2"));
        assert!(list.find_by_id(4).is_none());
    }

    #[test]
    fn test_generic_response_defaults() {
        let response: GenericResponse =
            serde_json::from_str(r#"{"success": true, "message": "OK"}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.message, "OK");
        assert_eq!(response.revision, 0);
    }
}
