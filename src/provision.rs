//! Provisioning workflow: create a workspace, push its content, roll back on failure.
//!
//! The server has no transactions, so a workspace created by
//! [`Provisioner::provision`] is deleted again when its content cannot be
//! pushed. The states one call goes through are:
//!
//! ```text
//! Absent -> Created -> ContentPushed
//!           Created -> RollingBack -> Absent          (push or read-back failed, delete succeeded)
//!           Created -> RollingBack -> RollbackFailed  (push or read-back failed, delete failed)
//! ```
//!
//! Creation is serialized process-wide: the server's behavior under concurrent
//! creation is unspecified, so only one create request is in flight at a time.

use crate::error::{Result, Stage, StructurizrError};
use crate::push::{ContentPusher, ContentSource, PushRequest};
use crate::types::{GenericResponse, Workspace};
use crate::workspaces::{Created, WorkspaceApi};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, trace};

/// Held for the duration of one create request.
static CREATE_LOCK: Mutex<()> = Mutex::const_new(());

/// Logical state of the workspace during one provisioning call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    /// Nothing exists on the server.
    Absent,
    /// The workspace exists, without pushed content.
    Created,
    /// The workspace exists with its content.
    ContentPushed,
    /// The push failed and the workspace is being deleted.
    RollingBack,
    /// The push failed and so did the delete; the workspace may still exist.
    RollbackFailed,
}

/// Input of [`Provisioner::provision`].
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    /// Content to push after creation. `None` creates an empty workspace.
    pub content: Option<ContentSource>,
}

/// A provisioned workspace.
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// The workspace as last read from the server.
    pub workspace: Workspace,
    /// [`ProvisionState::Created`] or [`ProvisionState::ContentPushed`].
    pub state: ProvisionState,
}

/// Runs the create / push / rollback workflow.
///
/// # Example
///
/// ```rust,no_run
/// use structurizr::{CliPusher, Client, ContentSource, ProvisionRequest, Provisioner};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::from_env()?;
///     let provisioner = Provisioner::new(
///         client.workspaces(),
///         CliPusher::new("/opt/structurizr-cli"),
///         client.api_url(),
///     );
///
///     let provisioned = provisioner
///         .provision(ProvisionRequest {
///             content: Some(ContentSource::new("workspace.dsl")),
///         })
///         .await?;
///     println!("Workspace {} is ready", provisioned.workspace.id);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Provisioner<A, P> {
    api: A,
    pusher: P,
    api_url: String,
}

impl<A: WorkspaceApi, P: ContentPusher> Provisioner<A, P> {
    /// Create a provisioner.
    ///
    /// # Arguments
    ///
    /// * `api` - Workspace endpoints, usually [`Client::workspaces`](crate::Client::workspaces)
    /// * `pusher` - Uploads content into created workspaces
    /// * `api_url` - Server address handed to the pusher, see
    ///   [`Client::api_url`](crate::Client::api_url)
    pub fn new(api: A, pusher: P, api_url: impl Into<String>) -> Self {
        Self {
            api,
            pusher,
            api_url: api_url.into(),
        }
    }

    /// The workspace endpoints this provisioner calls.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The content pusher.
    pub fn pusher(&self) -> &P {
        &self.pusher
    }

    /// Create a workspace and, if `request.content` is set, push content into it.
    ///
    /// If the push fails the workspace is deleted. The error is then
    /// [`StructurizrError::ContentPushFailed`] when the delete succeeded, or
    /// [`StructurizrError::RollbackFailed`] carrying both failures when it did
    /// not. A delete answered with `success: false` counts as failed. After a
    /// successful push the workspace is read again, since pushing changes its
    /// name and description.
    ///
    /// # Arguments
    ///
    /// * `request` - Optional content to push after creation
    #[instrument(skip_all, fields(push = request.content.is_some()))]
    pub async fn provision(&self, request: ProvisionRequest) -> Result<Provisioned> {
        let mut state = ProvisionState::Absent;

        let workspace = self.create(&mut state).await?;

        let Some(content) = request.content else {
            return Ok(Provisioned { workspace, state });
        };

        if let Err(push) = self.push(&workspace, &content).await {
            return Err(self.roll_back(workspace.id, push, &mut state).await);
        }
        advance(&mut state, ProvisionState::ContentPushed, workspace.id);

        let workspace = self
            .refresh(workspace.id)
            .await
            .map_err(|e| StructurizrError::at(Stage::Refresh, Some(workspace.id), e))?;
        Ok(Provisioned { workspace, state })
    }

    /// Push new content into an existing workspace, then read it again.
    ///
    /// Nothing is rolled back on failure: the workspace existed before the call.
    #[instrument(skip_all, fields(workspace_id = workspace.id))]
    pub async fn update_content(
        &self,
        workspace: &Workspace,
        content: &ContentSource,
    ) -> Result<Workspace> {
        self.push(workspace, content)
            .await
            .map_err(|e| StructurizrError::at(Stage::Update, Some(workspace.id), e))?;
        self.refresh(workspace.id)
            .await
            .map_err(|e| StructurizrError::at(Stage::Refresh, Some(workspace.id), e))
    }

    /// Read one workspace. Lists every workspace and filters by id.
    ///
    /// Fails with [`StructurizrError::NotFound`] when no workspace has `id`.
    pub async fn refresh(&self, id: i64) -> Result<Workspace> {
        self.api.get(id).await
    }

    /// Delete a workspace.
    ///
    /// The server's acknowledgement is returned as is; `success: false` is not
    /// turned into an error here.
    pub async fn destroy(&self, id: i64) -> Result<GenericResponse> {
        self.api.delete(id).await
    }

    /// Creates a workspace under the creation lock.
    ///
    /// A `Location`-only answer is resolved by reading the workspace back. If
    /// that read fails the new workspace is deleted again; if no id can be
    /// taken from the `Location` the error reports a possibly leftover workspace.
    async fn create(&self, state: &mut ProvisionState) -> Result<Workspace> {
        let created = {
            let _guard = CREATE_LOCK.lock().await;
            trace!("acquired creation lock");
            self.api.create().await
        }
        .map_err(|e| StructurizrError::at(Stage::Create, None, e))?;

        match created {
            Created::Workspace(workspace) => {
                advance(state, ProvisionState::Created, workspace.id);
                Ok(workspace)
            }
            Created::Location(location) => {
                let Some(id) = Created::location_id(&location) else {
                    error!(%location, "no workspace id in Location, workspace may still exist");
                    return Err(StructurizrError::at(
                        Stage::Create,
                        None,
                        StructurizrError::Untracked { location },
                    ));
                };
                advance(state, ProvisionState::Created, id);
                debug!(id, %location, "reading workspace created via Location");
                match self.refresh(id).await {
                    Ok(workspace) => Ok(workspace),
                    Err(e) => {
                        let cause = StructurizrError::at(Stage::Refresh, Some(id), e);
                        Err(self.roll_back(id, cause, state).await)
                    }
                }
            }
        }
    }

    /// Deletes a workspace left behind by a failed step, exactly once.
    ///
    /// Returns `cause` when the delete succeeded, otherwise
    /// [`StructurizrError::RollbackFailed`] carrying both errors.
    async fn roll_back(
        &self,
        workspace_id: i64,
        cause: StructurizrError,
        state: &mut ProvisionState,
    ) -> StructurizrError {
        advance(state, ProvisionState::RollingBack, workspace_id);

        let rollback = match self.api.delete(workspace_id).await {
            Ok(response) if response.success => None,
            Ok(response) => Some(StructurizrError::DeleteRejected {
                workspace_id,
                message: response.message,
            }),
            Err(e) => Some(e),
        };

        match rollback {
            None => {
                advance(state, ProvisionState::Absent, workspace_id);
                cause
            }
            Some(rollback) => {
                advance(state, ProvisionState::RollbackFailed, workspace_id);
                error!(workspace_id, %rollback, "rollback failed, workspace may still exist");
                StructurizrError::RollbackFailed {
                    workspace_id,
                    cause: Box::new(cause),
                    rollback: Box::new(rollback),
                }
            }
        }
    }

    async fn push(&self, workspace: &Workspace, content: &ContentSource) -> Result<()> {
        let request = PushRequest {
            workspace_id: workspace.id,
            api_key: workspace.api_key.clone(),
            api_secret: workspace.api_secret.clone(),
            passphrase: content.passphrase.clone(),
            source: content.path.clone(),
            api_url: self.api_url.clone(),
        };
        let output = self.pusher.push(&request).await?;
        trace!(workspace_id = workspace.id, output = %output.output, "content pushed");
        Ok(())
    }
}

fn advance(state: &mut ProvisionState, next: ProvisionState, workspace_id: i64) {
    info!(workspace_id, from = ?state, to = ?next, "provisioning state changed");
    *state = next;
}
