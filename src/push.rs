//! Pushing workspace content.
//!
//! Content is uploaded by an external program, the Structurizr CLI, invoked
//! with the workspace's own credentials. The provisioning workflow only sees
//! the [`ContentPusher`] trait; [`CliPusher`] is the implementation that runs
//! the CLI script through a [`CommandRunner`].

use crate::error::{Result, StructurizrError};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, trace};

/// Content to push into a workspace.
#[derive(Clone)]
pub struct ContentSource {
    /// Local workspace file (DSL or JSON).
    pub path: PathBuf,
    /// Client-side encryption passphrase, empty for none.
    pub passphrase: String,
}

impl ContentSource {
    /// Content read from the workspace file at `path`, without a passphrase.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            passphrase: String::new(),
        }
    }

    /// Set the client-side encryption passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentSource")
            .field("path", &self.path)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Everything the pusher needs to upload content into one workspace.
#[derive(Clone)]
pub struct PushRequest {
    pub workspace_id: i64,
    /// The workspace's own API key, not the admin key.
    pub api_key: String,
    /// The workspace's own API secret.
    pub api_secret: String,
    pub passphrase: String,
    pub source: PathBuf,
    /// Server API address, e.g. `https://structurizr.example.com/api`.
    pub api_url: String,
}

impl fmt::Debug for PushRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushRequest")
            .field("workspace_id", &self.workspace_id)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .field("source", &self.source)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Output of a successful push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutput {
    pub output: String,
}

/// Uploads content into an existing workspace.
///
/// Implementations fail with [`StructurizrError::ContentPushFailed`],
/// carrying the diagnostic output verbatim.
#[async_trait]
pub trait ContentPusher: Send + Sync {
    async fn push(&self, request: &PushRequest) -> Result<PushOutput>;
}

/// Exit state and combined stdout/stderr of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit description, e.g. `exit status: 1`.
    pub status: String,
    pub output: String,
}

/// Runs an external command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands with `tokio::process`. The child is killed if the future is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            output: combined,
        })
    }
}

/// Pushes content with the Structurizr CLI script found in `working_dir`.
///
/// Runs `structurizr.sh` (or `structurizr.bat` on Windows) as
/// `push -id <id> -key <key> -secret <secret> -passphrase <passphrase>
/// -workspace <source> -url <api url> -merge false -archive true`.
#[derive(Debug, Clone)]
pub struct CliPusher<R = TokioCommandRunner> {
    working_dir: PathBuf,
    runner: R,
    windows: bool,
}

impl CliPusher {
    /// Create a pusher running the CLI script found in `working_dir`.
    ///
    /// # Arguments
    ///
    /// * `working_dir` - Directory containing `structurizr.sh` / `structurizr.bat`
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use structurizr::CliPusher;
    ///
    /// let pusher = CliPusher::new("/opt/structurizr-cli");
    /// println!("{}", pusher.script().display());
    /// ```
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::with_runner(working_dir, TokioCommandRunner)
    }
}

impl<R: CommandRunner> CliPusher<R> {
    /// Create a pusher that runs the CLI through `runner`.
    pub fn with_runner(working_dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            working_dir: working_dir.into(),
            runner,
            windows: cfg!(windows),
        }
    }

    /// Path of the CLI script for the current platform.
    pub fn script(&self) -> PathBuf {
        let name = if self.windows {
            "structurizr.bat"
        } else {
            "structurizr.sh"
        };
        self.working_dir.join(name)
    }

    fn args(request: &PushRequest) -> Vec<String> {
        let id = request.workspace_id.to_string();
        let source = request.source.to_string_lossy();
        let args: [&str; 17] = [
            "push",
            "-id",
            &id,
            "-key",
            &request.api_key,
            "-secret",
            &request.api_secret,
            "-passphrase",
            &request.passphrase,
            "-workspace",
            &source,
            "-url",
            &request.api_url,
            "-merge",
            "false",
            "-archive",
            "true",
        ];
        args.into_iter().map(str::to_string).collect()
    }
}

#[async_trait]
impl<R: CommandRunner> ContentPusher for CliPusher<R> {
    async fn push(&self, request: &PushRequest) -> Result<PushOutput> {
        let script = self.script();
        trace!(script = %script.display(), workspace_id = request.workspace_id, "running Structurizr CLI");

        let failed = |output: String| StructurizrError::ContentPushFailed {
            workspace_id: request.workspace_id,
            output,
        };

        let result = self
            .runner
            .run(&script, &Self::args(request))
            .await
            .map_err(|e| failed(format!("error running Structurizr CLI: {e}")))?;

        if !result.success {
            return Err(failed(format!(
                "error running Structurizr CLI: {}\nOutput: {}",
                result.status, result.output
            )));
        }

        debug!(workspace_id = request.workspace_id, output = %result.output, "Structurizr CLI output");
        Ok(PushOutput {
            output: result.output,
        })
    }
}
