//! Structurizr API client.
//!
//! [`Client`] assembles requests (URL, standard headers, JSON body),
//! authenticates them through its [`AuthStrategy`], sends them and hands the
//! fully read response to [`classify`](crate::response::classify).

use crate::auth::{AdminKeyAuth, AuthStrategy, HmacAuth, SigningRequest};
use crate::error::{Result, StructurizrError};
use crate::response::{classify, Outcome};
use crate::workspaces::WorkspacesClient;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.structurizr.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Environment variable holding the server address.
pub const ENV_HOST: &str = "STRUCTURIZR_HOST";
/// Environment variable holding the admin API key.
pub const ENV_ADMIN_API_KEY: &str = "STRUCTURIZR_ADMIN_API_KEY";
/// Environment variable disabling TLS certificate verification.
pub const ENV_TLS_INSECURE: &str = "STRUCTURIZR_TLS_INSECURE";

/// Structurizr API client.
///
/// Cloning is cheap and shares the connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use structurizr::{Client, ClientConfig, WorkspaceApi};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::with_admin_key(
///         "admin-api-key",
///         ClientConfig {
///             base_url: Some("https://structurizr.example.com".to_string()),
///             ..Default::default()
///         },
///     )?;
///
///     for workspace in client.workspaces().list().await? {
///         println!("{}: {}", workspace.id, workspace.name);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    base_url: Url,
    user_agent: String,
    auth: Arc<dyn AuthStrategy>,
    cancel: CancellationToken,
}

/// Configuration options for the client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Server address (default: https://api.structurizr.com).
    pub base_url: Option<String>,
    /// Request timeout (default: 30 seconds).
    pub timeout: Option<Duration>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Skip TLS certificate verification, for self-signed on-premises installations.
    pub tls_insecure: bool,
}

impl ClientConfig {
    /// Reads `STRUCTURIZR_HOST` and `STRUCTURIZR_TLS_INSECURE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tls_insecure = match lookup(ENV_TLS_INSECURE).filter(|v| !v.is_empty()) {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                StructurizrError::Config(format!("unable to parse {ENV_TLS_INSECURE}: {v:?}"))
            })?,
            None => false,
        };

        Ok(Self {
            base_url: lookup(ENV_HOST).filter(|v| !v.is_empty()),
            tls_insecure,
            ..Default::default()
        })
    }
}

/// Same spellings as Go's `strconv.ParseBool`, which existing configurations use.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl Client {
    /// Create a client authenticating with the admin API key and default configuration.
    ///
    /// # Arguments
    ///
    /// * `admin_api_key` - Admin API key of the Structurizr installation
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use structurizr::Client;
    ///
    /// let client = Client::new("admin-api-key").unwrap();
    /// ```
    pub fn new(admin_api_key: impl Into<String>) -> Result<Self> {
        Self::with_admin_key(admin_api_key, ClientConfig::default())
    }

    /// Create an admin client from `STRUCTURIZR_HOST`, `STRUCTURIZR_ADMIN_API_KEY`
    /// and `STRUCTURIZR_TLS_INSECURE`.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let api_key = std::env::var(ENV_ADMIN_API_KEY)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                StructurizrError::AuthConfig(format!("{ENV_ADMIN_API_KEY} is not set"))
            })?;
        Self::with_admin_key(api_key, config)
    }

    /// Create a client authenticating with the admin API key.
    ///
    /// # Arguments
    ///
    /// * `admin_api_key` - Admin API key, sent verbatim in `X-Authorization`
    /// * `config` - Client configuration options
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use structurizr::{Client, ClientConfig};
    /// use std::time::Duration;
    ///
    /// let client = Client::with_admin_key("admin-api-key", ClientConfig {
    ///     base_url: Some("https://structurizr.example.com".to_string()),
    ///     timeout: Some(Duration::from_secs(60)),
    ///     user_agent: Some("my-app/1.0".to_string()),
    ///     tls_insecure: false,
    /// }).unwrap();
    /// ```
    pub fn with_admin_key(admin_api_key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        Self::with_config(AdminKeyAuth::new(admin_api_key), config)
    }

    /// Create a client signing requests with a workspace API key and secret.
    ///
    /// # Arguments
    ///
    /// * `api_key` - The workspace's API key
    /// * `api_secret` - The workspace's API secret, used as the HMAC key
    /// * `config` - Client configuration options
    pub fn with_hmac(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        Self::with_config(HmacAuth::new(api_key, api_secret), config)
    }

    /// Create a client with an explicit auth strategy and configuration.
    ///
    /// Fails with [`StructurizrError::Config`] if the base URL does not parse.
    pub fn with_config(auth: impl AuthStrategy + 'static, config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url).map_err(|e| {
            StructurizrError::Config(format!("unable to parse host {base_url:?}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StructurizrError::Config(format!(
                "host {base_url} cannot be used as a base URL"
            )));
        }

        let timeout = config
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let user_agent = config
            .user_agent
            .unwrap_or_else(|| format!("structurizr-rust/{}", env!("CARGO_PKG_VERSION")));

        // Certificate verification belongs to the connection pool, so it is
        // fixed here and cannot be changed per request.
        let http = HttpClient::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(config.tls_insecure)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url,
            user_agent,
            auth: Arc::new(auth),
            cancel: CancellationToken::new(),
        })
    }

    /// Returns a client sharing this one's connections whose requests abort with
    /// [`StructurizrError::Cancelled`] once `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..self.clone()
        }
    }

    /// Get the base URL for the API.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Address handed to the Structurizr CLI: the base URL joined with `/api`.
    pub fn api_url(&self) -> String {
        format!("{}/api", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Get the workspaces client for list, create and delete operations.
    pub fn workspaces(&self) -> WorkspacesClient {
        WorkspacesClient::new(self.clone())
    }

    /// Make an authenticated GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Outcome<T>> {
        self.execute(Method::GET, path, None::<&()>).await
    }

    /// Make an authenticated POST request without a body.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<Outcome<T>> {
        self.execute(Method::POST, path, None::<&()>).await
    }

    /// Make an authenticated DELETE request.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Outcome<T>> {
        self.execute(Method::DELETE, path, None::<&()>).await
    }

    async fn execute<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Outcome<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.build(method, path, body)?;
        let response = self.send(request).await?;
        classify(response.status, response.location.as_deref(), &response.body)
    }

    /// Assemble and authenticate a request.
    ///
    /// The body is serialized once; the same bytes are signed and transmitted.
    pub(crate) fn build<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<reqwest::Request>
    where
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path).map_err(|e| {
            StructurizrError::Config(format!("unable to resolve {path:?} against {}: {e}", self.base_url))
        })?;
        let body = body.map(serde_json::to_vec).transpose()?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|_| StructurizrError::Config("invalid User-Agent".to_string()))?,
        );
        let content_type = if body.is_some() {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            JSON_CONTENT_TYPE
        } else {
            ""
        };

        let bytes = body.unwrap_or_default();
        if !bytes.is_empty() {
            trace!(body = %String::from_utf8_lossy(&bytes), "raw body to be sent over wire");
        }
        self.auth.apply(
            &SigningRequest {
                method: &method,
                path: url.path(),
                body: &bytes,
                content_type,
            },
            &mut headers,
        )?;

        let mut builder = self.http.request(method, url).headers(headers);
        if !bytes.is_empty() {
            builder = builder.body(bytes);
        }
        Ok(builder.build()?)
    }

    /// Send a request and read its whole body.
    ///
    /// The body is always read to the end, on success and error statuses
    /// alike, so the connection goes back to the pool.
    pub(crate) async fn send(&self, request: reqwest::Request) -> Result<RawResponse> {
        let method = request.method().clone();
        let path = request.url().path().to_string();
        trace!(%method, %path, "sending request");

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StructurizrError::Cancelled),
            response = self.http.execute(request) => response.map_err(transport_error)?,
        };

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StructurizrError::Cancelled),
            body = response.bytes() => body.map_err(transport_error)?,
        };
        debug!(%method, %path, %status, bytes = body.len(), "received response");

        Ok(RawResponse {
            status,
            location,
            body: body.to_vec(),
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

fn transport_error(e: reqwest::Error) -> StructurizrError {
    if e.is_timeout() {
        StructurizrError::Timeout
    } else {
        StructurizrError::Http(e)
    }
}
