//! Authentication strategies.
//!
//! A [`Client`](crate::Client) holds exactly one [`AuthStrategy`], chosen when
//! it is constructed:
//!
//! - [`AdminKeyAuth`] sends the admin API key verbatim, for the workspace
//!   management endpoints.
//! - [`HmacAuth`] signs each request with a workspace's own key and secret.

use crate::error::{Result, StructurizrError};
use crate::signing;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header carrying the admin key or `<key>:<signature>`.
pub const AUTHORIZATION: &str = "x-authorization";
/// Header carrying the HMAC nonce.
pub const NONCE: &str = "nonce";
/// Header carrying the base64 encoded body checksum.
pub const CONTENT_MD5: &str = "content-md5";

/// The parts of an outbound request that authentication depends on.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    /// HTTP method.
    pub method: &'a Method,
    /// URL path, without query.
    pub path: &'a str,
    /// Exact body bytes that will be transmitted.
    pub body: &'a [u8],
    /// Value of the `Content-Type` header, empty when no body is sent.
    pub content_type: &'a str,
}

/// Computes and inserts authentication headers for a request.
pub trait AuthStrategy: Send + Sync {
    /// Inserts the authentication headers for `request` into `headers`.
    fn apply(&self, request: &SigningRequest<'_>, headers: &mut HeaderMap) -> Result<()>;
}

/// Source of nonces: milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u128;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u128);

impl Clock for FixedClock {
    fn now_millis(&self) -> u128 {
        self.0
    }
}

/// Static admin API key authentication.
#[derive(Clone)]
pub struct AdminKeyAuth {
    api_key: String,
}

impl AdminKeyAuth {
    /// An empty key is rejected when the first request is signed.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for AdminKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminKeyAuth")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl AuthStrategy for AdminKeyAuth {
    fn apply(&self, _request: &SigningRequest<'_>, headers: &mut HeaderMap) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(StructurizrError::AuthConfig(
                "admin API key is empty".to_string(),
            ));
        }
        headers.insert(AUTHORIZATION, header_value(&self.api_key)?);
        Ok(())
    }
}

/// HMAC-SHA256 request signing with a workspace API key and secret.
///
/// For every request the strategy emits:
///
/// * `X-Authorization: <key>:<base64(hex HMAC-SHA256(secret, canonical))>`
/// * `Nonce: <milliseconds since epoch>`
/// * `Content-MD5: <base64(hex MD5(body))>`, only when the body is non-empty
///
/// where `canonical` is method, path, hex MD5 of the body, content type and
/// nonce, each terminated by a newline.
#[derive(Clone)]
pub struct HmacAuth {
    api_key: String,
    api_secret: String,
    clock: Arc<dyn Clock>,
}

impl HmacAuth {
    /// Signs with the wall clock.
    ///
    /// # Arguments
    ///
    /// * `api_key` - The workspace's API key
    /// * `api_secret` - The workspace's API secret
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use structurizr::{Client, ClientConfig, HmacAuth};
    ///
    /// let auth = HmacAuth::new("workspace-key", "workspace-secret");
    /// let client = Client::with_config(auth, ClientConfig::default()).unwrap();
    /// ```
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self::with_clock(api_key, api_secret, Arc::new(SystemClock))
    }

    /// Signs with nonces taken from `clock`.
    pub fn with_clock(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            clock,
        }
    }
}

impl fmt::Debug for HmacAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacAuth")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl AuthStrategy for HmacAuth {
    fn apply(&self, request: &SigningRequest<'_>, headers: &mut HeaderMap) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(StructurizrError::AuthConfig(
                "workspace API key is empty".to_string(),
            ));
        }
        if self.api_secret.is_empty() {
            return Err(StructurizrError::AuthConfig(
                "workspace API secret is empty".to_string(),
            ));
        }

        let nonce = self.clock.now_millis().to_string();
        let checksum = signing::checksum(request.body);
        let message = signing::canonical_string(&[
            request.method.as_str(),
            request.path,
            &checksum,
            request.content_type,
            &nonce,
        ]);
        let signature = signing::encode(&signing::sign(&self.api_secret, &message));

        if !request.body.is_empty() {
            headers.insert(CONTENT_MD5, header_value(&signing::encode(&checksum))?);
        }
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("{}:{}", self.api_key, signature))?,
        );
        headers.insert(NONCE, header_value(&nonce)?);
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        StructurizrError::AuthConfig("credential contains characters not allowed in headers".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "b9ca9ee8-6917-4447-8654-39d8eba0447d";
    const SECRET: &str = "f17ec048-e92d-48f9-a76e-9b2716da807c";
    const NOW: u128 = 1713472217559;

    fn signer() -> HmacAuth {
        HmacAuth::with_clock(KEY, SECRET, Arc::new(FixedClock(NOW)))
    }

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).map(|v| v.to_str().unwrap())
    }

    #[test]
    fn test_admin_key_auth() {
        let mut headers = HeaderMap::new();
        let request = SigningRequest {
            method: &Method::GET,
            path: "/api/workspace",
            body: b"",
            content_type: "",
        };
        AdminKeyAuth::new("structurizr")
            .apply(&request, &mut headers)
            .unwrap();
        assert_eq!(header(&headers, AUTHORIZATION), Some("structurizr"));
        assert!(headers.get(NONCE).is_none());
    }

    #[test]
    fn test_admin_key_auth_requires_key() {
        let mut headers = HeaderMap::new();
        let request = SigningRequest {
            method: &Method::GET,
            path: "/api/workspace",
            body: b"",
            content_type: "",
        };
        let err = AdminKeyAuth::new("").apply(&request, &mut headers).unwrap_err();
        assert!(matches!(err, StructurizrError::AuthConfig(_)));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_hmac_signed_get() {
        let mut headers = HeaderMap::new();
        let request = SigningRequest {
            method: &Method::GET,
            path: "/api/workspace/1",
            body: b"",
            content_type: "",
        };
        signer().apply(&request, &mut headers).unwrap();

        assert_eq!(
            header(&headers, AUTHORIZATION),
            Some("b9ca9ee8-6917-4447-8654-39d8eba0447d:NGVkMjNmOWEyYjVkNDE3YjYwMTBiYjk2NDY0OWQ2ZmM0ODA4YmY2MDdjNDk2MDMwMjZkZTkzNmNhOGZhOWVjMA==")
        );
        assert_eq!(header(&headers, NONCE), Some("1713472217559"));
        assert!(headers.get(CONTENT_MD5).is_none());
    }

    #[test]
    fn test_hmac_signed_put_with_body() {
        let mut headers = HeaderMap::new();
        let request = SigningRequest {
            method: &Method::PUT,
            path: "/api/workspace/1",
            body: br#"{"id": 1}"#,
            content_type: "",
        };
        signer().apply(&request, &mut headers).unwrap();

        assert_eq!(
            header(&headers, CONTENT_MD5),
            Some("ZjNlNTZjNjAyNzcxZTk1NDFhZWY2MWQ1MDI1NjJiODk=")
        );
        assert_eq!(
            header(&headers, AUTHORIZATION),
            Some("b9ca9ee8-6917-4447-8654-39d8eba0447d:NDk2NjViZjBmN2ViNjQ5YzlkZTU5NGViYTIwZWU1ZTA5OTkyODkwNTEyYjE4MWRmZWQyZTQ3NDI2MTkzNDQ2Nw==")
        );
        assert_eq!(header(&headers, NONCE), Some("1713472217559"));
    }

    #[test]
    fn test_hmac_content_type_is_signed() {
        let sign_with = |content_type| {
            let mut headers = HeaderMap::new();
            let request = SigningRequest {
                method: &Method::PUT,
                path: "/api/workspace/1",
                body: br#"{"id": 1}"#,
                content_type,
            };
            signer().apply(&request, &mut headers).unwrap();
            headers.get(AUTHORIZATION).cloned()
        };
        assert_ne!(sign_with(""), sign_with("application/json; charset=UTF-8"));
    }

    #[test]
    fn test_hmac_requires_secret() {
        let mut headers = HeaderMap::new();
        let request = SigningRequest {
            method: &Method::GET,
            path: "/api/workspace/1",
            body: b"",
            content_type: "",
        };
        let err = HmacAuth::new(KEY, "").apply(&request, &mut headers).unwrap_err();
        assert!(matches!(err, StructurizrError::AuthConfig(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", signer());
        assert!(debug.contains(KEY));
        assert!(!debug.contains(SECRET));
        assert!(!format!("{:?}", AdminKeyAuth::new("top-secret")).contains("top-secret"));
    }
}
