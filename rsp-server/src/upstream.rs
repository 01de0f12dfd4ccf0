//! Outbound ES9+ client
//!
//! The relay only needs "POST JSON, get JSON back". [`UpstreamClient`] is
//! that seam; [`HttpUpstream`] implements it with `reqwest`.

use async_trait::async_trait;
use rsp_core::{RspError, RspResult, Version};
use std::time::Duration;

/// User agent the relay presents to upstream SM-DP+ servers
pub const USER_AGENT: &str = "gsma-rsp-lpad";

/// One POST to an upstream SM-DP+
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl UpstreamRequest {
    /// Build an ES9+ JSON request
    ///
    /// # Arguments
    /// * `host` - Upstream SM-DP+ host
    /// * `path` - Absolute request path
    /// * `svn` - SGP.22 version used for `X-Admin-Protocol`
    /// * `body` - JSON body
    pub fn es9plus(host: &str, path: &str, svn: Version, body: Vec<u8>) -> Self {
        Self {
            url: format!("https://{}{}", host, path),
            headers: vec![
                ("User-Agent".to_string(), USER_AGENT.to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Admin-Protocol".to_string(), format!("gsma/rsp/v{}", svn)),
            ],
            body,
        }
    }

    /// Value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Client for upstream SM-DP+ servers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Send a POST and return the response body
    ///
    /// # Errors
    /// Returns `Upstream` on transport failures and non-2xx responses.
    async fn post(&self, request: UpstreamRequest) -> RspResult<Vec<u8>>;
}

/// `reqwest` based upstream client
///
/// SM-DP+ TLS certificates chain to GSMA CIs rather than web PKI roots, so
/// certificate verification is disabled.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Create a client with a whole-request timeout
    pub fn new(timeout: Duration) -> RspResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| RspError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn post(&self, request: UpstreamRequest) -> RspResult<Vec<u8>> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| RspError::Upstream(format!("{}: {}", request.url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RspError::Upstream(format!("{}: HTTP {}", request.url, status)));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| RspError::Upstream(format!("{}: {}", request.url, e)))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_es9plus_request_headers() {
        let request = UpstreamRequest::es9plus(
            "smdp.example.com",
            "/gsma/rsp2/es9plus/initiateAuthentication",
            Version::new(2, 2, 1),
            b"{}".to_vec(),
        );
        assert_eq!(request.url, "https://smdp.example.com/gsma/rsp2/es9plus/initiateAuthentication");
        assert_eq!(request.header("user-agent"), Some("gsma-rsp-lpad"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("X-Admin-Protocol"), Some("gsma/rsp/v2.2.1"));
        assert_eq!(request.header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_http_upstream_connection_error() {
        let client = HttpUpstream::new(Duration::from_secs(2)).unwrap();
        let request = UpstreamRequest::es9plus("127.0.0.1:1", "/", Version::default(), Vec::new());
        assert!(matches!(client.post(request).await, Err(RspError::Upstream(_))));
    }
}
