// Shared HTTP plumbing: one blocking reqwest client reused by the temp-host
// uploader and both platform publishers. Every response goes through
// `check` so a non-success status always becomes a `Transport` error that
// carries the status code and the body the server sent back.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::error::{PublishError, Result};

/// Metadata calls (create, status, publish) are bounded by this timeout.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Byte transfers (temp host, TikTok PUT) get a much longer budget.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Thin wrapper around a reqwest blocking client.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(METADATA_TIMEOUT)
            .user_agent(concat!("reelpost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ApiClient { client })
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Authorization header map for bearer-token APIs.
    pub fn bearer_headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| PublishError::input("access token contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Turn a non-success status into `PublishError::Transport`.
pub fn check(res: Response) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().unwrap_or_default();
    Err(PublishError::Transport { status, body })
}

/// Check the status, then decode the JSON body.
pub fn read_json<T: DeserializeOwned>(res: Response) -> Result<T> {
    Ok(check(res)?.json()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, TestServer};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct IdBody {
        id: String,
    }

    #[test]
    fn success_body_is_decoded() {
        let server = TestServer::spawn(vec![("GET", "/thing", Reply::json(200, r#"{"id":"42"}"#))]);
        let api = ApiClient::new().unwrap();
        let res = api.http().get(server.url("/thing")).send().unwrap();
        let body: IdBody = read_json(res).unwrap();
        assert_eq!(body.id, "42");
    }

    #[test]
    fn error_status_keeps_code_and_body() {
        let server = TestServer::spawn(vec![(
            "GET",
            "/thing",
            Reply::json(400, r#"{"error":{"message":"Invalid token"}}"#),
        )]);
        let api = ApiClient::new().unwrap();
        let res = api.http().get(server.url("/thing")).send().unwrap();
        match read_json::<IdBody>(res).unwrap_err() {
            PublishError::Transport { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Invalid token"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bearer_header_is_formatted() {
        let headers = ApiClient::bearer_headers("abc").unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert!(ApiClient::bearer_headers("bad\ntoken").is_err());
    }
}
