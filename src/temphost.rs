// Temp-host uploader: pushes a local file to a public temporary-file host
// and hands back a URL the platforms can fetch.

use std::path::Path;

use reqwest::blocking::multipart;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{read_json, ApiClient, TRANSFER_TIMEOUT};
use crate::error::{PublishError, Result};

pub const DEFAULT_TEMP_HOST: &str = "https://tmpfiles.org";

/// Largest file the temp host accepts (512 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;

/// Domain that appears in the page URLs the host returns.
const PAGE_DOMAIN: &str = "tmpfiles.org/";

/// Segment that turns a page URL into a direct-download URL.
const DIRECT_MARKER: &str = "dl/";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

/// A file that is now publicly reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub public_url: String,
}

/// Fail with an input error when the file is too big for the temp host.
/// Never touches the network.
pub fn ensure_uploadable(path: &Path) -> Result<u64> {
    let size = std::fs::metadata(path)
        .map_err(|_| PublishError::input(format!("file not found: {}", path.display())))?
        .len();
    if size > MAX_UPLOAD_BYTES {
        return Err(PublishError::input(format!(
            "file too large for the temp host: {} ({:.0} MiB, max {} MiB)",
            path.display(),
            mib(size),
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(size)
}

/// Rewrite the host's page URL into its direct-download form by inserting
/// the download segment right after the host domain, once.
pub fn direct_download_url(page_url: &str) -> Result<String> {
    let Some(idx) = page_url.find(PAGE_DOMAIN) else {
        return Err(PublishError::Application {
            code: "unexpected_url".into(),
            message: format!("temp host returned an unrecognised URL: {page_url}"),
        });
    };
    let split = idx + PAGE_DOMAIN.len();
    if page_url[split..].starts_with(DIRECT_MARKER) {
        return Ok(page_url.to_string());
    }
    Ok(format!("{}{DIRECT_MARKER}{}", &page_url[..split], &page_url[split..]))
}

pub fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Uploader bound to one temp host.
#[derive(Clone)]
pub struct TempHost {
    api: ApiClient,
    base_url: String,
}

impl TempHost {
    pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
        TempHost {
            api,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Upload `path` and return its direct-download URL.
    pub fn upload(&self, path: &Path) -> Result<UploadedAsset> {
        let size = ensure_uploadable(path)?;
        info!(file = %path.display(), size_bytes = size, "uploading to temp host");

        let form = multipart::Form::new().file("file", path)?;
        let res = self
            .api
            .http()
            .post(format!("{}/api/v1/upload", self.base_url))
            .timeout(TRANSFER_TIMEOUT)
            .multipart(form)
            .send()?;
        let body: UploadResponse = read_json(res)?;

        let public_url = direct_download_url(&body.data.url)?;
        debug!(page_url = %body.data.url, %public_url, "temp host upload done");
        Ok(UploadedAsset { public_url })
    }
}
