// TikTok Content Posting API: open an upload session, push the raw bytes
// in one chunk, then poll the publish status.

use std::fs::File;

use reqwest::blocking::Body;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::api::{check, read_json, ApiClient, TRANSFER_TIMEOUT};
use crate::error::{PublishError, Result};
use crate::job::{CoverSpec, Platform, PublishJob};
use crate::poll::{poll_until_terminal, PollOutcome, PollPolicy, PollStatus, Sleeper};
use crate::publisher::Publisher;

pub const DEFAULT_API_BASE: &str = "https://open.tiktokapis.com/v2";
pub const DEFAULT_PRIVACY_LEVEL: &str = "SELF_ONLY";

#[derive(Debug, Clone)]
pub struct TikTokCredentials {
    pub access_token: String,
}

/// Every TikTok response wraps its payload next to an `error` object whose
/// `code` is `"ok"` on success, even when the HTTP status is 200. `data` is
/// only decoded once the error code has been checked.
#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<serde_json::Value>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    message: String,
}

impl Envelope {
    fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        if let Some(err) = self.error {
            if err.code != "ok" {
                return Err(PublishError::Application {
                    code: err.code,
                    message: err.message,
                });
            }
        }
        let data = self.data.ok_or_else(|| PublishError::Application {
            code: "missing_data".into(),
            message: "response has no data object".into(),
        })?;
        serde_json::from_value(data).map_err(|e| PublishError::Application {
            code: "invalid_response".into(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadSession {
    pub publish_id: String,
    pub upload_url: String,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: String,
    #[serde(default)]
    fail_reason: Option<String>,
}

pub struct TikTokPublisher {
    api: ApiClient,
    credentials: TikTokCredentials,
    base_url: String,
    privacy_level: String,
    policy: PollPolicy,
    sleep: Sleeper,
}

impl TikTokPublisher {
    pub fn new(api: ApiClient, credentials: TikTokCredentials) -> Self {
        TikTokPublisher {
            api,
            credentials,
            base_url: DEFAULT_API_BASE.to_string(),
            privacy_level: DEFAULT_PRIVACY_LEVEL.to_string(),
            policy: PollPolicy::default(),
            sleep: std::thread::sleep,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_privacy_level(mut self, privacy_level: impl Into<String>) -> Self {
        self.privacy_level = privacy_level.into();
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy, sleep: Sleeper) -> Self {
        self.policy = policy;
        self.sleep = sleep;
        self
    }

    /// `POST /post/publish/video/init/` declaring a single chunk that covers
    /// the whole file.
    pub fn init_upload(&self, title: &str, video_size: u64, cover_ms: Option<u64>) -> Result<UploadSession> {
        let mut post_info = json!({
            "title": title,
            "privacy_level": self.privacy_level,
        });
        if let Some(ms) = cover_ms {
            post_info["video_cover_timestamp_ms"] = json!(ms);
        }
        let body = json!({
            "post_info": post_info,
            "source_info": {
                "source": "FILE_UPLOAD",
                "video_size": video_size,
                "chunk_size": video_size,
                "total_chunk_count": 1,
            },
        });

        let res = self
            .api
            .http()
            .post(format!("{}/post/publish/video/init/", self.base_url))
            .headers(ApiClient::bearer_headers(&self.credentials.access_token)?)
            .json(&body)
            .send()?;
        read_json::<Envelope>(res)?.into_data()
    }

    /// `PUT {upload_url}` with the whole file as one content range.
    pub fn upload_bytes(&self, upload_url: &str, job: &PublishJob) -> Result<()> {
        let size = job.video_size();
        let file = File::open(job.video())?;

        let res = self
            .api
            .http()
            .put(upload_url)
            .timeout(TRANSFER_TIMEOUT)
            .header(CONTENT_TYPE, "video/mp4")
            .header(CONTENT_RANGE, content_range(size))
            .body(Body::sized(file, size))
            .send()?;
        check(res)?;
        Ok(())
    }

    /// One `POST /post/publish/status/fetch/`, classified for the poll loop.
    pub fn publish_status(&self, publish_id: &str) -> Result<PollStatus> {
        let res = self
            .api
            .http()
            .post(format!("{}/post/publish/status/fetch/", self.base_url))
            .headers(ApiClient::bearer_headers(&self.credentials.access_token)?)
            .json(&json!({ "publish_id": publish_id }))
            .send()?;
        let data: StatusData = read_json::<Envelope>(res)?.into_data()?;

        Ok(match data.status.as_str() {
            "PUBLISH_COMPLETE" => PollStatus::Done,
            "FAILED" => PollStatus::Failed(
                data.fail_reason.unwrap_or_else(|| "unknown failure".to_string()),
            ),
            other => PollStatus::Pending(other.to_string()),
        })
    }

    pub fn wait_until_published(&self, publish_id: &str) -> Result<PollOutcome> {
        poll_until_terminal(self.policy, self.sleep, || self.publish_status(publish_id))
    }
}

/// `bytes 0-<size-1>/<size>` for a single chunk covering the whole file.
pub fn content_range(size: u64) -> String {
    format!("bytes 0-{}/{}", size.saturating_sub(1), size)
}

impl Publisher for TikTokPublisher {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn publish(&self, job: &PublishJob) -> Result<String> {
        let cover_ms = match job.cover() {
            CoverSpec::FrameOffsetMs(ms) => Some(*ms),
            CoverSpec::None => None,
            other => {
                warn!(platform = "tiktok", cover = %other, "only frame covers are supported, ignoring cover");
                None
            }
        };

        let session = self.init_upload(job.caption(), job.video_size(), cover_ms)?;
        info!(platform = "tiktok", publish_id = %session.publish_id, "upload session opened");

        self.upload_bytes(&session.upload_url, job)?;
        info!(platform = "tiktok", bytes = job.video_size(), "video uploaded");

        match self.wait_until_published(&session.publish_id)? {
            PollOutcome::Success => {
                info!(platform = "tiktok", publish_id = %session.publish_id, "published");
                Ok(session.publish_id)
            }
            PollOutcome::Failure(reason) => Err(PublishError::Processing(reason)),
            PollOutcome::Timeout { polls } => {
                warn!(platform = "tiktok", publish_id = %session.publish_id, "publishing did not finish in time");
                Err(PublishError::Timeout { polls })
            }
        }
    }
}
