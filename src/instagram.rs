// Instagram Reels: create a media container from a public video URL, poll
// it until processing ends, then publish it.

use serde::Deserialize;
use tracing::{info, warn};

use crate::api::{read_json, ApiClient};
use crate::error::{PublishError, Result};
use crate::job::{CoverSpec, Platform, PublishJob};
use crate::poll::{poll_until_terminal, PollOutcome, PollPolicy, PollStatus, Sleeper};
use crate::publisher::Publisher;
use crate::temphost::{ensure_uploadable, TempHost};

pub const DEFAULT_API_BASE: &str = "https://graph.instagram.com/v25.0";

#[derive(Debug, Clone)]
pub struct InstagramCredentials {
    pub account_id: String,
    pub access_token: String,
}

/// Cover parameters accepted by the container-creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCover {
    None,
    ThumbOffset(u64),
    CoverUrl(String),
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status_code: Option<String>,
    status: Option<String>,
}

pub struct InstagramPublisher {
    api: ApiClient,
    temp_host: TempHost,
    credentials: InstagramCredentials,
    base_url: String,
    policy: PollPolicy,
    sleep: Sleeper,
}

impl InstagramPublisher {
    pub fn new(api: ApiClient, temp_host: TempHost, credentials: InstagramCredentials) -> Self {
        InstagramPublisher {
            api,
            temp_host,
            credentials,
            base_url: DEFAULT_API_BASE.to_string(),
            policy: PollPolicy::default(),
            sleep: std::thread::sleep,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy, sleep: Sleeper) -> Self {
        self.policy = policy;
        self.sleep = sleep;
        self
    }

    /// Turn the job's cover choice into container parameters, uploading a
    /// local image to the temp host when needed.
    fn resolve_cover(&self, cover: &CoverSpec) -> Result<ContainerCover> {
        Ok(match cover {
            CoverSpec::None => ContainerCover::None,
            CoverSpec::FrameOffsetMs(ms) => ContainerCover::ThumbOffset(*ms),
            CoverSpec::ExternalUrl(url) => ContainerCover::CoverUrl(url.clone()),
            CoverSpec::LocalImage(path) => {
                info!(platform = "instagram", "uploading cover image");
                ContainerCover::CoverUrl(self.temp_host.upload(path)?.public_url)
            }
        })
    }

    /// `POST {base}/{account}/media`; returns the container id.
    pub fn create_container(&self, video_url: &str, caption: &str, cover: &ContainerCover) -> Result<String> {
        let mut form = vec![
            ("media_type", "REELS".to_string()),
            ("video_url", video_url.to_string()),
            ("caption", caption.to_string()),
            ("access_token", self.credentials.access_token.clone()),
        ];
        match cover {
            ContainerCover::None => {}
            ContainerCover::ThumbOffset(ms) => form.push(("thumb_offset", ms.to_string())),
            ContainerCover::CoverUrl(url) => form.push(("cover_url", url.clone())),
        }

        let res = self
            .api
            .http()
            .post(format!("{}/{}/media", self.base_url, self.credentials.account_id))
            .form(&form)
            .send()?;
        let body: IdResponse = read_json(res)?;
        Ok(body.id)
    }

    /// One status check of a container, classified for the poll loop.
    pub fn container_status(&self, container_id: &str) -> Result<PollStatus> {
        let res = self
            .api
            .http()
            .get(format!("{}/{}", self.base_url, container_id))
            .query(&[
                ("fields", "status_code,status"),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()?;
        let body: StatusResponse = read_json(res)?;

        Ok(match body.status_code.as_deref() {
            Some("FINISHED") => PollStatus::Done,
            Some("ERROR") => PollStatus::Failed(
                body.status.unwrap_or_else(|| "unknown processing error".to_string()),
            ),
            other => PollStatus::Pending(other.unwrap_or("UNKNOWN").to_string()),
        })
    }

    pub fn wait_until_ready(&self, container_id: &str) -> Result<PollOutcome> {
        poll_until_terminal(self.policy, self.sleep, || self.container_status(container_id))
    }

    /// `POST {base}/{account}/media_publish`; returns the post id.
    pub fn publish_container(&self, container_id: &str) -> Result<String> {
        let res = self
            .api
            .http()
            .post(format!(
                "{}/{}/media_publish",
                self.base_url, self.credentials.account_id
            ))
            .form(&[
                ("creation_id", container_id),
                ("access_token", self.credentials.access_token.as_str()),
            ])
            .send()?;
        let body: IdResponse = read_json(res)?;
        Ok(body.id)
    }
}

impl Publisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn publish(&self, job: &PublishJob) -> Result<String> {
        // The video has to fit the temp host before the cover goes up.
        ensure_uploadable(job.video())?;
        let cover = self.resolve_cover(job.cover())?;

        info!(platform = "instagram", video = %job.video().display(), "uploading video");
        let video = self.temp_host.upload(job.video())?;

        let container_id = self.create_container(&video.public_url, job.caption(), &cover)?;
        info!(platform = "instagram", %container_id, "container created");

        match self.wait_until_ready(&container_id)? {
            PollOutcome::Success => {}
            PollOutcome::Failure(reason) => return Err(PublishError::Processing(reason)),
            PollOutcome::Timeout { polls } => {
                warn!(platform = "instagram", %container_id, "processing did not finish in time");
                return Err(PublishError::Timeout { polls });
            }
        }

        let post_id = self.publish_container(&container_id)?;
        info!(platform = "instagram", %post_id, "published");
        Ok(post_id)
    }
}
