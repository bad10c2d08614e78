// Library root
// -----------
// Publishes one short video (caption + optional cover) to Instagram Reels
// and TikTok. The binary (`main.rs`) only parses arguments and calls `app`.
//
// Module responsibilities:
// - `job`: what gets published (video, caption, cover choice, platforms).
// - `timestamp`: cover timestamps ("0:05") to milliseconds.
// - `api`: the shared blocking HTTP client and status checking.
// - `temphost`: uploads local files to a public temporary host.
// - `poll`: the poll-until-terminal loop both platforms use.
// - `instagram`, `tiktok`: each platform's create / poll / finalize flow.
// - `publisher`: the `Publisher` seam and the multi-platform orchestrator.
// - `config`, `cli`, `ui`, `archive`, `auth`, `app`: the tool around it.
pub mod api;
pub mod app;
pub mod archive;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod instagram;
pub mod job;
pub mod poll;
pub mod publisher;
pub mod temphost;
pub mod tiktok;
pub mod timestamp;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{PublishError, Result};
pub use job::{CoverSpec, Platform, PublishJob};
pub use publisher::{publish_all, PlatformOutcome, Publisher, RunReport};
