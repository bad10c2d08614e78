// The per-platform publishing seam and the orchestrator that drives every
// selected platform through it.

use std::collections::BTreeMap;

use tracing::{error, info};

use crate::error::Result;
use crate::job::{Platform, PublishJob};

/// One platform's whole create/upload, poll, finalize life cycle.
pub trait Publisher {
    fn platform(&self) -> Platform;

    /// Publish the job; returns the platform's post (or publish) id.
    fn publish(&self, job: &PublishJob) -> Result<String>;
}

impl<P: Publisher + ?Sized> Publisher for &P {
    fn platform(&self) -> Platform {
        (**self).platform()
    }

    fn publish(&self, job: &PublishJob) -> Result<String> {
        (**self).publish(job)
    }
}

/// Result of one platform's attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub success: bool,
    pub post_id: Option<String>,
    pub detail: Option<String>,
}

impl PlatformOutcome {
    fn published(platform: Platform, post_id: String) -> Self {
        PlatformOutcome {
            platform,
            success: true,
            post_id: Some(post_id),
            detail: None,
        }
    }

    fn failed(platform: Platform, detail: String) -> Self {
        PlatformOutcome {
            platform,
            success: false,
            post_id: None,
            detail: Some(detail),
        }
    }
}

/// Progress notifications for the terminal UI.
#[derive(Debug)]
pub enum PublishEvent<'a> {
    Started(Platform),
    Finished(&'a PlatformOutcome),
}

/// Every outcome of a run, keyed by platform.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: BTreeMap<Platform, PlatformOutcome>,
}

impl RunReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &PlatformOutcome> {
        self.outcomes.values()
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformOutcome> {
        self.outcomes.get(&platform)
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True only when something was attempted and everything succeeded.
    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.values().all(|o| o.success)
    }

    /// Files are archived as soon as one platform has the post.
    pub fn any_succeeded(&self) -> bool {
        self.outcomes.values().any(|o| o.success)
    }

    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }
}

/// Run each of the job's platforms, one after the other. A failing platform
/// is recorded and the next one is still attempted.
pub fn publish_all(
    job: &PublishJob,
    publishers: &[Box<dyn Publisher + '_>],
    mut observe: impl FnMut(PublishEvent<'_>),
) -> RunReport {
    let mut report = RunReport::default();

    for &platform in job.platforms() {
        observe(PublishEvent::Started(platform));

        let outcome = match publishers.iter().find(|p| p.platform() == platform) {
            None => PlatformOutcome::failed(platform, "no publisher configured".to_string()),
            Some(publisher) => match publisher.publish(job) {
                Ok(post_id) => {
                    info!(%platform, %post_id, "platform succeeded");
                    PlatformOutcome::published(platform, post_id)
                }
                Err(err) => {
                    error!(%platform, error = %err, "platform failed");
                    PlatformOutcome::failed(platform, err.to_string())
                }
            },
        };

        observe(PublishEvent::Finished(&outcome));
        report.outcomes.insert(platform, outcome);
    }

    report
}
