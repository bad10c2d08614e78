// Poll-until-terminal loop shared by every platform publisher.
//
// Each platform maps its own status vocabulary onto [`PollStatus`]; the
// loop owns the cadence (fixed interval, fixed overall budget) and folds
// the result into a [`PollOutcome`].

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How blocking waits between polls are performed.
pub type Sleeper = fn(Duration);

/// One observation of a remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Terminal success.
    Done,
    /// Terminal failure with the platform's reason.
    Failed(String),
    /// Still running; carries the raw status for logging.
    Pending(String),
}

/// Result of a whole polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Success,
    Failure(String),
    Timeout { polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        PollPolicy { interval, timeout }
    }

    /// Number of status checks the budget allows: `timeout / interval`,
    /// and always at least one.
    pub fn max_polls(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        let polls = self.timeout.as_millis() / interval;
        polls.clamp(1, u32::MAX as u128) as u32
    }
}

/// Call `check` until it reports a terminal status or the budget runs out.
///
/// Errors from `check` (transport failures) end the loop immediately.
/// After the last allowed check the loop gives up without sleeping again.
pub fn poll_until_terminal<F>(policy: PollPolicy, sleep: Sleeper, mut check: F) -> Result<PollOutcome>
where
    F: FnMut() -> Result<PollStatus>,
{
    let max_polls = policy.max_polls();
    for poll in 1..=max_polls {
        match check()? {
            PollStatus::Done => return Ok(PollOutcome::Success),
            PollStatus::Failed(reason) => return Ok(PollOutcome::Failure(reason)),
            PollStatus::Pending(status) => {
                debug!(poll, max_polls, %status, "still processing");
                if poll < max_polls {
                    sleep(policy.interval);
                }
            }
        }
    }
    warn!(polls = max_polls, "gave up waiting for processing");
    Ok(PollOutcome::Timeout { polls: max_polls })
}
