// ── Commit and job lifecycle ──
//
// Queues commits and polls their jobs to a terminal state. Terminal job
// results are memoized: once a job has finished, asking about it again
// never reaches the device. The memo keeps the newest `MAX_SETTLED_JOBS`
// jobs. Waits are bounded by `PollSettings::max_wait`
// and can be cut short with a `CancellationToken`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use panfly_api::{CommitOutcome, JobId, JobInfo, JobStatus, XmlApiClient, XmlNode};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollSettings;
use crate::context::{DeviceContext, PanoramaScope};
use crate::error::CoreError;

/// Terminal job records kept per engine. Job ids grow monotonically on the
/// device, so the lowest id is evicted first.
pub const MAX_SETTLED_JOBS: usize = 256;

/// Final word on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    /// `None` when the device had nothing to commit.
    pub job_id: Option<u64>,
    pub status: JobStatus,
    /// Device messages: job details, warnings, or the no-changes notice.
    pub details: Vec<String>,
    /// Status requests that reached the device.
    pub polls: u32,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    fn no_changes(message: String) -> Self {
        Self {
            job_id: None,
            status: JobStatus::FinishedSuccess,
            details: vec![message],
            polls: 0,
            elapsed: Duration::ZERO,
            finished_at: Utc::now(),
        }
    }
}

/// Commits and job polling against one device.
#[derive(Debug)]
pub struct CommitEngine {
    client: Arc<XmlApiClient>,
    poll: PollSettings,
    terminal: DashMap<JobId, JobInfo>,
}

impl CommitEngine {
    pub fn new(client: Arc<XmlApiClient>, poll: PollSettings) -> Self {
        Self {
            client,
            poll,
            terminal: DashMap::new(),
        }
    }

    pub fn poll_settings(&self) -> &PollSettings {
        &self.poll
    }

    /// Build the commit command for a context.
    ///
    /// Manager device-group and template scopes commit only their own
    /// changes; everything else is a full commit.
    pub fn commit_command(ctx: &DeviceContext, description: Option<&str>) -> Result<String, CoreError> {
        let mut commit = XmlNode::new("commit");
        let partial = match ctx {
            DeviceContext::Panorama(PanoramaScope::DeviceGroup { name, .. }) => {
                Some(("device-group", name.as_str()))
            }
            DeviceContext::Panorama(PanoramaScope::Template { name }) => {
                Some(("template", name.as_str()))
            }
            _ => None,
        };
        if let Some((scope, name)) = partial {
            commit.push_child(XmlNode::new("partial").with_child(
                XmlNode::new(scope).with_child(XmlNode::new("member").with_text(name)),
            ));
        }
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            commit.push_child(XmlNode::new("description").with_text(description));
        }
        commit
            .to_xml()
            .map_err(|e| CoreError::Internal(format!("building commit command: {e}")))
    }

    /// Queue a commit. Never retried.
    pub async fn commit(
        &self,
        ctx: &DeviceContext,
        description: Option<&str>,
    ) -> Result<CommitOutcome, CoreError> {
        let cmd = Self::commit_command(ctx, description)?;
        debug!(%ctx, "requesting commit");
        Ok(self.client.commit(&cmd).await?)
    }

    /// Current status of a job.
    pub async fn poll(&self, job: JobId) -> Result<JobStatus, CoreError> {
        Ok(self.poll_info(job).await?.status)
    }

    /// Current job record. Terminal records come from the memo without a
    /// device round trip.
    pub async fn poll_info(&self, job: JobId) -> Result<JobInfo, CoreError> {
        if let Some(info) = self.terminal.get(&job) {
            return Ok(info.value().clone());
        }
        let info = self.client.job_status(job).await?;
        if info.status.is_terminal() {
            self.remember(info.clone());
        }
        Ok(info)
    }

    /// `true` if the job's terminal state is already known locally.
    pub fn is_settled(&self, job: JobId) -> bool {
        self.terminal.contains_key(&job)
    }

    /// Drop a job's memoized terminal record. The next poll asks the device.
    pub fn forget(&self, job: JobId) -> Option<JobInfo> {
        self.terminal.remove(&job).map(|(_, info)| info)
    }

    fn remember(&self, info: JobInfo) {
        self.terminal.insert(info.id, info);
        while self.terminal.len() > MAX_SETTLED_JOBS {
            let oldest = self.terminal.iter().map(|e| *e.key()).min();
            match oldest {
                Some(job) => {
                    self.terminal.remove(&job);
                }
                None => break,
            }
        }
    }

    /// Poll until the job finishes or `max_wait` elapses.
    pub async fn wait(&self, job: JobId) -> Result<JobReport, CoreError> {
        self.wait_inner(job, None).await
    }

    /// As [`wait`](Self::wait), returning `CoreError::Cancelled` as soon as
    /// `cancel` fires.
    pub async fn wait_until_cancelled(
        &self,
        job: JobId,
        cancel: &CancellationToken,
    ) -> Result<JobReport, CoreError> {
        self.wait_inner(job, Some(cancel)).await
    }

    /// Queue a commit and wait for it. A commit with nothing to do
    /// succeeds immediately with no job id.
    pub async fn commit_and_wait(
        &self,
        ctx: &DeviceContext,
        description: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<JobReport, CoreError> {
        match self.commit(ctx, description).await? {
            CommitOutcome::Queued(job) => self.wait_inner(job, cancel).await,
            CommitOutcome::NoChanges { message } => {
                info!(%ctx, "nothing to commit");
                Ok(JobReport::no_changes(message))
            }
        }
    }

    async fn wait_inner(
        &self,
        job: JobId,
        cancel: Option<&CancellationToken>,
    ) -> Result<JobReport, CoreError> {
        let started = Instant::now();
        let mut delay = self.poll.interval;
        let mut polls = 0u32;

        loop {
            let cached = self.is_settled(job);
            let info = self.poll_info(job).await?;
            if !cached {
                polls += 1;
            }
            if info.status.is_terminal() {
                return finish(info, polls, started.elapsed());
            }

            let elapsed = started.elapsed();
            if elapsed >= self.poll.max_wait {
                warn!(%job, waited_secs = elapsed.as_secs(), "job did not finish in time");
                return Err(CoreError::PollTimeout {
                    job_id: job.0,
                    waited: elapsed,
                });
            }

            let pause = delay.min(self.poll.max_wait - elapsed);
            debug!(%job, status = %info.status, progress = ?info.progress, ?pause, "job pending");
            match cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            info!(%job, "wait cancelled");
                            return Err(CoreError::Cancelled { job_id: job.0 });
                        }
                        () = tokio::time::sleep(pause) => {}
                    }
                }
                None => tokio::time::sleep(pause).await,
            }
            delay = self.poll.next_delay(delay);
        }
    }
}

fn finish(info: JobInfo, polls: u32, elapsed: Duration) -> Result<JobReport, CoreError> {
    match info.status {
        JobStatus::FinishedSuccess => {
            info!(job = %info.id, polls, "job finished");
            Ok(JobReport {
                job_id: Some(info.id.0),
                status: info.status,
                details: info.details,
                polls,
                elapsed,
                finished_at: Utc::now(),
            })
        }
        _ => {
            let details = if info.details.is_empty() {
                "job failed without details".to_owned()
            } else {
                info.details.join("; ")
            };
            warn!(job = %info.id, %details, "job failed");
            Err(CoreError::CommitFailure {
                job_id: info.id.0,
                details,
            })
        }
    }
}
