// Operational and commit endpoints (`type=op`, `type=commit`)

use tracing::{debug, info};

use crate::error::Error;
use crate::xml::XmlNode;
use crate::xmlapi::client::XmlApiClient;
use crate::xmlapi::models::{ApiResponse, CommitOutcome, JobId, JobInfo};

impl XmlApiClient {
    /// Run an operational command given as its XML form,
    /// e.g. `<show><system><info/></system></show>`.
    ///
    /// `type=op&cmd=...`
    pub async fn run_operational(&self, cmd: &str) -> Result<ApiResponse, Error> {
        debug!(cmd, "operational command");
        self.request("op", &[("type", "op"), ("cmd", cmd)], None)
            .await
    }

    /// Submit a commit command (`<commit>...</commit>`).
    ///
    /// Sent once, never retried: a commit whose response was lost may
    /// already be queued, and queueing a second one is not the client's call.
    pub async fn commit(&self, cmd: &str) -> Result<CommitOutcome, Error> {
        debug!(cmd, "commit");
        let response = self
            .request_once("commit", &[("type", "commit"), ("cmd", cmd)])
            .await?;
        let outcome = CommitOutcome::from_response(&response)?;
        if let CommitOutcome::Queued(job) = &outcome {
            info!(%job, "commit queued");
        }
        Ok(outcome)
    }

    /// Fetch the status of one job.
    ///
    /// `type=op&cmd=<show><jobs><id>N</id></jobs></show>`
    pub async fn job_status(&self, job: JobId) -> Result<JobInfo, Error> {
        let cmd = format!("<show><jobs><id>{job}</id></jobs></show>");
        let response = self
            .request("op.show-jobs", &[("type", "op"), ("cmd", cmd.as_str())], None)
            .await?;
        JobInfo::from_response(&response, job)
    }

    /// Discard the candidate configuration, reverting it to the running one.
    ///
    /// `type=op&cmd=<revert><config/></revert>`
    pub async fn revert_config(&self) -> Result<ApiResponse, Error> {
        info!("reverting candidate configuration");
        self.request(
            "op.revert",
            &[("type", "op"), ("cmd", "<revert><config/></revert>")],
            None,
        )
        .await
    }

    /// `show system info`, returning the `<system>` element.
    pub async fn system_info(&self) -> Result<XmlNode, Error> {
        let response = self
            .run_operational("<show><system><info/></system></show>")
            .await?;
        response
            .result
            .and_then(|r| r.child("system").cloned())
            .ok_or_else(|| Error::MalformedResponse {
                message: "system info response has no <system> element".into(),
                body: String::new(),
            })
    }
}
