// XML API response types
//
// Every response is wrapped in the same envelope:
//
//   <response status="success|error" code="N">
//     <result>...</result>      (payload, optional)
//     <msg><line>...</line></msg> (diagnostics, optional)
//   </response>
//
// Commit and job-status payloads get typed views on top of that.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::xml::XmlNode;

// ── Envelope ─────────────────────────────────────────────────────────

/// The `status` attribute of the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Error,
}

/// A parsed `<response>` envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    pub code: Option<u16>,
    /// The `<result>` element, if the device sent one.
    pub result: Option<XmlNode>,
    /// Message lines from `<msg>` (top level or inside `<result>`).
    pub messages: Vec<String>,
}

impl ApiResponse {
    /// Parse a raw response body.
    pub fn parse(body: &str) -> Result<Self, Error> {
        let root = XmlNode::parse(body)?;
        if root.name() != "response" {
            return Err(Error::MalformedResponse {
                message: format!("expected <response> root, found <{}>", root.name()),
                body: body.to_owned(),
            });
        }

        let status = match root.attribute("status").map(str::trim) {
            Some("success") => ResponseStatus::Success,
            Some("error") => ResponseStatus::Error,
            other => {
                return Err(Error::MalformedResponse {
                    message: format!("unexpected response status {other:?}"),
                    body: body.to_owned(),
                });
            }
        };
        let code = root
            .attribute("code")
            .and_then(|c| c.trim().parse::<u16>().ok());

        let mut messages = Vec::new();
        if let Some(msg) = root.child("msg") {
            collect_lines(msg, &mut messages);
        }
        let result = root.child("result").cloned();
        if let Some(msg) = result.as_ref().and_then(|r| r.child("msg")) {
            collect_lines(msg, &mut messages);
        }

        Ok(Self {
            status,
            code,
            result,
            messages,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// All message lines joined, or `None` if the device sent none.
    pub fn message(&self) -> Option<String> {
        if self.messages.is_empty() {
            None
        } else {
            Some(self.messages.join("; "))
        }
    }
}

/// `<msg>` is either plain text or a list of `<line>` elements, which may
/// themselves nest further `<line>`s.
fn collect_lines(msg: &XmlNode, out: &mut Vec<String>) {
    let lines: Vec<&XmlNode> = msg.children_named("line").collect();
    if lines.is_empty() {
        let text = msg.text_content();
        if !text.trim().is_empty() {
            out.push(text.trim().to_owned());
        }
        return;
    }
    for line in lines {
        let text = line.text_content();
        if !text.trim().is_empty() {
            out.push(text.trim().to_owned());
        }
    }
}

// ── Jobs ─────────────────────────────────────────────────────────────

/// Identifier of an asynchronous device job (commit, revert, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Lifecycle of a job as seen by a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    InProgress,
    FinishedSuccess,
    FinishedFailure,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::FinishedSuccess | Self::FinishedFailure)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::FinishedSuccess => "finished-success",
            Self::FinishedFailure => "finished-failure",
        })
    }
}

/// One `<job>` element from `show jobs id N`.
///
/// ```xml
/// <job>
///   <id>4</id><type>Commit</type>
///   <status>ACT</status><result>PEND</result><progress>55</progress>
///   <details><line>...</line></details>
/// </job>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: JobId,
    pub job_type: Option<String>,
    pub status: JobStatus,
    /// Percentage; absent once finished (the device reports a timestamp there).
    pub progress: Option<u8>,
    pub details: Vec<String>,
}

impl JobInfo {
    /// Build from a job-status response.
    pub fn from_response(response: &ApiResponse, requested: JobId) -> Result<Self, Error> {
        let job = response
            .result
            .as_ref()
            .and_then(|r| r.child("job"))
            .ok_or_else(|| Error::MalformedResponse {
                message: format!("job {requested} status response has no <job> element"),
                body: String::new(),
            })?;

        let id = job
            .child("id")
            .and_then(XmlNode::text)
            .and_then(|t| t.parse().ok())
            .unwrap_or(requested);

        let state = job.child("status").and_then(XmlNode::text).unwrap_or("");
        let outcome = job.child("result").and_then(XmlNode::text).unwrap_or("");
        let status = match (state.trim(), outcome.trim()) {
            ("FIN", "OK") => JobStatus::FinishedSuccess,
            ("FIN", _) => JobStatus::FinishedFailure,
            ("ACT", _) => JobStatus::InProgress,
            ("PEND", _) | ("", _) => JobStatus::Pending,
            (other, _) => {
                return Err(Error::MalformedResponse {
                    message: format!("job {id} has unrecognized status '{other}'"),
                    body: String::new(),
                });
            }
        };

        let mut details = Vec::new();
        for section in ["details", "warnings"] {
            if let Some(node) = job.child(section) {
                collect_lines(node, &mut details);
            }
        }

        Ok(Self {
            id,
            job_type: job.child("type").and_then(XmlNode::text).map(String::from),
            status,
            progress: job
                .child("progress")
                .and_then(XmlNode::text)
                .and_then(|p| p.trim().parse().ok()),
            details,
        })
    }
}

// ── Commit ───────────────────────────────────────────────────────────

/// What the device did with a commit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A commit job was enqueued.
    Queued(JobId),
    /// The candidate configuration matched the running one.
    NoChanges { message: String },
}

impl CommitOutcome {
    pub fn from_response(response: &ApiResponse) -> Result<Self, Error> {
        let job = response
            .result
            .as_ref()
            .and_then(|r| r.child("job"))
            .and_then(XmlNode::text);
        if let Some(job) = job {
            let id = job.parse().map_err(|_| Error::MalformedResponse {
                message: format!("commit returned a non-numeric job id '{job}'"),
                body: String::new(),
            })?;
            return Ok(Self::Queued(id));
        }

        let message = response.message().unwrap_or_default();
        if message.to_ascii_lowercase().contains("no changes") {
            return Ok(Self::NoChanges { message });
        }
        Err(Error::MalformedResponse {
            message: format!("commit response carries no job id: {message}"),
            body: String::new(),
        })
    }
}
