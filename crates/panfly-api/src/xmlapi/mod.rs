// XML API client modules
//
// Hand-written client for the device's `/api/` endpoint. Configuration
// calls (`type=config`), operational commands (`type=op`) and commits
// (`type=commit`) all share the `<response status="..." code="...">`
// envelope parsed in `models`.

pub mod client;
pub mod codes;
pub mod config;
pub mod models;
pub mod operational;

pub use client::XmlApiClient;
pub use models::{ApiResponse, CommitOutcome, JobId, JobInfo, JobStatus, ResponseStatus};
