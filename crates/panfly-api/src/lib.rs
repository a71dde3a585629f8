// panfly-api: Async Rust client for the firewall / Panorama XML API

pub mod error;
pub mod retry;
pub mod transport;
pub mod xml;
pub mod xmlapi;

pub use error::Error;
pub use retry::RetryPolicy;
pub use transport::{TlsMode, TransportConfig};
pub use xml::XmlNode;
pub use xmlapi::{
    ApiResponse, CommitOutcome, JobId, JobInfo, JobStatus, ResponseStatus, XmlApiClient,
};
