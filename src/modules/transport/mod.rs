//! Seam to the destination instance
//!
//! - `traits`: the `ErpTransport` contract the core consumes
//! - `types`: wire shapes (submit responses, job status, links)
//! - `http_client` / `rest_transport`: the reqwest-based implementation
pub mod http_client;
pub mod rest_transport;
pub mod traits;
pub mod types;

pub use rest_transport::RestTransport;
pub use traits::ErpTransport;
pub use types::{find_link, links_of, JobStatus, Link, LinkResponse, SubmitResponse};

#[cfg(test)]
pub use traits::MockErpTransport;
