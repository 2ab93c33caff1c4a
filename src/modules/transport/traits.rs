use async_trait::async_trait;
use serde_json::Value;

use super::types::{JobStatus, LinkResponse, SubmitResponse};
use crate::modules::jobs::domain::JobHandle;
use crate::shared::domain::RecordKind;
use crate::shared::errors::AppResult;

/// Seam to the HTTP collaborator that talks to the destination instance.
///
/// Implementations return `Err` only for transport-level failures. HTTP error
/// statuses on `follow_link` and rejections on `submit_write` are data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ErpTransport: Send + Sync {
    /// Submit a create write for `kind`
    async fn submit_write(&self, kind: RecordKind, payload: &Value) -> AppResult<SubmitResponse>;

    /// Fetch the current status of an accepted write
    async fn poll_job(&self, job: &JobHandle) -> AppResult<JobStatus>;

    /// GET an absolute or base-relative href, exposing status and `Location`
    async fn follow_link(&self, url: &str) -> AppResult<LinkResponse>;

    /// Fetch one entity; `id` is already in the format the lookup requires
    async fn fetch_entity(&self, kind: &str, id: &str) -> AppResult<Value>;

    /// Fetch every entity of a kind (used for run-scoped lookup tables)
    async fn list_entities(&self, kind: &str) -> AppResult<Vec<Value>>;
}
