/// Resolves destination jobs created by asynchronous writes
///
/// Polls a job at a fixed per-kind interval until it reports a terminal state,
/// then walks the link chain job → task → task item → related entity to find
/// where the destination put the new record.
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::modules::jobs::domain::{
    classify_rejection, JobHandle, JobState, PollPolicy, PollPolicyTable, ResolvedLocation,
};
use crate::modules::transport::{find_link, links_of, ErpTransport, Link, LinkResponse};
use crate::shared::errors::{MigrationError, MigrationResult};

#[derive(Clone)]
pub struct AsyncJobResolver {
    transport: Arc<dyn ErpTransport>,
    policies: PollPolicyTable,
    cancellation: Option<CancellationToken>,
}

impl AsyncJobResolver {
    pub fn new(transport: Arc<dyn ErpTransport>, policies: PollPolicyTable) -> Self {
        Self {
            transport,
            policies,
            cancellation: None,
        }
    }

    /// Observe `token` between polls; a cancelled token ends resolution with
    /// `MigrationError::Cancelled`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn policy_for(&self, job: &JobHandle) -> PollPolicy {
        self.policies.policy_for(job.record_kind)
    }

    /// Resolve using the policy table entry for the job's record kind
    pub async fn resolve_job(&self, job: JobHandle) -> MigrationResult<ResolvedLocation> {
        let policy = self.policy_for(&job);
        self.resolve(job, policy).await
    }

    /// Poll `job` until it succeeds, fails, or exhausts `policy.max_attempts`.
    ///
    /// Transient transport errors consume an attempt. Structural problems in
    /// the link chain are returned immediately as `ProtocolError`.
    pub async fn resolve(
        &self,
        job: JobHandle,
        policy: PollPolicy,
    ) -> MigrationResult<ResolvedLocation> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.transport.poll_job(&job).await {
                Ok(status) => match status.state {
                    JobState::Running => {
                        log::debug!(
                            "{} job {} still running (poll {}/{})",
                            job.record_kind,
                            job.poll_url,
                            attempt,
                            max_attempts
                        );
                    }
                    JobState::Failed => {
                        let reason = status.failure_reason();
                        log::warn!("{} job {} failed: {}", job.record_kind, job.poll_url, reason);
                        return Err(MigrationError::JobFailed {
                            poll_url: job.poll_url,
                            reason,
                            detail: status.detail,
                        });
                    }
                    JobState::Succeeded => {
                        let resolved = self.traverse(&status.links, &status.detail).await?;
                        log::info!(
                            "{} job {} resolved to {} after {} polls ({:?})",
                            job.record_kind,
                            job.poll_url,
                            resolved.internal_id,
                            attempt,
                            job.age()
                        );
                        return Ok(resolved);
                    }
                },
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "Transient error polling {} (poll {}/{}): {}",
                        job.poll_url,
                        attempt,
                        max_attempts,
                        e
                    );
                }
                Err(e) => return Err(MigrationError::Transport(e)),
            }

            if attempt >= max_attempts {
                log::warn!(
                    "{} job {} did not finish within {} polls",
                    job.record_kind,
                    job.poll_url,
                    max_attempts
                );
                return Err(MigrationError::JobTimedOut {
                    poll_url: job.poll_url,
                    attempts: attempt,
                });
            }

            self.pause(policy.delay, &job).await?;
        }
    }

    async fn pause(&self, delay: Duration, job: &JobHandle) -> MigrationResult<()> {
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(MigrationError::Cancelled {
                        poll_url: job.poll_url.clone(),
                    }),
                    _ = tokio::time::sleep(delay) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    /// job → task → first task item → related entity → Location
    async fn traverse(
        &self,
        job_links: &[Link],
        job_detail: &Value,
    ) -> MigrationResult<ResolvedLocation> {
        let task_url = required_link(job_links, "self", "job", job_detail)?;
        let task = self.follow_hop("task", &task_url).await?;

        let item = task
            .body
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .ok_or_else(|| {
                MigrationError::protocol("task", "task has no items", task.body.clone())
            })?;
        let item_url = required_link(&links_of(item), "self", "task item", item)?;
        let task_item = self.follow_hop("task item", &item_url).await?;

        let related_url =
            required_link(&links_of(&task_item.body), "related", "task item", &task_item.body)?;
        let related = self
            .transport
            .follow_link(&related_url)
            .await
            .map_err(|e| MigrationError::protocol("related", e.to_string(), Value::Null))?;

        interpret_related(related)
    }

    async fn follow_hop(&self, hop: &str, url: &str) -> MigrationResult<LinkResponse> {
        let response = self
            .transport
            .follow_link(url)
            .await
            .map_err(|e| MigrationError::protocol(hop, e.to_string(), Value::Null))?;

        if !response.is_success() {
            return Err(MigrationError::protocol(
                hop,
                format!("GET {} answered HTTP {}", url, response.status),
                response.body,
            ));
        }
        Ok(response)
    }
}

fn required_link(
    links: &[Link],
    rel: &str,
    hop: &str,
    detail: &Value,
) -> MigrationResult<String> {
    find_link(links, rel)
        .map(|link| link.href.clone())
        .ok_or_else(|| {
            MigrationError::protocol(hop, format!("missing '{}' link", rel), detail.clone())
        })
}

/// 204 + Location is success; an error status carries the write rejection.
fn interpret_related(response: LinkResponse) -> MigrationResult<ResolvedLocation> {
    if response.status >= 400 {
        return Err(classify_rejection(response.body));
    }
    if response.status != 204 {
        return Err(MigrationError::protocol(
            "related",
            format!("expected HTTP 204, got {}", response.status),
            response.body,
        ));
    }

    let location = response.location.ok_or_else(|| {
        MigrationError::protocol("related", "HTTP 204 without Location header", Value::Null)
    })?;

    ResolvedLocation::from_location_header(&location)
        .map_err(|message| MigrationError::protocol("related", message, Value::String(location)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::transport::{JobStatus, MockErpTransport};
    use crate::shared::domain::RecordKind;
    use crate::shared::errors::AppError;
    use serde_json::json;

    fn running() -> JobStatus {
        JobStatus::new(JobState::Running, vec![])
    }

    fn succeeded() -> JobStatus {
        JobStatus::new(JobState::Succeeded, vec![Link::new("self", "/task/1")])
    }

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(max_attempts, Duration::ZERO)
    }

    /// Wire the three traversal hops; the final hop answers `last`
    fn expect_hops(mock: &mut MockErpTransport, last: LinkResponse) {
        mock.expect_follow_link().returning(move |url| match url {
            "/task/1" => Ok(LinkResponse::new(
                200,
                json!({"items": [{"links": [{"rel": "self", "href": "/task/1/item/1"}]}]}),
            )),
            "/task/1/item/1" => Ok(LinkResponse::new(
                200,
                json!({"links": [{"rel": "related", "href": "/record/42"}]}),
            )),
            "/record/42" => Ok(last.clone()),
            other => panic!("unexpected url {}", other),
        });
    }

    fn resolver(mock: MockErpTransport) -> AsyncJobResolver {
        AsyncJobResolver::new(Arc::new(mock), PollPolicyTable::uniform(fast(5)))
    }

    fn job() -> JobHandle {
        JobHandle::new("/async/v1/job/9", RecordKind::Invoice)
    }

    #[tokio::test]
    async fn test_resolves_after_running_polls() {
        let mut mock = MockErpTransport::new();
        let mut states = vec![running(), running(), succeeded()].into_iter();
        mock.expect_poll_job()
            .times(3)
            .returning(move |_| Ok(states.next().unwrap()));
        expect_hops(
            &mut mock,
            LinkResponse::no_content("https://host/record/v1/kind/42"),
        );

        let resolved = resolver(mock).resolve(job(), fast(5)).await.unwrap();
        assert_eq!(resolved.internal_id, "42");
        assert_eq!(resolved.location_uri, "https://host/record/v1/kind/42");
    }

    #[tokio::test]
    async fn test_times_out_after_max_attempts() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job().times(4).returning(|_| Ok(running()));
        mock.expect_follow_link().never();

        let err = resolver(mock).resolve(job(), fast(4)).await.unwrap_err();
        match err {
            MigrationError::JobTimedOut { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_job_carries_reason() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job().times(1).returning(|_| {
            JobStatus::from_body(json!({"progress": "failed", "reason": "Record locked"}))
        });

        let err = resolver(mock).resolve(job(), fast(5)).await.unwrap_err();
        match err {
            MigrationError::JobFailed { reason, detail, .. } => {
                assert_eq!(reason, "Record locked");
                assert_eq!(detail["progress"], "failed");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_task_link_is_not_retried() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job()
            .times(1)
            .returning(|_| Ok(JobStatus::new(JobState::Succeeded, vec![])));

        let err = resolver(mock).resolve(job(), fast(5)).await.unwrap_err();
        assert!(matches!(err, MigrationError::ProtocolError { ref hop, .. } if hop == "job"));
    }

    #[tokio::test]
    async fn test_non_numeric_location_is_protocol_error() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job().times(1).returning(|_| Ok(succeeded()));
        expect_hops(
            &mut mock,
            LinkResponse::no_content("https://host/record/v1/kind/forty-two"),
        );

        let err = resolver(mock).resolve(job(), fast(5)).await.unwrap_err();
        assert!(matches!(err, MigrationError::ProtocolError { ref hop, .. } if hop == "related"));
    }

    #[tokio::test]
    async fn test_rejected_related_fetch_is_write_rejected() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job().times(1).returning(|_| Ok(succeeded()));
        expect_hops(
            &mut mock,
            LinkResponse::new(
                400,
                json!({"o:errorDetails": [{"detail": "You only have 3 available."}]}),
            ),
        );

        let err = resolver(mock).resolve(job(), fast(5)).await.unwrap_err();
        assert!(err.is_inventory_error());
    }

    #[tokio::test]
    async fn test_failed_task_hop_is_protocol_error() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job().times(1).returning(|_| Ok(succeeded()));
        mock.expect_follow_link()
            .times(1)
            .returning(|_| Ok(LinkResponse::new(500, json!({"title": "boom"}))));

        let err = resolver(mock).resolve(job(), fast(5)).await.unwrap_err();
        assert!(matches!(err, MigrationError::ProtocolError { ref hop, .. } if hop == "task"));
    }

    #[tokio::test]
    async fn test_transient_poll_error_consumes_attempt() {
        let mut mock = MockErpTransport::new();
        let mut results = vec![
            Err(AppError::RateLimited("429".into())),
            Ok(succeeded()),
        ]
        .into_iter();
        mock.expect_poll_job()
            .times(2)
            .returning(move |_| results.next().unwrap());
        expect_hops(&mut mock, LinkResponse::no_content("/record/v1/invoice/7"));

        let resolved = resolver(mock).resolve(job(), fast(2)).await.unwrap();
        assert_eq!(resolved.internal_id, "7");
    }

    #[tokio::test]
    async fn test_permanent_poll_error_propagates() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job()
            .times(1)
            .returning(|_| Err(AppError::Unauthorized("expired token".into())));

        let err = resolver(mock).resolve(job(), fast(5)).await.unwrap_err();
        assert!(matches!(err, MigrationError::Transport(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_cancellation_between_polls() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job().times(1).returning(|_| Ok(running()));

        let token = CancellationToken::new();
        token.cancel();
        let resolver = resolver(mock).with_cancellation(token);

        let err = resolver
            .resolve(job(), PollPolicy::new(5, Duration::from_secs(60)))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_resolve_job_uses_table_policy() {
        let mut mock = MockErpTransport::new();
        mock.expect_poll_job().times(5).returning(|_| Ok(running()));

        let err = resolver(mock).resolve_job(job()).await.unwrap_err();
        assert!(matches!(err, MigrationError::JobTimedOut { attempts: 5, .. }));
    }
}
