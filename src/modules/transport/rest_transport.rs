//! `ErpTransport` over the destination's REST record API
//!
//! Writes are submitted with `Prefer: respond-async`. The destination answers
//! 202 with the job URL in `Location`, 204 when it completed synchronously, or
//! a 4xx problem document.

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::{json, Value};

use super::http_client::{RateLimitClient, RawResponse, Replay};
use super::traits::ErpTransport;
use super::types::{JobStatus, LinkResponse, SubmitResponse};
use crate::modules::jobs::domain::{JobHandle, ResolvedLocation};
use crate::shared::config::MigrationConfig;
use crate::shared::domain::RecordKind;
use crate::shared::errors::{AppError, AppResult};

/// Page size for collection reads
const LIST_PAGE_SIZE: usize = 1000;

pub struct RestTransport {
    http_client: RateLimitClient,
    base_url: Url,
}

impl RestTransport {
    pub fn new(config: &MigrationConfig) -> AppResult<Self> {
        // Trailing slash so relative joins keep the REST root
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))
            .map_err(|e| {
                AppError::Config(format!("Invalid base URL '{}': {}", config.base_url, e))
            })?;

        Ok(Self {
            http_client: RateLimitClient::from_config(config),
            base_url,
        })
    }

    /// Resolve an href from a links array against the REST root
    pub fn resolve_href(&self, href: &str) -> AppResult<Url> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Url::parse(href)
                .map_err(|e| AppError::InvalidUrl(format!("Invalid href '{}': {}", href, e)));
        }

        let joined = if href.starts_with('/') {
            self.base_url.join(href)
        } else {
            self.base_url.join(href.trim_start_matches("./"))
        };
        joined.map_err(|e| AppError::InvalidUrl(format!("Invalid href '{}': {}", href, e)))
    }

    fn record_url(&self, kind: &str, id: Option<&str>) -> AppResult<Url> {
        let path = match id {
            Some(id) => format!("record/v1/{}/{}", kind, id),
            None => format!("record/v1/{}", kind),
        };
        self.base_url
            .join(&path)
            .map_err(|e| AppError::InvalidUrl(format!("Invalid record path '{}': {}", path, e)))
    }

    fn expect_success(response: RawResponse, what: &str) -> AppResult<Value> {
        match response.status {
            200..=299 => Ok(response.body),
            404 => Err(AppError::NotFound(format!("{} not found", what))),
            status => Err(AppError::UnexpectedResponse(format!(
                "HTTP {} while reading {}: {}",
                status, what, response.body
            ))),
        }
    }
}

#[async_trait]
impl ErpTransport for RestTransport {
    async fn submit_write(&self, kind: RecordKind, payload: &Value) -> AppResult<SubmitResponse> {
        let url = self.record_url(kind.as_str(), None)?;
        let response = self
            .http_client
            .send(Method::POST, url.as_str(), Some(payload), true, Replay::RefusedOnly)
            .await?;

        match response.status {
            202 => {
                let location = response.location.ok_or_else(|| {
                    AppError::Decode(format!(
                        "Destination accepted {} write without a job Location",
                        kind
                    ))
                })?;
                let poll_url = self.resolve_href(&location)?;
                log::debug!("{} write accepted as job {}", kind, poll_url);
                Ok(SubmitResponse::Accepted(JobHandle::new(poll_url.as_str(), kind)))
            }
            204 => {
                let location = response.location.unwrap_or_default();
                let id = ResolvedLocation::from_location_header(&location)
                    .map(|resolved| resolved.internal_id)
                    .ok();
                Ok(SubmitResponse::Complete(json!({ "id": id, "location": location })))
            }
            200 | 201 => Ok(SubmitResponse::Complete(response.body)),
            400..=499 => Ok(SubmitResponse::Rejected(response.body)),
            status => Err(AppError::UnexpectedResponse(format!(
                "Unexpected HTTP {} submitting {}",
                status, kind
            ))),
        }
    }

    /// Single attempt; `AsyncJobResolver` owns the polling budget
    async fn poll_job(&self, job: &JobHandle) -> AppResult<JobStatus> {
        let url = self.resolve_href(&job.poll_url)?;
        let response = self
            .http_client
            .send(Method::GET, url.as_str(), None, false, Replay::Never)
            .await?;
        let body = Self::expect_success(response, &format!("job {}", job.poll_url))?;
        JobStatus::from_body(body)
    }

    async fn follow_link(&self, url: &str) -> AppResult<LinkResponse> {
        let url = self.resolve_href(url)?;
        let response = self
            .http_client
            .send(Method::GET, url.as_str(), None, false, Replay::Idempotent)
            .await?;

        Ok(LinkResponse {
            status: response.status,
            location: response.location,
            body: response.body,
        })
    }

    async fn fetch_entity(&self, kind: &str, id: &str) -> AppResult<Value> {
        let mut url = self.record_url(kind, Some(id))?;
        url.query_pairs_mut().append_pair("expandSubResources", "true");

        let response = self
            .http_client
            .send(Method::GET, url.as_str(), None, false, Replay::Idempotent)
            .await?;
        Self::expect_success(response, &format!("{} {}", kind, id))
    }

    async fn list_entities(&self, kind: &str) -> AppResult<Vec<Value>> {
        let mut ids = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut url = self.record_url(kind, None)?;
            url.query_pairs_mut()
                .append_pair("limit", &LIST_PAGE_SIZE.to_string())
                .append_pair("offset", &offset.to_string());

            let response = self
                .http_client
                .send(Method::GET, url.as_str(), None, false, Replay::Idempotent)
                .await?;
            let page = Self::expect_success(response, &format!("{} collection", kind))?;

            let items = page
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            ids.extend(items.iter().filter_map(|item| {
                crate::shared::domain::value_objects::scalar_to_string(item.get("id")?)
            }));

            let has_more = page.get("hasMore").and_then(Value::as_bool).unwrap_or(false);
            if !has_more || items.is_empty() {
                break;
            }
            offset += items.len();
        }

        log::debug!("Listing {} {} entities", ids.len(), kind);

        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            entities.push(self.fetch_entity(kind, &id).await?);
        }
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> RestTransport {
        RestTransport::new(&MigrationConfig::new("https://acct.example.com/services/rest")).unwrap()
    }

    #[test]
    fn test_resolve_relative_href() {
        let transport = transport();
        assert_eq!(
            transport.resolve_href("/task/1").unwrap().as_str(),
            "https://acct.example.com/task/1"
        );
        assert_eq!(
            transport.resolve_href("async/v1/job/7").unwrap().as_str(),
            "https://acct.example.com/services/rest/async/v1/job/7"
        );
    }

    #[test]
    fn test_resolve_absolute_href() {
        let transport = transport();
        assert_eq!(
            transport
                .resolve_href("https://other.example.com/record/42")
                .unwrap()
                .as_str(),
            "https://other.example.com/record/42"
        );
    }

    #[test]
    fn test_record_url() {
        let transport = transport();
        assert_eq!(
            transport.record_url("vendorBill", Some("eid:VB-9")).unwrap().as_str(),
            "https://acct.example.com/services/rest/record/v1/vendorBill/eid:VB-9"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(RestTransport::new(&MigrationConfig::new("not a url")).is_err());
    }
}
