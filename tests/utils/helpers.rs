/// Scripted destination transport and service builders for integration tests
use async_trait::async_trait;
use erp_migrate::modules::jobs::{JobHandle, JobState, PollPolicy, PollPolicyTable};
use erp_migrate::modules::transport::{ErpTransport, JobStatus, Link, LinkResponse, SubmitResponse};
use erp_migrate::{AppError, AppResult, MigrationConfig, MigrationOrchestrator, RecordKind};
use erp_migrate::shared::utils::init_logger;
use erp_migrate::ReferenceCache;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A write as the destination received it
#[derive(Debug, Clone)]
pub struct SubmittedWrite {
    pub kind: RecordKind,
    pub payload: Value,
}

#[derive(Default)]
struct Script {
    submits: HashMap<RecordKind, VecDeque<SubmitResponse>>,
    polls: HashMap<String, VecDeque<AppResult<JobStatus>>>,
    links: HashMap<String, LinkResponse>,
    entities: HashMap<(String, String), Value>,
    collections: HashMap<String, Vec<Value>>,
    failing_entities: HashMap<(String, String), String>,
}

#[derive(Default)]
struct Calls {
    submitted: Vec<SubmittedWrite>,
    polls: Vec<String>,
    followed: Vec<String>,
    fetched: Vec<(String, String)>,
}

/// In-memory `ErpTransport` that answers from a script and records calls
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    calls: Mutex<Calls>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(&self, kind: RecordKind, response: SubmitResponse) -> &Self {
        self.script
            .lock()
            .unwrap()
            .submits
            .entry(kind)
            .or_default()
            .push_back(response);
        self
    }

    /// Accept the next `kind` write as job `job_url`
    pub fn accept(&self, kind: RecordKind, job_url: &str) -> &Self {
        self.on_submit(kind, SubmitResponse::Accepted(JobHandle::new(job_url, kind)))
    }

    pub fn on_poll(&self, job_url: &str, status: AppResult<JobStatus>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .polls
            .entry(job_url.to_string())
            .or_default()
            .push_back(status);
        self
    }

    pub fn running(&self, job_url: &str, times: usize) -> &Self {
        for _ in 0..times {
            self.on_poll(job_url, Ok(JobStatus::new(JobState::Running, vec![])));
        }
        self
    }

    pub fn on_link(&self, url: &str, response: LinkResponse) -> &Self {
        self.script
            .lock()
            .unwrap()
            .links
            .insert(url.to_string(), response);
        self
    }

    /// Script a succeeded poll of `job_url` and the full link chain ending
    /// in `204 Location: record_location`
    pub fn succeed_job(&self, job_url: &str, record_location: &str) -> &Self {
        let task = format!("{}/task", job_url);
        let task_item = format!("{}/task/item/0", job_url);
        let related = format!("{}/related", job_url);

        self.on_poll(
            job_url,
            Ok(JobStatus::new(JobState::Succeeded, vec![Link::new("self", &task)])),
        );
        self.on_link(
            &task,
            LinkResponse::new(
                200,
                json!({"items": [{"links": [{"rel": "self", "href": task_item}]}]}),
            ),
        );
        self.on_link(
            &task_item,
            LinkResponse::new(200, json!({"links": [{"rel": "related", "href": related}]})),
        );
        self.on_link(&related, LinkResponse::no_content(record_location));
        self
    }

    pub fn with_entity(&self, kind: &str, id: &str, entity: Value) -> &Self {
        self.script
            .lock()
            .unwrap()
            .entities
            .insert((kind.to_string(), id.to_string()), entity);
        self
    }

    pub fn failing_entity(&self, kind: &str, id: &str, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .failing_entities
            .insert((kind.to_string(), id.to_string()), message.to_string());
        self
    }

    pub fn with_collection(&self, kind: &str, records: Vec<Value>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .collections
            .insert(kind.to_string(), records);
        self
    }

    pub fn submitted(&self) -> Vec<SubmittedWrite> {
        self.calls.lock().unwrap().submitted.clone()
    }

    pub fn submitted_of(&self, kind: RecordKind) -> Vec<SubmittedWrite> {
        self.submitted()
            .into_iter()
            .filter(|write| write.kind == kind)
            .collect()
    }

    pub fn poll_count(&self, job_url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .polls
            .iter()
            .filter(|url| url.as_str() == job_url)
            .count()
    }

    pub fn followed(&self) -> Vec<String> {
        self.calls.lock().unwrap().followed.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.lock().unwrap().fetched.len()
    }
}

#[async_trait]
impl ErpTransport for ScriptedTransport {
    async fn submit_write(&self, kind: RecordKind, payload: &Value) -> AppResult<SubmitResponse> {
        self.calls.lock().unwrap().submitted.push(SubmittedWrite {
            kind,
            payload: payload.clone(),
        });

        self.script
            .lock()
            .unwrap()
            .submits
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| AppError::Internal(format!("unscripted {} write", kind)))
    }

    async fn poll_job(&self, job: &JobHandle) -> AppResult<JobStatus> {
        self.calls.lock().unwrap().polls.push(job.poll_url.clone());

        self.script
            .lock()
            .unwrap()
            .polls
            .get_mut(&job.poll_url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(JobStatus::new(JobState::Running, vec![])))
    }

    async fn follow_link(&self, url: &str) -> AppResult<LinkResponse> {
        self.calls.lock().unwrap().followed.push(url.to_string());

        self.script
            .lock()
            .unwrap()
            .links
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("unscripted link {}", url)))
    }

    async fn fetch_entity(&self, kind: &str, id: &str) -> AppResult<Value> {
        let key = (kind.to_string(), id.to_string());
        self.calls.lock().unwrap().fetched.push(key.clone());

        let script = self.script.lock().unwrap();
        if let Some(message) = script.failing_entities.get(&key) {
            return Err(AppError::Unavailable(message.clone()));
        }
        script
            .entities
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind, id)))
    }

    async fn list_entities(&self, kind: &str) -> AppResult<Vec<Value>> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .collections
            .get(kind)
            .cloned()
            .unwrap_or_default())
    }
}

/// Polling with no delay so tests run instantly
pub fn fast_policies(max_attempts: u32) -> PollPolicyTable {
    PollPolicyTable::uniform(PollPolicy::new(max_attempts, Duration::ZERO))
}

pub fn test_config() -> MigrationConfig {
    let mut config = MigrationConfig::new("https://dest.example.com/services/rest");
    config.line_batch_size = 2;
    config.line_batch_pause = Duration::ZERO;
    config.max_concurrent_records = 3;
    config
}

/// Orchestrator over `transport` with instant polling
pub fn build_orchestrator(transport: Arc<ScriptedTransport>) -> MigrationOrchestrator {
    init_logger();
    MigrationOrchestrator::new(transport, Arc::new(ReferenceCache::new()), test_config())
        .with_poll_policies(fast_policies(5))
}
