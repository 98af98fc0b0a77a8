#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use dietmate_relay::services::{
    CompletionProvider, CompletionRequest, FragmentStream, InteractionLog, MemoryInteractionLog,
    MemorySetBackend, SetBackend,
};
use dietmate_relay::types::{ChatExchange, StoreError, UpstreamError};
use dietmate_relay::{AppState, Config};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

#[derive(Clone)]
pub enum Step {
    Fragment(&'static str),
    Fail(&'static str),
}

/// Completion provider that replays a fixed script of fragments and failures.
pub struct ScriptedProvider {
    steps: Vec<Step>,
    fail_on_connect: Option<&'static str>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn fragments(fragments: &[&'static str]) -> Self {
        Self::script(fragments.iter().copied().map(Step::Fragment).collect())
    }

    pub fn script(steps: Vec<Step>) -> Self {
        Self {
            steps,
            fail_on_connect: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn refusing(reason: &'static str) -> Self {
        Self {
            steps: Vec::new(),
            fail_on_connect: Some(reason),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, UpstreamError> {
        self.requests.lock().unwrap().push(request);
        if let Some(reason) = self.fail_on_connect {
            return Err(UpstreamError::Status {
                status: 503,
                body: reason.to_string(),
            });
        }
        let items: Vec<Result<String, UpstreamError>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Fragment(text) => Ok(text.to_string()),
                Step::Fail(reason) => Err(UpstreamError::Protocol(reason.to_string())),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Interaction log whose writes always fail.
pub struct BrokenLog;

#[async_trait]
impl InteractionLog for BrokenLog {
    async fn insert(&self, _record: ChatExchange) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("document store offline".to_string()))
    }

    async fn recent(&self, _session_id: &str, _limit: usize) -> Result<Vec<ChatExchange>, StoreError> {
        Ok(Vec::new())
    }
}

/// Set backend that rejects every call.
pub struct BrokenSets;

#[async_trait]
impl SetBackend for BrokenSets {
    async fn add(&self, _collection: &str, _member: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn members(&self, _collection: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

pub struct Harness {
    pub state: AppState,
    pub log: Arc<MemoryInteractionLog>,
    pub provider: Arc<ScriptedProvider>,
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "SECRET_KEY" => Some(SECRET.to_string()),
        "TOKEN_TTL_SECS" => Some("600".to_string()),
        "GROQ_GPT_MODEL" => Some("test-model".to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn harness(provider: ScriptedProvider) -> Harness {
    let log = Arc::new(MemoryInteractionLog::new());
    let provider = Arc::new(provider);
    let state = AppState::with_components(
        test_config(),
        provider.clone(),
        Arc::new(MemorySetBackend::new()),
        log.clone(),
    )
    .unwrap();
    Harness {
        state,
        log,
        provider,
    }
}

/// State around arbitrary collaborators, for failure-path tests.
pub fn state_with(
    provider: ScriptedProvider,
    sets: Arc<dyn SetBackend>,
    interactions: Arc<dyn InteractionLog>,
) -> AppState {
    AppState::with_components(test_config(), Arc::new(provider), sets, interactions).unwrap()
}

impl Harness {
    pub fn app(&self) -> axum::Router {
        dietmate_relay::create_app(self.state.clone())
    }

    /// Poll until the background persistence task has written `count` records.
    pub async fn wait_for_records(&self, count: usize) -> Vec<ChatExchange> {
        for _ in 0..100 {
            if self.log.len().await >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.log.records().await
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    post_raw(uri, token, body.to_string())
}

pub fn post_raw(uri: &str, token: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.into()).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
