use crate::config::Config;
use crate::services::{
    CompletionProvider, GroqProvider, InteractionLog, JsonlInteractionLog, KeyedSetStore,
    MemoryInteractionLog, MemorySetBackend, RelayMetrics, SetBackend, StreamingRelay,
    TokenService,
};
use anyhow::Result;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub sets: Arc<KeyedSetStore>,
    pub relay: Arc<StreamingRelay>,
    pub interactions: Arc<dyn InteractionLog>,
    pub metrics: Arc<RelayMetrics>,
}

impl AppState {
    /// Wire the production components described by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        tracing::info!("[STATE] Initializing AppState...");
        tracing::info!("[STATE]   Upstream: {}", config.upstream.api_base);
        tracing::info!("[STATE]   Model: {}", config.upstream.model);

        let provider: Arc<dyn CompletionProvider> = Arc::new(GroqProvider::new(&config.upstream)?);

        let interactions: Arc<dyn InteractionLog> = match &config.interaction_log_path {
            Some(path) => Arc::new(JsonlInteractionLog::open(path).await?),
            None => {
                tracing::info!("[STATE]   Interaction log: in-memory");
                Arc::new(MemoryInteractionLog::new())
            }
        };

        Self::with_components(
            config,
            provider,
            Arc::new(MemorySetBackend::new()),
            interactions,
        )
    }

    /// Assemble state around explicit collaborators.
    pub fn with_components(
        config: Config,
        provider: Arc<dyn CompletionProvider>,
        set_backend: Arc<dyn SetBackend>,
        interactions: Arc<dyn InteractionLog>,
    ) -> Result<Self> {
        let metrics = Arc::new(RelayMetrics::new());
        let tokens = TokenService::new(&config.secret_key, config.token_ttl)?;
        let relay = StreamingRelay::new(&config, provider, interactions.clone(), metrics.clone())?;

        Ok(Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            sets: Arc::new(KeyedSetStore::new(set_backend)),
            relay: Arc::new(relay),
            interactions,
            metrics,
        })
    }
}
