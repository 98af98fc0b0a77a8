//! Upstream completion relay
//!
//! [`StreamingRelay::open`] calls the provider and waits for the first
//! fragment, so a failure before any output surfaces as an `Err` the caller
//! can turn into an error response. [`RelayStream::forward`] then yields
//! every fragment as soon as it arrives while a [`TranscriptGuard`]
//! accumulates it for the completion hook.

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;

use super::transcript::{CompletionHook, TranscriptGuard};
use crate::config::Config;
use crate::services::interaction_log::InteractionLog;
use crate::services::metrics::RelayMetrics;
use crate::services::prompt::PromptTemplates;
use crate::services::upstream::{CompletionProvider, CompletionRequest, FragmentStream, PromptMessage};
use crate::types::{StreamOutcome, UpstreamError};

/// One user turn as received by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatTurn {
    pub session_id: String,
    pub message: String,
    pub file_name: String,
    pub file_content: String,
}

#[derive(Debug, Clone)]
struct RelaySettings {
    model: String,
    temperature: f32,
    max_tokens: u32,
    history_limit: usize,
}

pub struct StreamingRelay {
    provider: Arc<dyn CompletionProvider>,
    history: Arc<dyn InteractionLog>,
    prompts: PromptTemplates,
    settings: RelaySettings,
    metrics: Arc<RelayMetrics>,
}

impl StreamingRelay {
    pub fn new(
        config: &Config,
        provider: Arc<dyn CompletionProvider>,
        history: Arc<dyn InteractionLog>,
        metrics: Arc<RelayMetrics>,
    ) -> anyhow::Result<Self> {
        let prompts = PromptTemplates::new(
            &config.system_prompt,
            config.max_attachment_chars,
            config.template_dir.as_deref(),
        )?;
        Ok(Self {
            provider,
            history,
            prompts,
            settings: RelaySettings {
                model: config.upstream.model.clone(),
                temperature: config.upstream.temperature,
                max_tokens: config.upstream.max_tokens,
                history_limit: config.history_limit,
            },
            metrics,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// System prompt, recent session history, then the rendered user turn.
    pub async fn build_request(&self, turn: &ChatTurn) -> Result<CompletionRequest, UpstreamError> {
        let mut messages = vec![PromptMessage::system(self.prompts.render_system()?)];

        if self.settings.history_limit > 0 {
            match self
                .history
                .recent(&turn.session_id, self.settings.history_limit)
                .await
            {
                Ok(previous) => {
                    for exchange in previous {
                        messages.push(PromptMessage::user(exchange.user_message));
                        if !exchange.bot_message.is_empty() {
                            messages.push(PromptMessage::assistant(exchange.bot_message));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not load session history, continuing without it");
                }
            }
        }

        messages.push(PromptMessage::user(self.prompts.render_user_turn(
            &turn.message,
            &turn.file_name,
            &turn.file_content,
        )?));

        Ok(CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream: true,
        })
    }

    /// Arm `on_close`, call the provider and wait for the first fragment.
    ///
    /// A failure before any output disarms the hook and comes back as `Err`;
    /// no exchange is recorded for it. If this future is dropped while
    /// waiting, the hook fires as a client abort.
    pub async fn open(
        &self,
        turn: &ChatTurn,
        on_close: CompletionHook,
    ) -> Result<RelayStream, UpstreamError> {
        let guard = TranscriptGuard::new(on_close);
        match self.open_inner(turn).await {
            Ok((head, tail)) => Ok(RelayStream {
                head,
                tail,
                guard,
                metrics: self.metrics.clone(),
            }),
            Err(e) => {
                guard.disarm();
                self.metrics.record_upstream_failure();
                Err(e)
            }
        }
    }

    async fn open_inner(
        &self,
        turn: &ChatTurn,
    ) -> Result<(Option<String>, FragmentStream), UpstreamError> {
        let request = self.build_request(turn).await?;
        let mut tail = self.provider.stream_completion(request).await?;

        let head = match tail.next().await {
            Some(Ok(fragment)) => Some(fragment),
            Some(Err(e)) => return Err(e),
            None => None,
        };

        self.metrics.record_stream_opened();
        tracing::info!(session_id = %turn.session_id, "📡 relay stream opened");
        Ok((head, tail))
    }
}

/// An opened upstream stream whose first fragment is already in hand.
///
/// Owns the armed [`TranscriptGuard`], so dropping it at any point, polled
/// or not, still closes the transcript exactly once.
pub struct RelayStream {
    head: Option<String>,
    tail: FragmentStream,
    guard: TranscriptGuard,
    metrics: Arc<RelayMetrics>,
}

impl RelayStream {
    /// Body stream for the HTTP response. Fragments are yielded as they arrive.
    pub fn forward(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let RelayStream {
            head,
            mut tail,
            mut guard,
            metrics,
        } = self;

        // `guard` moves into the stream state here, before the first poll.
        async_stream::stream! {
            if let Some(fragment) = head.filter(|f| !f.is_empty()) {
                guard.push(&fragment);
                metrics.record_fragment();
                yield Ok(Bytes::from(fragment));
            }

            loop {
                match tail.next().await {
                    Some(Ok(fragment)) => {
                        if fragment.is_empty() {
                            continue;
                        }
                        guard.push(&fragment);
                        metrics.record_fragment();
                        yield Ok(Bytes::from(fragment));
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "upstream failed mid-stream, closing early");
                        guard.finish(StreamOutcome::UpstreamError);
                        break;
                    }
                    None => {
                        guard.finish(StreamOutcome::Completed);
                        break;
                    }
                }
            }
        }
    }
}
