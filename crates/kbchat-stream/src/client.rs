use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use kbchat_core::config::ApiConfig;
use kbchat_core::error::{ChatError, Result};
use kbchat_core::types::{ApiEnvelope, ChatRequest};
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::classify::{classify, RawFailure};
use crate::observer::StreamObserver;
use crate::orchestrator::Orchestrator;
use crate::stream::StreamEvent;

pub const CHAT_STREAM_PATH: &str = "ollama/generate_stream";
pub const RAG_STREAM_PATH: &str = "ollama/generate_stream_rag";
pub const MODELS_PATH: &str = "ollama/models";
pub const RAG_TAGS_PATH: &str = "rag/query_rag_tag_list";

/// Everything needed to issue one streaming chat request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub endpoint: String,
    pub method: Method,
    pub body: ChatRequest,
    pub cancel: CancellationToken,
}

impl RequestDescriptor {
    /// Validate `body` and route it to the plain or knowledge-base endpoint.
    pub fn for_chat(
        api: &ApiConfig,
        body: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<Self> {
        body.validate()?;
        let path = if body.is_grounded() {
            RAG_STREAM_PATH
        } else {
            CHAT_STREAM_PATH
        };
        Ok(Self {
            endpoint: api.endpoint(path),
            method: Method::POST,
            body,
            cancel,
        })
    }
}

/// HTTP client for the knowledge-base chat backend.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api: ApiConfig,
    observer: Option<Arc<dyn StreamObserver>>,
}

impl ChatClient {
    pub fn new(api: ApiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), api)
    }

    pub fn with_client(client: reqwest::Client, api: ApiConfig) -> Self {
        Self {
            client,
            api,
            observer: None,
        }
    }

    /// Install a diagnostics hook on every stream this client starts.
    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Send `req` and stream the response as typed segments.
    ///
    /// Nothing happens until the returned stream is polled. Invalid input
    /// yields a single `Validation` error without touching the network;
    /// connection failures and non-2xx statuses yield a single classified
    /// error before any segment.
    pub fn stream_chat(
        &self,
        req: ChatRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StreamEvent>> + Send + 'static {
        let client = self.client.clone();
        let api = self.api.clone();
        let observer = self.observer.clone();

        async_stream::stream! {
            let desc = match RequestDescriptor::for_chat(&api, req, cancel) {
                Ok(desc) => desc,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let span = info_span!(
                "chat_stream",
                stream_id = %Uuid::new_v4(),
                model = %desc.body.model,
                rag_tag = desc.body.rag_tag.as_deref().unwrap_or("-"),
            );
            debug!(parent: &span, endpoint = %desc.endpoint, "sending streaming chat request");

            let send = client
                .request(desc.method.clone(), &desc.endpoint)
                .header(ACCEPT, "text/event-stream")
                .json(&desc.body)
                .send();

            let sent = tokio::select! {
                biased;
                _ = desc.cancel.cancelled() => None,
                result = send => Some(result),
            };

            let resp = match sent {
                None => {
                    debug!(parent: &span, "request cancelled before response");
                    yield Err(ChatError::cancelled());
                    return;
                }
                Some(Err(e)) => {
                    warn!(parent: &span, error = %e, "chat request failed");
                    yield Err(classify(RawFailure::Transport(e), Some(&desc.cancel)));
                    return;
                }
                Some(Ok(resp)) => resp,
            };

            let status = resp.status().as_u16();
            if !resp.status().is_success() {
                // the error body can stall like any other read
                let body = tokio::select! {
                    biased;
                    _ = desc.cancel.cancelled() => None,
                    body = resp.text() => Some(body.unwrap_or_default()),
                };
                let Some(body) = body else {
                    debug!(parent: &span, status, "request cancelled while reading error body");
                    yield Err(ChatError::cancelled());
                    return;
                };
                warn!(parent: &span, status, body = %body, "chat stream rejected");
                yield Err(classify(RawFailure::Status { status, body }, None));
                return;
            }

            let mut orchestrator = Orchestrator::new().with_span(span);
            if let Some(observer) = observer {
                orchestrator = orchestrator.with_observer(observer);
            }
            let events = orchestrator.run(resp.bytes_stream(), desc.cancel.clone());
            futures_util::pin_mut!(events);
            while let Some(item) = events.next().await {
                yield item;
            }
        }
    }

    /// Models the backend can serve.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let envelope: ApiEnvelope<Vec<String>> = self.get_envelope(MODELS_PATH).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Knowledge-base tags. Any failure degrades to an empty list so a
    /// missing backend never blocks plain chat.
    pub async fn list_rag_tags(&self) -> Vec<String> {
        match self.get_envelope::<Vec<String>>(RAG_TAGS_PATH).await {
            Ok(envelope) => envelope.data.unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, code = e.code(), "rag tag list unavailable, using empty list");
                Vec::new()
            }
        }
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiEnvelope<T>> {
        let url = self.api.endpoint(path);
        debug!(url = %url, "GET");

        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_millis(self.api.request_timeout_ms))
            .send()
            .await
            .map_err(|e| classify(RawFailure::Transport(e), None))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status, url = %url, "backend returned error status");
            return Err(classify(RawFailure::Status { status, body }, None));
        }

        let envelope: ApiEnvelope<T> = resp
            .json()
            .await
            .map_err(|e| classify(RawFailure::Transport(e), None))?;

        if !envelope.is_success() {
            warn!(code = %envelope.code, info = %envelope.info, "backend returned failure code");
            return Err(classify(
                RawFailure::Application {
                    code: envelope.code,
                    info: envelope.info,
                },
                None,
            ));
        }
        Ok(envelope)
    }
}
