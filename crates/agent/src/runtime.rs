use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use mandi_core::domain::tenant::TenantId;

use crate::extraction::{ExtractionError, IntentExtractor, MediaAttachment};
use crate::intent::IntentEnvelope;
use crate::reply::compose_reply;
use crate::router::{IntentRouter, RouterResult};

/// Everything produced for one inbound message.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedMessage {
    pub reply: String,
    pub envelope: IntentEnvelope,
    pub result: RouterResult,
}

/// Media in, confirmation text out: extract, decode, route, compose.
#[derive(Clone)]
pub struct AgentRuntime {
    extractor: Arc<dyn IntentExtractor>,
    router: IntentRouter,
    timeout: Duration,
}

impl AgentRuntime {
    pub fn new(extractor: Arc<dyn IntentExtractor>, router: IntentRouter, timeout: Duration) -> Self {
        Self { extractor, router, timeout }
    }

    pub async fn handle_media(
        &self,
        tenant_id: &TenantId,
        media: &MediaAttachment,
        correlation_id: &str,
    ) -> ProcessedMessage {
        let extracted = match tokio::time::timeout(self.timeout, self.extractor.extract(media)).await {
            Ok(extracted) => extracted,
            Err(_) => Err(ExtractionError::Timeout(self.timeout)),
        };

        match extracted {
            Ok(raw) => self.handle_extracted(tenant_id, &raw, correlation_id).await,
            Err(error) => {
                warn!(
                    event_name = "agent.extraction.failed",
                    correlation_id,
                    tenant_id = %tenant_id.0,
                    content_type = %media.content_type,
                    error = %error,
                    "intent extraction failed"
                );
                unprocessed(RouterResult::failure(error.to_string()))
            }
        }
    }

    /// Routes already-extracted model text. Used directly when the model call happened elsewhere.
    pub async fn handle_extracted(&self, tenant_id: &TenantId, raw: &str, correlation_id: &str) -> ProcessedMessage {
        let envelope = match IntentEnvelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(
                    event_name = "agent.intent.unparseable",
                    correlation_id,
                    tenant_id = %tenant_id.0,
                    error = %error,
                    "model output could not be decoded"
                );
                return unprocessed(RouterResult::failure(error.to_string()));
            }
        };

        let result = self.router.route(tenant_id, &envelope.intent).await;
        let reply = compose_reply(&envelope, &result);

        info!(
            event_name = "agent.message.processed",
            correlation_id,
            tenant_id = %tenant_id.0,
            intent = envelope.intent.kind(),
            success = result.is_success(),
            "message processed"
        );

        ProcessedMessage { reply, envelope, result }
    }
}

fn unprocessed(result: RouterResult) -> ProcessedMessage {
    let envelope = IntentEnvelope::unknown();
    let reply = compose_reply(&envelope, &result);
    ProcessedMessage { reply, envelope, result }
}
