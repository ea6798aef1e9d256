use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use mandi_agent::{AgentRuntime, MediaAttachment};
use mandi_core::errors::InterfaceError;
use mandi_db::TenantRepository;
use mandi_whatsapp::{InboundMessage, TwilioWebhookForm, TwimlReply, WebhookParseError, TWIML_CONTENT_TYPE};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

pub const WEBHOOK_PATH: &str = "/whatsapp/webhook";

#[derive(Clone)]
pub struct WebhookState {
    pub tenants: Arc<dyn TenantRepository>,
    pub runtime: AgentRuntime,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route(WEBHOOK_PATH, post(whatsapp_webhook)).with_state(state)
}

pub async fn whatsapp_webhook(
    State(state): State<WebhookState>,
    Form(form): Form<TwilioWebhookForm>,
) -> Response {
    let correlation_id = form.message_sid.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

    let message = match InboundMessage::from_form(form) {
        Ok(message) => message,
        Err(WebhookParseError::NotMedia { content_type }) => {
            info!(
                event_name = "server.webhook.ignored",
                correlation_id = %correlation_id,
                content_type = content_type.as_deref().unwrap_or("none"),
                "inbound message carries no usable media"
            );
            return Json(json!({"status": "ignored", "reason": "not_media"})).into_response();
        }
        Err(WebhookParseError::MissingSender) => {
            return error_response(InterfaceError::bad_request("Missing sender", correlation_id));
        }
    };

    let tenant = match state.tenants.find_by_phone(&message.sender).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => {
            info!(
                event_name = "server.webhook.unregistered_sender",
                correlation_id = %correlation_id,
                "message from unregistered number"
            );
            return Json(json!({"status": "error", "message": "User not registered"})).into_response();
        }
        Err(lookup_error) => {
            error!(
                event_name = "server.webhook.tenant_lookup_failed",
                correlation_id = %correlation_id,
                error = %lookup_error,
                "tenant lookup failed"
            );
            return error_response(InterfaceError::service_unavailable(
                "Tenant lookup failed",
                correlation_id,
            ));
        }
    };

    info!(
        event_name = "server.webhook.received",
        correlation_id = %correlation_id,
        tenant_id = %tenant.id,
        media_kind = message.media.kind.as_str(),
        "processing inbound media"
    );

    let media = MediaAttachment::new(message.media.url, message.media.content_type);
    let processed = state.runtime.handle_media(&tenant.id, &media, &correlation_id).await;

    (
        [(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)],
        TwimlReply::message(processed.reply).render(),
    )
        .into_response()
}

fn error_response(error: InterfaceError) -> Response {
    let status = match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    let body = json!({
        "status": "error",
        "message": error.message(),
        "correlation_id": error.correlation_id(),
    });
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use mandi_agent::{AgentRuntime, ExtractionError, IntentExtractor, IntentRouter, MediaAttachment};
    use mandi_core::ledger::InventoryLedger;
    use mandi_core::domain::tenant::{Tenant, TenantId};
    use mandi_core::store::InMemoryLedgerStore;
    use mandi_db::{InMemoryTenantRepository, RepositoryError, TenantRepository};
    use tower::ServiceExt;

    use super::{router, WebhookState, WEBHOOK_PATH};

    struct UnreachableTenants;

    #[async_trait]
    impl TenantRepository for UnreachableTenants {
        async fn find_by_phone(&self, _phone_number: &str) -> Result<Option<Tenant>, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolClosed))
        }

        async fn find_by_id(&self, _id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolClosed))
        }

        async fn create(
            &self,
            _phone_number: &str,
            _business_name: Option<&str>,
        ) -> Result<Tenant, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolClosed))
        }
    }

    struct FixedExtractor(&'static str);

    #[async_trait]
    impl IntentExtractor for FixedExtractor {
        async fn extract(&self, _media: &MediaAttachment) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    async fn app(extracted: &'static str) -> Router {
        let tenants = Arc::new(InMemoryTenantRepository::new());
        tenants.create("+923001234567", Some("Ali Traders")).await.expect("register tenant");
        let ledger = InventoryLedger::new(Arc::new(InMemoryLedgerStore::new()));
        router(WebhookState {
            tenants,
            runtime: AgentRuntime::new(
                Arc::new(FixedExtractor(extracted)),
                IntentRouter::new(ledger),
                Duration::from_secs(5),
            ),
        })
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(WEBHOOK_PATH)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    const VOICE_NOTE: &str = "From=whatsapp%3A%2B923001234567&MessageSid=SM1&NumMedia=1\
        &MediaUrl0=https%3A%2F%2Fapi.twilio.com%2FMedia%2FME1&MediaContentType0=audio%2Fogg";

    #[tokio::test]
    async fn text_only_message_is_ignored() {
        let app = app("{}").await;

        let response = app
            .oneshot(form_request("From=whatsapp%3A%2B923001234567&Body=hello&NumMedia=0"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload: serde_json::Value = serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(payload, serde_json::json!({"status": "ignored", "reason": "not_media"}));
    }

    #[tokio::test]
    async fn unknown_sender_is_rejected() {
        let app = app("{}").await;
        let body = VOICE_NOTE.replace("923001234567", "923009999999");

        let response = app.oneshot(form_request(&body)).await.expect("response");

        let payload: serde_json::Value = serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(payload, serde_json::json!({"status": "error", "message": "User not registered"}));
    }

    #[tokio::test]
    async fn voice_note_from_tenant_gets_twiml_confirmation() {
        let app = app(r#"{"intent":"UPDATE","item_name":"Onion","quantity":12,"unit":"bori","action":"IN",
                         "summary_for_user":"12 bori pyaaz <jama> & save"}"#)
        .await;

        let response = app.oneshot(form_request(VOICE_NOTE)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok()),
            Some("application/xml")
        );
        let body = body_text(response).await;
        assert!(body.contains("<Response><Message>12 bori pyaaz &lt;jama&gt; &amp; save</Message></Response>"));
    }

    #[tokio::test]
    async fn failed_intent_still_replies_with_error_note() {
        let app = app(r#"{"intent":"UPDATE","item_name":"Onion","quantity":12,"action":"SIDEWAYS"}"#).await;

        let response = app.oneshot(form_request(VOICE_NOTE)).await.expect("response");

        let body = body_text(response).await;
        assert!(body.contains("Done: Onion 12 SIDEWAYS (System error: Unknown stock action: SIDEWAYS)"));
    }

    #[tokio::test]
    async fn tenant_lookup_failure_is_retryable_and_carries_correlation_id() {
        let ledger = InventoryLedger::new(Arc::new(InMemoryLedgerStore::new()));
        let app = router(WebhookState {
            tenants: Arc::new(UnreachableTenants),
            runtime: AgentRuntime::new(
                Arc::new(FixedExtractor("{}")),
                IntentRouter::new(ledger),
                Duration::from_secs(5),
            ),
        });

        let response = app.oneshot(form_request(VOICE_NOTE)).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let payload: serde_json::Value = serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(
            payload,
            serde_json::json!({"status": "error", "message": "Tenant lookup failed", "correlation_id": "SM1"})
        );
    }

    #[tokio::test]
    async fn media_without_sender_is_a_bad_request() {
        let app = app("{}").await;
        let body = VOICE_NOTE.replace("From=whatsapp%3A%2B923001234567&", "");

        let response = app.oneshot(form_request(&body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload: serde_json::Value = serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(payload["message"], "Missing sender");
        assert_eq!(payload["correlation_id"], "SM1");
    }

    #[tokio::test]
    async fn registered_tenant_lookup_uses_bare_number() {
        let tenants = InMemoryTenantRepository::new();
        let created = tenants.create("whatsapp:+923001234567", None).await.expect("create");
        let found = tenants.find_by_phone("+923001234567").await.expect("lookup");
        assert_eq!(found.map(|tenant| tenant.id), Some(created.id));
    }
}
