use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use payment_sessions_api::config::PolicyConfig;
use payment_sessions_api::events::{process_events, EventSender};
use payment_sessions_api::gateway::SecurityGateway;
use payment_sessions_api::handlers::app_router;
use payment_sessions_api::models::{CardDetails, CreateSessionRequest, PaymentSession};
use payment_sessions_api::service::SessionService;
use payment_sessions_api::settlement::{
    MockSettlementProcessor, SettlementError, SettlementOutcome, SettlementProcessor,
};
use payment_sessions_api::store::SessionStore;
use payment_sessions_api::tokenization::{CardToken, CardTokenizer};
use payment_sessions_api::AppState;

pub const TEST_TOKEN_SECRET: &str = "test-secret-key-for-testing-purposes-only";

/// Mirrors the shipped policy defaults.
pub fn test_policy() -> PolicyConfig {
    PolicyConfig::default()
}

/// Policy whose sessions are expired the moment they are created.
#[allow(dead_code)]
pub fn instant_expiry_policy() -> PolicyConfig {
    PolicyConfig {
        session_ttl_minutes: 0,
        ..PolicyConfig::default()
    }
}

/// Settlement stub that declines every payment with a fixed reason.
#[allow(dead_code)]
pub struct DecliningProcessor;

#[async_trait]
impl SettlementProcessor for DecliningProcessor {
    async fn settle(
        &self,
        _session: &PaymentSession,
        _card: &CardToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        Ok(SettlementOutcome::Declined {
            reason: "card declined by issuer".to_string(),
        })
    }
}

/// Settlement stub that never reaches a definitive outcome.
#[allow(dead_code)]
pub struct TransportErrorProcessor;

#[async_trait]
impl SettlementProcessor for TransportErrorProcessor {
    async fn settle(
        &self,
        _session: &PaymentSession,
        _card: &CardToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        Err(SettlementError::Transport("connection reset".to_string()))
    }
}

/// Settlement stub that holds every call until `parties` calls have arrived,
/// then approves them all at once. Guarantees the callers overlap.
#[allow(dead_code)]
pub struct RendezvousProcessor {
    barrier: tokio::sync::Barrier,
}

#[allow(dead_code)]
impl RendezvousProcessor {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: tokio::sync::Barrier::new(parties),
        }
    }
}

#[async_trait]
impl SettlementProcessor for RendezvousProcessor {
    async fn settle(
        &self,
        _session: &PaymentSession,
        _card: &CardToken,
    ) -> Result<SettlementOutcome, SettlementError> {
        self.barrier.wait().await;
        Ok(SettlementOutcome::Approved {
            transaction_id: Uuid::new_v4().to_string(),
        })
    }
}

/// Harness wiring the full stack over a fresh in-memory store.
pub struct TestApp {
    router: Router,
    #[allow(dead_code)]
    pub store: Arc<SessionStore>,
    #[allow(dead_code)]
    pub gateway: Arc<SecurityGateway>,
    #[allow(dead_code)]
    pub service: Arc<SessionService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(test_policy(), Arc::new(MockSettlementProcessor))
    }

    #[allow(dead_code)]
    pub fn with_policy(policy: PolicyConfig) -> Self {
        Self::with_parts(policy, Arc::new(MockSettlementProcessor))
    }

    #[allow(dead_code)]
    pub fn with_processor(settlement: Arc<dyn SettlementProcessor>) -> Self {
        Self::with_parts(test_policy(), settlement)
    }

    pub fn with_parts(policy: PolicyConfig, settlement: Arc<dyn SettlementProcessor>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(process_events(event_rx));
        let events = EventSender::new(event_tx);

        let store = Arc::new(SessionStore::new(policy.session_ttl(), policy.max_retries));
        let service = Arc::new(SessionService::new(
            Arc::clone(&store),
            settlement,
            events,
            policy,
        ));
        let tokenizer = CardTokenizer::new(TEST_TOKEN_SECRET);
        let gateway = Arc::new(SecurityGateway::new(Arc::clone(&service), tokenizer));

        let state = AppState {
            gateway: Arc::clone(&gateway),
            store: Arc::clone(&store),
        };
        let router = app_router(state);

        Self {
            router,
            store,
            gateway,
            service,
            _event_task: event_task,
        }
    }

    /// Create a session through the gateway and return its snapshot.
    #[allow(dead_code)]
    pub async fn create_session(&self, amount: Decimal, currency: &str) -> PaymentSession {
        self.gateway
            .create_session(CreateSessionRequest {
                amount,
                currency: currency.to_string(),
            })
            .await
            .expect("session creation failed in test setup")
    }

    /// Send a request against the router, optionally with a JSON body.
    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// A card that passes every gateway check.
#[allow(dead_code)]
pub fn valid_card() -> CardDetails {
    CardDetails {
        card_number: "4111 1111 1111 1111".to_string(),
        cvv: "123".to_string(),
        expiry_month: 12,
        expiry_year: 2035,
        holder_name: "Ada Lovelace".to_string(),
    }
}

/// JSON body equivalent of [`valid_card`].
#[allow(dead_code)]
pub fn valid_card_json() -> Value {
    json!({
        "card_number": "4111 1111 1111 1111",
        "cvv": "123",
        "expiry_month": 12,
        "expiry_year": 2035,
        "holder_name": "Ada Lovelace",
    })
}

#[allow(dead_code)]
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body was not valid json")
}

#[allow(dead_code)]
pub async fn response_text(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("response body was not utf-8")
}
