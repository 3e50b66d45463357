//! Shared world state for status propagation BDD scenarios.

use std::sync::Arc;

use camino::Utf8Path;
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::Value;
use statusflow::{
    config::load_mapping_table,
    propagation::{
        adapters::memory::InMemoryTracker,
        domain::{EntityId, StatusCode},
    },
    webhook::{
        domain::{SignatureVerifier, WebhookResponse},
        services::{WebhookRequest, WebhookService},
    },
};

/// Service type used by the BDD world.
pub type TestWebhookService = WebhookService<InMemoryTracker, DefaultClock>;

/// Secret shared by the world's signer and service.
pub const SECRET: &str = "scenario-secret";

/// Scenario world for status propagation behaviour tests.
pub struct PropagationWorld {
    /// The webhook service under test.
    pub service: TestWebhookService,
    /// Tracker seeded by `Given` steps and inspected by `Then` steps.
    pub tracker: Arc<InMemoryTracker>,
    /// Signs request bodies.
    pub verifier: SignatureVerifier,
    /// Response to the last delivered webhook.
    pub last_response: Option<WebhookResponse>,
}

impl PropagationWorld {
    /// Creates a world over the shipped mapping document and an empty
    /// tracker.
    ///
    /// # Panics
    ///
    /// Panics when the shipped mapping document does not load.
    #[must_use]
    pub fn new() -> Self {
        let path = Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("config/status_mapping.yaml");
        let table = load_mapping_table(&path).expect("shipped mapping should load");
        let tracker = Arc::new(InMemoryTracker::new());
        let verifier = SignatureVerifier::new(SECRET).expect("secret should key the MAC");
        let service = WebhookService::new(
            verifier.clone(),
            Arc::new(table),
            Arc::clone(&tracker),
            Arc::new(DefaultClock),
        );
        Self {
            service,
            tracker,
            verifier,
            last_response: None,
        }
    }

    /// Delivers `payload` to `path`, signing it when `signed` is set.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload cannot be serialized.
    pub fn deliver(&mut self, path: &str, payload: &Value, signed: bool) -> eyre::Result<()> {
        let body = serde_json::to_vec(payload)?;
        let signature = signed.then(|| self.verifier.sign(&body));
        let request = WebhookRequest::new(path, signature, body);
        self.last_response = Some(run_async(self.service.respond(&request)));
        Ok(())
    }

    /// Returns the last response.
    ///
    /// # Errors
    ///
    /// Returns an error when no webhook has been delivered yet.
    pub fn response(&self) -> eyre::Result<&WebhookResponse> {
        self.last_response
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no webhook delivered in scenario world"))
    }
}

impl Default for PropagationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> PropagationWorld {
    PropagationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Parses a positive entity id from a step argument.
///
/// # Errors
///
/// Returns an error when `value` is zero.
pub fn entity_id(value: u64) -> eyre::Result<EntityId> {
    Ok(EntityId::new(value)?)
}

/// Parses a status code from a step argument.
///
/// # Errors
///
/// Returns an error when `value` is not a valid status code.
pub fn status_code(value: &str) -> eyre::Result<StatusCode> {
    Ok(StatusCode::new(value)?)
}
