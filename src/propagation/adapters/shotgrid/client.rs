//! ShotGrid REST v1 implementation of the tracking-service port.

use super::models::{
    AccessTokenResponse, RecordListResponse, SingleRecordResponse, StatusUpdateBody, collection,
    fields,
};
use crate::propagation::{
    domain::{EntityId, EntityRef, EntityType, StatusCode, StepName},
    ports::{TrackedEntity, TrackerError, TrackerResult, TrackingService},
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);
const SEARCH_PAGE_SIZE: u32 = 500;
const JSON_MEDIA_TYPE: &str = "application/json";
const ARRAY_FILTER_MEDIA_TYPE: &str = "application/vnd+shotgun.api3_array+json";

/// Connection settings for a ShotGrid site.
#[derive(Clone, PartialEq, Eq)]
pub struct ShotgridSettings {
    base_url: String,
    script_name: String,
    api_key: String,
    request_timeout: Duration,
}

impl ShotgridSettings {
    /// Creates settings for the site at `base_url` using script credentials.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        script_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            script_name: script_name.into(),
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the site URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the API script name.
    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for ShotgridSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShotgridSettings")
            .field("base_url", &self.base_url)
            .field("script_name", &self.script_name)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Grants longer than a day are capped; an unrepresentable expiry is treated
/// as already expired.
fn token_expiry(now: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in).min(MAX_TOKEN_LIFETIME);
    now.checked_add(lifetime).unwrap_or(now)
}

/// Tracking service backed by the ShotGrid REST API.
///
/// The access token is cached and shared by clones; it is refreshed shortly
/// before expiry and dropped whenever the site answers `401`.
#[derive(Clone)]
pub struct ShotgridTracker {
    settings: ShotgridSettings,
    client: reqwest::Client,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl fmt::Debug for ShotgridTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShotgridTracker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ShotgridTracker {
    /// Creates a tracker for the configured site.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(settings: ShotgridSettings) -> TrackerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(TrackerError::transport)?;
        Ok(Self {
            settings,
            client,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn settings(&self) -> &ShotgridSettings {
        &self.settings
    }

    async fn access_token(&self) -> TrackerResult<String> {
        if let Some(cached) = self.token.read().await.as_ref().filter(|t| t.is_fresh()) {
            return Ok(cached.value.clone());
        }

        let mut slot = self.token.write().await;
        if let Some(cached) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(cached.value.clone());
        }

        let response = self
            .client
            .post(self.settings.api_url("auth/access_token"))
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.settings.script_name.as_str()),
                ("client_secret", self.settings.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(send_error)?;
        let granted: AccessTokenResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;

        tracing::debug!(expires_in = granted.expires_in, "obtained ShotGrid access token");
        let token = CachedToken {
            value: granted.access_token,
            expires_at: token_expiry(Instant::now(), granted.expires_in),
        };
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> TrackerResult<reqwest::Response> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .send()
            .await
            .map_err(send_error)?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.token.write().await.take();
        }
        Ok(response)
    }
}

#[async_trait]
impl TrackingService for ShotgridTracker {
    async fn find_entity(&self, entity: EntityRef) -> TrackerResult<Option<TrackedEntity>> {
        let entity_type = entity.entity_type();
        let url = self.settings.api_url(&format!(
            "entity/{}/{}",
            collection(entity_type),
            entity.id()
        ));
        let request = self
            .client
            .get(url)
            .query(&[("fields", fields(entity_type))]);

        let response = self.execute(request).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(%entity, "entity not found in ShotGrid");
            return Ok(None);
        }
        let record: SingleRecordResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;
        TrackedEntity::try_from(record.data).map(Some)
    }

    async fn find_step_tasks(
        &self,
        shot: EntityId,
        steps: &[StepName],
    ) -> TrackerResult<Vec<TrackedEntity>> {
        if steps.is_empty() {
            return Ok(Vec::new());
        }
        let step_codes: Vec<&str> = steps.iter().map(StepName::as_str).collect();
        let body = serde_json::json!({
            "filters": [
                ["entity", "is", { "type": EntityType::Shot.as_str(), "id": shot.value() }],
                ["step.Step.code", "in", step_codes],
            ],
            "fields": fields(EntityType::Task),
            "page": { "size": SEARCH_PAGE_SIZE },
        });
        let payload = serde_json::to_vec(&body)
            .map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;
        let request = self
            .client
            .post(self.settings.api_url("entity/tasks/_search"))
            .header(CONTENT_TYPE, ARRAY_FILTER_MEDIA_TYPE)
            .body(payload);

        let response = self.execute(request).await?;
        let records: RecordListResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;
        records
            .data
            .into_iter()
            .map(TrackedEntity::try_from)
            .collect()
    }

    async fn update_status(&self, entity: EntityRef, status: &StatusCode) -> TrackerResult<()> {
        let url = self.settings.api_url(&format!(
            "entity/{}/{}",
            collection(entity.entity_type()),
            entity.id()
        ));
        let request = self.client.put(url).json(&StatusUpdateBody {
            sg_status_list: status.as_str(),
        });
        ensure_success(self.execute(request).await?).await?;
        Ok(())
    }
}

fn send_error(err: reqwest::Error) -> TrackerError {
    if err.is_timeout() {
        TrackerError::Timeout
    } else {
        TrackerError::transport(err)
    }
}

async fn ensure_success(response: reqwest::Response) -> TrackerResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|err| format!("unreadable error body: {err}"));
    Err(TrackerError::Rejected {
        status: status.as_u16(),
        message,
    })
}
