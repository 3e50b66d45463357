//! Webhook request pipeline.
//!
//! Every request runs verify → parse → route → enrich → resolve → dispatch →
//! acknowledge inside a span tagged with a fresh request id. Nothing is
//! retried; ShotGrid redelivers on non-2xx responses.

use crate::propagation::{
    domain::{
        EntityId, EntityRef, StatusEvent, StatusMappingTable, StepName, TaskStatusChange,
        VersionCreation, VersionStatusChange,
    },
    ports::{TrackedEntity, TrackingService},
    services::{PropagationDispatcher, RuleResolver},
};
use crate::webhook::domain::{
    RequestStage, STATUS_ATTRIBUTE, SignatureVerifier, WebhookAck, WebhookEnvelope, WebhookError,
    WebhookResponse, WebhookRoute,
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Raw inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    path: String,
    signature: Option<String>,
    body: Vec<u8>,
}

impl WebhookRequest {
    /// Creates a request for `path` with an optional signature header.
    #[must_use]
    pub fn new(path: impl Into<String>, signature: Option<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            signature,
            body: body.into(),
        }
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the signature header value.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Handles verified webhooks against a tracking service.
pub struct WebhookService<T, C>
where
    T: TrackingService,
    C: Clock + Send + Sync,
{
    verifier: SignatureVerifier,
    resolver: RuleResolver,
    dispatcher: PropagationDispatcher<T>,
    tracker: Arc<T>,
    clock: Arc<C>,
}

impl<T, C> Clone for WebhookService<T, C>
where
    T: TrackingService,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            verifier: self.verifier.clone(),
            resolver: self.resolver.clone(),
            dispatcher: self.dispatcher.clone(),
            tracker: Arc::clone(&self.tracker),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T, C> WebhookService<T, C>
where
    T: TrackingService,
    C: Clock + Send + Sync,
{
    /// Creates a service over `table` and `tracker`.
    #[must_use]
    pub fn new(
        verifier: SignatureVerifier,
        table: Arc<StatusMappingTable>,
        tracker: Arc<T>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            verifier,
            resolver: RuleResolver::new(table),
            dispatcher: PropagationDispatcher::new(Arc::clone(&tracker)),
            tracker,
            clock,
        }
    }

    /// Bounds each dispatch to `timeout`.
    #[must_use]
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatcher = self.dispatcher.with_timeout(timeout);
        self
    }

    /// Handles `request` and renders the `(status, body)` response.
    pub async fn respond(&self, request: &WebhookRequest) -> WebhookResponse {
        match self.handle(request).await {
            Ok(ack) => WebhookResponse::acknowledged(&ack),
            Err(err) => WebhookResponse::rejected(&err),
        }
    }

    /// Handles `request`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] when the signature is rejected, the payload
    /// is malformed, the route is unknown, or a tracker read needed for
    /// context fails. Dispatch failures are reported in the acknowledgement
    /// instead.
    pub async fn handle(&self, request: &WebhookRequest) -> Result<WebhookAck, WebhookError> {
        let span = tracing::info_span!(
            "webhook",
            request_id = %Uuid::new_v4(),
            path = %request.path(),
        );
        async {
            let result = self.run(request).await;
            match &result {
                Ok(ack) => {
                    let summary = ack.summary();
                    tracing::info!(
                        stage = %RequestStage::Acknowledged,
                        route = %ack.route(),
                        ignored = ack.is_ignored(),
                        instructions = ack.instructions(),
                        applied = summary.applied,
                        failed = summary.failed,
                        lag_ms = ack.lag_ms(),
                        "webhook processed"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        stage = %RequestStage::Rejected,
                        after = %RequestStage::rejected_after(err),
                        status = err.http_status(),
                        error = %err,
                        "webhook rejected"
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &WebhookRequest) -> Result<WebhookAck, WebhookError> {
        tracing::debug!(stage = %RequestStage::Received, bytes = request.body().len());
        self.verifier
            .verify(request.body(), request.signature())?;
        tracing::debug!(stage = %RequestStage::Authenticated);

        let envelope = WebhookEnvelope::from_slice(request.body())?;
        let route = WebhookRoute::from_path(request.path())?;
        tracing::debug!(
            stage = %RequestStage::Parsed,
            %route,
            event_type = envelope.data.event_type.as_deref().unwrap_or("unknown")
        );

        let ack = if route.requires_status_attribute() && !envelope.is_status_change() {
            let attribute = envelope.attribute_name().unwrap_or("<none>");
            tracing::info!(%route, attribute, "ignoring non-status attribute change");
            WebhookAck::ignored(
                route,
                format!("attribute_name is '{attribute}', not '{STATUS_ATTRIBUTE}'"),
            )
        } else {
            match route {
                WebhookRoute::Task => self.task_changed(&envelope).await?,
                WebhookRoute::Version => self.version_changed(&envelope).await?,
                WebhookRoute::VersionCreated => self.version_created(&envelope).await?,
            }
        };

        Ok(self.with_lag(ack, &envelope))
    }

    async fn task_changed(&self, envelope: &WebhookEnvelope) -> Result<WebhookAck, WebhookError> {
        let task = envelope.entity_id()?;
        let entity = EntityRef::task(task);
        let Some(transition) = envelope.transition()? else {
            return Ok(status_cleared(WebhookRoute::Task, entity));
        };
        let ack = WebhookAck::new(WebhookRoute::Task)
            .with_entity(entity)
            .with_transition(transition.clone());
        tracing::info!(%entity, new_status = %transition.new_status(), "task status changed");

        let mut step = envelope.step();
        let mut shot = envelope.shot();
        if step.is_none() || shot.is_none() {
            let Some(found) = self.lookup(entity).await? else {
                return Ok(ack.with_note(format!("{entity} not found")));
            };
            step = step.or_else(|| found.step().cloned());
            shot = shot.or(found.shot());
        }

        let mut change = TaskStatusChange::new(task, transition);
        if let Some(name) = step {
            change = change.with_step(name);
        }
        if let Some(shot_id) = shot {
            change = change.with_shot(shot_id);
        }
        Ok(self
            .propagate(ack, StatusEvent::TaskStatusChanged(change))
            .await)
    }

    async fn version_changed(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<WebhookAck, WebhookError> {
        let version = envelope.entity_id()?;
        let entity = EntityRef::version(version);
        let Some(transition) = envelope.transition()? else {
            return Ok(status_cleared(WebhookRoute::Version, entity));
        };
        let ack = WebhookAck::new(WebhookRoute::Version)
            .with_entity(entity)
            .with_transition(transition.clone());
        tracing::info!(%entity, new_status = %transition.new_status(), "version status changed");

        let mut task = envelope.task();
        let mut shot = envelope.shot();
        if task.is_none() {
            let Some(found) = self.lookup(entity).await? else {
                return Ok(ack.with_note(format!("{entity} not found")));
            };
            task = found.task();
            shot = shot.or(found.shot());
        }

        let chaining = self.resolver.table().chains_version_to_shot();
        if let Some(task_id) = task
            && chaining
            && shot.is_none()
        {
            shot = self
                .lookup(EntityRef::task(task_id))
                .await?
                .and_then(|found| found.shot());
        }

        let mut change = VersionStatusChange::new(version, transition);
        if let Some(task_id) = task {
            change = change.with_task(task_id);
        }
        if let Some(shot_id) = shot {
            change = change.with_shot(shot_id);
        }
        Ok(self
            .propagate(ack, StatusEvent::VersionStatusChanged(change))
            .await)
    }

    async fn version_created(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<WebhookAck, WebhookError> {
        let version = envelope.entity_id()?;
        let entity = EntityRef::version(version);
        let ack = WebhookAck::new(WebhookRoute::VersionCreated).with_entity(entity);
        tracing::info!(%entity, "version created");

        let Some(found) = self.lookup(entity).await? else {
            return Ok(ack.with_note(format!("{entity} not found")));
        };

        let context = match found.task() {
            Some(task_id) => self.task_context(task_id).await?,
            None => TaskContext::default(),
        };

        let mut created = VersionCreation::new(version);
        if let Some(status) = found.status() {
            created = created.with_initial_status(status.clone());
        }
        if let Some(task_id) = found.task() {
            created = created.with_task(task_id);
        }
        if let Some(step) = context.step {
            created = created.with_step(step);
        }
        if let Some(shot_id) = found.shot().or(context.shot) {
            created = created.with_shot(shot_id);
        }
        Ok(self
            .propagate(ack, StatusEvent::VersionCreated(created))
            .await)
    }

    async fn task_context(&self, task: EntityId) -> Result<TaskContext, WebhookError> {
        let found = self.lookup(EntityRef::task(task)).await?;
        Ok(found.map_or_else(TaskContext::default, |task_entity| TaskContext {
            step: task_entity.step().cloned(),
            shot: task_entity.shot(),
        }))
    }

    async fn lookup(&self, entity: EntityRef) -> Result<Option<TrackedEntity>, WebhookError> {
        let found = self.tracker.find_entity(entity).await.map_err(|err| {
            tracing::warn!(%entity, error = %err, "context lookup failed");
            WebhookError::UpstreamRead(err)
        })?;
        if found.is_none() {
            tracing::warn!(%entity, "context entity not found");
        }
        Ok(found)
    }

    async fn propagate(&self, ack: WebhookAck, event: StatusEvent) -> WebhookAck {
        let instructions = self.resolver.resolve(&event);
        tracing::debug!(stage = %RequestStage::Resolved, instructions = instructions.len());
        let report = self.dispatcher.dispatch(&instructions).await;
        tracing::debug!(stage = %RequestStage::Dispatched);
        ack.with_dispatch(instructions.len(), report)
    }

    fn with_lag(&self, ack: WebhookAck, envelope: &WebhookEnvelope) -> WebhookAck {
        match envelope.sent_at() {
            Some(Ok(sent_at)) => {
                let lag_ms = (self.clock.utc() - sent_at).num_milliseconds();
                ack.with_lag_ms(lag_ms)
            }
            Some(Err(reason)) => {
                tracing::warn!(%reason, "ignoring delivery timestamp");
                ack
            }
            None => ack,
        }
    }
}

#[derive(Debug, Default)]
struct TaskContext {
    step: Option<StepName>,
    shot: Option<EntityId>,
}

fn status_cleared(route: WebhookRoute, entity: EntityRef) -> WebhookAck {
    tracing::info!(%route, %entity, "status cleared; nothing to propagate");
    WebhookAck::new(route)
        .with_entity(entity)
        .with_note("status cleared")
}
