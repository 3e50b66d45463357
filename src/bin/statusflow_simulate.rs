//! Routes a simulated webhook through the same pipeline the server uses.
//!
//! Usage:
//!
//! ```text
//! statusflow-simulate <request.json> [--sign] [--tracker <fixture.json>]
//! ```
//!
//! The request file describes one delivery:
//!
//! ```json
//! {
//!   "path": "/task",
//!   "headers": { "X-SG-Signature": "sha1=..." },
//!   "body": { "data": { "entity_id": 101, "meta": { "new_value": "stcomp" } } }
//! }
//! ```
//!
//! `body` may be a JSON value or a raw string. `--sign` replaces the
//! signature with one computed from `SECRET_TOKEN`. `--tracker` runs against
//! an in-memory tracker seeded from a JSON array of entity snapshots instead
//! of the ShotGrid site named by the environment; it then needs no ShotGrid
//! credentials. Both modes honour `STATUSFLOW_CONFIG`,
//! `STATUSFLOW_MAPPING` and `STATUSFLOW_DISPATCH_TIMEOUT_SECS`. The
//! `(status, body)` response is written to stdout as JSON.

use camino::{Utf8Path, Utf8PathBuf};
use mockable::DefaultClock;
use serde::Deserialize;
use serde_json::{Value, json};
use statusflow::{
    config::{PipelineConfig, ServiceConfig, load_mapping_table, read_utf8},
    observability::{LogFormat, init_logging},
    propagation::{
        adapters::{memory::InMemoryTracker, shotgrid::ShotgridTracker},
        ports::{TrackedEntity, TrackingService},
    },
    webhook::{
        domain::{SIGNATURE_HEADER, SignatureVerifier},
        services::{WebhookRequest, WebhookService},
    },
};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

const USAGE: &str = "usage: statusflow-simulate <request.json> [--sign] [--tracker <fixture.json>]";

#[derive(Debug, Error)]
enum SimulateError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to read '{path}': {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] statusflow::config::ConfigError),
    #[error(transparent)]
    Mapping(#[from] statusflow::propagation::domain::MappingConfigError),
    #[error(transparent)]
    Secret(#[from] statusflow::webhook::domain::AuthenticationError),
    #[error(transparent)]
    Tracker(#[from] statusflow::propagation::ports::TrackerError),
    #[error("failed to write response: {0}")]
    Output(#[source] std::io::Error),
}

#[derive(Debug)]
struct Args {
    request: Utf8PathBuf,
    sign: bool,
    tracker: Option<Utf8PathBuf>,
}

impl Args {
    fn parse(raw: impl IntoIterator<Item = String>) -> Result<Self, SimulateError> {
        let mut request = None;
        let mut sign = false;
        let mut tracker = None;
        let mut remaining = raw.into_iter();
        while let Some(arg) = remaining.next() {
            match arg.as_str() {
                "--sign" => sign = true,
                "--tracker" => {
                    let path = remaining.next().ok_or_else(|| {
                        SimulateError::InvalidArgs("--tracker needs a fixture path".to_owned())
                    })?;
                    tracker = Some(Utf8PathBuf::from(path));
                }
                flag if flag.starts_with("--") => {
                    return Err(SimulateError::InvalidArgs(format!(
                        "unknown flag '{flag}'; {USAGE}"
                    )));
                }
                _ if request.is_none() => request = Some(Utf8PathBuf::from(arg.as_str())),
                _ => {
                    return Err(SimulateError::InvalidArgs(format!(
                        "unexpected argument '{arg}'; {USAGE}"
                    )));
                }
            }
        }
        let request_path = request.ok_or_else(|| SimulateError::InvalidArgs(USAGE.to_owned()))?;
        Ok(Self {
            request: request_path,
            sign,
            tracker,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SimulatedRequest {
    path: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    body: Value,
}

impl SimulatedRequest {
    fn body_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match &self.body {
            Value::String(raw) => Ok(raw.as_bytes().to_vec()),
            other => serde_json::to_vec(other),
        }
    }

    fn signature(&self) -> Option<String> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(SIGNATURE_HEADER))
            .map(|(_, value)| value.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_logging(LogFormat::Pretty);
    let args = Args::parse(std::env::args().skip(1))?;
    run(args).await.map_err(|err| Box::new(err) as BoxError)
}

async fn run(args: Args) -> Result<(), SimulateError> {
    let simulated: SimulatedRequest = read_json(&args.request)?;
    let body = simulated
        .body_bytes()
        .map_err(|source| SimulateError::Parse {
            path: args.request.clone(),
            source,
        })?;

    let response = if let Some(fixture) = &args.tracker {
        let pipeline = PipelineConfig::from_env()?;
        let entities: Vec<TrackedEntity> = read_json(fixture)?;
        let tracker = Arc::new(InMemoryTracker::from_entities(entities));
        simulate(&simulated, body, &pipeline, args.sign, tracker).await?
    } else {
        let config = ServiceConfig::from_env()?;
        let tracker = Arc::new(ShotgridTracker::new(config.shotgrid_settings())?);
        simulate(&simulated, body, config.pipeline(), args.sign, tracker).await?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{response:#}").map_err(SimulateError::Output)
}

async fn simulate<T>(
    simulated: &SimulatedRequest,
    body: Vec<u8>,
    pipeline: &PipelineConfig,
    sign: bool,
    tracker: Arc<T>,
) -> Result<Value, SimulateError>
where
    T: TrackingService + 'static,
{
    let table = Arc::new(load_mapping_table(pipeline.mapping_path())?);
    let verifier = SignatureVerifier::new(pipeline.secret_token())?;
    let signature = if sign {
        Some(verifier.sign(&body))
    } else {
        simulated.signature()
    };
    let mut service = WebhookService::new(verifier, table, tracker, Arc::new(DefaultClock));
    if let Some(budget) = pipeline.dispatch_timeout() {
        service = service.with_dispatch_timeout(budget);
    }
    let request = WebhookRequest::new(simulated.path.as_str(), signature, body);
    let (status, response_body) = service.respond(&request).await.into_parts();
    Ok(json!({ "status": status, "body": response_body }))
}

fn read_json<D>(path: &Utf8Path) -> Result<D, SimulateError>
where
    D: serde::de::DeserializeOwned,
{
    let source = read_utf8(path).map_err(|source| SimulateError::Read {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|err| SimulateError::Parse {
        path: path.to_owned(),
        source: err,
    })
}

#[cfg(test)]
mod tests {
    use super::{SimulatedRequest, read_json, simulate};
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use statusflow::{
        config::PipelineConfig,
        propagation::{
            adapters::memory::InMemoryTracker,
            domain::{EntityId, EntityRef, StatusCode},
            ports::TrackedEntity,
        },
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    fn demo(name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
    }

    fn pipeline(budget_secs: &str) -> PipelineConfig {
        let mapping = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/status_mapping.yaml");
        let vars: HashMap<&str, String> = [
            ("SECRET_TOKEN", "simulated-secret".to_owned()),
            ("STATUSFLOW_MAPPING", mapping.to_string()),
            ("STATUSFLOW_DISPATCH_TIMEOUT_SECS", budget_secs.to_owned()),
        ]
        .into_iter()
        .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned()).expect("pipeline settings")
    }

    async fn run_demo(budget_secs: &str) -> (serde_json::Value, Arc<InMemoryTracker>) {
        let simulated: SimulatedRequest =
            read_json(&demo("task_stcomp_request.json")).expect("demo request");
        let entities: Vec<TrackedEntity> =
            read_json(&demo("tracker_fixture.json")).expect("demo fixture");
        let tracker = Arc::new(InMemoryTracker::from_entities(entities));
        let body = simulated.body_bytes().expect("demo body");
        let response = simulate(&simulated, body, &pipeline(budget_secs), true, Arc::clone(&tracker))
            .await
            .expect("simulation should run");
        (response, tracker)
    }

    fn shot_status(tracker: &InMemoryTracker) -> Option<StatusCode> {
        let shot = EntityRef::shot(EntityId::new(7).expect("positive id"));
        tracker.status_of(shot).expect("lock")
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn signed_demo_propagates_within_budget() {
        let (response, tracker) = run_demo("30").await;

        assert_eq!(response["status"], 200);
        assert_eq!(response["body"]["summary"]["applied"], 3);
        assert_eq!(shot_status(&tracker), StatusCode::new("ip").ok());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn exhausted_budget_leaves_tracker_untouched() {
        let (response, tracker) = run_demo("0").await;

        assert_eq!(response["status"], 200);
        assert_eq!(response["body"]["summary"]["applied"], 0);
        assert_ne!(response["body"]["summary"]["not_attempted"], 0);
        assert_eq!(shot_status(&tracker), StatusCode::new("wtg").ok());
    }
}
