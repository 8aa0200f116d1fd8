//! Autorouting Server Client
//!
//! Speaks the autorouting HTTP API in either of its two modes: a single
//! blocking `solve` call, or a job that is created, polled and collected.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::autorouter::config::RouterSettings;
use crate::autorouter::plan::RoutingPlan;
use crate::autorouter::{BackendError, RoutingBackend};
use crate::schema::{GroupMode, InputFormat, PcbTrace, ServerMode};

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Client for a remote autorouting service
pub struct ServerRouter {
    client: Client,
    settings: RouterSettings,
}

#[derive(Debug, Serialize)]
struct RouteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    input_circuit_json: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_simple_route_json: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_mode: Option<GroupMode>,
    server_cache_enabled: bool,
    trace_clearance: f64,
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
struct JobRef<'a> {
    autorouting_job_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SolveResponse {
    autorouting_result: RouteOutput,
}

#[derive(Debug, Deserialize)]
struct RouteOutput {
    #[serde(default)]
    output_pcb_traces: Vec<PcbTrace>,
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    autorouting_job: JobCreated,
}

#[derive(Debug, Deserialize)]
struct JobCreated {
    autorouting_job_id: String,
}

#[derive(Debug, Deserialize)]
struct GetJobResponse {
    autorouting_job: JobStatus,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(default)]
    is_finished: bool,
    #[serde(default)]
    has_error: bool,
    #[serde(default)]
    error: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct JobOutputResponse {
    autorouting_job_output: RouteOutput,
}

fn client_or_default(built: reqwest::Result<Client>) -> Client {
    match built {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(
                "Failed to build autorouting HTTP client ({}); using defaults without the {}s timeout",
                e,
                REQUEST_TIMEOUT_SECS
            );
            Client::new()
        }
    }
}

impl ServerRouter {
    pub fn new(settings: RouterSettings) -> Self {
        let client = client_or_default(
            Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build(),
        );

        Self { client, settings }
    }

    fn request_body<'a>(plan: &'a RoutingPlan) -> RouteRequest<'a> {
        let circuit = plan.circuit.circuit.as_ref();
        let (input_circuit_json, input_simple_route_json) = match plan.config.input_format {
            InputFormat::CircuitJson => (Some(circuit), None),
            InputFormat::Simplified => (None, Some(circuit)),
        };
        RouteRequest {
            input_circuit_json,
            input_simple_route_json,
            group_mode: plan.config.group_mode,
            server_cache_enabled: plan.config.server_cache_enabled,
            trace_clearance: plan.config.trace_clearance.mm(),
            display_name: &plan.group,
        }
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, BackendError> {
        let response = self.client.post(url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::new(format!(
                "autorouting server returned {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::new(format!("unexpected autorouting response: {}", e)))
    }

    async fn solve(&self, base_url: &str, plan: &RoutingPlan) -> Result<Vec<PcbTrace>, BackendError> {
        let url = format!("{}/autorouting/solve", base_url);
        let response: SolveResponse = self.post(&url, &Self::request_body(plan)).await?;
        Ok(response.autorouting_result.output_pcb_traces)
    }

    async fn run_job(&self, base_url: &str, plan: &RoutingPlan) -> Result<Vec<PcbTrace>, BackendError> {
        let created: CreateJobResponse = self
            .post(
                &format!("{}/autorouting/jobs/create", base_url),
                &Self::request_body(plan),
            )
            .await?;
        let job_id = created.autorouting_job.autorouting_job_id;
        tracing::debug!("Created autorouting job {} for group `{}`", job_id, plan.group);

        let job = JobRef {
            autorouting_job_id: &job_id,
        };
        loop {
            let status: GetJobResponse = self
                .post(&format!("{}/autorouting/jobs/get", base_url), &job)
                .await?;
            let status = status.autorouting_job;
            if status.has_error {
                let message = status
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "autorouting job failed".to_string());
                return Err(BackendError::new(message));
            }
            if status.is_finished {
                break;
            }
            tokio::time::sleep(self.settings.poll_interval()).await;
        }

        let output: JobOutputResponse = self
            .post(&format!("{}/autorouting/jobs/get_output", base_url), &job)
            .await?;
        Ok(output.autorouting_job_output.output_pcb_traces)
    }
}

#[async_trait]
impl RoutingBackend for ServerRouter {
    fn name(&self) -> &str {
        "server"
    }

    async fn route(&self, plan: &RoutingPlan) -> Result<Vec<PcbTrace>, BackendError> {
        let url = plan
            .config
            .server_url
            .clone()
            .or_else(|| self.settings.server_url.clone());
        let mode = plan
            .config
            .server_mode
            .unwrap_or(self.settings.default_server_mode);
        let url = url.ok_or_else(|| BackendError::new("no autorouting server URL is configured"))?;
        let base_url = url.trim_end_matches('/');

        match mode {
            ServerMode::SolveEndpoint => self.solve(base_url, plan).await,
            ServerMode::Job => self.run_job(base_url, plan).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autorouter::plan::CircuitSnapshot;
    use crate::schema::validate_group;
    use crate::units::{Distance, MillimeterNormalizer};
    use serde_json::json;

    fn plan(autorouter: Value) -> RoutingPlan {
        let props = validate_group(
            &json!({ "subcircuit": true, "autorouter": autorouter }),
            "board",
            &MillimeterNormalizer,
        )
        .unwrap();
        RoutingPlan::build(
            "board",
            &props,
            None,
            CircuitSnapshot::new("topo", json!([{ "type": "source_trace" }])),
            Distance::from_mm(0.2),
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_request_body_follows_input_format() {
        let circuit_json = plan(json!("sequential-trace"));
        let body = serde_json::to_value(ServerRouter::request_body(&circuit_json)).unwrap();
        assert!(body.get("input_circuit_json").is_some());
        assert!(body.get("input_simple_route_json").is_none());
        assert_eq!(body["group_mode"], "sequential-trace");
        assert_eq!(body["trace_clearance"], 0.2);

        let simplified = plan(json!({ "inputFormat": "simplified", "local": false }));
        let body = serde_json::to_value(ServerRouter::request_body(&simplified)).unwrap();
        assert!(body.get("input_circuit_json").is_none());
        assert!(body.get("input_simple_route_json").is_some());
    }

    #[test]
    fn test_client_builder_error_falls_back() {
        // No TLS version satisfies min 1.3 and max 1.2.
        let built = Client::builder()
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_3)
            .max_tls_version(reqwest::tls::Version::TLS_1_2)
            .build();
        assert!(built.is_err());
        let _client = client_or_default(built);
    }

    #[tokio::test]
    async fn test_missing_url_is_a_backend_error() {
        let router = ServerRouter::new(RouterSettings::default());
        let err = router.route(&plan(json!("subcircuit"))).await.unwrap_err();
        assert!(err.message.contains("URL"));
    }
}
