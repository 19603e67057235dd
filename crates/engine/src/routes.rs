use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::Instrument;

use paperverify_common::api::verify::{VerifyRequest, VerifyResponse};
use paperverify_common::types::VerificationInput;
use paperverify_common::{PaperVerifyError, RequestId};

use crate::llm::LlmCaller;
use crate::oracle::{LlmOracle, Oracles, PromptSet};
use crate::verification::{HallucinationDetector, VerificationSuite};

/// LLM clients behind the oracles, one per role.
#[derive(Clone)]
pub struct LlmClients {
    pub verifier: Arc<dyn LlmCaller>,
    pub answer: Arc<dyn LlmCaller>,
}

/// Shared application state accessible from axum handlers.
pub struct AppState {
    pub suite: VerificationSuite,
    /// `None` when an API key is missing; /verify then answers 503.
    pub llm: Option<LlmClients>,
    pub prompts: Arc<PromptSet>,
    pub request_timeout: Duration,
    pub metrics_handle: PrometheusHandle,
}

/// POST /verify: score an answer for hallucination risk.
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, (StatusCode, String)> {
    let request_id = RequestId::new();

    let input = VerificationInput::try_from(request).map_err(|e| {
        metrics::counter!("verification.rejected").increment(1);
        let e = PaperVerifyError::from(e);
        tracing::info!(request_id = %request_id, error = %e, "Rejected verification request");
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    })?;

    let Some(clients) = state.llm.as_ref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "LLM clients are not configured".into(),
        ));
    };

    // Oracle handles live for this request only.
    let oracle = LlmOracle::new(
        Arc::clone(&clients.verifier),
        Arc::clone(&clients.answer),
        Arc::clone(&state.prompts),
    );
    let detector = HallucinationDetector::new(&state.suite, Oracles::all(&oracle));

    let span = tracing::info_span!("verify", request_id = %request_id);
    let verdict = detector
        .verify_with_deadline(&input, state.request_timeout)
        .instrument(span)
        .await
        .map_err(|e| (status_for(&e), e.to_string()))?;

    Ok(Json(VerifyResponse {
        request_id,
        completed_at: chrono::Utc::now(),
        verdict,
    }))
}

fn status_for(e: &PaperVerifyError) -> StatusCode {
    match e {
        PaperVerifyError::MalformedInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PaperVerifyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PaperVerifyError::Oracle(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let llm_ok = state.llm.is_some();

    let status = if llm_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = serde_json::json!({
        "status": if llm_ok { "healthy" } else { "degraded" },
        "services": {
            "llm": if llm_ok { "configured" } else { "unconfigured" },
        }
    });

    (status, Json(body))
}

/// GET /metrics: Prometheus exposition.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
