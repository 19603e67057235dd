use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;

use paperverify_engine::config;
use paperverify_engine::llm::{LlmCaller, LlmClient};
use paperverify_engine::oracle::PromptSet;
use paperverify_engine::routes::{self, AppState, LlmClients};
use paperverify_engine::verification::VerificationSuite;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("paperverify starting");

    // Load configuration. Fail loudly on misconfiguration.
    let config_dir = std::env::var("PAPERVERIFY_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let engine_config = match config::load_config(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration, refusing to start");
            std::process::exit(1);
        }
    };

    tracing::info!(
        config_dir = %engine_config.config_dir.display(),
        retrieval_depth = engine_config.system.retrieval.depth,
        "Configuration loaded"
    );

    let suite = match VerificationSuite::from_config(&engine_config.system) {
        Ok(suite) => suite,
        Err(e) => {
            tracing::error!(error = %e, "Invalid verification configuration");
            std::process::exit(1);
        }
    };

    let prompts = match PromptSet::from_prompts(&engine_config.prompts) {
        Ok(prompts) => Arc::new(prompts),
        Err(e) => {
            tracing::error!(error = %e, "Prompt templates incomplete");
            std::process::exit(1);
        }
    };

    // Install Prometheus metrics recorder.
    let metrics_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus metrics recorder");
            std::process::exit(1);
        }
    };

    // LLM clients (optional: a missing API key disables /verify, not the server).
    let system = &engine_config.system;
    let verifier = LlmClient::new(system.llm.verifier.clone(), system.retry.llm_api.clone());
    let answer = LlmClient::new(system.llm.answer.clone(), system.retry.llm_api.clone());
    let llm = match (verifier, answer) {
        (Some(verifier), Some(answer)) => {
            tracing::info!(
                verifier_model = verifier.model(),
                answer_model = answer.model(),
                "LLM clients ready"
            );
            Some(LlmClients {
                verifier: Arc::new(verifier) as Arc<dyn LlmCaller>,
                answer: Arc::new(answer) as Arc<dyn LlmCaller>,
            })
        }
        _ => {
            tracing::warn!("LLM clients unavailable, /verify will answer 503");
            None
        }
    };

    let state = Arc::new(AppState {
        suite,
        llm,
        prompts,
        request_timeout: Duration::from_secs(system.oracle.request_timeout_seconds),
        metrics_handle,
    });

    let app = Router::new()
        .route("/health", get(routes::health_handler))
        .route("/metrics", get(routes::metrics_handler))
        .route("/verify", post(routes::verify_handler))
        .with_state(state);

    let port: u16 = std::env::var("PAPERVERIFY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, port, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    tracing::info!(port = port, "paperverify listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "HTTP server error");
        std::process::exit(1);
    }
}
