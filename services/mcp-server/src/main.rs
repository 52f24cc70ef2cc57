//! F-Prime MCP Server
//!
//! HTTP front end for the F-Prime tool catalog. Callers authenticate with an
//! Entra ID bearer token or a browser session; every tool call runs through
//! the registry's lookup, validation and authorization pipeline.
//!
//! ## Tool Endpoints
//!
//! - `GET /mcp/tools` - Tools the caller may invoke
//! - `POST /mcp/tools/call` - Invoke a tool: `{"name", "arguments"}`
//!
//! ## Auth Endpoints
//!
//! - `GET /auth/login` - Start the authorization-code flow
//! - `GET /auth/callback` - Identity provider redirect target
//! - `GET /auth/user` - Current caller
//! - `GET /auth/logout` - End the session
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /` - Service descriptor
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod extractors;
mod handlers;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use fprime_auth_core::{AuthService, Authenticator};
use fprime_landscape::Aggregator;
use fprime_mcp::tools::{register_catalog, CatalogConfig};
use fprime_mcp::{ProxyClient, ToolRegistry};
use fprime_utils::credentials::CredentialResolver;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

/// Service name reported by health endpoints and tools
pub const SERVICE_NAME: &str = "fprime-mcp-server";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    fprime_utils::config::load_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("fprime_mcp_server=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting F-Prime MCP server");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        environment = %config.environment,
        proxy_configured = config.proxy_url.is_some(),
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Credentials: environment first, secrets bundle as fallback
    let credentials =
        CredentialResolver::from_env(config.use_secrets_store, config.secrets_bundle_path.clone());
    let client_secret = credentials.get("AZURE_CLIENT_SECRET").await?;

    // Auth
    let auth = Arc::new(AuthService::new(
        config.identity.auth_config(client_secret.expose())?,
    ));
    let authenticator: Arc<dyn Authenticator> = Arc::new(auth.validator().clone());

    // Tool catalog
    let aggregator = Aggregator::from_config(&config.landscape, credentials);
    tracing::info!(precedence = ?aggregator.precedence(), "Landscape sources ready");
    let proxy = ProxyClient::new(
        config.proxy_url.clone(),
        config.proxy_token.clone(),
        config.http_timeout,
    );
    let mut registry = ToolRegistry::new(Arc::clone(&authenticator));
    register_catalog(
        &mut registry,
        aggregator,
        proxy,
        &CatalogConfig {
            default_policy: auth.config().default_policy(),
            admin_role: config.admin_role.clone(),
            service_name: SERVICE_NAME.to_string(),
            environment: config.environment.clone(),
        },
    )?;
    tracing::info!(tools = registry.len(), "Tool catalog registered");

    // Create application state
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(auth, authenticator, registry, config);

    let app = build_router(state, metrics_handle);
    run_http_server(app, addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Tool calls span sub-second lookups to multi-source aggregations
    let tool_latency_buckets = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("mcp_tool_call_duration_seconds".to_string()),
            tool_latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("landscape_source_duration_seconds".to_string()),
            tool_latency_buckets,
        )?;

    let handle = builder.install_recorder()?;

    metrics::describe_counter!(
        "mcp_tool_calls_total",
        "Total tool calls by tool and outcome"
    );
    metrics::describe_histogram!(
        "mcp_tool_call_duration_seconds",
        "Tool call latency in seconds by tool"
    );
    metrics::describe_counter!(
        "landscape_cache_lookups_total",
        "Landscape cache lookups by result"
    );
    metrics::describe_counter!(
        "landscape_source_results_total",
        "Landscape source queries by source and status"
    );
    metrics::describe_histogram!(
        "landscape_source_duration_seconds",
        "Landscape source query latency in seconds by source"
    );
    metrics::describe_counter!(
        "auth_token_validations_total",
        "Bearer token validations by result"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
