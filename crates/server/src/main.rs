// crates/server/src/main.rs
//! Newsdeck server binary.
//!
//! Parses configuration, builds the AI clients and proxies, and serves the
//! API until Ctrl-C. Shutdown cancels every unfinished job.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use newsdeck_server::proxy::{ProxyClient, Service};
use newsdeck_server::{create_app, AiServices, AppState, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "warn,newsdeck_server=info,newsdeck_core=info";

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_tracing(config.log_json);

    let ai = config
        .ai_config()
        .map(AiServices::openai)
        .transpose()
        .context("failed to build AI client")?;
    if ai.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; carousel and voice routes will answer 503");
    }
    let proxy = ProxyClient::new(config.proxy_config()).context("failed to build proxy client")?;
    for service in Service::ALL {
        if !proxy.is_configured(service) {
            tracing::info!(upstream = %service, "proxy disabled (no credential or URL)");
        }
    }

    let state = AppState::new(config.runner_config(), ai, proxy);
    let sweep = state.jobs.spawn_retention_sweep(config.job_retention());
    let app = create_app(state.clone(), config.static_dir.as_deref());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "newsdeck listening");
    eprintln!("\n  newsdeck v{} \u{2192} http://{}\n", env!("CARGO_PKG_VERSION"), addr);

    let jobs = state.jobs.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let cancelled = jobs.cancel_all();
            if cancelled > 0 {
                tracing::info!(cancelled, "cancelled unfinished jobs");
            }
        })
        .await?;

    sweep.abort();
    Ok(())
}
