use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vizgen_api::config::ServerConfig;
use vizgen_api::router::build_app_router;
use vizgen_api::state::AppState;
use vizgen_pipeline::config::PipelineConfig;
use vizgen_pipeline::intake::IntakeHandler;
use vizgen_pipeline::llm::GeminiClient;
use vizgen_pipeline::orchestrator::Orchestrator;
use vizgen_pipeline::registry::JobRegistry;
use vizgen_pipeline::render_upload::RenderUploadClient;
use vizgen_pipeline::renderer::RendererApi;
use vizgen_pipeline::storage::CloudinaryUploader;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vizgen_api=debug,vizgen_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pipeline = PipelineConfig::from_env()?;
    tracing::info!(
        planning_model = %pipeline.planning.model,
        coding_model = %pipeline.coding.model,
        renderer = %pipeline.renderer_url,
        folder = %pipeline.upload_folder,
        "Loaded pipeline configuration"
    );

    // --- Collaborators ---
    let gemini = Arc::new(GeminiClient::new(
        pipeline.gemini_api_url.clone(),
        pipeline.gemini_api_key.clone(),
    ));

    let renderer = Arc::new(RendererApi::new(pipeline.renderer_url.clone()));
    match renderer.health().await {
        Ok(health) => tracing::info!(status = %health.status, "Renderer reachable"),
        Err(e) => tracing::warn!(
            error = %e,
            "Renderer health check failed; jobs will fail until it is up"
        ),
    }

    let uploader = Arc::new(CloudinaryUploader::new(pipeline.cloudinary.clone()));

    // --- Pipeline ---
    let registry = Arc::new(JobRegistry::new());
    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::clone(&registry),
            gemini.clone(),
            pipeline.coding.clone(),
            RenderUploadClient::new(renderer, uploader, pipeline.upload_folder.clone()),
        )
        .with_job_timeout(pipeline.job_timeout),
    );
    let intake = Arc::new(IntakeHandler::new(
        gemini,
        pipeline.planning.clone(),
        Arc::clone(&registry),
        Arc::clone(&orchestrator),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        registry,
        intake,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    let in_flight = orchestrator.in_flight();
    tracing::info!(in_flight, "Server stopped accepting connections, draining jobs");

    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if orchestrator.shutdown(grace).await {
        tracing::info!("Graceful shutdown complete");
    } else {
        tracing::warn!(
            remaining = orchestrator.in_flight(),
            "Shutdown grace period elapsed with jobs still running"
        );
    }

    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
