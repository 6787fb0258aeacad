use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use onboarding_tracker::config::AppConfig;
use onboarding_tracker::documents::HtmlContractGenerator;
use onboarding_tracker::files::{DriveFileStore, FileStore, FolderCache, LocalFileStore};
use onboarding_tracker::identity::StaticTokenIdentity;
use onboarding_tracker::notify::{LogNotifier, Notifier, SmtpNotifier};
use onboarding_tracker::onboarding::{
    ManagerDeps, OnboardingManager, OnboardingRouteState, onboarding_routes,
};
use onboarding_tracker::pipeline::StepRegistry;
use onboarding_tracker::store::{LibSqlBackend, RequestStore};
use secrecy::ExposeSecret;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    // ── Pipeline ────────────────────────────────────────────────────────
    let registry = match &config.steps_file {
        Some(path) => StepRegistry::load(path)
            .with_context(|| format!("invalid step registry at {}", path.display()))?,
        None => StepRegistry::standard().context("invalid built-in step registry")?,
    };
    let registry = Arc::new(registry);

    // ── Database ────────────────────────────────────────────────────────
    let store: Arc<dyn RequestStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Adapters ────────────────────────────────────────────────────────
    let notifier: Arc<dyn Notifier> = match config.smtp.clone() {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP delivery enabled");
            Arc::new(SmtpNotifier::new(smtp))
        }
        None => {
            warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let files: Arc<dyn FileStore> = match config.drive.clone() {
        Some(drive) => {
            info!(parent = %drive.parent_folder_id, "Google Drive storage enabled");
            Arc::new(DriveFileStore::new(drive, Arc::new(FolderCache::new())))
        }
        None => {
            info!(dir = %config.upload_dir.display(), "Storing documents on local disk");
            Arc::new(LocalFileStore::new(&config.upload_dir))
        }
    };

    let identity = StaticTokenIdentity::parse(config.staff_tokens.expose_secret())
        .context("invalid staff token table")?;
    if identity.is_empty() {
        warn!("ONBOARDING_STAFF_TOKENS is empty, every staff endpoint will refuse callers");
    }

    let manager = Arc::new(OnboardingManager::new(ManagerDeps {
        registry: Arc::clone(&registry),
        store,
        notifier,
        documents: Arc::new(HtmlContractGenerator {
            provider_name: config.provider_name.clone(),
        }),
        files,
        base_url: config.base_url.clone(),
    }));

    let app = onboarding_routes(OnboardingRouteState {
        manager,
        identity: Arc::new(identity),
    })
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        steps = registry.len(),
        db = %config.db_path.display(),
        base_url = %config.base_url,
        "Onboarding tracker listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
