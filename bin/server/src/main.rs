//! blogmate HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! # Minimal: JWT secret is required
//! JWT=change-me-to-something-long blogmate-server
//!
//! # With AI helpers and a custom data directory
//! JWT=... GEMINI_API_KEY=... DATABASE_URI=/var/lib/blogmate PORT=9000 blogmate-server
//!
//! # Deliver account emails over SMTP
//! JWT=... EMAIL_KEY=app-password EMAIL_FROM=noreply@example.com blogmate-server
//!
//! # Debug logging
//! RUST_LOG=debug blogmate-server
//! ```

mod auth;
mod error;
mod handlers;
mod mail;
mod rate_limit;
mod routes;
mod state;


use async_trait::async_trait;
use auth::TokenIssuer;
use blogmate::ai::{AiFacade, GeminiModel, LanguageModel, PromptTemplates};
use blogmate::config::Config;
use blogmate::content::ContentStore;
use blogmate::service::Blocking;
use blogmate::storage::{open_database, RocksDbConfig};
use blogmate::users::UserDirectory;
use blogmate::BlogError;
use mail::{LogMailer, Mailer, SmtpMailer};
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// How often expired verification and reset tokens are swept.
const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);
use tracing_subscriber::EnvFilter;

/// Stands in for the model when no API key is configured.
struct UnconfiguredModel;

#[async_trait]
impl LanguageModel for UnconfiguredModel {
    async fn generate(&self, _prompt: &str) -> blogmate::Result<String> {
        Err(BlogError::internal("no language model is configured"))
    }
}

fn load_prompts(config: &Config) -> PromptTemplates {
    match PromptTemplates::load(&config.prompts_path) {
        Ok(prompts) => prompts,
        Err(e) => {
            warn!(
                "Could not load prompts from {}: {}; using built-in templates",
                config.prompts_path.display(),
                e
            );
            PromptTemplates::default()
        }
    }
}

fn language_model(config: &Config) -> blogmate::Result<Arc<dyn LanguageModel>> {
    match &config.gemini.api_key {
        Some(key) => Ok(Arc::new(GeminiModel::new(
            key.clone(),
            config.gemini.model.clone(),
            config.timeouts.ai,
        )?)),
        None => {
            warn!("GEMINI_API_KEY is not set; AI endpoints will fail");
            Ok(Arc::new(UnconfiguredModel))
        }
    }
}

fn mailer(config: &Config) -> blogmate::Result<Arc<dyn Mailer>> {
    match SmtpMailer::from_config(&config.email)? {
        Some(smtp) => {
            info!(host = %config.email.smtp_host, port = config.email.smtp_port, "Account emails go out over SMTP");
            Ok(Arc::new(smtp))
        }
        None => {
            info!("EMAIL_KEY is not set; account emails are logged only");
            Ok(Arc::new(LogMailer))
        }
    }
}

fn spawn_token_sweeper(users: Blocking<UserDirectory>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match users.run(|users| users.purge_expired_tokens()).await {
                Ok(purged) => debug!(purged, "Token sweep finished"),
                Err(e) => warn!("Token sweep failed: {}", e),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogmate=info,blogmate_server=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(?config, "Configuration loaded");

    let db = open_database(&config.database.uri, &RocksDbConfig::for_server())?;
    let users = Arc::new(UserDirectory::new(db.clone()));
    let content = Arc::new(ContentStore::new(db, users.clone()));
    let ai = AiFacade::new(language_model(&config)?, load_prompts(&config), config.timeouts.ai);

    let users = Blocking::new(users, config.timeouts.store);
    spawn_token_sweeper(users.clone());

    let state = AppState {
        content: Blocking::new(content, config.timeouts.store),
        users,
        ai: Arc::new(ai),
        tokens: Arc::new(TokenIssuer::new(config.jwt.secret.as_bytes())),
        mailer: mailer(&config)?,
        public_url: Arc::from(config.email.public_url.as_str()),
    };
    let app = routes::router(state, config.trust_proxy_headers);

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(bind_addr).await?;
    info!("blogmate server listening on http://{}", bind_addr);

    // Connect info feeds the per-client rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
