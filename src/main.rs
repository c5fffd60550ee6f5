use anyhow::{Context, Result};
use axum::{extract::FromRef, Router};
use reqwest::{Client, Proxy};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;
use crate::directus::DirectusClient;
use crate::error::AppError;

// Declare modules
mod cache;
mod catalog;
mod config;
mod directus;
mod error;
mod models;
mod reconcile;
mod routes;

// Shared application state
#[derive(Clone, FromRef)]
struct AppState {
    settings: Arc<Settings>,
    http_client: Arc<Client>,
    // None when APP_DIRECTUS_URL is not configured
    directus: Option<Arc<DirectusClient>>,
}

impl AppState {
    fn new(settings: Settings, http_client: Arc<Client>) -> Self {
        let directus = settings.directus_url.as_deref().map(|url| {
            Arc::new(DirectusClient::new(
                Arc::clone(&http_client),
                url,
                settings.directus_token.clone(),
                settings.cache_ttl(),
            ))
        });
        AppState {
            settings: Arc::new(settings),
            http_client,
            directus,
        }
    }

    /// The upstream client, or a configuration error for the current request.
    fn directus(&self) -> Result<Arc<DirectusClient>, AppError> {
        self.directus.clone().ok_or_else(|| {
            AppError::Configuration("APP_DIRECTUS_URL is not set".to_string())
        })
    }
}

fn build_http_client(settings: &Settings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("fluxcars_rust/", env!("CARGO_PKG_VERSION")))
        .timeout(settings.request_timeout());
    if let Some(proxy_url) = &settings.proxy_url {
        let proxy = Proxy::all(proxy_url).context("Invalid proxy_url in configuration")?;
        builder = builder.proxy(proxy);
        tracing::info!("Routing upstream requests through the configured proxy.");
    }
    builder.build().context("Failed to build shared reqwest client")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fluxcars_rust=info,tower_http=info".into()))
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing FluxCars storefront...");

    // Load configuration (also reads .env)
    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    if settings.directus_url.is_none() {
        // Static pages still work; data pages answer with a configuration error
        tracing::error!("APP_DIRECTUS_URL is not set; catalog pages will fail until it is configured.");
    }

    let http_client = Arc::new(build_http_client(&settings)?);
    tracing::info!("Shared HTTP client created.");

    let app_state = AppState::new(settings, http_client);
    let static_dir = app_state.settings.static_dir.clone();

    let router: Router = routes::create_router(app_state.clone());
    let app = router.nest_service("/static", ServeDir::new(&static_dir));

    let addr: SocketAddr = app_state
        .settings
        .server_address
        .parse()
        .with_context(|| format!("Invalid server address format: {}", app_state.settings.server_address))?;

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
