//! HTTP Server configuration and startup.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use paytrack_types::Repository;

use super::handlers::{self, AppState, admin, auth, dashboard, lookups, payments};
use super::rate_limit::{RateLimitState, SWEEP_INTERVAL, rate_limit_middleware};
use super::session::{require_admin, require_auth};
use crate::service::{AuthService, PaymentService};
use crate::tasks;

/// Tunables for the HTTP layer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rate_limit_per_minute: u32,
    pub cors_origins: Vec<String>,
    pub token_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 100,
            cors_origins: vec!["http://localhost:3000".into()],
            token_sweep_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// HTTP Server for the Paytrack API.
pub struct HttpServer<R: Repository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimitState>,
    config: ServerConfig,
    shutdown: watch::Sender<bool>,
}

impl<R: Repository> HttpServer<R> {
    /// Creates a new HTTP server with default settings.
    pub fn new(auth: AuthService<R>, payments: PaymentService<R>) -> Self {
        Self::with_config(auth, payments, ServerConfig::default())
    }

    pub fn with_config(
        auth: AuthService<R>,
        payments: PaymentService<R>,
        config: ServerConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Arc::new(AppState { auth, payments }),
            rate_limiter: Arc::new(RateLimitState::per_minute(config.rate_limit_per_minute)),
            config,
            shutdown,
        }
    }

    /// Receiver that flips to `true` once the server has shut down. Hand it to
    /// background workers that should stop with the server.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn state(&self) -> Arc<AppState<R>> {
        self.state.clone()
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let public = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/openapi.json", get(handlers::openapi_json))
            .route("/api/auth/register", post(auth::register::<R>))
            .route("/api/auth/login", post(auth::login::<R>))
            .route("/api/auth/refresh", post(auth::refresh::<R>))
            .route("/api/auth/forgot-password", post(auth::forgot_password::<R>))
            .route("/api/auth/reset-password", post(auth::reset_password::<R>));

        let protected = Router::new()
            .route("/api/auth/me", get(auth::me::<R>))
            .route("/api/auth/logout", post(auth::logout::<R>))
            .route("/api/categories", get(lookups::categories::<R>))
            .route("/api/payment-methods", get(lookups::payment_methods::<R>))
            .route(
                "/api/payments",
                get(payments::list_payments::<R>).post(payments::create_payment::<R>),
            )
            .route("/api/payments/export", get(payments::export_payments::<R>))
            .route(
                "/api/payments/{id}",
                get(payments::get_payment::<R>)
                    .put(payments::update_payment::<R>)
                    .delete(payments::delete_payment::<R>),
            )
            .route("/api/dashboard/stats", get(dashboard::stats::<R>))
            .route("/api/dashboard/recent", get(dashboard::recent::<R>))
            .route("/api/dashboard/chart", get(dashboard::chart::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_auth::<R>,
            ));

        let admin = Router::new()
            .route("/api/admin/users/{id}", get(admin::get_user::<R>))
            .route_layer(middleware::from_fn(require_admin))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_auth::<R>,
            ));

        Router::new()
            .merge(public)
            .merge(protected)
            .merge(admin)
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(cors_layer(&self.config.cors_origins))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `signal` resolves, then stops the
    /// background sweepers and notifies every shutdown subscriber.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let sweepers = [
            tokio::spawn(tasks::run_token_sweeper(
                self.state.clone(),
                self.config.token_sweep_interval,
                self.shutdown.subscribe(),
            )),
            tokio::spawn(tasks::run_rate_limit_sweeper(
                self.rate_limiter.clone(),
                SWEEP_INTERVAL,
                self.shutdown.subscribe(),
            )),
        ];

        let app = self.router();
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await;

        self.shutdown.send_replace(true);
        for handle in sweepers {
            if let Err(e) = handle.await {
                tracing::warn!("Background task ended abnormally: {}", e);
            }
        }

        result.map_err(Into::into)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
