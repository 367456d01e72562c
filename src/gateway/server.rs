//! Gateway server startup and shutdown.

use crate::Mineserve;
use crate::config::{DEFAULT_WORKERS, GatewayConfig};
use crate::error::{Error, Result};
use crate::gateway::auth::Authentication;
use crate::gateway::handlers;

use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::ServerHandle, middleware, web};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Register every gateway route on `cfg`.
///
/// Expects a `web::Data<Mineserve>` in the application data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/events", web::get().to(handlers::events))
        .route("/console", web::get().to(handlers::console))
        .route("/status", web::get().to(handlers::status))
        .route("/directory", web::post().to(handlers::bind_directory))
        .route("/directory/reset", web::post().to(handlers::reset_directory))
        .route("/server/details", web::get().to(handlers::server_details))
        .route("/server/start", web::post().to(handlers::start))
        .route("/server/stop", web::post().to(handlers::stop))
        .route("/server/restart", web::post().to(handlers::restart))
        .route("/server/command", web::post().to(handlers::command))
        .route("/players", web::get().to(handlers::players))
        .route(
            "/players/{name}/{action}",
            web::post().to(handlers::player_action),
        )
        .route("/properties", web::get().to(handlers::get_properties))
        .route("/properties", web::put().to(handlers::save_properties))
        .route("/archives", web::post().to(handlers::create_archive))
        .route("/archives/auto", web::put().to(handlers::auto_archive));
}

/// Handle for controlling a running gateway
#[derive(Clone)]
pub struct GatewayHandle {
    /// Actix server handle
    server: ServerHandle,
    /// Server task handle
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Bound socket addresses
    addrs: Vec<SocketAddr>,
    /// Configuration for the gateway
    config: GatewayConfig,
}

impl GatewayHandle {
    /// Addresses the gateway listens on
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Get the gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Stop the gateway, letting in-flight requests finish
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Stopping gateway");
        self.server.stop(true).await;

        let mut task = self.task.lock().await;
        if let Some(h) = task.take() {
            // Wait with a timeout
            match tokio::time::timeout(Duration::from_secs(5), h).await {
                Ok(Err(e)) => tracing::warn!(error = %e, "Error while joining gateway task"),
                Ok(Ok(())) => {}
                Err(_) => tracing::warn!("Timeout waiting for gateway task to finish"),
            }
        }

        tracing::info!("Gateway shut down");
        Ok(())
    }
}

/// Start the HTTP/SSE gateway in a background task
pub async fn start_gateway(app: Mineserve, config: GatewayConfig) -> Result<GatewayHandle> {
    // Parse the socket address from the config
    let addr_str = format!("{}:{}", config.address, config.port);
    let addr = addr_str
        .to_socket_addrs()
        .map_err(|e| Error::Other(format!("Failed to parse socket address: {}", e)))?
        .next()
        .ok_or_else(|| Error::Other(format!("Could not parse socket address: {}", addr_str)))?;

    tracing::info!(address = %addr_str, "Starting gateway with Actix Web");

    let app_data = web::Data::new(app);
    let config_arc = Arc::new(config.clone());

    let server_builder = HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(config_arc.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_data.clone())
            .configure(routes)
    });

    // Configure workers - use the config value if specified, otherwise the default
    let workers = config.workers.unwrap_or(DEFAULT_WORKERS);
    tracing::info!(workers, "Setting number of Actix Web workers");

    let bound = server_builder
        .workers(workers)
        .bind(addr)
        .map_err(|e| Error::Other(format!("Failed to bind gateway: {}", e)))?;
    let addrs = bound.addrs();
    let server = bound.run();
    let server_handle = server.handle();

    let task = tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!(error = %e, "Gateway server error");
        }
        tracing::info!("Gateway server task finished");
    });

    tracing::info!(addrs = ?addrs, "Gateway started");
    Ok(GatewayHandle {
        server: server_handle,
        task: Arc::new(Mutex::new(Some(task))),
        addrs,
        config,
    })
}
