pub mod api;

pub use api::{ create_router, AppState };

use crate::cli::Args;
use axum_server::tls_rustls::RustlsConfig;
use log::{ info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct Server {
    addr: SocketAddr,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(args: Args, state: AppState) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let addr = format!("{}:{}", args.host, args.port)
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid listen address {}:{}: {}", args.host, args.port, e))?;

        Ok(Self {
            addr,
            state,
            args,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let app = create_router(self.state.clone());

        match (self.args.enable_tls, &self.args.tls_cert_path, &self.args.tls_key_path) {
            (true, Some(cert_path), Some(key_path)) => {
                let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await.map_err(|e|
                    format!("Failed to load TLS files '{}' / '{}': {}", cert_path, key_path, e)
                )?;

                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    shutdown_signal().await;
                    shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                });

                info!("coach-proxy listening on https://{}", self.addr);
                axum_server::bind_rustls(self.addr, tls_config)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?;
            }
            (tls, _, _) => {
                if tls {
                    warn!("ENABLE_TLS is set but TLS_CERT_PATH/TLS_KEY_PATH are missing; serving plain HTTP");
                }
                let listener = tokio::net::TcpListener::bind(self.addr).await.map_err(|e|
                    format!("Failed to bind HTTP server to {}: {}. Try a different port.", self.addr, e)
                )?;

                info!("coach-proxy listening on http://{}", self.addr);
                axum::serve(listener, app.into_make_service())
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
