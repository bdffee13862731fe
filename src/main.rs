use std::{error::Error, net::SocketAddr};

use tokio::signal::{self, ctrl_c};
use tracing_subscriber::{fmt, EnvFilter};

use foodgram::{config::Config, routes, state::State};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    log::info!("Loading configuration...");
    let config = Config::load()?;
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));

    log::info!("Initializing state...");
    let state = State::new(config).await?;

    let (address, server) =
        warp::serve(routes::app(state)).try_bind_with_graceful_shutdown(address, shutdown_signal())?;
    log::info!("Server running on {address}");

    server.await;
    log::info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
