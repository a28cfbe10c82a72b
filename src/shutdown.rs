use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled on the first of those
/// signals. The dispatcher stops its producer and workers on it and the
/// metrics server closes its listener. If the handlers cannot be installed
/// the error is logged and the token is only cancelled by its other holders.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();

    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "Shutdown signal received, stopping dispatcher");
                on_signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
        }
    });

    token
}

/// Resolves with the name of the first termination signal delivered.
async fn wait_for_signal() -> io::Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}
