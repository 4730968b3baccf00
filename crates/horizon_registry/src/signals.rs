//! Process signal handling.
//!
//! A termination signal cancels the process-wide shutdown token. The HTTP
//! server then drains in-flight requests and the reaper stops before its next
//! sweep.

use std::io;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(unix)]
async fn termination() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    })
}

#[cfg(not(unix))]
async fn termination() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

/// Cancels `shutdown` on the first termination signal.
///
/// Returns early without waiting for a signal if the token is cancelled by
/// someone else, for example when the server stops on its own.
pub async fn cancel_on_signal(shutdown: CancellationToken) -> io::Result<()> {
    tokio::select! {
        received = termination() => {
            info!("📡 Received {}, shutting down", received?);
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
    Ok(())
}
