//! Process signal handling.

use tokio::signal::unix::{SignalKind, signal};

/// Completes once the process receives SIGINT, SIGTERM or SIGHUP.
///
/// Signals whose handler cannot be installed are ignored. If none can be installed the
/// future never completes.
pub async fn await_termination() {
    let mut sig_int = signal(SignalKind::interrupt()).ok();
    let mut sig_term = signal(SignalKind::terminate()).ok();
    let mut sig_hup = signal(SignalKind::hangup()).ok();

    tokio::select! {
        Some(_) = async { sig_int.as_mut()?.recv().await } => {
            tracing::info!("Received SIGINT. Shutting down...");
        },
        Some(_) = async { sig_term.as_mut()?.recv().await } => {
            tracing::info!("Received SIGTERM. Shutting down...");
        },
        Some(_) = async { sig_hup.as_mut()?.recv().await } => {
            tracing::info!("Received SIGHUP. Shutting down...");
        },
        else => std::future::pending::<()>().await,
    }
}
