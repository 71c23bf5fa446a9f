//! Ctrl+C / SIGTERM handling.
//!
//! The first signal cancels a [`CancellationToken`]; album runs check it
//! between items, so the item in flight always finishes. A second signal
//! exits immediately with status 130.

use tokio_util::sync::CancellationToken;

/// Exit status for a forced stop (128 + SIGINT).
const FORCE_EXIT_CODE: i32 = 130;

#[cfg(unix)]
async fn next_signal(sigterm: &mut Option<tokio::signal::unix::Signal>) {
    match sigterm {
        Some(sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        None => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

/// Install signal handlers and return the token they cancel.
pub(crate) fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        let mut sigterm = {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!("Failed to register SIGTERM handler: {}", e);
                    None
                }
            }
        };

        let mut received = 0u32;
        loop {
            #[cfg(unix)]
            next_signal(&mut sigterm).await;
            #[cfg(not(unix))]
            let _ = tokio::signal::ctrl_c().await;

            received += 1;
            if received == 1 {
                tracing::info!("Received shutdown signal, finishing the current item...");
                tracing::info!("Press Ctrl+C again to force exit");
                handler_token.cancel();
            } else {
                tracing::warn!("Force exit requested");
                std::process::exit(FORCE_EXIT_CODE);
            }
        }
    });

    token
}
