//! Interrupt handling: signals are listened for once per command and turned
//! into a [`CancellationToken`] every phase of the command selects on.

use tokio_util::sync::CancellationToken;

/// Start listening for SIGINT/SIGTERM and return a token cancelled on the first one.
///
/// A signal that arrives while no phase is waiting stays recorded in the token.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
    });
    token
}

/// Resolves on SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Registration may fail in restricted environments (containers, tests).
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(
                error = %e,
                "could not register SIGTERM handler, waiting for SIGINT only"
            );
            ctrl_c_or_never().await;
        }
        (_, Err(e)) => {
            tracing::warn!(
                error = %e,
                "could not register SIGINT handler, waiting for SIGTERM only"
            );
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("received SIGTERM");
            } else {
                ctrl_c_or_never().await;
            }
        }
    }
}

/// Resolves on Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c_or_never().await;
}

/// A failed registration must not look like an interrupt, so it waits forever instead.
async fn ctrl_c_or_never() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
