//! Ctrl+C handling

use cfgsync_core::CancellationToken;

/// Exit code after a second interrupt, as a shell reports SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Token cancelled by the first Ctrl+C.
///
/// The running job stops at its next checkpoint. A second Ctrl+C exits
/// immediately. Without a listener the token is never cancelled.
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    let spawned = std::thread::Builder::new()
        .name("cfgsync-interrupt".into())
        .spawn(move || listen(handle));
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Ctrl+C will not cancel the running job");
    }
    token
}

fn listen(token: CancellationToken) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to start interrupt listener");
            return;
        }
    };

    runtime.block_on(async {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            if token.is_cancelled() {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
            tracing::warn!("Interrupted, cancelling after the current object");
            token.cancel();
        }
    });
}
