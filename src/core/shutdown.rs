//! # Process termination signals.
//!
//! [`wait_for_shutdown_signal`] resolves on the first of:
//! - Unix: `SIGINT`, `SIGTERM` or `SIGQUIT`
//! - elsewhere: Ctrl-C
//!
//! Used by `Engine::interrupt_on_shutdown_signal`.

use std::io;

/// Resolves when the process is asked to terminate.
///
/// Fails if a signal handler cannot be installed.
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;

        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = quit.recv() => "SIGQUIT",
        };
        tracing::debug!(signal = name, "termination signal");
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
