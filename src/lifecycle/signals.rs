//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGTERM / SIGINT and translate them to shutdown
//! - Surface SIGHUP as a topology reload request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers a reload, not shutdown

use tokio::signal;

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Stream of reload requests.
pub struct ReloadSignal {
    #[cfg(unix)]
    inner: Option<signal::unix::Signal>,
}

impl ReloadSignal {
    /// Register for SIGHUP. Without it, `recv` never resolves.
    pub fn new() -> Self {
        #[cfg(unix)]
        let inner = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                tracing::warn!(error = %e, "SIGHUP reload unavailable");
                None
            }
        };

        Self {
            #[cfg(unix)]
            inner,
        }
    }

    pub async fn recv(&mut self) {
        #[cfg(unix)]
        let fired = match self.inner.as_mut() {
            Some(sig) => sig.recv().await.is_some(),
            None => false,
        };
        #[cfg(not(unix))]
        let fired = false;

        if fired {
            tracing::info!("Received SIGHUP");
        } else {
            std::future::pending::<()>().await
        }
    }
}

impl Default for ReloadSignal {
    fn default() -> Self {
        Self::new()
    }
}
