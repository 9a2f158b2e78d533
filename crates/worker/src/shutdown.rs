//! Signal handling.
//!
//! The first SIGHUP, SIGINT, SIGQUIT, or SIGTERM cancels the root token so
//! consumers finish their in-flight message and return. A second signal
//! exits immediately with status 1.

use tokio_util::sync::CancellationToken;

/// Watch for termination signals for the life of the process.
pub fn spawn_signal_handler(cancel: CancellationToken) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let mut signals = Signals::install()?;
    Ok(tokio::spawn(async move {
        let name = signals.recv().await;
        tracing::info!(signal = name, "Shutdown requested, draining in-flight work");
        cancel.cancel();

        let name = signals.recv().await;
        tracing::warn!(signal = name, "Second signal received, exiting immediately");
        std::process::exit(1);
    }))
}

#[cfg(unix)]
struct Signals {
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            interrupt: signal(SignalKind::interrupt())?,
            quit: signal(SignalKind::quit())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.quit.recv() => "SIGQUIT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "ctrl-c"
    }
}
