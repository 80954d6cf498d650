use std::sync::Arc;

use tokio::sync::Notify;

/// Window controls requested by the front end
pub trait ShellWindow: Send + Sync {
    fn minimize(&self);
    fn maximize(&self);
    fn close(&self);
}

/// Stand-in for a native window when the front end runs elsewhere.
///
/// Closing it asks the launcher to shut down.
pub struct HeadlessWindow {
    shutdown: Arc<Notify>,
}

impl HeadlessWindow {
    pub fn new(shutdown: Arc<Notify>) -> Self {
        Self { shutdown }
    }
}

impl ShellWindow for HeadlessWindow {
    fn minimize(&self) {
        tracing::debug!("Minimize requested; no native window to minimize");
    }

    fn maximize(&self) {
        tracing::debug!("Maximize requested; no native window to maximize");
    }

    fn close(&self) {
        tracing::info!("Close requested, shutting down");
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn close_signals_shutdown() {
        let shutdown = Arc::new(Notify::new());
        let window = HeadlessWindow::new(shutdown.clone());

        window.minimize();
        window.close();

        tokio::time::timeout(Duration::from_secs(1), shutdown.notified())
            .await
            .expect("shutdown was not signalled");
    }
}
