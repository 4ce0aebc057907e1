//! Graceful shutdown handling for the runner.
//!
//! An interrupt only raises a flag. The tick loop checks it between ticks, so
//! a run never stops with a tick half applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag between the signal handler and the tick loop.
#[derive(Clone)]
pub struct ShutdownManager {
    shutdown_requested: Arc<AtomicBool>,
    exit_code: i32,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            exit_code: 0,
        }
    }

    /// Requests shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        tracing::info!("Shutdown requested");
    }

    /// Checks if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Raises the flag on Ctrl+C. Needs a running tokio runtime.
    pub fn listen_for_interrupt(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl+C received, stopping after the current tick");
                manager.request_shutdown();
            }
        });
    }

    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_manager_new() {
        let manager = ShutdownManager::new();
        assert!(!manager.is_shutdown_requested());
        assert_eq!(manager.exit_code(), 0);
    }

    #[test]
    fn test_shutdown_request_is_shared_by_clones() {
        let manager = ShutdownManager::new();
        let handle = manager.clone();
        handle.request_shutdown();
        assert!(manager.is_shutdown_requested());
    }

    #[test]
    fn test_exit_code() {
        let mut manager = ShutdownManager::new();
        manager.set_exit_code(1);
        assert_eq!(manager.exit_code(), 1);
    }
}
