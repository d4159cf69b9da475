//! The single controller connection shared by every process-interface block.
//!
//! The connection opens lazily on the first `initialise` of any block. When
//! the controller is not ready yet (typical right after boot) the first
//! caller retries up to `connect_retries` times, sleeping `retry_interval`
//! between attempts, while holding the guard so other blocks wait for the
//! outcome instead of racing their own attempts. `disconnect` closes the
//! connection for good.

use crate::api::{ConnectionHandle, ControlApi};
use fb_common::ProcessConfig;
use static_assertions::assert_impl_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Idle,
    Open(ConnectionHandle),
    Closed,
}

/// Process-wide controller connection.
#[derive(Debug)]
pub struct SharedConnection {
    api: Arc<dyn ControlApi>,
    config: ProcessConfig,
    link: Mutex<Link>,
}

assert_impl_all!(SharedConnection: Send, Sync);

impl SharedConnection {
    /// Wrap `api`; nothing is opened until first use.
    #[must_use]
    pub fn new(api: Arc<dyn ControlApi>, config: ProcessConfig) -> Self {
        Self {
            api,
            config,
            link: Mutex::new(Link::Idle),
        }
    }

    fn link(&self) -> MutexGuard<'_, Link> {
        // A panic cannot leave the link half-written
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the connection if needed. Returns true once it is open.
    pub fn ensure_connected(&self) -> bool {
        let mut link = self.link();
        match *link {
            Link::Open(_) => return true,
            Link::Closed => {
                warn!("Controller connection already torn down");
                return false;
            }
            Link::Idle => {}
        }

        let mut attempt = 0;
        loop {
            info!(attempt, "Trying to connect to the control API");
            match self.api.connect() {
                Ok(handle) => {
                    info!(?handle, "Connection to the control API succeeded");
                    *link = Link::Open(handle);
                    return true;
                }
                Err(e) => {
                    error!(attempt, error = %e, "Failed to connect to the control API");
                }
            }
            if attempt >= self.config.connect_retries {
                return false;
            }
            attempt += 1;
            std::thread::sleep(self.config.retry_interval);
        }
    }

    /// Returns true while the connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.link(), Link::Open(_))
    }

    /// Run `f` against the open connection, or return `None` if none is open.
    pub fn with_api<R>(&self, f: impl FnOnce(&dyn ControlApi, ConnectionHandle) -> R) -> Option<R> {
        let link = self.link();
        match *link {
            Link::Open(handle) => Some(f(self.api.as_ref(), handle)),
            Link::Idle | Link::Closed => None,
        }
    }

    /// Close the connection. Only the first call reaches the controller;
    /// afterwards the connection cannot be reopened.
    ///
    /// Returns true if this call closed an open connection.
    pub fn disconnect(&self) -> bool {
        let mut link = self.link();
        let previous = std::mem::replace(&mut *link, Link::Closed);
        let Link::Open(handle) = previous else {
            return false;
        };
        match self.api.disconnect(handle) {
            Ok(()) => {
                info!(?handle, "Disconnected from the control API");
                true
            }
            Err(e) => {
                error!(?handle, error = %e, "Error on disconnect from the control API");
                false
            }
        }
    }
}

impl Drop for SharedConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
