//! Binding to an external motion/logic control API.
//!
//! The controller addresses process variables by UTF-16 symbol name. A real
//! binding wraps the vendor library behind [`ControlApi`]; [`SimulatedApi`]
//! keeps the variables in memory for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Handle of an open controller connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u32);

/// Failures reported by the control API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The controller refused or did not answer the connection request.
    #[error("connection refused: 0x{0:08X}")]
    ConnectFailed(u32),

    /// The handle does not name an open connection.
    #[error("invalid connection handle {0:?}")]
    InvalidHandle(ConnectionHandle),

    /// No variable with this symbol exists on the controller.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// The call reached the controller but failed there.
    #[error("call failed: 0x{0:08X}")]
    CallFailed(u32),
}

/// Encode a symbol name the way the controller expects it.
#[must_use]
pub fn encode_symbol(name: &str) -> Vec<u16> {
    name.encode_utf16().collect()
}

/// Operations the process-interface blocks need from the controller.
pub trait ControlApi: Send + Sync + std::fmt::Debug {
    /// Open a connection to the local controller.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ConnectFailed`] if the controller is not reachable.
    fn connect(&self) -> Result<ConnectionHandle, ApiError>;

    /// Close `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidHandle`] if `handle` is not open.
    fn disconnect(&self, handle: ConnectionHandle) -> Result<(), ApiError>;

    /// Read the BOOL variable named by `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid handle, an unknown symbol, or a failed call.
    fn read_bool(&self, handle: ConnectionHandle, symbol: &[u16]) -> Result<bool, ApiError>;

    /// Write the BOOL variable named by `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid handle, an unknown symbol, or a failed call.
    fn write_bool(
        &self,
        handle: ConnectionHandle,
        symbol: &[u16],
        value: bool,
    ) -> Result<(), ApiError>;
}

#[derive(Debug, Default)]
struct SimState {
    symbols: HashMap<Vec<u16>, bool>,
    open: Option<ConnectionHandle>,
    next_handle: u32,
    refuse_connects: usize,
    fail_calls: bool,
}

/// In-memory controller.
#[derive(Debug, Default)]
pub struct SimulatedApi {
    state: Mutex<SimState>,
    connect_attempts: AtomicUsize,
    disconnects: AtomicUsize,
}

impl SimulatedApi {
    /// Create a controller with no variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add variable `name` with initial `value`.
    #[must_use]
    pub fn with_symbol(self, name: &str, value: bool) -> Self {
        self.set_symbol(name, value);
        self
    }

    /// Refuse the next `count` connection attempts.
    #[must_use]
    pub fn refusing_connects(self, count: usize) -> Self {
        self.lock().refuse_connects = count;
        self
    }

    /// Make every read and write fail at the controller.
    pub fn set_fail_calls(&self, fail: bool) {
        self.lock().fail_calls = fail;
    }

    /// Set variable `name` (for testing).
    pub fn set_symbol(&self, name: &str, value: bool) {
        self.lock().symbols.insert(encode_symbol(name), value);
    }

    /// Current value of variable `name`.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<bool> {
        self.lock().symbols.get(&encode_symbol(name)).copied()
    }

    /// Connection attempts so far, refused ones included.
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Successful disconnects so far.
    #[must_use]
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // The state stays consistent even if a holder panicked
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_call(state: &SimState, handle: ConnectionHandle) -> Result<(), ApiError> {
        if state.open != Some(handle) {
            return Err(ApiError::InvalidHandle(handle));
        }
        if state.fail_calls {
            return Err(ApiError::CallFailed(0xF036_0001));
        }
        Ok(())
    }
}

impl ControlApi for SimulatedApi {
    fn connect(&self) -> Result<ConnectionHandle, ApiError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        if state.refuse_connects > 0 {
            state.refuse_connects -= 1;
            return Err(ApiError::ConnectFailed(0xF036_0002));
        }
        state.next_handle += 1;
        let handle = ConnectionHandle(state.next_handle);
        state.open = Some(handle);
        Ok(handle)
    }

    fn disconnect(&self, handle: ConnectionHandle) -> Result<(), ApiError> {
        let mut state = self.lock();
        if state.open != Some(handle) {
            return Err(ApiError::InvalidHandle(handle));
        }
        state.open = None;
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_bool(&self, handle: ConnectionHandle, symbol: &[u16]) -> Result<bool, ApiError> {
        let state = self.lock();
        Self::check_call(&state, handle)?;
        state
            .symbols
            .get(symbol)
            .copied()
            .ok_or_else(|| ApiError::UnknownSymbol(String::from_utf16_lossy(symbol)))
    }

    fn write_bool(
        &self,
        handle: ConnectionHandle,
        symbol: &[u16],
        value: bool,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        Self::check_call(&state, handle)?;
        match state.symbols.get_mut(symbol) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ApiError::UnknownSymbol(String::from_utf16_lossy(symbol))),
        }
    }
}
