use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DriverError, Result};

/// Adapter-local transaction flag.
///
/// The flag is true only between a successful BEGIN and its matching
/// COMMIT/ROLLBACK. Transitions are validated here, before any engine round
/// trip, so illegal ones fail without touching the wire. Nested transactions
/// are rejected.
#[derive(Debug, Default)]
pub struct TxnState {
    open: AtomicBool,
}

impl TxnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Marks a transaction as open. Fails if one already is.
    pub fn begin(&self) -> Result<()> {
        if self.open.swap(true, Ordering::SeqCst) {
            return Err(DriverError::Transaction(
                "already in a transaction (nesting is not supported)".to_string(),
            ));
        }
        Ok(())
    }

    /// Clears the flag for COMMIT. Fails if no transaction is open.
    pub fn commit(&self) -> Result<()> {
        self.close("cannot commit when not in a transaction")
    }

    /// Clears the flag for ROLLBACK. Fails if no transaction is open.
    pub fn rollback(&self) -> Result<()> {
        self.close("cannot rollback when not in a transaction")
    }

    /// Undoes a `begin` whose BEGIN round trip failed.
    pub fn abort_begin(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Re-marks the transaction open after a COMMIT/ROLLBACK round trip
    /// failed. The engine-side transaction is still live in that case, so the
    /// flag must keep reporting it.
    pub fn restore_open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    fn close(&self, message: &str) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(DriverError::Transaction(message.to_string()));
        }
        Ok(())
    }
}
