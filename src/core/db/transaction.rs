/// Transaction Control Module
///
/// Tracks whether a transaction is open on a connection and rejects
/// out-of-sequence begin/commit/rollback calls before they reach the driver.
/// Nested transactions and savepoints are not supported.

use crate::core::db::connection::ConnectionProvider;
use crate::core::{DalError, Result};
use std::fmt;
use tracing::{debug, warn};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Idle,
    /// Transaction in progress
    Active,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Idle => write!(f, "idle"),
            TransactionState::Active => write!(f, "active"),
        }
    }
}

/// Enforces Idle → Active → Idle over a borrowed connection.
#[derive(Debug)]
pub struct TransactionController<'c, P> {
    conn: &'c P,
    state: TransactionState,
}

impl<'c, P: ConnectionProvider> TransactionController<'c, P> {
    pub fn new(conn: &'c P) -> Self {
        TransactionController {
            conn,
            state: TransactionState::Idle,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns `DalError::TransactionState` if one is already active; driver
    /// failures propagate and leave the state Idle.
    pub fn begin(&mut self) -> Result<()> {
        self.require("begin", TransactionState::Idle)?;
        self.conn.begin_transaction()?;
        self.state = TransactionState::Active;
        debug!("transaction started");
        Ok(())
    }

    /// Commits the active transaction.
    ///
    /// If the driver fails, the state is taken from the connection before
    /// the error is returned: a transaction the backend already ended goes
    /// back to Idle, one that is still open (e.g. busy) stays Active.
    pub fn commit(&mut self) -> Result<()> {
        self.require("commit", TransactionState::Active)?;
        if let Err(e) = self.conn.commit() {
            self.resync("commit");
            return Err(e);
        }
        self.state = TransactionState::Idle;
        debug!("transaction committed");
        Ok(())
    }

    /// Rolls back the active transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.require("rollback", TransactionState::Active)?;
        if let Err(e) = self.conn.rollback() {
            self.resync("rollback");
            return Err(e);
        }
        self.state = TransactionState::Idle;
        debug!("transaction rolled back");
        Ok(())
    }

    fn resync(&mut self, operation: &'static str) {
        self.state = if self.conn.in_transaction() {
            TransactionState::Active
        } else {
            TransactionState::Idle
        };
        warn!(operation, state = %self.state, "driver failed, state taken from connection");
    }

    fn require(&self, operation: &'static str, expected: TransactionState) -> Result<()> {
        if self.state != expected {
            warn!(operation, state = %self.state, "rejected transaction transition");
            return Err(DalError::TransactionState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}
