//! Connection management for RAN nodes.
//!
//! This crate provides the connection state machine and the managers that
//! drive nodes through it: [`RanSetupManager`] sends setup requests,
//! [`RanStatusChangeManager`] applies transitions with compare-and-set
//! writes, [`RanReconnectionManager`] enforces the attempt budget, and
//! [`DeleteAllManager`] shuts the whole topology down.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod delete_all;
pub mod error;
pub mod reconnection;
pub mod setup;
pub mod state_machine;
pub mod status_change;

// Re-export main types
pub use delete_all::{DeleteAllManager, DeleteAllSummary};
pub use error::ManagerError;
pub use reconnection::{RanReconnectionManager, ReconnectOutcome};
pub use setup::{RanSetupManager, SetupInitiator};
pub use state_machine::{next_state, transition, Trigger};
pub use status_change::{RanStatusChangeManager, StatusChange};
