//! Connection state machine.
//!
//! A pure lookup over per-trigger transition tables. A status missing from a
//! trigger's table has no valid transition: [`transition`] returns it
//! unchanged together with `false`, and the caller must not persist anything.

use e2mgr_storage::ConnectionStatus;
use std::fmt;

use ConnectionStatus::*;

/// Event driving a connection status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Operator shutdown of every node
    DeleteAll,
    /// Shutdown grace period elapsed
    DeleteAllTimeout,
    /// RAN accepted the setup request
    SetupSuccess,
    /// RAN rejected the setup request
    SetupFailure,
    /// Association with the RAN was lost
    LostConnection,
    /// A reconnection attempt is about to be made
    ReconnectionAttempt,
    /// Reconnection attempts are used up
    ReconnectionExhausted,
}

impl Trigger {
    /// Transition table for this trigger
    pub fn table(&self) -> &'static [(ConnectionStatus, ConnectionStatus)] {
        match self {
            Trigger::DeleteAll => DELETE_ALL,
            Trigger::DeleteAllTimeout => DELETE_ALL_TIMEOUT,
            Trigger::SetupSuccess => SETUP_SUCCESS,
            Trigger::SetupFailure => SETUP_FAILURE,
            Trigger::LostConnection => LOST_CONNECTION,
            Trigger::ReconnectionAttempt => RECONNECTION_ATTEMPT,
            Trigger::ReconnectionExhausted => RECONNECTION_EXHAUSTED,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::DeleteAll => "delete-all",
            Trigger::DeleteAllTimeout => "delete-all-timeout",
            Trigger::SetupSuccess => "setup-success",
            Trigger::SetupFailure => "setup-failure",
            Trigger::LostConnection => "lost-connection",
            Trigger::ReconnectionAttempt => "reconnection-attempt",
            Trigger::ReconnectionExhausted => "reconnection-exhausted",
        };
        f.write_str(name)
    }
}

const DELETE_ALL: &[(ConnectionStatus, ConnectionStatus)] = &[
    (Connecting, ShuttingDown),
    (Connected, ShuttingDown),
    (ConnectedSetupFailed, ShuttingDown),
    (Disconnected, ShutDown),
];

const DELETE_ALL_TIMEOUT: &[(ConnectionStatus, ConnectionStatus)] = &[(ShuttingDown, ShutDown)];

const SETUP_SUCCESS: &[(ConnectionStatus, ConnectionStatus)] =
    &[(Connecting, Connected), (Connected, Connected)];

const SETUP_FAILURE: &[(ConnectionStatus, ConnectionStatus)] = &[
    (Connecting, ConnectedSetupFailed),
    (Connected, ConnectedSetupFailed),
];

const LOST_CONNECTION: &[(ConnectionStatus, ConnectionStatus)] = &[
    (Connecting, Disconnected),
    (Connected, Disconnected),
    (ConnectedSetupFailed, Disconnected),
    (ShuttingDown, ShutDown),
];

const RECONNECTION_ATTEMPT: &[(ConnectionStatus, ConnectionStatus)] = &[
    (Unknown, Connecting),
    (Connecting, Connecting),
    (Connected, Connecting),
    (ConnectedSetupFailed, Connecting),
    (Disconnected, Connecting),
];

const RECONNECTION_EXHAUSTED: &[(ConnectionStatus, ConnectionStatus)] = &[
    (Unknown, Disconnected),
    (Connecting, Disconnected),
    (Connected, Disconnected),
    (ConnectedSetupFailed, Disconnected),
    (ShuttingDown, ShutDown),
];

/// Next status for `current` under `trigger`, and whether the transition is valid
pub fn transition(current: ConnectionStatus, trigger: Trigger) -> (ConnectionStatus, bool) {
    trigger
        .table()
        .iter()
        .find(|(from, _)| *from == current)
        .map(|(_, to)| (*to, true))
        .unwrap_or((current, false))
}

/// Next status, or `None` when the transition is invalid
pub fn next_state(current: ConnectionStatus, trigger: Trigger) -> Option<ConnectionStatus> {
    match transition(current, trigger) {
        (next, true) => Some(next),
        (_, false) => None,
    }
}
