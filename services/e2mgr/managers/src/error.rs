//! Manager error types.

use e2mgr_session::TransportError;
use e2mgr_storage::{E2ApplicationProtocol, StoreError};
use e2mgr_wire::WireError;
use thiserror::Error;

/// Manager errors
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Topology store failure
    #[error("rnib error: {0}")]
    Store(#[from] StoreError),

    /// Transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Encoding failure
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Node is provisioned with a protocol we cannot set up
    #[error("unsupported application protocol {protocol:?} for {ran_name}")]
    UnsupportedProtocol {
        /// RAN name
        ran_name: String,
        /// Provisioned protocol
        protocol: E2ApplicationProtocol,
    },
}
