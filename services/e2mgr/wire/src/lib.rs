//! Message buffers, framing and payload codecs for the E2 manager.
//!
//! This crate provides the transport-facing data types of the E2 manager:
//! the [`MBuf`] message buffer and RIC message type numbering, the
//! length-prefixed frame format used on the message transport, the pluggable
//! RAN payload codec, and payload header templating.
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------+
//! | u32 frame_len        | length of bytes that follow|
//! +----------------------+----------------------------+
//! | Frame Header (13B)   | version, type, lengths     |
//! +----------------------+----------------------------+
//! | meid                 | variable (0..256B)         |
//! +----------------------+----------------------------+
//! | xaction              | variable (0..256B)         |
//! +----------------------+----------------------------+
//! | payload              | variable (0..max_msg_size) |
//! +----------------------+----------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod frame;
pub mod header;
pub mod message;
pub mod template;

// Re-export main types
pub use codec::{
    CborCodec, CellLoadInformation, ConfigurationUpdate, ConfigurationUpdateAck,
    ConfigurationUpdateFailure, E2RequestMessage, E2TermInitPayload, FailureCause,
    HighInterferenceInformation, InterferenceOverload, LoadInformation, ProtocolCodec,
    RelativeNarrowbandTxPower, ResetResponse, RicIdentity, SetupFailure, SetupProtocol,
    SetupRequest, SetupResponse, WireNodeType, SETUP_REQUEST_HEADER,
};
pub use error::WireError;
pub use frame::{encode_frame, encoded_size, FrameDecoder, DEFAULT_MAX_MSG_SIZE, HARD_MAX_MSG_SIZE};
pub use header::{FrameHeader, FRAME_HEADER_SIZE, WIRE_VERSION};
pub use message::{
    message_type_name, MBuf, RIC_E2_TERM_INIT, RIC_ENB_CONF_UPDATE, RIC_ENB_CONF_UPDATE_ACK,
    RIC_ENB_CONF_UPDATE_FAILURE, RIC_ENB_LOAD_INFORMATION, RIC_ENDC_CONF_UPDATE,
    RIC_ENDC_CONF_UPDATE_ACK, RIC_ENDC_CONF_UPDATE_FAILURE, RIC_ENDC_X2_SETUP_FAILURE,
    RIC_ENDC_X2_SETUP_REQ, RIC_ENDC_X2_SETUP_RESP, RIC_SCTP_CLEAR_ALL, RIC_SCTP_CONNECTION_FAILURE,
    RIC_X2_RESET, RIC_X2_RESET_RESP, RIC_X2_SETUP_FAILURE, RIC_X2_SETUP_REQ, RIC_X2_SETUP_RESP,
};
pub use template::{
    expand_payload_header, FieldAccessor, FieldValue, TemplateFields, TransactionCounter,
};
