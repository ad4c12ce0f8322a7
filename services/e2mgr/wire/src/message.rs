//! Message buffers and RIC message type numbering.

use bytes::Bytes;
use std::fmt;

/// X2 setup request sent towards a RAN
pub const RIC_X2_SETUP_REQ: i32 = 10060;
/// X2 setup response from a RAN
pub const RIC_X2_SETUP_RESP: i32 = 10061;
/// X2 setup failure from a RAN
pub const RIC_X2_SETUP_FAILURE: i32 = 10062;
/// X2 reset request from a RAN
pub const RIC_X2_RESET: i32 = 10070;
/// X2 reset response
pub const RIC_X2_RESET_RESP: i32 = 10071;
/// ENB load information indication
pub const RIC_ENB_LOAD_INFORMATION: i32 = 10020;
/// ENB configuration update
pub const RIC_ENB_CONF_UPDATE: i32 = 10080;
/// ENB configuration update acknowledge
pub const RIC_ENB_CONF_UPDATE_ACK: i32 = 10081;
/// ENB configuration update failure
pub const RIC_ENB_CONF_UPDATE_FAILURE: i32 = 10082;
/// ENDC X2 setup request sent towards a RAN
pub const RIC_ENDC_X2_SETUP_REQ: i32 = 10360;
/// ENDC X2 setup response from a RAN
pub const RIC_ENDC_X2_SETUP_RESP: i32 = 10361;
/// ENDC X2 setup failure from a RAN
pub const RIC_ENDC_X2_SETUP_FAILURE: i32 = 10362;
/// ENDC configuration update
pub const RIC_ENDC_CONF_UPDATE: i32 = 10370;
/// ENDC configuration update acknowledge
pub const RIC_ENDC_CONF_UPDATE_ACK: i32 = 10371;
/// ENDC configuration update failure
pub const RIC_ENDC_CONF_UPDATE_FAILURE: i32 = 10372;
/// SCTP association towards a RAN was lost
pub const RIC_SCTP_CONNECTION_FAILURE: i32 = 1080;
/// Ask the E2 terminator to drop every SCTP association
pub const RIC_SCTP_CLEAR_ALL: i32 = 1090;
/// E2 terminator (re)started
pub const RIC_E2_TERM_INIT: i32 = 1100;

/// Human readable name for a message type. Unmapped values yield `"UNKNOWN"`.
pub fn message_type_name(msg_type: i32) -> &'static str {
    match msg_type {
        RIC_X2_SETUP_REQ => "RIC_X2_SETUP_REQ",
        RIC_X2_SETUP_RESP => "RIC_X2_SETUP_RESP",
        RIC_X2_SETUP_FAILURE => "RIC_X2_SETUP_FAILURE",
        RIC_X2_RESET => "RIC_X2_RESET",
        RIC_X2_RESET_RESP => "RIC_X2_RESET_RESP",
        RIC_ENB_LOAD_INFORMATION => "RIC_ENB_LOAD_INFORMATION",
        RIC_ENB_CONF_UPDATE => "RIC_ENB_CONF_UPDATE",
        RIC_ENB_CONF_UPDATE_ACK => "RIC_ENB_CONF_UPDATE_ACK",
        RIC_ENB_CONF_UPDATE_FAILURE => "RIC_ENB_CONF_UPDATE_FAILURE",
        RIC_ENDC_X2_SETUP_REQ => "RIC_ENDC_X2_SETUP_REQ",
        RIC_ENDC_X2_SETUP_RESP => "RIC_ENDC_X2_SETUP_RESP",
        RIC_ENDC_X2_SETUP_FAILURE => "RIC_ENDC_X2_SETUP_FAILURE",
        RIC_ENDC_CONF_UPDATE => "RIC_ENDC_CONF_UPDATE",
        RIC_ENDC_CONF_UPDATE_ACK => "RIC_ENDC_CONF_UPDATE_ACK",
        RIC_ENDC_CONF_UPDATE_FAILURE => "RIC_ENDC_CONF_UPDATE_FAILURE",
        RIC_SCTP_CONNECTION_FAILURE => "RIC_SCTP_CONNECTION_FAILURE",
        RIC_SCTP_CLEAR_ALL => "RIC_SCTP_CLEAR_ALL",
        RIC_E2_TERM_INIT => "RIC_E2_TERM_INIT",
        _ => "UNKNOWN",
    }
}

/// A message as carried by the transport.
///
/// `meid` identifies the RAN the message concerns and is the per-node
/// ordering key on the inbound path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MBuf {
    /// Message type, the dispatch key
    pub msg_type: i32,
    /// Managed element id (RAN name)
    pub meid: String,
    /// Opaque application payload
    pub payload: Bytes,
    /// Transaction id
    pub xaction: Bytes,
}

impl MBuf {
    /// Create a new message buffer
    pub fn new(
        msg_type: i32,
        meid: impl Into<String>,
        payload: impl Into<Bytes>,
        xaction: impl Into<Bytes>,
    ) -> Self {
        Self {
            msg_type,
            meid: meid.into(),
            payload: payload.into(),
            xaction: xaction.into(),
        }
    }

    /// Transaction id rendered as text, lossy for non UTF-8 ids
    pub fn xaction_str(&self) -> String {
        String::from_utf8_lossy(&self.xaction).into_owned()
    }
}

impl fmt::Display for MBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) meid={} len={}",
            message_type_name(self.msg_type),
            self.msg_type,
            self.meid,
            self.payload.len()
        )
    }
}
