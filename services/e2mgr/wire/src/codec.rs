//! Payload codecs for the messages the E2 manager interprets.
//!
//! The RAN application protocol grammar is pluggable through [`ProtocolCodec`];
//! the bundled [`CborCodec`] carries setup outcomes as canonical CBOR.

use crate::template::{expand_payload_header, FieldAccessor, FieldValue, TemplateFields};
use crate::WireError;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node type reported by a RAN in its setup response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireNodeType {
    /// LTE eNB
    Enb,
    /// NR gNB
    Gnb,
}

/// Successful X2 / ENDC X2 setup outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupResponse {
    /// PLMN identity of the responding node
    pub plmn_id: String,
    /// Node id within the PLMN
    pub nb_id: String,
    /// Node type
    pub node_type: WireNodeType,
    /// Served cell ids
    #[serde(default)]
    pub served_cells: Vec<String>,
}

/// Cause carried by a setup failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "group", content = "value", rename_all = "snake_case")]
pub enum FailureCause {
    /// Radio network layer cause
    RadioNetwork(String),
    /// Transport layer cause
    Transport(String),
    /// Protocol cause
    Protocol(String),
    /// Miscellaneous cause
    Misc(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::RadioNetwork(v) => write!(f, "radio network: {}", v),
            FailureCause::Transport(v) => write!(f, "transport: {}", v),
            FailureCause::Protocol(v) => write!(f, "protocol: {}", v),
            FailureCause::Misc(v) => write!(f, "misc: {}", v),
        }
    }
}

/// Unsuccessful X2 / ENDC X2 setup outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupFailure {
    /// Failure cause
    pub cause: FailureCause,
    /// Seconds the RAN asks us to wait before retrying
    #[serde(default)]
    pub time_to_wait_sec: Option<u32>,
}

/// Setup protocol variant of an outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupProtocol {
    /// X2 setup
    X2,
    /// EN-DC X2 setup
    EndcX2,
}

/// Global RIC identity advertised in setup requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicIdentity {
    /// 20-bit RIC id as 5 hex characters
    pub ric_id: String,
    /// Mobile country code, 3 digits
    pub mcc: String,
    /// Mobile network code, 2 or 3 digits
    pub mnc: String,
}

impl RicIdentity {
    /// PLMN identity in TBCD encoding, as 6 hex characters.
    ///
    /// A 2-digit MNC is padded with the filler nibble `f`.
    pub fn plmn_id(&self) -> Result<String, WireError> {
        let mcc: Vec<char> = self.mcc.chars().collect();
        let mut mnc: Vec<char> = self.mnc.chars().collect();
        let digits_ok = mcc.iter().chain(mnc.iter()).all(|c| c.is_ascii_digit());
        if mcc.len() != 3 || !(2..=3).contains(&mnc.len()) || !digits_ok {
            return Err(WireError::Encode {
                message: "plmn id",
                reason: format!("invalid mcc {:?} / mnc {:?}", self.mcc, self.mnc),
            });
        }
        if mnc.len() == 2 {
            mnc.push('f');
        }
        Ok([mcc[1], mcc[0], mnc[2], mcc[2], mnc[1], mnc[0]]
            .iter()
            .collect())
    }
}

/// Outbound setup request PDU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupRequest {
    /// Setup variant
    pub protocol: SetupProtocol,
    /// RIC PLMN identity
    pub plmn_id: String,
    /// RIC id
    pub ric_id: String,
}

impl SetupRequest {
    /// Build a request advertising `ric`
    pub fn for_ric(protocol: SetupProtocol, ric: &RicIdentity) -> Result<Self, WireError> {
        Ok(Self {
            protocol,
            plmn_id: ric.plmn_id()?,
            ric_id: ric.ric_id.clone(),
        })
    }
}

/// ENB or ENDC configuration update sent by a RAN
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationUpdate {
    /// Cells the RAN started serving
    #[serde(default)]
    pub served_cells_to_add: Vec<String>,
    /// Cells whose configuration changed
    #[serde(default)]
    pub served_cells_to_modify: Vec<String>,
    /// Cells the RAN stopped serving
    #[serde(default)]
    pub served_cells_to_delete: Vec<String>,
}

/// Positive answer to a configuration update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationUpdateAck {
    /// Criticality diagnostics, when any IE was ignored
    #[serde(default)]
    pub criticality_diagnostics: Option<String>,
}

/// Negative answer to a configuration update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationUpdateFailure {
    /// Failure cause
    pub cause: FailureCause,
}

/// Answer to a RAN initiated X2 reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Criticality diagnostics, when any IE was ignored
    #[serde(default)]
    pub criticality_diagnostics: Option<String>,
}

/// Uplink interference overload level of a physical resource block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterferenceOverload {
    /// High interference
    HighInterference,
    /// Medium interference
    MediumInterference,
    /// Low interference
    LowInterference,
}

/// High interference indication towards a neighbour cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighInterferenceInformation {
    /// Neighbour cell the indication targets
    pub target_cell_id: String,
    /// Per-PRB indication bitmap
    pub indication: String,
}

/// Relative narrowband TX power (RNTP)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeNarrowbandTxPower {
    /// Per-PRB RNTP bitmap
    pub rntp_per_prb: String,
    /// RNTP threshold in dB
    pub rntp_threshold_db: i8,
    /// Number of cell specific antenna ports
    pub antenna_ports: u8,
    /// PDSCH-to-RS EPRE ratio index
    pub p_b: u32,
    /// PDCCH interference impact
    pub pdcch_interference_impact: u32,
}

/// Load report for one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLoadInformation {
    /// Reporting cell
    pub cell_id: String,
    /// Uplink interference overload per PRB
    #[serde(default)]
    pub ul_interference_overload: Vec<InterferenceOverload>,
    /// High interference indications
    #[serde(default)]
    pub ul_high_interference: Vec<HighInterferenceInformation>,
    /// RNTP report
    #[serde(default)]
    pub relative_narrowband_tx_power: Option<RelativeNarrowbandTxPower>,
}

/// ENB load information PDU
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadInformation {
    /// Per-cell reports
    #[serde(default)]
    pub cells: Vec<CellLoadInformation>,
}

/// Decoder / encoder for the RAN application protocol payloads
pub trait ProtocolCodec: Send + Sync {
    /// Encode an outbound setup request PDU
    fn encode_setup_request(&self, message: &SetupRequest) -> Result<Bytes, WireError>;

    /// Decode a setup response payload
    fn decode_setup_response(&self, payload: &[u8]) -> Result<SetupResponse, WireError>;

    /// Decode a setup failure payload
    fn decode_setup_failure(&self, payload: &[u8]) -> Result<SetupFailure, WireError>;

    /// Encode a setup response payload
    fn encode_setup_response(&self, message: &SetupResponse) -> Result<Bytes, WireError>;

    /// Encode a setup failure payload
    fn encode_setup_failure(&self, message: &SetupFailure) -> Result<Bytes, WireError>;

    /// Decode a configuration update payload
    fn decode_configuration_update(&self, payload: &[u8]) -> Result<ConfigurationUpdate, WireError>;

    /// Encode a configuration update payload
    fn encode_configuration_update(&self, message: &ConfigurationUpdate) -> Result<Bytes, WireError>;

    /// Encode a configuration update acknowledge
    fn encode_configuration_update_ack(
        &self,
        message: &ConfigurationUpdateAck,
    ) -> Result<Bytes, WireError>;

    /// Encode a configuration update failure
    fn encode_configuration_update_failure(
        &self,
        message: &ConfigurationUpdateFailure,
    ) -> Result<Bytes, WireError>;

    /// Encode a reset response
    fn encode_reset_response(&self, message: &ResetResponse) -> Result<Bytes, WireError>;

    /// Decode a reset response
    fn decode_reset_response(&self, payload: &[u8]) -> Result<ResetResponse, WireError>;

    /// Decode an ENB load information payload
    fn decode_load_information(&self, payload: &[u8]) -> Result<LoadInformation, WireError>;

    /// Encode an ENB load information payload
    fn encode_load_information(&self, message: &LoadInformation) -> Result<Bytes, WireError>;
}

/// CBOR payload codec
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl CborCodec {
    fn decode<T: serde::de::DeserializeOwned>(
        message: &'static str,
        payload: &[u8],
    ) -> Result<T, WireError> {
        ciborium::from_reader(payload).map_err(|e| WireError::Decode {
            message,
            reason: e.to_string(),
        })
    }

    fn encode<T: Serialize>(message: &'static str, value: &T) -> Result<Bytes, WireError> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).map_err(|e| WireError::Encode {
            message,
            reason: e.to_string(),
        })?;
        Ok(Bytes::from(buf))
    }
}

impl ProtocolCodec for CborCodec {
    fn encode_setup_request(&self, message: &SetupRequest) -> Result<Bytes, WireError> {
        Self::encode("setup request", message)
    }

    fn decode_setup_response(&self, payload: &[u8]) -> Result<SetupResponse, WireError> {
        Self::decode("setup response", payload)
    }

    fn decode_setup_failure(&self, payload: &[u8]) -> Result<SetupFailure, WireError> {
        Self::decode("setup failure", payload)
    }

    fn encode_setup_response(&self, message: &SetupResponse) -> Result<Bytes, WireError> {
        Self::encode("setup response", message)
    }

    fn encode_setup_failure(&self, message: &SetupFailure) -> Result<Bytes, WireError> {
        Self::encode("setup failure", message)
    }

    fn decode_configuration_update(&self, payload: &[u8]) -> Result<ConfigurationUpdate, WireError> {
        Self::decode("configuration update", payload)
    }

    fn encode_configuration_update(&self, message: &ConfigurationUpdate) -> Result<Bytes, WireError> {
        Self::encode("configuration update", message)
    }

    fn encode_configuration_update_ack(
        &self,
        message: &ConfigurationUpdateAck,
    ) -> Result<Bytes, WireError> {
        Self::encode("configuration update ack", message)
    }

    fn encode_configuration_update_failure(
        &self,
        message: &ConfigurationUpdateFailure,
    ) -> Result<Bytes, WireError> {
        Self::encode("configuration update failure", message)
    }

    fn encode_reset_response(&self, message: &ResetResponse) -> Result<Bytes, WireError> {
        Self::encode("reset response", message)
    }

    fn decode_reset_response(&self, payload: &[u8]) -> Result<ResetResponse, WireError> {
        Self::decode("reset response", payload)
    }

    fn decode_load_information(&self, payload: &[u8]) -> Result<LoadInformation, WireError> {
        Self::decode("load information", payload)
    }

    fn encode_load_information(&self, message: &LoadInformation) -> Result<Bytes, WireError> {
        Self::encode("load information", message)
    }
}

/// Payload of RIC_E2_TERM_INIT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2TermInitPayload {
    /// Address of the E2 terminator that came up
    pub address: String,
}

impl E2TermInitPayload {
    /// Parse the JSON payload. The address must not be blank.
    pub fn from_json(payload: &[u8]) -> Result<Self, WireError> {
        let init: Self = serde_json::from_slice(payload).map_err(|e| WireError::Decode {
            message: "e2 term init",
            reason: e.to_string(),
        })?;
        if init.address.trim().is_empty() {
            return Err(WireError::Decode {
                message: "e2 term init",
                reason: "empty e2t address".to_string(),
            });
        }
        Ok(init)
    }
}

/// Header layout of an outbound setup request
pub const SETUP_REQUEST_HEADER: &str = "$ranIp|$ranPort|$ranName|#payload|";

/// Outbound setup request addressed to the E2 terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct E2RequestMessage {
    /// Transaction id
    pub transaction_id: String,
    /// RAN IP address
    pub ran_ip: String,
    /// RAN SCTP port
    pub ran_port: u16,
    /// RAN name
    pub ran_name: String,
    /// Packed setup request PDU
    pub payload: Bytes,
}

impl TemplateFields for E2RequestMessage {
    const FIELDS: &'static [FieldAccessor<Self>] = &[
        ("transactionId", |m| FieldValue::Str(&m.transaction_id)),
        ("ranIp", |m| FieldValue::Str(&m.ran_ip)),
        ("ranPort", |m| FieldValue::Int(i64::from(m.ran_port))),
        ("ranName", |m| FieldValue::Str(&m.ran_name)),
        ("payload", |m| FieldValue::Bytes(&m.payload)),
    ];
}

impl E2RequestMessage {
    /// Render as `ranIp|ranPort|ranName|payloadLen|payload`
    pub fn to_bytes(&self) -> Result<Bytes, WireError> {
        let header = expand_payload_header(SETUP_REQUEST_HEADER, self)?;
        let mut buf = BytesMut::with_capacity(header.len() + self.payload.len());
        buf.put_slice(header.as_bytes());
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}
