//! RAN node entities persisted in the topology store.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Connection status of a RAN node.
///
/// Unrecognised values read back from the store map to [`ConnectionStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    /// Status not known
    #[default]
    Unknown,
    /// Setup request sent, waiting for the RAN
    Connecting,
    /// Setup completed
    Connected,
    /// RAN answered the setup request with a failure
    ConnectedSetupFailed,
    /// Association lost
    Disconnected,
    /// Operator shutdown in progress
    ShuttingDown,
    /// Operator shutdown complete
    ShutDown,
}

impl ConnectionStatus {
    /// All statuses, in declaration order
    pub const ALL: [ConnectionStatus; 7] = [
        ConnectionStatus::Unknown,
        ConnectionStatus::Connecting,
        ConnectionStatus::Connected,
        ConnectionStatus::ConnectedSetupFailed,
        ConnectionStatus::Disconnected,
        ConnectionStatus::ShuttingDown,
        ConnectionStatus::ShutDown,
    ];

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Unknown => "UNKNOWN",
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::ConnectedSetupFailed => "CONNECTED_SETUP_FAILED",
            ConnectionStatus::Disconnected => "DISCONNECTED",
            ConnectionStatus::ShuttingDown => "SHUTTING_DOWN",
            ConnectionStatus::ShutDown => "SHUT_DOWN",
        }
    }

    /// Parse a canonical name, falling back to `Unknown`
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == value)
            .unwrap_or(ConnectionStatus::Unknown)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConnectionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConnectionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ConnectionStatus::parse(&value))
    }
}

/// Application protocol used to set up the RAN association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum E2ApplicationProtocol {
    /// Not provisioned
    #[default]
    Unknown,
    /// X2 setup
    X2SetupRequest,
    /// EN-DC X2 setup
    EndcX2SetupRequest,
}

/// Node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Not reported yet
    #[default]
    Unknown,
    /// LTE eNB
    Enb,
    /// NR gNB
    Gnb,
}

/// Kind of the last setup failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureType {
    /// No failure recorded
    #[default]
    Nothing,
    /// X2 setup failure
    X2SetupFailure,
    /// EN-DC X2 setup failure
    EndcX2SetupFailure,
}

/// Global node id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalNbId {
    /// PLMN identity
    pub plmn_id: String,
    /// Node id within the PLMN
    pub nb_id: String,
}

/// Lightweight identity used for topology-wide listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NbIdentity {
    /// RAN name
    pub inventory_name: String,
    /// Global node id once known
    #[serde(default)]
    pub global_nb_id: Option<GlobalNbId>,
}

/// Full RAN node record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodebInfo {
    /// RAN name, the node's key
    pub ran_name: String,
    /// RAN IP address
    pub ip: String,
    /// RAN SCTP port
    pub port: u16,
    /// Setup protocol
    #[serde(default)]
    pub e2_application_protocol: E2ApplicationProtocol,
    /// Current connection status
    #[serde(default)]
    pub connection_status: ConnectionStatus,
    /// Reconnection attempts since the last successful setup
    #[serde(default)]
    pub connection_attempts: u32,
    /// Node type
    #[serde(default)]
    pub node_type: NodeType,
    /// Global node id
    #[serde(default)]
    pub global_nb_id: Option<GlobalNbId>,
    /// Kind of the last setup failure
    #[serde(default)]
    pub failure_type: FailureType,
    /// Cause of the last setup failure
    #[serde(default)]
    pub setup_failure: Option<String>,
    /// Store revision, bumped on every write
    #[serde(default)]
    pub revision: u64,
}

impl NodebInfo {
    /// Create a node that has never been contacted
    pub fn new(
        ran_name: impl Into<String>,
        ip: impl Into<String>,
        port: u16,
        e2_application_protocol: E2ApplicationProtocol,
    ) -> Self {
        Self {
            ran_name: ran_name.into(),
            ip: ip.into(),
            port,
            e2_application_protocol,
            connection_status: ConnectionStatus::Unknown,
            connection_attempts: 0,
            node_type: NodeType::Unknown,
            global_nb_id: None,
            failure_type: FailureType::Nothing,
            setup_failure: None,
            revision: 0,
        }
    }

    /// Identity record for this node
    pub fn identity(&self) -> NbIdentity {
        NbIdentity {
            inventory_name: self.ran_name.clone(),
            global_nb_id: self.global_nb_id.clone(),
        }
    }
}

/// Uplink interference overload level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UlInterferenceOverloadIndication {
    /// High interference
    HighInterference,
    /// Medium interference
    MediumInterference,
    /// Low interference
    LowInterference,
}

/// High interference indication towards a neighbour cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlHighInterferenceInformation {
    /// Neighbour cell
    pub target_cell_id: String,
    /// Per-PRB indication bitmap
    pub ul_high_interference_indication: String,
}

/// Relative narrowband TX power report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeNarrowbandTxPower {
    /// Per-PRB RNTP bitmap
    pub rntp_per_prb: String,
    /// RNTP threshold in dB
    pub rntp_threshold_db: i8,
    /// Number of cell specific antenna ports
    pub number_of_cell_specific_antenna_ports: u8,
    /// PDSCH-to-RS EPRE ratio index
    pub p_b: u32,
    /// PDCCH interference impact
    pub pdcch_interference_impact: u32,
}

/// Load report of one served cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLoadInformation {
    /// Cell id
    pub cell_id: String,
    /// Uplink interference overload per PRB
    #[serde(default)]
    pub ul_interference_overload_indications: Vec<UlInterferenceOverloadIndication>,
    /// High interference indications
    #[serde(default)]
    pub ul_high_interference_infos: Vec<UlHighInterferenceInformation>,
    /// RNTP report
    #[serde(default)]
    pub relative_narrowband_tx_power: Option<RelativeNarrowbandTxPower>,
}

/// Latest load information reported by a RAN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RanLoadInformation {
    /// Receipt time of the report, nanoseconds since the Unix epoch
    pub load_timestamp: u64,
    /// Per-cell reports
    #[serde(default)]
    pub cell_load_infos: Vec<CellLoadInformation>,
}
