//! Configuration handling for the E2 manager.
//!
//! Values come from a YAML file, then `E2MGR_*` environment variables, then
//! command line flags. [`E2ManagerConfig::validate`] runs once all layers
//! are applied.

use crate::logging::LogFormat;
use anyhow::{bail, Context, Result};
use e2mgr_storage::StoreMode;
use e2mgr_wire::RicIdentity;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// File unusable, defaults in effect
    Defaults {
        /// Why the file was not used
        reason: String,
    },
}

/// E2 manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct E2ManagerConfig {
    /// Logging settings
    pub logging: LoggingConfig,
    /// Message transport settings
    pub rmr: RmrConfig,
    /// Per-node dispatch queue capacity
    pub notification_response_buffer: usize,
    /// Bound on concurrently running handlers
    pub max_concurrent_handlers: usize,
    /// Grace period between the two delete-all phases
    pub big_red_button_timeout_sec: u64,
    /// Reconnection budget per node, also the rnib retry count
    pub max_rnib_connection_attempts: u32,
    /// Delay between rnib retries and between reconnection attempts
    pub rnib_retry_interval_ms: u64,
    /// Session retention
    pub session_ttl_sec: u64,
    /// Topology store settings
    pub rnib: RnibConfig,
    /// RIC identity advertised in setup requests
    pub global_ric_id: GlobalRicIdConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RmrConfig {
    pub port: u16,
    pub max_msg_size: usize,
    pub route_address: String,
}

/// Topology store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RnibBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RnibConfig {
    pub backend: RnibBackend,
    pub url: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalRicIdConfig {
    pub ric_id: String,
    pub mcc: String,
    pub mnc: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Console,
        }
    }
}

impl Default for RmrConfig {
    fn default() -> Self {
        Self {
            port: 3801,
            max_msg_size: 65536,
            route_address: "127.0.0.1:38000".to_string(),
        }
    }
}

impl Default for RnibConfig {
    fn default() -> Self {
        Self {
            backend: RnibBackend::Memory,
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 4,
        }
    }
}

impl Default for GlobalRicIdConfig {
    fn default() -> Self {
        Self {
            ric_id: "AACCE".to_string(),
            mcc: "327".to_string(),
            mnc: "94".to_string(),
        }
    }
}

impl Default for E2ManagerConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            rmr: RmrConfig::default(),
            notification_response_buffer: 100,
            max_concurrent_handlers: 256,
            big_red_button_timeout_sec: 5,
            max_rnib_connection_attempts: 3,
            rnib_retry_interval_ms: 10,
            session_ttl_sec: 300,
            rnib: RnibConfig::default(),
            global_ric_id: GlobalRicIdConfig::default(),
        }
    }
}

impl E2ManagerConfig {
    /// Load the file at `config_path` and apply environment overrides.
    ///
    /// A missing or unparsable file yields defaults; the returned
    /// [`ConfigSource`] says which happened. Call [`validate`](Self::validate)
    /// once any further overrides are applied.
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> (Self, ConfigSource) {
        let path = config_path.as_ref();
        let (mut config, source) = match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Self>(&content) {
                Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
                Err(e) => (
                    Self::default(),
                    ConfigSource::Defaults {
                        reason: format!("failed to parse {}: {}", path.display(), e),
                    },
                ),
            },
            Err(e) => (
                Self::default(),
                ConfigSource::Defaults {
                    reason: format!("cannot read {}: {}", path.display(), e),
                },
            ),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        (config, source)
    }

    /// Apply `E2MGR_*` overrides looked up through `lookup`. Unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("E2MGR_RMR_PORT").and_then(|v| v.parse().ok()) {
            self.rmr.port = port;
        }
        if let Some(address) = lookup("E2MGR_RMR_ROUTE_ADDRESS") {
            self.rmr.route_address = address;
        }
        if let Some(url) = lookup("E2MGR_RNIB_URL") {
            self.rnib.url = url;
        }
        if let Some(level) = lookup("E2MGR_LOG_LEVEL") {
            self.logging.log_level = level;
        }
        if let Some(format) = lookup("E2MGR_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.logging.format = format;
        }
        if let Some(attempts) =
            lookup("E2MGR_MAX_RNIB_CONNECTION_ATTEMPTS").and_then(|v| v.parse().ok())
        {
            self.max_rnib_connection_attempts = attempts;
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rmr.port == 0 {
            bail!("rmr.port must not be 0");
        }
        if self.rmr.max_msg_size == 0 {
            bail!("rmr.maxMsgSize must not be 0");
        }
        if self.notification_response_buffer == 0 {
            bail!("notificationResponseBuffer must not be 0");
        }
        if self.rnib.pool_size == 0 {
            bail!("rnib.poolSize must not be 0");
        }

        let ric = &self.global_ric_id;
        if ric.ric_id.len() != 5 || !ric.ric_id.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("globalRicId.ricId must be 5 hex characters, got {:?}", ric.ric_id);
        }
        if ric.mcc.len() != 3 || !ric.mcc.chars().all(|c| c.is_ascii_digit()) {
            bail!("globalRicId.mcc must be 3 digits, got {:?}", ric.mcc);
        }
        if !(2..=3).contains(&ric.mnc.len()) || !ric.mnc.chars().all(|c| c.is_ascii_digit()) {
            bail!("globalRicId.mnc must be 2 or 3 digits, got {:?}", ric.mnc);
        }

        self.route_addr()?;
        Ok(())
    }

    /// Address the transport listens on
    pub fn rmr_listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.rmr.port))
    }

    /// Address outbound messages are routed to
    pub fn route_addr(&self) -> Result<SocketAddr> {
        self.rmr
            .route_address
            .parse()
            .with_context(|| format!("invalid rmr.routeAddress {:?}", self.rmr.route_address))
    }

    /// Topology store backend selection
    pub fn store_mode(&self) -> StoreMode {
        match self.rnib.backend {
            RnibBackend::Memory => StoreMode::InMemory,
            RnibBackend::Redis => StoreMode::Redis {
                url: self.rnib.url.clone(),
                pool_size: self.rnib.pool_size,
            },
        }
    }

    /// RIC identity for setup requests
    pub fn ric_identity(&self) -> RicIdentity {
        RicIdentity {
            ric_id: self.global_ric_id.ric_id.clone(),
            mcc: self.global_ric_id.mcc.clone(),
            mnc: self.global_ric_id.mnc.clone(),
        }
    }

    pub fn rnib_retry_interval(&self) -> Duration {
        Duration::from_millis(self.rnib_retry_interval_ms)
    }

    pub fn big_red_button_timeout(&self) -> Duration {
        Duration::from_secs(self.big_red_button_timeout_sec)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_sec)
    }
}
