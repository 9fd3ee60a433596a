//! Session configuration
//!
//! Built in code or deserialized from TOML. A session takes its config by
//! value at construction and never changes it.

use crate::error::{FeedError, Result};
use crate::protocol::HeaderLayout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_RECV_BUFFER_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 250;
pub const MAX_READ_TIMEOUT_MS: u64 = 1000;
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// Live-live feed identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    A,
    B,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::A => f.write_str("A"),
            Service::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub address: Ipv4Addr,
    pub port: u16,
    /// Local interface for the group join; unspecified lets the kernel pick
    #[serde(default = "default_interface")]
    pub interface: Ipv4Addr,
    #[serde(default = "default_true")]
    pub is_emdi: bool,
    pub service: Service,
    pub channel: String,
    #[serde(default = "default_true")]
    pub snapshot_enabled: bool,
    #[serde(default = "default_true")]
    pub incremental_enabled: bool,
    #[serde(default)]
    pub tuning: Tuning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub queue_capacity: usize,
    pub recv_buffer_bytes: usize,
    pub read_timeout_ms: u64,
    pub max_datagram_size: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            recv_buffer_bytes: DEFAULT_RECV_BUFFER_BYTES,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }
}

fn default_interface() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// EMDI config with both snapshot and incremental delivery enabled
    pub fn new(address: Ipv4Addr, port: u16, service: Service, channel: impl Into<String>) -> Self {
        SessionConfig {
            address,
            port,
            interface: default_interface(),
            is_emdi: true,
            service,
            channel: channel.into(),
            snapshot_enabled: true,
            incremental_enabled: true,
            tuning: Tuning::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SessionConfig =
            toml::from_str(s).map_err(|e| FeedError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FeedError::setup(format!("read config {}", path.display()), e))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.address.is_multicast() {
            return Err(FeedError::InvalidConfig(format!(
                "{} is not an IPv4 multicast address",
                self.address
            )));
        }
        if self.port == 0 {
            return Err(FeedError::InvalidConfig("port must be non-zero".into()));
        }
        if self.tuning.queue_capacity == 0 {
            return Err(FeedError::InvalidConfig("queue_capacity must be non-zero".into()));
        }
        if self.tuning.max_datagram_size == 0 || self.tuning.max_datagram_size > MAX_DATAGRAM_SIZE {
            return Err(FeedError::InvalidConfig(format!(
                "max_datagram_size must be in 1..={MAX_DATAGRAM_SIZE}"
            )));
        }
        if self.tuning.read_timeout_ms == 0 || self.tuning.read_timeout_ms > MAX_READ_TIMEOUT_MS {
            return Err(FeedError::InvalidConfig(format!(
                "read_timeout_ms must be in 1..={MAX_READ_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    pub fn with_delivery(mut self, snapshots: bool, increments: bool) -> Self {
        self.snapshot_enabled = snapshots;
        self.incremental_enabled = increments;
        self
    }

    pub fn with_layout(mut self, layout: HeaderLayout) -> Self {
        self.is_emdi = layout.is_emdi();
        self
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn header_layout(&self) -> HeaderLayout {
        HeaderLayout::from_emdi_flag(self.is_emdi)
    }

    pub fn group(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.address, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.tuning.read_timeout_ms)
    }
}
