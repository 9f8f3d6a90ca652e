use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use config::{Config, ConfigError, Environment, File};

use crate::media::StreamInfo;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: Server,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub media: Vec<Item>,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a session may stay idle before it is torn down.
    pub timeout: u64,
    /// Seconds between sweeps for idle sessions.
    pub sweep_interval: u64,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: 60,
            sweep_interval: 5,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Limits {
    /// Largest request body accepted. Unlimited if not set.
    pub content_length: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct Item {
    pub name: String,
    pub path: String,
    pub streams: Vec<StreamItem>,
}

impl Item {
    pub fn stream_infos(&self) -> Vec<StreamInfo> {
        self.streams
            .iter()
            .map(|stream| StreamInfo {
                media: stream.media.clone(),
                encoding: stream.encoding.clone(),
                payload_type: stream.payload_type,
                clock_rate: stream.clock_rate,
            })
            .collect()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} streams",
            self.name,
            self.path,
            self.streams.len(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamItem {
    pub media: String,
    pub encoding: String,
    pub payload_type: u8,
    pub clock_rate: u32,
    /// UDP address RTP packets for this stream are received on.
    #[serde(default)]
    pub source: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: Server {
                host: "127.0.0.1".to_string(),
                port: rtsp_protocol::DEFAULT_PORT,
            },
            session: SessionConfig::default(),
            limits: Limits::default(),
            media: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    #[cfg(test)]
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(contents, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }

    /// Overrides such as `RTSP_SERVER__PORT=8554`.
    fn environment() -> Environment {
        Environment::with_prefix("RTSP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }
}
