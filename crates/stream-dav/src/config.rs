//! Server configuration, read from a TOML file.

use crate::auth::{StaticToken, TokenFile, TokenSource};
use crate::fetch::DEFAULT_BASE_URL;
use crate::webdav::{DavConfig, DEFAULT_CHUNK, DEFAULT_METADATA_CHUNK};
use serde::Deserialize;
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQLite index written by the synchronisation engine.
    pub database: PathBuf,
    /// Levels below `shows` at which show folders live.
    #[serde(default = "default_depth")]
    pub depth: i64,
    /// Folder ID of the films root.
    pub films: String,
    /// Folder ID of the shows root.
    pub shows: String,
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 4918,
        }
    }
}

/// Exactly one of `token` and `token_file` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub base_url: String,
    /// Fetch permits per second.
    pub rate: f64,
    pub burst: u32,
    /// Byte cap of the first chunk of a stream.
    pub metadata_chunk: u64,
    /// Byte cap of every later chunk.
    pub chunk: u64,
    pub timeout_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate: 10.0,
            burst: 1,
            metadata_chunk: DEFAULT_METADATA_CHUNK,
            chunk: DEFAULT_CHUNK,
            timeout_secs: 300,
        }
    }
}

fn default_depth() -> i64 {
    1
}

impl Config {
    /// Read and validate the config file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate config text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.auth.token, &self.auth.token_file) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "set only one of auth.token and auth.token_file".to_string(),
                ))
            }
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "one of auth.token or auth.token_file is required".to_string(),
                ))
            }
            _ => {}
        }

        if self.films.is_empty() || self.shows.is_empty() {
            return Err(ConfigError::Invalid(
                "films and shows folder IDs must not be empty".to_string(),
            ));
        }
        if self.stream.metadata_chunk == 0 || self.stream.chunk == 0 {
            return Err(ConfigError::Invalid(
                "chunk sizes must be greater than zero".to_string(),
            ));
        }
        if !(self.stream.rate > 0.0) {
            return Err(ConfigError::Invalid(
                "stream.rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.address, self.server.port)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.stream.timeout_secs)
    }

    pub fn token_source(&self) -> Arc<dyn TokenSource> {
        match (&self.auth.token, &self.auth.token_file) {
            (_, Some(path)) => Arc::new(TokenFile::new(path)),
            (Some(token), None) => Arc::new(StaticToken::new(token.as_str())),
            (None, None) => Arc::new(StaticToken::new("")),
        }
    }

    pub fn dav_config(&self) -> DavConfig {
        DavConfig {
            films_id: self.films.clone(),
            shows_id: self.shows.clone(),
            depth: self.depth,
            metadata_chunk: self.stream.metadata_chunk,
            chunk: self.stream.chunk,
        }
    }
}
