//! Configuration management for the deposit pipeline

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Upload chunk size mandated by the drive API (320 KiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 327_680;

/// Chunk sizes must be a multiple of this many bytes
pub const CHUNK_SIZE_MULTIPLE: u64 = 320 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub lookup: LookupConfig,
    pub deposit: DepositConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub records: RecordsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    pub drive_id: String,
    pub site_id: String,
    pub list_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub endpoint: String,
    pub region: String,
    pub service: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositConfig {
    /// Stable download prefix; `{download_endpoint}/{artefact_id}` resolves to a deposit
    pub download_endpoint: String,
    pub chunk_size: u64,
    /// Constraint alias that means "publish organisation-wide"
    pub broadcast_alias: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    pub dir: PathBuf,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl DepositConfig {
    /// Prefix every deposited transfer reference starts with
    pub fn download_prefix(&self) -> String {
        format!("{}/", self.download_endpoint.trim_end_matches('/'))
    }

    /// Stable download URL for an artefact
    pub fn download_url(&self, artefact_id: &str) -> String {
        format!("{}{}", self.download_prefix(), artefact_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreConfig {
                base_url: "https://graph.microsoft.com/v1.0".to_string(),
                drive_id: String::new(),
                site_id: String::new(),
                list_id: String::new(),
            },
            lookup: LookupConfig {
                endpoint: String::new(),
                region: "eu-west-1".to_string(),
                service: "lambda".to_string(),
            },
            deposit: DepositConfig {
                download_endpoint: "https://data.bas.ac.uk/download".to_string(),
                chunk_size: DEFAULT_CHUNK_SIZE,
                broadcast_alias: "~nerc".to_string(),
            },
            http: HttpConfig {
                timeout_secs: 300,
                connect_timeout_secs: 30,
            },
            auth: AuthConfig {
                token_path: PathBuf::from("./auth-token.json"),
            },
            records: RecordsConfig {
                dir: PathBuf::from("./records"),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        Ok(Config {
            store: StoreConfig {
                base_url: env::var("GRAPH_BASE_URL").unwrap_or(defaults.store.base_url),
                drive_id: env::var("GRAPH_DRIVE_ID")?,
                site_id: env::var("GRAPH_SITE_ID")?,
                list_id: env::var("GRAPH_LIST_ID")?,
            },
            lookup: LookupConfig {
                endpoint: env::var("LOOKUP_ENDPOINT")?,
                region: env::var("LOOKUP_REGION").unwrap_or(defaults.lookup.region),
                service: env::var("LOOKUP_SERVICE").unwrap_or(defaults.lookup.service),
            },
            deposit: DepositConfig {
                download_endpoint: env::var("DOWNLOAD_ENDPOINT")?,
                chunk_size: parse_chunk_size(env::var("UPLOAD_CHUNK_SIZE").ok()),
                broadcast_alias: env::var("BROADCAST_ALIAS")
                    .unwrap_or(defaults.deposit.broadcast_alias),
            },
            http: HttpConfig {
                timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.http.timeout_secs),
                connect_timeout_secs: env::var("HTTP_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.http.connect_timeout_secs),
            },
            auth: AuthConfig {
                token_path: env::var("AUTH_TOKEN_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.auth.token_path),
            },
            records: RecordsConfig {
                dir: env::var("RECORDS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.records.dir),
            },
        })
    }
}

fn parse_chunk_size(raw: Option<String>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_CHUNK_SIZE;
    };

    match raw.parse::<u64>() {
        Ok(size) if size > 0 && size % CHUNK_SIZE_MULTIPLE == 0 => size,
        _ => {
            tracing::warn!(
                value = %raw,
                default = DEFAULT_CHUNK_SIZE,
                "UPLOAD_CHUNK_SIZE must be a positive multiple of 320 KiB, using default"
            );
            DEFAULT_CHUNK_SIZE
        }
    }
}
