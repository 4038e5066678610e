//! Configuration management for the Fabric server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Default upload ceiling in MiB when `FABRIC_MAX_UPLOAD_MB` is unset or invalid
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 100;

/// Default ceiling on decompressed archive size, as a multiple of the upload limit
pub const DEFAULT_EXTRACT_RATIO: u64 = 4;

/// Errors raised while reading configuration from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Run the orphaned blob sweep once before accepting connections
    pub sweep_on_start: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Shared secret every caller must present. `None` is a server fault.
    pub token: Option<String>,
}

impl AuthConfig {
    /// The configured secret, trimmed, or `None` when unset or blank
    pub fn secret(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_upload_mb: u64,
    /// Total decompressed bytes a zip may expand to, in multiples of the upload limit
    pub extract_ratio: u64,
}

impl UploadConfig {
    pub fn limit_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Budget for all entries of one archive combined
    pub fn extract_limit_bytes(&self) -> u64 {
        (self.limit_bytes() as u64).saturating_mul(self.extract_ratio.max(1))
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            extract_ratio: DEFAULT_EXTRACT_RATIO,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Local { path: PathBuf },
    S3(S3Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub provider: StorageProvider,
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Minio,
    R2,
    S3,
    B2,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8787,
                sweep_on_start: false,
            },
            auth: AuthConfig::default(),
            upload: UploadConfig::default(),
            storage: StorageConfig::Local {
                path: PathBuf::from("./data/blobs"),
            },
            database: DatabaseConfig {
                url: "sqlite:./fabric.db".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("SERVER_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "SERVER_PORT",
                value: raw,
            })?,
            Err(_) => 8787,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                sweep_on_start: env::var("FABRIC_SWEEP_ON_START")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
            auth: AuthConfig {
                token: env::var("FABRIC_TOKEN").ok(),
            },
            upload: UploadConfig {
                max_upload_mb: parse_upload_limit(env::var("FABRIC_MAX_UPLOAD_MB").ok().as_deref()),
                extract_ratio: env::var("FABRIC_MAX_EXTRACT_RATIO")
                    .ok()
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .filter(|ratio| *ratio > 0)
                    .unwrap_or(DEFAULT_EXTRACT_RATIO),
            },
            storage: storage_from_env()?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./fabric.db".to_string()),
            },
        })
    }
}

fn storage_from_env() -> Result<StorageConfig, ConfigError> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string());
    match backend.to_ascii_lowercase().as_str() {
        "local" => Ok(StorageConfig::Local {
            path: env::var("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/blobs")),
        }),
        "s3" => Ok(StorageConfig::S3(S3Config {
            provider: match env::var("S3_PROVIDER").unwrap_or_else(|_| "r2".to_string()).as_str() {
                "minio" => StorageProvider::Minio,
                "s3" => StorageProvider::S3,
                "b2" => StorageProvider::B2,
                _ => StorageProvider::R2,
            },
            endpoint: required("S3_ENDPOINT")?,
            bucket: required("S3_BUCKET")?,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: env::var("S3_REGION").ok(),
        })),
        _ => Err(ConfigError::Invalid {
            name: "STORAGE_BACKEND",
            value: backend,
        }),
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Non-numeric, zero, or negative values fall back to the default
fn parse_upload_limit(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|mb| *mb > 0)
        .unwrap_or(DEFAULT_MAX_UPLOAD_MB)
}
