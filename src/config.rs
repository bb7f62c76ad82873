use anyhow::{anyhow, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::ethereum::{abi::DEFAULT_EXPLORER_URL, Mode};

pub const DEFAULT_RPC_URL: &str = "https://cloudflare-eth.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Everything one invocation needs, fixed once parsed.
#[derive(Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract: String,
    pub abi: String,
    pub method: String,
    pub args: Vec<String>,
    pub private_key: Option<String>,
    pub estimate: bool,
    pub explorer_url: String,
    pub timeout: Option<Duration>,
    /// Only set when a limit was asked for; receipts may take many blocks.
    pub confirmation_timeout: Option<Duration>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("contract", &self.contract)
            .field("abi", &self.abi)
            .field("method", &self.method)
            .field("args", &self.args)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("estimate", &self.estimate)
            .field("explorer_url", &self.explorer_url)
            .field("timeout", &self.timeout)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish()
    }
}

impl Config {
    /// Command-line values win over the config file, which wins over defaults.
    pub fn from_matches(matches: &ArgMatches, file: &FileConfig) -> Result<Self> {
        let required = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .ok_or_else(|| anyhow!("Missing required argument --{}", id))
        };

        let rpc_url = matches
            .get_one::<String>("rpc")
            .cloned()
            .or_else(|| file.rpc_url.clone())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let explorer_url = matches
            .get_one::<String>("explorer-url")
            .cloned()
            .or_else(|| file.explorer_url.clone())
            .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string());

        let explicit_timeout = matches
            .get_one::<u64>("timeout")
            .copied()
            .or(file.timeout_secs);
        let timeout_secs = explicit_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        // Zero turns the limit off.
        let limit = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

        let args = matches
            .get_many::<String>("args")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            rpc_url,
            contract: required("contract")?,
            abi: required("abi")?,
            method: required("method")?,
            args,
            private_key: matches.get_one::<String>("pk").cloned(),
            estimate: matches.get_flag("estimate"),
            explorer_url,
            timeout: limit(timeout_secs),
            confirmation_timeout: explicit_timeout.and_then(limit),
        })
    }

    pub fn mode(&self) -> Mode {
        Mode::from_flags(self.private_key.is_some(), self.estimate)
    }
}

/// Defaults that may be kept in a TOML file between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub explorer_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: FileConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// An explicit path must load. The default path is optional.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path).await?;
            tracing::info!("Loaded configuration from {:?}", path);
            return Ok(config);
        }

        match Self::default_config_path() {
            Ok(path) if path.exists() => Ok(Self::load_optional(&path).await),
            _ => Ok(Self::default()),
        }
    }

    /// A broken optional file falls back to defaults. The notice stays below
    /// the default log level so that a run still prints one line.
    async fn load_optional(path: &Path) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                tracing::info!("Ignoring config file, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("chainrun").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# chainrun configuration file
# Every value here is a default; the matching command-line flag wins.

# JSON-RPC endpoint of the node (--rpc)
rpc_url = "https://cloudflare-eth.com"

# Block-explorer API used when --abi is an API key (--explorer-url)
explorer_url = "https://api.etherscan.io"

# Seconds allowed for the ABI lookup and for each node request (--timeout).
# Setting it here also limits the wait for a receipt, which is otherwise
# unbounded. 0 waits forever.
timeout_secs = 120
"#;
        sample_config.to_string()
    }
}
