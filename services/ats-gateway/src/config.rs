//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys, OAuth client secrets and refresh tokens come only from the
//! environment; they are never read from the TOML file.

use ats_provider::AssociationPolicy;
use ats_provider::ashby::{DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_JOB_BOARD};
use common::Secret;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zoho_auth::DataCenter;

const DEFAULT_CONFIG_FILE: &str = "ats-gateway.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ats: AtsConfig,
    pub zoho: ZohoSettings,
}

/// Inbound HTTP settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
    /// Per-request timeout for upstream ATS calls
    pub upstream_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_connections: 1000,
            upstream_timeout_secs: 30,
        }
    }
}

/// Which adapter serves requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ashby,
    Zoho,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ashby" => Ok(ProviderKind::Ashby),
            "zoho" => Ok(ProviderKind::Zoho),
            other => Err(format!("unknown provider '{other}' (expected ashby or zoho)")),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Ashby => f.write_str("ashby"),
            ProviderKind::Zoho => f.write_str("zoho"),
        }
    }
}

/// Provider-independent ATS settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AtsConfig {
    pub provider: ProviderKind,
    /// Overrides the provider's default API root. Unset for Zoho means the
    /// data center's Recruit URL.
    pub base_url: Option<String>,
    pub job_board_name: String,
    pub association_policy: AssociationPolicy,
    #[serde(skip, default = "default_api_key")]
    pub api_key: Secret<String>,
}

fn default_api_key() -> Secret<String> {
    Secret::from(DEFAULT_API_KEY)
}

impl Default for AtsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: None,
            job_board_name: DEFAULT_JOB_BOARD.to_string(),
            association_policy: AssociationPolicy::default(),
            api_key: default_api_key(),
        }
    }
}

impl AtsConfig {
    /// Ashby API root, falling back to the local mock.
    pub fn ashby_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// Zoho OAuth settings
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ZohoSettings {
    pub data_center: DataCenter,
    /// Overrides the data center's token endpoint.
    pub accounts_url: Option<String>,
    #[serde(skip)]
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    #[serde(skip)]
    pub refresh_token: Option<Secret<String>>,
}

impl ZohoSettings {
    pub fn token_url(&self) -> String {
        self.accounts_url
            .clone()
            .unwrap_or_else(|| self.data_center.token_url())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr<Err = String>>(key: &'static str) -> common::Result<Option<T>> {
    env_var(key)
        .map(|raw| raw.parse::<T>().map_err(|reason| common::Error::invalid(key, reason)))
        .transpose()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Load from `path` when it exists, otherwise start from defaults.
    ///
    /// An explicitly requested file that is missing is still an error; only the
    /// implicit default file may be absent.
    pub fn load_or_default(path: &Path, explicit: bool) -> common::Result<Self> {
        if explicit || path.exists() {
            Self::load(path)
        } else {
            Config::default().finish()
        }
    }

    fn finish(mut self) -> common::Result<Self> {
        self.apply_env()?;
        self.validate()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> common::Result<()> {
        if let Some(provider) = parse_env::<ProviderKind>("ATS_PROVIDER")? {
            self.ats.provider = provider;
        }
        if let Some(url) = env_var("ATS_BASE_URL") {
            self.ats.base_url = Some(url);
        }
        if let Some(key) = env_var("ATS_API_KEY") {
            self.ats.api_key = Secret::new(key);
        }
        if let Some(board) = env_var("ATS_JOB_BOARD") {
            self.ats.job_board_name = board;
        }
        if let Some(policy) = parse_env::<AssociationPolicy>("ATS_ASSOCIATION_POLICY")? {
            self.ats.association_policy = policy;
        }

        if let Some(id) = env_var("ZOHO_CLIENT_ID") {
            self.zoho.client_id = Some(id);
        }
        if let Some(secret) = env_var("ZOHO_CLIENT_SECRET") {
            self.zoho.client_secret = Some(Secret::new(secret));
        }
        if let Some(token) = env_var("ZOHO_REFRESH_TOKEN") {
            self.zoho.refresh_token = Some(Secret::new(token));
        }
        if let Some(dc) = parse_env::<DataCenter>("ZOHO_DATA_CENTER")? {
            self.zoho.data_center = dc;
        }
        if let Some(url) = env_var("ZOHO_ACCOUNTS_URL") {
            self.zoho.accounts_url = Some(url);
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        for (key, url) in [
            ("ats.base_url", self.ats.base_url.as_deref()),
            ("zoho.accounts_url", self.zoho.accounts_url.as_deref()),
        ] {
            if let Some(url) =
                url.filter(|u| !u.starts_with("http://") && !u.starts_with("https://"))
            {
                return Err(common::Error::invalid(
                    key,
                    format!("must start with http:// or https://, got: {url}"),
                ));
            }
        }

        if self.server.upstream_timeout_secs == 0 {
            return Err(common::Error::Config(
                "upstream_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.ats.provider == ProviderKind::Ashby && self.ats.api_key.is_blank() {
            return Err(common::Error::invalid("ATS_API_KEY", "must not be blank"));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    ///
    /// The flag is true when the path was requested explicitly.
    pub fn resolve_path(cli_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (PathBuf::from(p), true);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_FILE), false)
    }
}
