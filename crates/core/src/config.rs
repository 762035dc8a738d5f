use serde::{Deserialize, Serialize};
use std::{
    fmt,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 50051));
pub const DEFAULT_PROVIDER: &str = "google";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const ENV_DEEPL_API_KEY: &str = "DEEPL_API_KEY";
pub const ENV_TRANSLATOR_PROVIDER: &str = "TRANSLATOR_PROVIDER";
pub const ENV_TRANSLATOR_LISTEN_ADDR: &str = "TRANSLATOR_LISTEN_ADDR";
pub const ENV_TRANSLATOR_MAX_CONCURRENCY: &str = "TRANSLATOR_MAX_CONCURRENCY";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Google,
    DeepL,
    Echo,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::DeepL => "deepl",
            ProviderKind::Echo => "echo",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "deepl" => Ok(ProviderKind::DeepL),
            "echo" => Ok(ProviderKind::Echo),
            _ => Err(ConfigError::UnknownProvider(s.to_owned())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeys {
    pub deepl: Option<ApiKey>,
}

/// What a batch does once one of its items has failed.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Every unit runs to completion; the lowest-index failure is reported.
    #[default]
    WaitAll,
    /// The first failure to complete cancels the remaining units and is
    /// reported as the batch error.
    FailFast,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Upper bound on provider calls in flight per batch. `None` spawns
    /// every item at once.
    pub max_concurrency: Option<NonZeroUsize>,
    pub on_failure: FailurePolicy,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestTimeout {
    pub timeout_ms: u64,
}

impl RequestTimeout {
    pub fn new(timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self { timeout_ms })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RequestTimeout {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub provider: ProviderKind,
    pub api_keys: ApiKeys,
    pub dispatch: DispatchPolicy,
    pub request_timeout: RequestTimeout,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR,
            provider: ProviderKind::default(),
            api_keys: ApiKeys::default(),
            dispatch: DispatchPolicy::default(),
            request_timeout: RequestTimeout::default(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("{0} provider requires an api key")]
    MissingApiKey(&'static str),
    #[error("request timeout must be > 0 ms")]
    ZeroTimeout,
    #[error("unknown provider {0:?} (expected google, deepl or echo)")]
    UnknownProvider(String),
    #[error("invalid listen address {0:?}")]
    InvalidListenAddr(String),
    #[error("max concurrency must be a positive integer, got {0:?}")]
    InvalidConcurrency(String),
}

pub fn parse_listen_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidListenAddr(value.to_owned()))
}

/// CLI value, then environment, then [`DEFAULT_LISTEN_ADDR`].
pub fn resolve_listen_addr(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<SocketAddr, ConfigError> {
    match cli_value.or_else(|| env.var(env_key)) {
        Some(v) => parse_listen_addr(&v),
        None => Ok(DEFAULT_LISTEN_ADDR),
    }
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_max_concurrency(
    cli_value: Option<usize>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<NonZeroUsize>, ConfigError> {
    let raw = match cli_value {
        Some(v) => v.to_string(),
        None => match env.var(env_key) {
            Some(v) => v,
            None => return Ok(None),
        },
    };
    raw.trim()
        .parse::<NonZeroUsize>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidConcurrency(raw))
}
