use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 1_500;
pub const DEFAULT_RELOAD_DELAY_MS: u64 = 1_000;
pub const DEFAULT_LOGIN_REDIRECT_DELAY_MS: u64 = 2_000;
pub const DEFAULT_LOGIN_PATH: &str = "/accounts/login/";

pub const ENV_BASE_URL: &str = "CRAZYCART_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "CRAZYCART_TIMEOUT_MS";
pub const ENV_SESSION_ID: &str = "CRAZYCART_SESSION_ID";
pub const ENV_REDIRECT_DELAY_MS: &str = "CRAZYCART_REDIRECT_DELAY_MS";
pub const ENV_RELOAD_DELAY_MS: &str = "CRAZYCART_RELOAD_DELAY_MS";

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_META_NAME: &str = "csrf-token";
pub const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";
pub const SESSION_COOKIE: &str = "sessionid";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("invalid CRAZYCART_TIMEOUT_MS: {0}")]
    InvalidTimeoutMs(String),
    #[error("invalid CRAZYCART_REDIRECT_DELAY_MS: {0}")]
    InvalidRedirectDelayMs(String),
    #[error("invalid CRAZYCART_RELOAD_DELAY_MS: {0}")]
    InvalidReloadDelayMs(String),
}

/// Fixed delays before follow-up navigation, long enough for a notice to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTiming {
    pub redirect_delay: Duration,
    pub reload_delay: Duration,
    pub login_redirect_delay: Duration,
}

impl Default for NavigationTiming {
    fn default() -> Self {
        Self {
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            reload_delay: Duration::from_millis(DEFAULT_RELOAD_DELAY_MS),
            login_redirect_delay: Duration::from_millis(DEFAULT_LOGIN_REDIRECT_DELAY_MS),
        }
    }
}

impl NavigationTiming {
    /// No delays; used by tests and non-interactive runs.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            redirect_delay: Duration::ZERO,
            reload_delay: Duration::ZERO,
            login_redirect_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BargainingConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub session_id: Option<String>,
    pub login_path: String,
    pub timing: NavigationTiming,
}

impl BargainingConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            session_id: None,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timing: NavigationTiming::default(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_non_empty(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Some(raw) = env_non_empty(ENV_TIMEOUT_MS) {
            let timeout_ms = raw
                .parse::<u64>()
                .map_err(|error| ConfigError::InvalidTimeoutMs(error.to_string()))?;
            config.timeout = Duration::from_millis(timeout_ms.max(1));
        }
        if let Some(raw) = env_non_empty(ENV_REDIRECT_DELAY_MS) {
            let delay_ms = raw
                .parse::<u64>()
                .map_err(|error| ConfigError::InvalidRedirectDelayMs(error.to_string()))?;
            config.timing.redirect_delay = Duration::from_millis(delay_ms);
        }
        if let Some(raw) = env_non_empty(ENV_RELOAD_DELAY_MS) {
            let delay_ms = raw
                .parse::<u64>()
                .map_err(|error| ConfigError::InvalidReloadDelayMs(error.to_string()))?;
            config.timing.reload_delay = Duration::from_millis(delay_ms);
        }
        config.session_id = env_non_empty(ENV_SESSION_ID);

        Ok(config)
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    #[must_use]
    pub fn with_timing(mut self, timing: NavigationTiming) -> Self {
        self.timing = timing;
        self
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
