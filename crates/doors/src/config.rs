use crate::errors::{DoorsError, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_USERNAME: &str = "DOORS_USERNAME";
pub const ENV_PASSWORD: &str = "DOORS_PASSWORD";
pub const ENV_SERVER_ADDR: &str = "DOORS_SERVERADDR";
pub const ENV_CLIENT_PATH: &str = "DOORS_PATH";
pub const ENV_MAX_WAIT: &str = "DOORS_MAX_WAIT";
pub const ENV_POLL_INTERVAL_MS: &str = "DOORS_POLL_INTERVAL_MS";
pub const ENV_KILL_BY_NAME: &str = "DOORS_KILL_BY_NAME";

pub const DEFAULT_CLIENT_PATH: &str = r"C:\Program Files\IBM\Rational\DOORS\9.7\bin\doors.exe";
pub const DEFAULT_MAX_WAIT_SECS: u64 = 1200;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Connection and timing settings for one DOORS client installation.
#[derive(Clone)]
pub struct DoorsConfig {
    pub username: String,
    pub password: String,
    /// Database server, e.g. `36677@doors.example.local`
    pub server_addr: String,
    pub client_path: PathBuf,
    /// Upper bound on the wait for the completion marker
    pub max_wait: Duration,
    pub poll_interval: Duration,
    /// Also kill every process named like the client executable after the PID kill
    pub kill_by_name: bool,
}

impl DoorsConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server_addr: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            server_addr: server_addr.into(),
            client_path: PathBuf::from(DEFAULT_CLIENT_PATH),
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            kill_by_name: false,
        }
    }

    /// Reads the process environment, after loading `.env` from the working
    /// directory if one exists. Variables already set win over `.env` entries.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let username = non_empty(ENV_USERNAME);
        let password = non_empty(ENV_PASSWORD);
        let server_addr = non_empty(ENV_SERVER_ADDR);

        let missing: Vec<String> = [
            (ENV_USERNAME, username.is_none()),
            (ENV_PASSWORD, password.is_none()),
            (ENV_SERVER_ADDR, server_addr.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(key, _)| key.to_string())
        .collect();

        let (Some(username), Some(password), Some(server_addr)) = (username, password, server_addr)
        else {
            return Err(DoorsError::MissingCredentials(missing));
        };

        let mut config = Self::new(username, password, server_addr.trim());

        match non_empty(ENV_CLIENT_PATH) {
            Some(path) => {
                tracing::info!("Using DOORS client path from {ENV_CLIENT_PATH}: {path}");
                config.client_path = PathBuf::from(path.trim());
            }
            None => tracing::info!("Using default DOORS client path: {DEFAULT_CLIENT_PATH}"),
        }

        if let Some(raw) = non_empty(ENV_MAX_WAIT) {
            config.max_wait = Duration::from_secs(parse_u64(ENV_MAX_WAIT, &raw)?);
        }

        if let Some(raw) = non_empty(ENV_POLL_INTERVAL_MS) {
            let millis = parse_u64(ENV_POLL_INTERVAL_MS, &raw)?;
            if millis == 0 {
                return Err(DoorsError::InvalidConfig(format!(
                    "{ENV_POLL_INTERVAL_MS} must be greater than zero"
                )));
            }
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Some(raw) = non_empty(ENV_KILL_BY_NAME) {
            config.kill_by_name = parse_flag(ENV_KILL_BY_NAME, &raw)?;
        }

        Ok(config)
    }

    /// The install root that holds `bin/`, used as the client's working directory.
    pub fn working_dir(&self) -> Option<PathBuf> {
        let text = self.client_path.to_string_lossy();
        let trimmed = text.trim_end_matches(['/', '\\']);
        let bin_dir = &trimmed[..trimmed.rfind(['/', '\\'])?];
        let root = &bin_dir[..bin_dir.rfind(['/', '\\'])?];
        if root.is_empty() {
            return None;
        }
        Some(PathBuf::from(root))
    }

    /// File name of the client executable, whichever separator the path uses.
    pub fn executable_name(&self) -> Option<String> {
        let text = self.client_path.to_string_lossy();
        text.rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

impl fmt::Debug for DoorsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoorsConfig")
            .field("username", &self.username)
            .field("password", &"********")
            .field("server_addr", &self.server_addr)
            .field("client_path", &self.client_path)
            .field("max_wait", &self.max_wait)
            .field("poll_interval", &self.poll_interval)
            .field("kill_by_name", &self.kill_by_name)
            .finish()
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| DoorsError::InvalidConfig(format!("{key} must be a whole number, got '{raw}'")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DoorsError::InvalidConfig(format!(
            "{key} must be true or false, got '{raw}'"
        ))),
    }
}
