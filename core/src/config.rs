//! Runtime configuration and the state directory convention.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const HUSK_HOME_ENV: &str = "HUSK_HOME";
const CONFIG_FILE: &str = "config.toml";
const SESSIONS_FILE: &str = "sessions.json";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_USER_AGENT: &str = concat!("husk/", env!("CARGO_PKG_VERSION"));

/// Knobs every transport round trip and store location derives from.
#[derive(Debug, Clone)]
pub struct HuskConfig {
    /// Hard bound on one webshell round trip.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub state_dir: PathBuf,
}

impl HuskConfig {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            state_dir,
        }
    }

    /// Resolve the state dir and apply `config.toml` when it exists.
    pub fn load() -> io::Result<Self> {
        let state_dir = find_husk_home()?;
        let mut config = Self::new(state_dir);
        let config_path = config.state_dir.join(CONFIG_FILE);
        match fs::read_to_string(&config_path) {
            Ok(raw) => {
                let file: ConfigToml = toml::from_str(&raw).map_err(|err| {
                    io::Error::other(format!(
                        "malformed {}: {err}",
                        config_path.display()
                    ))
                })?;
                if let Some(ms) = file.request_timeout_ms {
                    config.request_timeout = Duration::from_millis(ms);
                }
                if let Some(ms) = file.connect_timeout_ms {
                    config.connect_timeout = Duration::from_millis(ms);
                }
                if let Some(user_agent) = file.user_agent {
                    config.user_agent = user_agent;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        Ok(config)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Where the profile store lives.
    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join(SESSIONS_FILE)
    }
}

/// `$HUSK_HOME` when set, `~/.husk` otherwise.
pub fn find_husk_home() -> io::Result<PathBuf> {
    if let Some(home) = env::var_os(HUSK_HOME_ENV)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| io::Error::other("home directory is unavailable"))?;
    Ok(home.join(".husk"))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigToml {
    request_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    user_agent: Option<String>,
}
