use serde::Deserialize;
use std::{fmt, fs, io::ErrorKind, path::PathBuf, time::Duration};

use consumption_store::db::ConsumptionTables;
use sqlx::postgres::PgConnectOptions;

use crate::pipeline::PipelineError;
use crate::transform::DEFAULT_TIMEZONE;

pub const CONFIG_PATH_ENV: &str = "CONSUMPTION_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "consumption-config.toml";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timezone: String,
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    pub fn credentials(&self) -> Result<Credentials, PipelineError> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(PipelineError::Config(
                "provider credentials missing: set provider.username/password or EN_USER/EN_PASS".to_string(),
            )),
        }
    }

    pub fn base_url(&self) -> Result<&str, PipelineError> {
        self.base_url
            .as_deref()
            .ok_or_else(|| PipelineError::Config("provider.base_url (or EN_API_URL) is not set".to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Json,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub sinks: Vec<SinkKind>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            sinks: vec![SinkKind::Json],
        }
    }
}

/// Either a full `uri` or discrete connection parts; `uri` wins when both are set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub uri: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub max_connections: u32,
    pub hourly_table: String,
    pub daily_cost_table: String,
    pub hourly_enabled: bool,
    pub daily_cost_enabled: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            host: None,
            port: None,
            user: None,
            password: None,
            name: None,
            max_connections: 2,
            hourly_table: "en_consumption".to_string(),
            daily_cost_table: "hl_consumption".to_string(),
            hourly_enabled: true,
            daily_cost_enabled: true,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, PipelineError> {
        if let Some(uri) = &self.uri {
            return uri
                .parse()
                .map_err(|e| PipelineError::Config(format!("invalid database uri: {e}")));
        }

        let Some(host) = &self.host else {
            return Err(PipelineError::Config(
                "database not configured: set database.uri (DATABASE_URL) or database.host (DB_HOST)".to_string(),
            ));
        };

        let mut options = PgConnectOptions::new().host(host);
        if let Some(port) = self.port {
            options = options.port(port);
        }
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        if let Some(name) = &self.name {
            options = options.database(name);
        }
        Ok(options)
    }

    pub fn tables(&self) -> ConsumptionTables {
        ConsumptionTables {
            hourly: self.hourly_enabled.then(|| self.hourly_table.clone()),
            daily_cost: self.daily_cost_enabled.then(|| self.daily_cost_table.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// `/metrics` listen address, e.g. `0.0.0.0:9100`.
    pub bind_addr: Option<String>,
    /// Prometheus text snapshot written when the run ends.
    pub textfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub output: OutputConfig,
    pub database: DatabaseConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load `.env`, then the TOML file, then apply environment overrides.
    ///
    /// A missing file is only an error when `CONSUMPTION_CONFIG` names it explicitly.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        dotenvy::dotenv().ok();

        let explicit = env::var(CONFIG_PATH_ENV).ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound && explicit.is_none() => {
                tracing::debug!(%path, "no config file, using defaults and environment");
                String::new()
            }
            Err(e) => return Err(anyhow::anyhow!("failed to read config {path}: {e}")),
        };

        let mut cfg = Self::from_toml_str(&contents)?;
        cfg.apply_env_overrides(|key| env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    /// Overlay values from the environment. `lookup` is injected so tests need not touch process state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EN_API_URL") {
            self.provider.base_url = Some(v);
        }
        if let Some(v) = lookup("EN_USER") {
            self.provider.username = Some(v);
        }
        if let Some(v) = lookup("EN_PASS") {
            self.provider.password = Some(v);
        }
        if let Some(v) = lookup("PATH_TO_CONSUMPTION_FILES") {
            self.output.dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.uri = Some(v);
        }
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = Some(v);
        }
        if let Some(v) = lookup("DB_PORT") {
            match v.trim().parse() {
                Ok(port) => self.database.port = Some(port),
                Err(e) => tracing::warn!(value = %v, error = %e, "ignoring invalid DB_PORT"),
            }
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = Some(v);
        }
        if let Some(v) = lookup("DB_PASS") {
            self.database.password = Some(v);
        }
        if let Some(v) = lookup("DB_NAME") {
            self.database.name = Some(v);
        }
        if let Some(v) = lookup("EN_TABLE_NAME") {
            self.database.hourly_table = v;
        }
        if let Some(v) = lookup("HL_TABLE_NAME") {
            self.database.daily_cost_table = v;
        }
        if let Some(v) = lookup("ENDESA_ENABLED") {
            self.database.hourly_enabled = parse_flag(&v);
        }
        if let Some(v) = lookup("HOLALUZ_ENABLED") {
            self.database.daily_cost_enabled = parse_flag(&v);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}
