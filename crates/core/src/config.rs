use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["recommender.toml", "config/recommender.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Tunables of the recommendation engine itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lifetime of a cached response.
    pub cache_ttl_secs: u64,
    /// Maximum cached responses before least-recently-used eviction.
    pub cache_capacity: usize,
    /// Age after which the next request triggers a full rebuild.
    pub update_interval_secs: u64,
    pub max_vocabulary: usize,
    pub max_latent_factors: usize,
    pub default_count: usize,
    pub personalized_default_count: usize,
    pub max_count: usize,
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(clamp_secs(self.cache_ttl_secs))
    }

    pub fn update_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(clamp_secs(self.update_interval_secs))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 2 * 60 * 60,
            cache_capacity: 1024,
            update_interval_secs: 60 * 60,
            max_vocabulary: 200,
            max_latent_factors: 50,
            default_count: 5,
            personalized_default_count: 10,
            max_count: 100,
        }
    }
}

fn clamp_secs(value: u64) -> i64 {
    // chrono durations are bounded well below i64::MAX seconds
    value.min(i64::MAX as u64 / 1_000) as i64
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub cache_ttl_secs: Option<u64>,
    pub update_interval_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://recommender.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 5001,
                graceful_shutdown_secs: 15,
            },
            engine: EngineConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(engine) = patch.engine {
            let target = &mut self.engine;
            if let Some(value) = engine.cache_ttl_secs {
                target.cache_ttl_secs = value;
            }
            if let Some(value) = engine.cache_capacity {
                target.cache_capacity = value;
            }
            if let Some(value) = engine.update_interval_secs {
                target.update_interval_secs = value;
            }
            if let Some(value) = engine.max_vocabulary {
                target.max_vocabulary = value;
            }
            if let Some(value) = engine.max_latent_factors {
                target.max_latent_factors = value;
            }
            if let Some(value) = engine.default_count {
                target.default_count = value;
            }
            if let Some(value) = engine.personalized_default_count {
                target.personalized_default_count = value;
            }
            if let Some(value) = engine.max_count {
                target.max_count = value;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RECOMMENDER_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("RECOMMENDER_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("RECOMMENDER_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("RECOMMENDER_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RECOMMENDER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("RECOMMENDER_SERVER_PORT") {
            self.server.port = parse_u16("RECOMMENDER_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("RECOMMENDER_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("RECOMMENDER_ENGINE_CACHE_TTL_SECS") {
            self.engine.cache_ttl_secs = parse_u64("RECOMMENDER_ENGINE_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_ENGINE_CACHE_CAPACITY") {
            self.engine.cache_capacity = parse_usize("RECOMMENDER_ENGINE_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_ENGINE_UPDATE_INTERVAL_SECS") {
            self.engine.update_interval_secs =
                parse_u64("RECOMMENDER_ENGINE_UPDATE_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_ENGINE_MAX_VOCABULARY") {
            self.engine.max_vocabulary = parse_usize("RECOMMENDER_ENGINE_MAX_VOCABULARY", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_ENGINE_MAX_LATENT_FACTORS") {
            self.engine.max_latent_factors =
                parse_usize("RECOMMENDER_ENGINE_MAX_LATENT_FACTORS", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_ENGINE_DEFAULT_COUNT") {
            self.engine.default_count = parse_usize("RECOMMENDER_ENGINE_DEFAULT_COUNT", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_ENGINE_PERSONALIZED_DEFAULT_COUNT") {
            self.engine.personalized_default_count =
                parse_usize("RECOMMENDER_ENGINE_PERSONALIZED_DEFAULT_COUNT", &value)?;
        }
        if let Some(value) = read_env("RECOMMENDER_ENGINE_MAX_COUNT") {
            self.engine.max_count = parse_usize("RECOMMENDER_ENGINE_MAX_COUNT", &value)?;
        }

        let log_level =
            read_env("RECOMMENDER_LOGGING_LEVEL").or_else(|| read_env("RECOMMENDER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RECOMMENDER_LOGGING_FORMAT").or_else(|| read_env("RECOMMENDER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(cache_ttl_secs) = overrides.cache_ttl_secs {
            self.engine.cache_ttl_secs = cache_ttl_secs;
        }
        if let Some(update_interval_secs) = overrides.update_interval_secs {
            self.engine.update_interval_secs = update_interval_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_engine(&self.engine)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First existing config file, either the explicit path or one of [`DEFAULT_CONFIG_FILES`].
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    if engine.cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "engine.cache_capacity must be greater than zero".to_string(),
        ));
    }
    if engine.update_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "engine.update_interval_secs must be greater than zero".to_string(),
        ));
    }
    if engine.max_vocabulary == 0 {
        return Err(ConfigError::Validation(
            "engine.max_vocabulary must be greater than zero".to_string(),
        ));
    }
    if engine.max_count == 0 {
        return Err(ConfigError::Validation("engine.max_count must be greater than zero".to_string()));
    }
    for (key, value) in [
        ("engine.default_count", engine.default_count),
        ("engine.personalized_default_count", engine.personalized_default_count),
    ] {
        if value == 0 || value > engine.max_count {
            return Err(ConfigError::Validation(format!(
                "{key} must be in range 1..={} (engine.max_count)",
                engine.max_count
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    engine: Option<EnginePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    cache_ttl_secs: Option<u64>,
    cache_capacity: Option<usize>,
    update_interval_secs: Option<u64>,
    max_vocabulary: Option<usize>,
    max_latent_factors: Option<usize>,
    default_count: Option<usize>,
    personalized_default_count: Option<usize>,
    max_count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, EngineConfig, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_engine_constants() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.engine == EngineConfig::default(), "engine defaults should be untouched")?;
        ensure(config.engine.cache_ttl().num_seconds() == 7_200, "cache ttl defaults to two hours")?;
        ensure(
            config.engine.update_interval().num_seconds() == 3_600,
            "update interval defaults to one hour",
        )?;
        ensure(config.server.port == 5001, "default port should be 5001")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logging by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_RECOMMENDER_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("recommender.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_RECOMMENDER_DB}"

[engine]
cache_capacity = 64
max_vocabulary = 150
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.engine.cache_capacity == 64, "cache capacity should come from file")?;
            ensure(config.engine.max_vocabulary == 150, "vocabulary cap should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_RECOMMENDER_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOMMENDER_LOG_LEVEL", "warn");
        env::set_var("RECOMMENDER_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["RECOMMENDER_LOG_LEVEL", "RECOMMENDER_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOMMENDER_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("RECOMMENDER_ENGINE_CACHE_TTL_SECS", "600");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("recommender.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[engine]
cache_ttl_secs = 60
update_interval_secs = 120

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.engine.cache_ttl_secs == 600, "env cache ttl should win over file")?;
            ensure(config.engine.update_interval_secs == 120, "file interval should win over default")?;
            Ok(())
        })();

        clear_vars(&["RECOMMENDER_DATABASE_URL", "RECOMMENDER_ENGINE_CACHE_TTL_SECS"]);
        result
    }

    #[test]
    fn invalid_env_number_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOMMENDER_ENGINE_CACHE_CAPACITY", "lots");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "RECOMMENDER_ENGINE_CACHE_CAPACITY"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["RECOMMENDER_ENGINE_CACHE_CAPACITY"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RECOMMENDER_ENGINE_DEFAULT_COUNT", "500");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("engine.default_count")
            );
            ensure(has_message, "validation failure should mention engine.default_count")
        })();

        clear_vars(&["RECOMMENDER_ENGINE_DEFAULT_COUNT"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let result = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "absent required file should fail",
        )
    }
}
