use std::env;
use std::fs;
use std::path::Path;

use recommender_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in effective_values(&config) {
        let source = field_source(
            key_path,
            env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

type EffectiveValue = (&'static str, String, &'static [&'static str]);

fn effective_values(config: &AppConfig) -> Vec<EffectiveValue> {
    let engine = &config.engine;
    vec![
        entry("database.url", config.database.url.clone(), &["RECOMMENDER_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["RECOMMENDER_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["RECOMMENDER_DATABASE_TIMEOUT_SECS"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["RECOMMENDER_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["RECOMMENDER_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["RECOMMENDER_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry(
            "engine.cache_ttl_secs",
            engine.cache_ttl_secs.to_string(),
            &["RECOMMENDER_ENGINE_CACHE_TTL_SECS"],
        ),
        entry(
            "engine.cache_capacity",
            engine.cache_capacity.to_string(),
            &["RECOMMENDER_ENGINE_CACHE_CAPACITY"],
        ),
        entry(
            "engine.update_interval_secs",
            engine.update_interval_secs.to_string(),
            &["RECOMMENDER_ENGINE_UPDATE_INTERVAL_SECS"],
        ),
        entry(
            "engine.max_vocabulary",
            engine.max_vocabulary.to_string(),
            &["RECOMMENDER_ENGINE_MAX_VOCABULARY"],
        ),
        entry(
            "engine.max_latent_factors",
            engine.max_latent_factors.to_string(),
            &["RECOMMENDER_ENGINE_MAX_LATENT_FACTORS"],
        ),
        entry(
            "engine.default_count",
            engine.default_count.to_string(),
            &["RECOMMENDER_ENGINE_DEFAULT_COUNT"],
        ),
        entry(
            "engine.personalized_default_count",
            engine.personalized_default_count.to_string(),
            &["RECOMMENDER_ENGINE_PERSONALIZED_DEFAULT_COUNT"],
        ),
        entry("engine.max_count", engine.max_count.to_string(), &["RECOMMENDER_ENGINE_MAX_COUNT"]),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["RECOMMENDER_LOGGING_LEVEL", "RECOMMENDER_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["RECOMMENDER_LOGGING_FORMAT", "RECOMMENDER_LOG_FORMAT"],
        ),
    ]
}

fn entry(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> EffectiveValue {
    (key_path, value, env_keys)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
