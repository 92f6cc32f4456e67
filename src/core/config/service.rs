use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::{validate_config, validate_settings};
use super::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 14] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "auth_",
    "_auth",
    "authorization",
    "cookie",
    "access_key",
    "bearer",
    "x-api-key",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "tokens", "token_count"];

/// Environment variables that override config keys, with the value kind.
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 13] = [
    ("DEBUG", &["debug"], EnvKind::Flag),
    ("HOST", &["server", "host"], EnvKind::Text),
    ("PORT", &["server", "port"], EnvKind::Integer),
    ("OPENAI_API_KEY", &["llm", "api_key"], EnvKind::Text),
    ("OPENAI_BASE_URL", &["llm", "base_url"], EnvKind::Text),
    ("OPENAI_CHAT_MODEL", &["llm", "chat_model"], EnvKind::Text),
    ("OPENAI_EMBEDDING_MODEL", &["llm", "embedding_model"], EnvKind::Text),
    ("SEARCH_PROVIDER", &["search", "provider"], EnvKind::Text),
    ("GOOGLE_SEARCH_API_KEY", &["search", "google_search_api_key"], EnvKind::Text),
    ("GOOGLE_SEARCH_ENGINE_ID", &["search", "google_search_engine_id"], EnvKind::Text),
    ("BRAVE_SEARCH_API_KEY", &["search", "brave_search_api_key"], EnvKind::Text),
    ("BING_SEARCH_API_KEY", &["search", "bing_search_api_key"], EnvKind::Text),
    ("LOG_RECENT_CAPACITY", &["logging", "recent_capacity"], EnvKind::Integer),
];

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
    /// Only the literal `"true"` enables a flag.
    Flag,
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Loads `config.yml` deep-merged with `secrets.yaml`.
    pub fn load_config(&self) -> Result<Value, ConfigError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Loads the merged config, applies process environment overrides,
    /// validates it and returns typed settings.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let mut config = self.load_config()?;
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        settings_from_value(config)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn settings_from_value(config: Value) -> Result<Settings, ConfigError> {
    validate_config(&config)?;
    let settings: Settings = serde_json::from_value(config)?;
    validate_settings(&settings)?;
    Ok(settings)
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value = serde_yaml::from_str::<Value>(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Invalid {
            path: path.display().to_string(),
            reason: "expected a mapping at the document root".to_string(),
        }),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    for (var, path, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let raw = raw.trim();
        let value = match kind {
            EnvKind::Text => {
                if raw.is_empty() {
                    continue;
                }
                Value::String(raw.to_string())
            }
            EnvKind::Integer => match raw.parse::<u64>() {
                Ok(number) => Value::from(number),
                Err(_) => Value::String(raw.to_string()),
            },
            EnvKind::Flag => Value::Bool(raw == "true"),
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

/// Whether a config key or HTTP header name carries a credential.
pub fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

pub fn redacted_placeholder() -> &'static str {
    REDACT_PLACEHOLDER
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": {
                "api_key": "sk-live",
                "max_tokens": 42,
                "chat_model": "gpt-4o-mini"
            },
            "search": { "brave_search_api_key": "brave" }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": {
                    "api_key": "****",
                    "max_tokens": 42,
                    "chat_model": "gpt-4o-mini"
                },
                "search": { "brave_search_api_key": "****" }
            })
        );
    }

    #[test]
    fn sensitive_header_names_are_detected() {
        assert!(is_sensitive_key("Authorization"));
        assert!(is_sensitive_key("cookie"));
        assert!(is_sensitive_key("x-api-key"));
        assert!(!is_sensitive_key("content-type"));
        assert!(!is_sensitive_key("max_tokens"));
    }

    #[test]
    fn env_overrides_are_typed_and_nested() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEBUG", "true"),
            ("PORT", "9100"),
            ("OPENAI_API_KEY", "sk-test"),
            ("SEARCH_PROVIDER", "  "),
        ]);
        let mut config = json!({ "server": { "host": "127.0.0.1" }, "search": { "provider": "brave" } });

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config["debug"], json!(true));
        assert_eq!(config["server"]["port"], json!(9100));
        assert_eq!(config["server"]["host"], json!("127.0.0.1"));
        assert_eq!(config["llm"]["api_key"], json!("sk-test"));
        assert_eq!(config["search"]["provider"], json!("brave"));
    }

    #[test]
    fn debug_flag_requires_literal_true() {
        let mut config = json!({});
        apply_env_overrides(&mut config, |key| {
            (key == "DEBUG").then(|| "1".to_string())
        });
        assert_eq!(config["debug"], json!(false));
    }

    #[test]
    fn load_settings_merges_secrets_file() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));
        fs::write(
            paths.project_root.join("config.yml"),
            "server:\n  port: 8123\nllm:\n  chat_model: local-model\n",
        )
        .unwrap();
        fs::write(&paths.secrets_path, "llm:\n  api_key: sk-secret\n").unwrap();

        let service = ConfigService::new(Arc::new(paths));
        let merged = service.load_config().unwrap();
        let settings = settings_from_value(merged).unwrap();

        assert_eq!(settings.server.port, 8123);
        assert_eq!(settings.llm.chat_model, "local-model");
        assert_eq!(settings.llm.api_key, "sk-secret");
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "server: [unclosed").unwrap();

        let err = load_yaml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
