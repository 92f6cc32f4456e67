use serde_json::{Map, Value};

use super::settings::Settings;
use super::ConfigError;

const SEARCH_PROVIDERS: [&str; 4] = ["duckduckgo", "google", "brave", "bing"];

/// Structural validation of the merged config before deserialization.
pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    validate_bool_field(root, "debug", "debug")?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(
            llm,
            "llm.embedding_batch_size",
            "embedding_batch_size",
            1,
            2048,
        )?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        validate_optional_string_field(search, "search.provider", "provider")?;
        if let Some(provider) = search.get("provider").and_then(|v| v.as_str()) {
            if !SEARCH_PROVIDERS.contains(&provider) {
                return Err(ConfigError::Invalid {
                    path: "search.provider".to_string(),
                    reason: format!("must be one of {}", SEARCH_PROVIDERS.join(", ")),
                });
            }
        }
        validate_u64_field(search, "search.max_results", "max_results", 1, 100)?;
        if let Some(endpoints) = expect_optional_object(search, "endpoints")? {
            for provider in SEARCH_PROVIDERS {
                let path = format!("search.endpoints.{}", provider);
                validate_optional_string_field(endpoints, &path, provider)?;
            }
        }
    }

    if let Some(crawler) = expect_optional_object(root, "crawler")? {
        validate_u64_field(crawler, "crawler.timeout_secs", "timeout_secs", 1, 600)?;
        validate_u64_field(crawler, "crawler.concurrency", "concurrency", 1, 64)?;
        validate_u64_field(
            crawler,
            "crawler.max_content_chars",
            "max_content_chars",
            1,
            5_000_000,
        )?;
        validate_optional_string_field(crawler, "crawler.user_agent", "user_agent")?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 100_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 100_000)?;
        validate_u64_field(
            rag,
            "rag.max_chunks_per_document",
            "max_chunks_per_document",
            1,
            10_000,
        )?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 100)?;
        validate_u64_field(
            rag,
            "rag.max_context_chars",
            "max_context_chars",
            1,
            1_000_000,
        )?;
        validate_f64_field(
            rag,
            "rag.cache_similarity_threshold",
            "cache_similarity_threshold",
            -1.0,
            1.0,
        )?;
    }

    if let Some(logging) = expect_optional_object(root, "logging")? {
        validate_u64_field(
            logging,
            "logging.recent_capacity",
            "recent_capacity",
            1,
            100_000,
        )?;
        validate_bool_field(logging, "logging.file_enabled", "file_enabled")?;
    }

    Ok(())
}

/// Cross-field checks that only make sense on typed settings.
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.rag.chunk_overlap >= settings.rag.chunk_size {
        return Err(ConfigError::Invalid {
            path: "rag.chunk_overlap".to_string(),
            reason: "must be smaller than rag.chunk_size".to_string(),
        });
    }
    if settings.rag.max_context_chars <= settings.rag.chunk_size {
        return Err(ConfigError::Invalid {
            path: "rag.max_context_chars".to_string(),
            reason: "must be larger than rag.chunk_size".to_string(),
        });
    }
    if settings.llm.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid {
            path: "llm.base_url".to_string(),
            reason: "value cannot be empty".to_string(),
        });
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: format!("{}[{}]", path, index),
                reason: "value cannot be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn range_error<T: std::fmt::Display>(path: &str, min: T, max: T) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: format!("must be between {} and {}", min, max),
    }
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: format!("expected {}", expected),
    }
}
