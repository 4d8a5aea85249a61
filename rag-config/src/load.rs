//! Config file discovery, parsing, and environment overrides.

use crate::errors::ConfigError;
use crate::model::{Config, QdrantSection};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "mcp-config.json";

/// Loads, resolves, overrides, and validates the configuration.
///
/// Discovery order: `explicit` argument, `MCP_CONFIG_FILE`, `mcp-config.json`
/// in the working directory, `config/mcp-config.json`, then upward search
/// from the working directory.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => discover()?,
    };
    info!(target: "rag_config", config = %path.display(), "loading configuration");
    let mut config = load_from_path(&path)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Parses the file and resolves `project_root` against its directory.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let mut config: Config = serde_json::from_str(&raw)?;

    if let Ok(root) = env::var("MCP_PROJECT_ROOT") {
        config.project_root = PathBuf::from(root);
    } else if config.project_root.is_relative() {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.project_root = base.join(&config.project_root);
    }
    Ok(config)
}

fn discover() -> Result<PathBuf, ConfigError> {
    if let Ok(from_env) = env::var("MCP_CONFIG_FILE") {
        let p = PathBuf::from(from_env);
        if p.exists() {
            return Ok(p);
        }
        return Err(ConfigError::NotFound);
    }

    let cwd = env::current_dir()?;
    for candidate in [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("config").join(CONFIG_FILE_NAME),
    ] {
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Upward search from the working directory.
    let mut current = cwd.as_path();
    while let Some(parent) = current.parent() {
        let candidate = parent.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Ok(candidate);
        }
        current = parent;
    }
    Err(ConfigError::NotFound)
}

/// `QDRANT_CLOUD_URL`, `QDRANT_API_KEY`, and `QDRANT_COLLECTION` override
/// (or create) the cloud endpoint.
fn apply_env_overrides(config: &mut Config) {
    let url = env::var("QDRANT_CLOUD_URL").ok();
    let api_key = env::var("QDRANT_API_KEY").ok();
    let collection = env::var("QDRANT_COLLECTION").ok();
    if url.is_none() && api_key.is_none() && collection.is_none() {
        return;
    }
    debug!(target: "rag_config", "applying qdrant env overrides");

    match &mut config.cloud_qdrant {
        Some(section) => {
            if let Some(url) = url {
                section.url = url;
            }
            if api_key.is_some() {
                section.api_key = api_key;
            }
            if let Some(collection) = collection {
                section.collection = collection;
            }
        }
        None => {
            if let (Some(url), Some(collection)) = (url, collection) {
                config.cloud_qdrant = Some(QdrantSection {
                    url,
                    api_key,
                    collection,
                    timeout: 30,
                    retry_attempts: 3,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "project_root": ".",
        "local_qdrant": {"url": "http://localhost:6334", "collection": "docs_local"},
        "cloud_docs": ["docs/**/*.md"]
    }"#;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn minimal_config_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), MINIMAL);
        let config = load_from_path(&path).unwrap();
        config.validate().unwrap();

        assert_eq!(config.hybrid_retrieval.search_top_k, 20);
        assert_eq!(config.hybrid_retrieval.rerank_top_k, 10);
        assert!((config.hybrid_retrieval.hybrid_weights.vector - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.chunking.doc_chunk_size, 1000);
        assert_eq!(config.local_qdrant.as_ref().unwrap().timeout, 30);
        assert_eq!(config.local_qdrant.as_ref().unwrap().retry_attempts, 3);
        // project_root resolved against the config directory.
        assert!(config.project_root.starts_with(dir.path()));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"project_root": ".", "surprise_key": true}"#,
        );
        assert!(matches!(
            load_from_path(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn mismatched_doc_and_code_models_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{
            "project_root": ".",
            "local_qdrant": {"url": "http://localhost:6334", "collection": "c"},
            "embedding_models": {"doc": "minilm", "code": "codebert"}
        }"#;
        let path = write_config(dir.path(), body);
        let config = load_from_path(&path).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{
            "project_root": ".",
            "local_qdrant": {"url": "http://localhost:6334", "collection": "c"},
            "hybrid_retrieval": {"hybrid_weights": {"bm25": 0.5, "vector": 0.7}}
        }"#;
        let path = write_config(dir.path(), body);
        let config = load_from_path(&path).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn no_endpoint_at_all_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{"project_root": "."}"#);
        let config = load_from_path(&path).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
