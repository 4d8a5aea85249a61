use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config file not found (set MCP_CONFIG_FILE or place mcp-config.json next to the binary)")]
    NotFound,

    #[error("invalid config: {0}")]
    Invalid(String),
}
