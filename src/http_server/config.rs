//! HTTP Server Configuration
//!
//! Bind address, CORS origins and the chunking of streamed archive bodies.

use serde::{Deserialize, Serialize};

use super::sink::DEFAULT_CHUNK_SIZE;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 25443)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Bytes buffered per response chunk of a streamed archive
    /// (default: 64 KiB). Smaller chunks reach the client sooner.
    #[serde(default = "default_stream_chunk_size")]
    pub stream_chunk_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    25443
}

fn default_stream_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            stream_chunk_size: default_stream_chunk_size(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 25443);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.stream_chunk_size, 65536);
    }

    #[test]
    fn test_socket_addr() {
        let config = HttpServerConfig::with_port(8080);
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HttpServerConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.stream_chunk_size, 65536);
    }

    #[test]
    fn test_stream_chunk_size_from_json() {
        let config: HttpServerConfig =
            serde_json::from_str(r#"{"stream_chunk_size": 4096}"#).unwrap();
        assert_eq!(config.stream_chunk_size, 4096);
        assert_eq!(config.port, 25443);
    }
}
