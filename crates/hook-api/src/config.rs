//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// JSON file holding named subtitle presets
    pub presets_file: PathBuf,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Most job results kept for status lookups
    pub history_max_entries: usize,
    /// Results older than this are dropped from history
    pub history_max_age: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8002,
            cors_origins: vec!["*".to_string()],
            max_body_size: 2 * 1024 * 1024, // 2MB
            environment: "development".to_string(),
            presets_file: PathBuf::from("subtitle_presets.json"),
            metrics_enabled: true,
            history_max_entries: 1000,
            history_max_age: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            presets_file: std::env::var("PRESETS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.presets_file),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            history_max_entries: std::env::var("HISTORY_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.history_max_entries),
            history_max_age: std::env::var("HISTORY_MAX_DAYS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(|days| Duration::from_secs(days.saturating_mul(24 * 60 * 60)))
                .unwrap_or(defaults.history_max_age),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8002);
        assert!(config.metrics_enabled);
        assert!(!config.is_production());
        assert_eq!(config.history_max_entries, 1000);
        assert_eq!(config.history_max_age.as_secs(), 30 * 86_400);
    }
}
