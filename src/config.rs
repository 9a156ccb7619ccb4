use serde::Deserialize;

/// Durable store backing the dataset caches
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Redis,
    /// Process-local map, lost on restart. Useful for development and tests.
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Gemini API key
    pub gemini_api_key: String,

    /// Gemini API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Model identifier sent with every generation request
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Which key-value store persists the caches
    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix for every persisted key
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_storage() -> StorageBackend {
    StorageBackend::Redis
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_cache_namespace() -> String {
    "moviescout".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config: Config = envy::from_iter(vars(&[("GEMINI_API_KEY", "secret")])).unwrap();

        assert_eq!(config.gemini_api_key, "secret");
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.storage, StorageBackend::Redis);
        assert_eq!(config.cache_namespace, "moviescout");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_memory_storage_selectable() {
        let config: Config = envy::from_iter(vars(&[
            ("GEMINI_API_KEY", "secret"),
            ("STORAGE", "memory"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let result = envy::from_iter::<_, Config>(vars(&[("PORT", "8080")]));
        assert!(result.is_err());
    }
}
