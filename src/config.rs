use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Application configuration, loaded from `ollamachat.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ollama_url: String,
    pub default_model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub max_history_messages: usize,
    pub host: String,
    pub port: u16,
    pub log_dir: String,
    /// Delay inserted between token events for smoother incremental rendering.
    pub stream_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            default_model: "llama3.2:1b".to_string(),
            system_prompt: "You are a helpful AI assistant. Provide clear and concise responses."
                .to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            request_timeout_secs: 60,
            max_retries: 3,
            max_history_messages: 100,
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_dir: "logs".to_string(),
            stream_delay_ms: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./ollamachat.toml` -> `~/ollamachat.toml` -> defaults.
    ///
    /// `OLLAMA_URL` in the environment (or `.env`) overrides the file value.
    pub fn load() -> Self {
        let mut config = Self::load_from_files();
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            if !url.is_empty() {
                config.ollama_url = url;
            }
        }
        config
    }

    fn load_from_files() -> Self {
        let candidates = Self::config_paths();
        for path in &candidates {
            if let Ok(contents) = fs::read_to_string(path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("ollamachat.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("ollamachat.toml"));
        }
        paths
    }

    /// Address the web server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ollama_url, "http://localhost:11434");
        assert_eq!(cfg.default_model, "llama3.2:1b");
        assert_eq!(cfg.temperature, 0.7);
        assert_eq!(cfg.max_tokens, 2000);
        assert_eq!(cfg.request_timeout_secs, 60);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.max_history_messages, 100);
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.log_dir, "logs");
        assert_eq!(cfg.stream_delay_ms, 10);
        assert!(cfg.system_prompt.contains("helpful"));
    }

    #[test]
    fn test_partial_toml_deserialize() {
        let toml_str = r#"
            default_model = "mistral:7b"
            port = 9000
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.default_model, "mistral:7b");
        assert_eq!(cfg.port, 9000);
        // Other fields should be defaults
        assert_eq!(cfg.temperature, 0.7);
        assert_eq!(cfg.max_retries, 3);
    }

    #[test]
    fn test_full_toml_deserialize() {
        let toml_str = r#"
            ollama_url = "http://ollama.lan:11434"
            default_model = "test-model"
            system_prompt = "Be terse."
            temperature = 0.5
            max_tokens = 4096
            request_timeout_secs = 30
            max_retries = 5
            max_history_messages = 10
            host = "127.0.0.1"
            port = 8080
            log_dir = "my_logs"
            stream_delay_ms = 0
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.ollama_url, "http://ollama.lan:11434");
        assert_eq!(cfg.default_model, "test-model");
        assert_eq!(cfg.system_prompt, "Be terse.");
        assert_eq!(cfg.temperature, 0.5);
        assert_eq!(cfg.max_tokens, 4096);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.max_history_messages, 10);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.log_dir, "my_logs");
        assert_eq!(cfg.stream_delay_ms, 0);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        // When no config file exists, load_from_files() returns defaults
        let cfg = AppConfig::load_from_files();
        assert_eq!(cfg.max_retries, AppConfig::default().max_retries);
    }
}
