use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub gemini_api_key: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Front-end origin allowed by CORS, e.g. `http://localhost:3000`.
    pub cors_origin: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub gemini_base_url: String,
    pub vision_model: String,
    pub text_model: String,
    /// Upper bound for a single vision or text model call.
    pub upstream_timeout_secs: u64,
    pub max_image_bytes: usize,
    /// Most recent historical rows fetched per category during validation.
    pub history_limit: i64,
}

impl AppConfig {
    /// The subset of settings needed to talk to the model API.
    #[must_use]
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            gemini_api_key: self.gemini_api_key.clone(),
            gemini_base_url: self.gemini_base_url.clone(),
            vision_model: self.vision_model.clone(),
            text_model: self.text_model.clone(),
            upstream_timeout_secs: self.upstream_timeout_secs,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("cors_origin", &self.cors_origin)
            .field("database_url", &"[redacted]")
            .field("gemini_api_key", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("vision_model", &self.vision_model)
            .field("text_model", &self.text_model)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

/// Model API settings, loadable without any database configuration.
#[derive(Clone)]
pub struct ModelConfig {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub vision_model: String,
    pub text_model: String,
    pub upstream_timeout_secs: u64,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("gemini_api_key", &"[redacted]")
            .field("gemini_base_url", &self.gemini_base_url)
            .field("vision_model", &self.vision_model)
            .field("text_model", &self.text_model)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .finish()
    }
}
