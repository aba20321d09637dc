use std::path::PathBuf;

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
    /// Base URL of the marketing backend, e.g. `"https://api.example.com"`.
    pub api_base_url: String,
    /// Bearer token for authenticated calls. Publishing requires one.
    pub access_token: Option<String>,
    pub env: Environment,
    pub log_level: String,
    /// Directory holding the file-backed session slots.
    pub state_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    pub publish_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Per-file upload cap in bytes. Larger files are excluded from a submission.
    pub max_upload_bytes: u64,
    pub upload_subdir: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("state_dir", &self.state_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("generate_timeout_secs", &self.generate_timeout_secs)
            .field("publish_timeout_secs", &self.publish_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("upload_subdir", &self.upload_subdir)
            .finish()
    }
}
