use std::env;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Managed backend
    pub backend_url: String,
    pub backend_api_key: String,

    // AI assistant
    pub assistant_url: String,

    // Realtime polling
    pub realtime_poll_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            backend_url: required_env("BACKEND_URL"),
            backend_api_key: required_env("BACKEND_API_KEY"),
            assistant_url: required_env("ASSISTANT_URL"),
            realtime_poll_secs: env::var("REALTIME_POLL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("REALTIME_POLL_SECS must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
