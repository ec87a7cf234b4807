use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceUpError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Assistant error: {0}")]
    Assistant(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
