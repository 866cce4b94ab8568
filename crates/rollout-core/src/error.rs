use thiserror::Error;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("not initialized: run 'rollout init'")]
    NotInitialized,

    #[error("home directory not found: set HOME or ROLLOUT_CACHE_FILE")]
    HomeNotFound,

    #[error("cache error: {0}")]
    Cache(String),

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("invalid command template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RolloutError>;
