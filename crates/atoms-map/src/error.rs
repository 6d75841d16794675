//! Error types for standardization.

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("fuzzy threshold {0} must lie in [0, 1]")]
    InvalidThreshold(f64),

    #[error("failed to build standardized table: {0}")]
    Model(#[from] atoms_model::ModelError),

    #[error("failed to serialize mapping report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
