use crate::types::Category;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IcfError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No cap entry for category '{category}'")]
    MissingCap { category: Category },

    #[error("Unknown transaction category '{label}'")]
    UnknownCategory { label: String },

    #[error("Invalid cap {value} for '{category}': {reason}")]
    InvalidCap { category: Category, value: f64, reason: String },

    #[error("Session not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type IcfResult<T> = Result<T, IcfError>;
