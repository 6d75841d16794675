#![deny(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("schema document must be an object keyed by subtype")]
    InvalidSchemaDocument,

    #[error("no canonical schema for subtype {subtype}")]
    UnknownSubtype { subtype: String },

    #[error("malformed canonical schema for subtype {subtype}: {message}")]
    MalformedSchema { subtype: String, message: String },

    #[error("invalid synonym table: {message}")]
    InvalidSynonyms { message: String },

    #[error("invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StandardsError>;
