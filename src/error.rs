use thiserror::Error;

use crate::unit_defs::types::UnitRef;

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("Malformed unit document {unit}: {detail}")]
    DocumentMalformed { unit: UnitRef, detail: String },
    #[error("Malformed layout document: {0}")]
    LayoutMalformed(String),
    #[error("Unit not found in catalog: {0}")]
    UnknownUnit(UnitRef),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Lua error: {err}")]
    Lua {
        #[from]
        err: mlua::Error,
    },
    #[cfg(feature = "json")]
    #[error("Error serializing or deserializing json: {err}")]
    SerdeJson {
        #[from]
        err: serde_json::Error,
    },
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("File tree error: {0}")]
    VfsError(#[from] vfs::VfsError),
}

impl ErrorKind {
    /// Wraps any failure that happened while turning a unit document into a record.
    pub fn malformed(unit: &UnitRef, detail: impl Into<String>) -> Self {
        ErrorKind::DocumentMalformed {
            unit: unit.clone(),
            detail: detail.into(),
        }
    }

    /// Whether this error only disqualifies a single document rather than the whole load.
    pub fn is_document_level(&self) -> bool {
        matches!(self, ErrorKind::DocumentMalformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, ErrorKind>;
