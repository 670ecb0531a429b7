use thiserror::Error;

/// Everything that can abort a cleaning run.
///
/// Every variant is fatal: a partially cleaned document is never written.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load PDF: {0}")]
    Load(#[from] lopdf::Error),

    #[error("Malformed object {num}: {reason}")]
    MalformedObject { num: u32, reason: String },

    #[error("Cannot decode stream in object {num}: {reason}")]
    StreamDecode { num: u32, reason: String },

    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("Page selection contains no pages")]
    NoPagesSelected,

    #[error("Trailer has no document catalog (Root)")]
    MissingRoot,
}

impl CleanError {
    pub fn malformed(num: u32, reason: impl Into<String>) -> Self {
        CleanError::MalformedObject {
            num,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;
