use rusqlite::ErrorCode;

/// Failures from either record store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("stored applications could not be parsed")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to encode applications")]
    Encode(#[source] serde_json::Error),
    #[error("failed to read applications")]
    Read(#[source] rusqlite::Error),
    #[error("storage quota exceeded")]
    QuotaExceeded(#[source] rusqlite::Error),
    #[error("failed to write applications")]
    Write(#[source] rusqlite::Error),
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl StoreError {
    /// Splits SQLite write failures into "storage full" and everything else.
    pub fn from_write(err: rusqlite::Error) -> Self {
        let full = matches!(
            &err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::DiskFull
        );
        if full {
            StoreError::QuotaExceeded(err)
        } else {
            StoreError::Write(err)
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Corrupt(_) | StoreError::Read(_) => {
                "Error loading your saved applications. Storage may be full."
            }
            StoreError::QuotaExceeded(_) => {
                "Storage limit exceeded. Please delete some old applications."
            }
            StoreError::Encode(_) | StoreError::Write(_) => {
                "Error saving your application. Please try again."
            }
            StoreError::NotSignedIn => "Please sign in to save to the cloud.",
            StoreError::Remote(_) => "Error syncing with the cloud.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request to remote storage failed")]
    Http(#[from] reqwest::Error),
    #[error("remote storage returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected document format: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("account not found or wrong password")]
    InvalidCredentials,
    #[error("an account already exists for {0}")]
    AlreadyExists(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error("authentication rejected: {0}")]
    Rejected(String),
    #[error("authentication request failed")]
    Http(#[from] reqwest::Error),
    #[error("failed to access account storage")]
    Storage(#[from] rusqlite::Error),
    #[error("failed to encode account data")]
    Encode(#[from] serde_json::Error),
}
