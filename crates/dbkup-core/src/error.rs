use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Backup file already exists: {0}")]
    BackupExists(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use dbkup_core::Error;
    /// let err = Error::config_error("Unsupported driver");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for creating database errors
    ///
    /// # Example
    /// ```
    /// use dbkup_core::Error;
    /// let err = Error::database("Failed to list tables: connection refused");
    /// ```
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Helper for creating general errors with a message
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    /// Whether this error means the requested thing does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TableNotFound(_))
    }
}
