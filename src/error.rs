use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(ThisError, Debug)]
pub enum Error {
    /// A package was requested with no templates selected.
    #[error("no reports selected: choose at least one template to build a package")]
    EmptySelection,

    /// A selected template id is not in the catalog. Recoverable during bulk
    /// assembly (the entry is skipped).
    #[error("unknown report template: {0}")]
    TemplateNotFound(String),

    #[error("invalid template catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("invalid analysis data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
