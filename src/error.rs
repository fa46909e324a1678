use crate::model::Section;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet sync failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Location {0} does not exist.")]
    UnknownLocation(String),

    #[error("No {kind} with id {id}.")]
    NotFound { kind: &'static str, id: String },

    #[error("{0} is required.")]
    Required(&'static str),

    #[error("Maximum {max} photos per {section} item.")]
    PhotoLimit { section: Section, max: usize },

    #[error("Attach a photo before sharing.")]
    MissingPhoto,

    #[error("Invalid photo data: {0}")]
    InvalidPhoto(String),

    #[error("Sharing failed: {0}")]
    Share(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        DashboardError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
