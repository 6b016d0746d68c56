use thiserror::Error;

pub type DrawingResult<T> = Result<T, DrawingError>;

#[derive(Debug, Error)]
pub enum DrawingError {
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unknown drawing tool: {0}")]
    UnknownDrawing(String),

    #[error("invalid `{name}` descriptor: {reason}")]
    InvalidDescriptor { name: String, reason: String },

    #[error("panel `{0}` does not exist")]
    MissingPanel(String),

    #[error("codec error: {0}")]
    Codec(String),
}

impl DrawingError {
    pub(crate) fn descriptor(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
