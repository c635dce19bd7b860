use thiserror::Error;

pub type Result<T> = std::result::Result<T, BannerError>;

#[derive(Debug, Error)]
pub enum BannerError {
    /// Degenerate configuration or point data. Never clamped.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// A font or decorative asset that the render call depends on.
    #[error("resource unavailable: {resource}: {reason}")]
    ResourceUnavailable { resource: String, reason: String },
    #[error("svg error: {0}")]
    Svg(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("config error: {0}")]
    Config(String),
    /// Malformed donation records.
    #[error("invalid input: {0}")]
    Input(String),
}

impl BannerError {
    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry(message.into())
    }

    pub(crate) fn unavailable(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<usvg::Error> for BannerError {
    fn from(err: usvg::Error) -> Self {
        Self::Svg(err.to_string())
    }
}

impl From<serde_json::Error> for BannerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
