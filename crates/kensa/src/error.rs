use thiserror::Error;

#[derive(Error, Debug)]
pub enum KensaError {
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Invalid manifest: {0}")]
    MpdParsing(String),

    #[error(transparent)]
    MpdParseError(#[from] dash_mpd::DashMpdError),

    #[error("Failed to parse time: {0}")]
    DateTimeParsing(String),

    #[error(transparent)]
    ChronoParseError(#[from] chrono::ParseError),

    #[error(transparent)]
    DurationOutOfRange(#[from] chrono::OutOfRangeError),

    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid HTTP header: {0}")]
    InvalidHeader(String),
}

/// Coarse classification of fatal conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required attribute is missing or malformed.
    ParseError,
    /// The manifest relies on something the validator does not handle, or
    /// violates a structural precondition.
    UnsupportedFeature,
    /// A fetch timed out, failed or returned a non-success status.
    TransportFailure,
}

impl KensaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            Self::MpdParsing(_)
            | Self::MpdParseError(_)
            | Self::DateTimeParsing(_)
            | Self::ChronoParseError(_)
            | Self::DurationOutOfRange(_) => ErrorKind::ParseError,
            Self::HttpError(_)
            | Self::RequestError(_)
            | Self::UrlParseError(_)
            | Self::InvalidHeader(_) => ErrorKind::TransportFailure,
        }
    }

    pub fn is_unsupported_feature(&self) -> bool {
        self.kind() == ErrorKind::UnsupportedFeature
    }

    pub fn is_parse_error(&self) -> bool {
        self.kind() == ErrorKind::ParseError
    }

    pub fn is_transport_failure(&self) -> bool {
        self.kind() == ErrorKind::TransportFailure
    }
}

pub type KensaResult<T> = Result<T, KensaError>;
