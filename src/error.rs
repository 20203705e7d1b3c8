use http::StatusCode;
use thiserror::Error;

use crate::upload::ProcessingState;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;
pub type UploadResult<T> = std::result::Result<T, UploadError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("token acquisition failed : {0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
    #[error("request failed : {0}")]
    Transport(#[from] TransportError),
    #[error("media upload failed : {0}")]
    Upload(#[from] UploadError),
    #[error("no credential is available for account {0}")]
    CredentialNotFound(i64),
    #[error("request was rejected with status {0} : {1}")]
    Status(StatusCode, String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("base url must not carry a query or fragment, but {0} does.")]
    InvalidBaseUrl(String),
    #[error("resource url {0} could not be parsed or recomposed.")]
    MalformedResourceUrl(String),
    #[error("signing key could not be used for HMAC-SHA1.")]
    InvalidSigningKey,
    #[error("parameters could not be serialized : {0}")]
    Serialize(String),
    #[error("header value for {0} contains invalid characters.")]
    InvalidHeader(&'static str),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps an error raised by a transport other than reqwest.
    pub fn custom<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TransportError::Custom(err.into())
    }
}

/// Why a single upload command could not be completed.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("request could not be signed : {0}")]
    Sign(#[from] SignError),
    #[error("transport failed : {0}")]
    Transport(#[from] TransportError),
    #[error("server answered {0} : {1}")]
    Status(StatusCode, String),
    #[error("response body could not be decoded : {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("INIT command failed : {0}")]
    InitFailed(#[source] CommandError),
    #[error("APPEND failed for {failed_segments} segment(s), first at segment {segment_index} : {source}")]
    AppendFailed {
        segment_index: usize,
        failed_segments: usize,
        #[source]
        source: CommandError,
    },
    #[error("FINALIZE command failed : {0}")]
    FinalizeFailed(#[source] CommandError),
    #[error("gave up waiting for media processing (last state {state:?}) : {recovery_hint}")]
    GiveUp {
        state: Option<ProcessingState>,
        recovery_hint: String,
        #[source]
        source: Option<CommandError>,
    },
    #[error("upload was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
    #[error("response has malformed format: {0} is not a valid user id")]
    InvalidUserId(String),
    #[error("server did not confirm the callback url.")]
    CallbackNotConfirmed,
    #[error("callback {0} does not belong to this client.")]
    UnexpectedCallback(String),
    #[error("callback carries token {0}, which was not issued for this authorization.")]
    TokenMismatch(String),
}
