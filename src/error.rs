//! Typed error taxonomy for the connectivity engine and signaling client.
//!
//! `util::Error` (boxed-string) remains in use inside `candidate`/`url`/
//! `control` for continuity with the `stun`/`turn` interop helpers they call
//! into; this module gives callers outside those leaf modules the `Kind`
//! taxonomy they need to branch on.

use thiserror::Error as ThisError;

/// Coarse classification a caller can match on without inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    InvalidArgument,
    InvalidState,
    Timeout,
    Auth,
    NotFound,
    Conflict,
    Transport,
    Protocol,
    ResourceExhausted,
    GoAway,
    Cancelled,
}

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// ICE went into restart/failed state; the signaling FSM should reconnect.
    #[error("ice restart required: {0}")]
    GoAway(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Util(#[from] util::Error),

    #[error(transparent)]
    Stun(#[from] stun::Error),

    #[error(transparent)]
    Turn(#[from] turn::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Wire(#[from] crate::signaling::wire::WireError),
}

impl Error {
    pub fn kind(&self) -> Kind {
        match self {
            Error::InvalidArgument(_) => Kind::InvalidArgument,
            Error::InvalidState(_) => Kind::InvalidState,
            Error::Timeout(_) => Kind::Timeout,
            Error::Auth(_) => Kind::Auth,
            Error::NotFound(_) => Kind::NotFound,
            Error::Conflict(_) => Kind::Conflict,
            Error::Transport(_) => Kind::Transport,
            Error::Protocol(_) => Kind::Protocol,
            Error::ResourceExhausted(_) => Kind::ResourceExhausted,
            Error::GoAway(_) => Kind::GoAway,
            Error::Cancelled => Kind::Cancelled,
            Error::Util(_) | Error::Stun(_) | Error::Turn(_) | Error::Io(_) => Kind::Transport,
            Error::Json(_) | Error::UrlParse(_) => Kind::Protocol,
            Error::Http(_) | Error::WebSocket(_) => Kind::Transport,
            Error::Wire(_) => Kind::Protocol,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
