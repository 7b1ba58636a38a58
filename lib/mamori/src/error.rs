use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reasons a single check failed
///
/// These only ever end up in debug logs. Everything leaving the crate is collapsed into [`InvalidAuthenticityToken`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed authenticity token")]
    MalformedToken,

    #[error("Missing authenticity token")]
    MissingToken,

    #[error("Authenticity token doesn't match the session secret")]
    TokenMismatch,

    #[error("Origin header doesn't match the request origin")]
    OriginMismatch,

    #[error("Session secret is corrupted")]
    SecretCorrupted,
}

/// The request couldn't be verified to originate from this application
#[derive(Clone, Copy, Debug, Default, Error, PartialEq, Eq)]
#[error("Can't verify CSRF token authenticity")]
pub struct InvalidAuthenticityToken {
    _priv: (),
}
