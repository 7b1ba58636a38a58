//! Per-request forgery protection policy

use crate::{
    config::Configuration,
    error::{Error, InvalidAuthenticityToken},
    mask, origin,
    session::{Session, SessionSecret},
    verify, MaskedToken, Result, SECRET_BYTES,
};
use http::{Method, StatusCode};
use triomphe::Arc;

/// Outcome of verifying a single request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    /// Protection is turned off or the method is safe
    NotRequired,
    Verified,
    Rejected,
}

/// What should happen with a request after the unverified-request handler ran
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Hand the request to the action
    Continue,

    /// Short-circuit with an empty response of this status
    Respond(StatusCode),
}

/// Strategy invoked whenever a request fails verification
///
/// Overriding it changes how the application reacts, never how requests are verified.
pub trait UnverifiedRequestHandler {
    fn handle(&self, session: &dyn Session, error: &InvalidAuthenticityToken) -> Disposition;
}

impl<F> UnverifiedRequestHandler for F
where
    F: Fn(&dyn Session, &InvalidAuthenticityToken) -> Disposition,
{
    #[inline]
    fn handle(&self, session: &dyn Session, error: &InvalidAuthenticityToken) -> Disposition {
        (self)(session, error)
    }
}

/// Wipe the session and let the request through as a logged-out one
///
/// This is the default. A forged request ends up without any of the victim's session state.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResetSession;

impl UnverifiedRequestHandler for ResetSession {
    #[inline]
    fn handle(&self, session: &dyn Session, _error: &InvalidAuthenticityToken) -> Disposition {
        session.reset();
        Disposition::Continue
    }
}

/// Refuse the request with a fixed status, leaving the session untouched
#[derive(Clone, Copy, Debug)]
pub struct RejectWith(pub StatusCode);

impl Default for RejectWith {
    fn default() -> Self {
        Self(StatusCode::UNPROCESSABLE_ENTITY)
    }
}

impl UnverifiedRequestHandler for RejectWith {
    #[inline]
    fn handle(&self, _session: &dyn Session, _error: &InvalidAuthenticityToken) -> Disposition {
        Disposition::Respond(self.0)
    }
}

/// Everything the guard needs to know about an incoming request
#[derive(Clone, Copy, Debug)]
pub struct Submission<'a> {
    pub method: &'a Method,

    /// Token submitted through the configured parameter (or header)
    pub token: Option<&'a str>,

    /// Value of the `Origin` header, if any
    pub origin: Option<&'a str>,

    /// `scheme://host[:port]` of the request itself, see [`origin::base_url`]
    pub base_url: Option<&'a str>,
}

/// GET and HEAD never mutate state, so they never need a token
#[inline]
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

#[derive(Clone)]
pub struct ForgeryGuard<H = ResetSession> {
    config: Arc<Configuration>,
    handler: H,
}

impl ForgeryGuard {
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self {
            config: Arc::new(config),
            handler: ResetSession,
        }
    }
}

impl Default for ForgeryGuard {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl<H> ForgeryGuard<H> {
    /// Replace the unverified-request handler
    #[must_use]
    pub fn with_handler<NH>(self, handler: NH) -> ForgeryGuard<NH> {
        ForgeryGuard {
            config: self.config,
            handler,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    #[inline]
    pub(crate) fn shared_config(&self) -> Arc<Configuration> {
        Arc::clone(&self.config)
    }

    #[inline]
    #[must_use]
    pub fn protect_against_forgery(&self) -> bool {
        self.config.allow_forgery_protection
    }

    /// Mint a masked token for the session, creating its secret if needed
    pub fn form_authenticity_token<S>(&self, session: &S) -> Result<MaskedToken>
    where
        S: Session + ?Sized,
    {
        let secret = SessionSecret::get_or_create(session)?;
        Ok(mask::mint(&secret))
    }

    fn check_token<S>(token: Option<&str>, session: &S) -> Result<()>
    where
        S: Session + ?Sized,
    {
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            // Same digest work as a submitted token, without touching the session
            let _ = verify::check("", &SessionSecret::from_bytes([0; SECRET_BYTES]));
            return Err(Error::MissingToken);
        };

        let secret = SessionSecret::get_or_create(session)?;
        verify::check(token, &secret)
    }

    /// Decide whether the request is verified, without any side effect besides secret creation
    #[must_use]
    pub fn verified_request<S>(&self, submission: &Submission<'_>, session: &S) -> Verification
    where
        S: Session + ?Sized,
    {
        if !self.protect_against_forgery() || is_safe_method(submission.method) {
            return Verification::NotRequired;
        }

        // Both checks always run, regardless of the first one's outcome
        let token_result = Self::check_token(submission.token, session);
        let origin_result = origin::check(submission.origin, submission.base_url.unwrap_or(""));

        if let Err(ref error) = token_result {
            debug!(?error, "token check failed");
        }
        if let Err(ref error) = origin_result {
            debug!(?error, "origin check failed");
        }

        #[allow(clippy::needless_bitwise_bool)]
        let verified = token_result.is_ok() & origin_result.is_ok();

        if verified {
            Verification::Verified
        } else {
            Verification::Rejected
        }
    }
}

impl<H> ForgeryGuard<H>
where
    H: UnverifiedRequestHandler,
{
    /// Verify the request and run the unverified-request handler if it got rejected
    #[must_use]
    pub fn verify_authenticity_token<S>(
        &self,
        submission: &Submission<'_>,
        session: &S,
    ) -> (Verification, Disposition)
    where
        S: Session,
    {
        let verification = self.verified_request(submission, session);
        if verification != Verification::Rejected {
            return (verification, Disposition::Continue);
        }

        let error = InvalidAuthenticityToken::default();
        warn!(method = %submission.method, "{error}");

        (verification, self.handler.handle(session, &error))
    }
}
