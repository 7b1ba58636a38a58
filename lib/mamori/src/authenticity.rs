use crate::{
    config::Configuration,
    mask,
    session::{Session, SessionSecret},
    MaskedToken, Result,
};
use smol_str::SmolStr;
use std::fmt::{self, Display, Write};
use triomphe::Arc;

/// View-layer helpers, available from the request extensions of every request that made it past the guard
#[derive(Clone)]
pub struct Authenticity<Sess> {
    session: Sess,
    config: Arc<Configuration>,
}

impl<Sess> Authenticity<Sess>
where
    Sess: Session,
{
    #[must_use]
    pub fn new(session: Sess, config: Arc<Configuration>) -> Self {
        Self { session, config }
    }

    /// Mint a fresh masked token to render into a form
    ///
    /// Fails if the session holds a corrupted secret.
    #[inline]
    pub fn form_authenticity_token(&self) -> Result<MaskedToken> {
        let secret = SessionSecret::get_or_create(&self.session)?;
        Ok(mask::mint(&secret))
    }

    #[inline]
    #[must_use]
    pub fn protect_against_forgery(&self) -> bool {
        self.config.allow_forgery_protection
    }

    /// Name of the parameter the token has to be submitted as
    #[inline]
    #[must_use]
    pub fn param_name(&self) -> &str {
        &self.config.request_forgery_protection_token
    }

    /// Tags for the document head, so scripts can pick up parameter name and token
    ///
    /// `None` when protection is turned off.
    pub fn meta_tags(&self) -> Result<Option<MetaTags>> {
        if !self.protect_against_forgery() {
            return Ok(None);
        }

        Ok(Some(MetaTags {
            param: self.config.request_forgery_protection_token.clone(),
            token: self.form_authenticity_token()?,
        }))
    }
}

#[derive(Clone, Debug)]
pub struct MetaTags {
    pub param: SmolStr,
    pub token: MaskedToken,
}

struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            match ch {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                other => f.write_char(other)?,
            }
        }

        Ok(())
    }
}

impl Display for MetaTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            r#"<meta name="csrf-param" content="{}" />"#,
            Escaped(&self.param)
        )?;
        write!(
            f,
            r#"<meta name="csrf-token" content="{}" />"#,
            Escaped(self.token.as_str())
        )
    }
}

#[cfg(feature = "axum")]
mod axum_impl {
    use super::Authenticity;
    use axum_core::extract::FromRequestParts;
    use http::{request::Parts, StatusCode};

    impl<S, Sess> FromRequestParts<S> for Authenticity<Sess>
    where
        S: Sync,
        Sess: Clone + Send + Sync + 'static,
    {
        type Rejection = StatusCode;

        async fn from_request_parts(
            parts: &mut Parts,
            _state: &S,
        ) -> Result<Self, Self::Rejection> {
            parts.extensions.get::<Self>().cloned().ok_or_else(|| {
                error!("service not wrapped by the forgery protection layer");
                StatusCode::INTERNAL_SERVER_ERROR
            })
        }
    }
}
