use crate::{
    guard::{
        is_safe_method, Disposition, ForgeryGuard, ResetSession, Submission,
        UnverifiedRequestHandler,
    },
    origin,
    session::Session,
    Authenticity, Params,
};
use either::Either;
use http::{header, Request, Response, StatusCode};
use std::{
    future::{self, Ready},
    marker::PhantomData,
    task::{self, Poll},
};
use tower_service::Service;

#[inline]
fn empty_response<B>(status: StatusCode) -> Response<B>
where
    B: Default,
{
    let mut response = Response::new(B::default());
    *response.status_mut() = status;
    response
}

pub struct ForgeryService<S, Sess, H = ResetSession> {
    inner: S,
    guard: ForgeryGuard<H>,
    _marker: PhantomData<fn() -> Sess>,
}

impl<S, Sess, H> ForgeryService<S, Sess, H> {
    pub fn new(inner: S, guard: ForgeryGuard<H>) -> Self {
        Self {
            inner,
            guard,
            _marker: PhantomData,
        }
    }
}

impl<S, Sess, H> Clone for ForgeryService<S, Sess, H>
where
    S: Clone,
    H: Clone,
{
    fn clone(&self) -> Self {
        Self::new(self.inner.clone(), self.guard.clone())
    }
}

impl<S, Sess, H> ForgeryService<S, Sess, H>
where
    Sess: Session,
    H: UnverifiedRequestHandler,
{
    fn verify<B>(&self, req: &Request<B>, session: &Sess) -> Disposition {
        let config = self.guard.config();
        let param_name = config.request_forgery_protection_token.as_str();

        let query_params = req.uri().query().map(Params::from_query).unwrap_or_default();
        let token = query_params
            .get(param_name)
            .or_else(|| req.extensions().get::<Params>()?.get(param_name))
            .or_else(|| req.headers().get(config.header_name.as_str())?.to_str().ok());

        // A header we can't read as a string is treated like an opaque origin and never matches
        let origin = req
            .headers()
            .get(header::ORIGIN)
            .map(|value| value.to_str().unwrap_or("null"));
        let base_url = origin::base_url(req.uri(), req.headers());

        let submission = Submission {
            method: req.method(),
            token,
            origin,
            base_url: base_url.as_deref(),
        };

        let (_verification, disposition) =
            self.guard.verify_authenticity_token(&submission, session);

        disposition
    }
}

impl<S, Sess, H, ReqBody, ResBody> Service<Request<ReqBody>> for ForgeryService<S, Sess, H>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    Sess: Session + Clone + Send + Sync + 'static,
    H: UnverifiedRequestHandler,
    ResBody: Default,
{
    type Error = S::Error;
    type Response = S::Response;
    type Future = Either<S::Future, Ready<Result<S::Response, S::Error>>>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let needs_verification = self.guard.protect_against_forgery()
            && !is_safe_method(req.method())
            && self.guard.config().filter.applies_to(req.uri().path());

        let Some(session) = req.extensions().get::<Sess>().cloned() else {
            if !needs_verification {
                return Either::Left(self.inner.call(req));
            }

            error!("no session attached to the request. is the session layer missing?");
            return Either::Right(future::ready(Ok(empty_response(
                StatusCode::INTERNAL_SERVER_ERROR,
            ))));
        };

        if needs_verification {
            if let Disposition::Respond(status) = self.verify(&req, &session) {
                return Either::Right(future::ready(Ok(empty_response(status))));
            }
        }

        req.extensions_mut()
            .insert(Authenticity::new(session, self.guard.shared_config()));

        Either::Left(self.inner.call(req))
    }
}
