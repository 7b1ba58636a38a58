use crate::{
    config::Configuration,
    guard::{ForgeryGuard, ResetSession},
    ForgeryService,
};
use std::marker::PhantomData;
use tower_layer::Layer;

/// Layer running the forgery guard before every request reaches the inner service
///
/// `Sess` is the session handle type the session layer puts into the request extensions.
pub struct ForgeryLayer<Sess, H = ResetSession> {
    guard: ForgeryGuard<H>,
    _marker: PhantomData<fn() -> Sess>,
}

impl<Sess> ForgeryLayer<Sess> {
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self::from_guard(ForgeryGuard::new(config))
    }
}

impl<Sess, H> ForgeryLayer<Sess, H> {
    #[must_use]
    pub fn from_guard(guard: ForgeryGuard<H>) -> Self {
        Self {
            guard,
            _marker: PhantomData,
        }
    }
}

impl<Sess, H> Clone for ForgeryLayer<Sess, H>
where
    H: Clone,
{
    fn clone(&self) -> Self {
        Self::from_guard(self.guard.clone())
    }
}

impl<S, Sess, H> Layer<S> for ForgeryLayer<Sess, H>
where
    H: Clone,
{
    type Service = ForgeryService<S, Sess, H>;

    fn layer(&self, inner: S) -> Self::Service {
        ForgeryService::new(inner, self.guard.clone())
    }
}
