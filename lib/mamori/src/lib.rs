#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

pub use self::{
    authenticity::{Authenticity, MetaTags},
    config::Configuration,
    error::{Error, InvalidAuthenticityToken, Result},
    guard::{
        Disposition, ForgeryGuard, RejectWith, ResetSession, UnverifiedRequestHandler, Verification,
    },
    layer::ForgeryLayer,
    newtypes::*,
    params::Params,
    service::ForgeryService,
    session::{MemorySession, Session, SessionSecret},
};

mod authenticity;
mod error;
mod layer;
mod service;

pub mod config;
pub mod guard;
pub mod mask;
pub mod origin;
pub mod params;
pub mod session;
pub mod verify;

/// Session key the secret is stored under
pub const SESSION_KEY: &str = "_csrf_token";

/// Length of the per-session secret
pub const SECRET_BYTES: usize = 32;

/// Length of the one-time salt prepended to every masked token
pub const SALT_BYTES: usize = 32;

/// Output length of SHA-256
pub const DIGEST_BYTES: usize = 32;

/// Decoded length of a masked token
pub const MASKED_TOKEN_BYTES: usize = SALT_BYTES + DIGEST_BYTES;

mod newtypes {
    /// Base64-encoded `salt || SHA256(salt || secret)`, safe to put into forms and headers
    #[aliri_braid::braid]
    pub struct MaskedToken;
}
