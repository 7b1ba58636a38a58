//! Per-session secret storage
//!
//! The session store itself (persistence, signing, expiry) lives outside of this crate.
//! All we need from it is a string map and the ability to wipe it.

use crate::{error::Error, Result, SECRET_BYTES, SESSION_KEY};
use rand::RngCore;
use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
};
use subtle::ConstantTimeEq;
use triomphe::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

const B64_ENGINE: base64_simd::Base64 = base64_simd::STANDARD;

/// Capability interface over the application's session store
///
/// Implementations are handles: they are cloned into request extensions, so mutation goes through `&self`.
pub trait Session {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    /// Drop every value in the session, leaving it in a fresh state
    fn reset(&self);
}

impl<T> Session for &T
where
    T: Session + ?Sized,
{
    #[inline]
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    #[inline]
    fn set(&self, key: &str, value: String) {
        (**self).set(key, value);
    }

    #[inline]
    fn reset(&self) {
        (**self).reset();
    }
}

/// In-memory session, mostly useful for tests and single-process setups
#[derive(Clone)]
pub struct MemorySession {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), value);
    }

    fn reset(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clear();
    }
}

/// The raw per-session secret
///
/// Never leaves the server. Tokens handed out to clients are masked derivations of it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionSecret([u8; SECRET_BYTES]);

impl SessionSecret {
    #[must_use]
    pub fn from_bytes(bytes: [u8; SECRET_BYTES]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh secret from the thread-local CSPRNG
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SECRET_BYTES] {
        &self.0
    }

    /// Strict base64 encoding, as stored in the session
    #[must_use]
    pub fn to_base64(&self) -> String {
        B64_ENGINE.encode_to_string(self.0)
    }

    /// Decode a secret previously stored in the session
    ///
    /// Anything that isn't strict base64 of exactly [`SECRET_BYTES`] bytes is rejected.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded_len = B64_ENGINE
            .decoded_length(encoded.as_bytes())
            .inspect_err(|error| debug!(?error, "couldn't determine decoded secret length"))
            .map_err(|_| Error::SecretCorrupted)?;

        if decoded_len != SECRET_BYTES {
            debug!(decoded_len, "stored secret has the wrong length");
            return Err(Error::SecretCorrupted);
        }

        let mut buf = [0; SECRET_BYTES];
        B64_ENGINE
            .decode(encoded.as_bytes(), base64_simd::Out::from_slice(&mut buf))
            .inspect_err(|error| debug!(?error, "failed to decode stored secret"))
            .map_err(|_| Error::SecretCorrupted)?;

        Ok(Self(buf))
    }

    /// Read the secret of the session, creating and storing one if it doesn't exist yet
    ///
    /// Concurrent first requests of the same session may each create a secret.
    /// The session store decides which write survives (last writer wins), and tokens minted
    /// from the surviving secret validate from then on. Only the bootstrap window is affected.
    pub fn get_or_create<S>(session: &S) -> Result<Self>
    where
        S: Session + ?Sized,
    {
        if let Some(encoded) = session.get(SESSION_KEY) {
            return Self::from_base64(&encoded);
        }

        let secret = Self::generate();
        session.set(SESSION_KEY, secret.to_base64());

        Ok(secret)
    }
}

impl PartialEq for SessionSecret {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl Eq for SessionSecret {}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionSecret").field(&"[redacted]").finish()
    }
}
