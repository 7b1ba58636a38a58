//! Masked token encoding
//!
//! Wire format: `base64(salt || SHA256(salt || secret))`, strict standard alphabet with padding.

use crate::{
    error::Error, session::SessionSecret, MaskedToken, Result, DIGEST_BYTES, MASKED_TOKEN_BYTES,
    SALT_BYTES,
};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

const B64_ENGINE: base64_simd::Base64 = base64_simd::STANDARD;

/// A masked token split into its parts
pub struct Decoded {
    pub salt: [u8; SALT_BYTES],
    pub digest: [u8; DIGEST_BYTES],
}

#[inline]
pub(crate) fn salted_digest(
    salt: &[u8; SALT_BYTES],
    secret: &SessionSecret,
) -> [u8; DIGEST_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Mint a fresh masked token for the secret
///
/// Every call uses a new salt, so two tokens of the same session never look alike.
#[must_use]
pub fn mint(secret: &SessionSecret) -> MaskedToken {
    mint_with(&mut rand::thread_rng(), secret)
}

/// Same as [`mint`] but with a caller-provided CSPRNG
#[must_use]
pub fn mint_with<R>(rng: &mut R, secret: &SessionSecret) -> MaskedToken
where
    R: CryptoRng + RngCore,
{
    let mut salt = [0; SALT_BYTES];
    rng.fill_bytes(&mut salt);

    let mut buf = [0; MASKED_TOKEN_BYTES];
    buf[..SALT_BYTES].copy_from_slice(&salt);
    buf[SALT_BYTES..].copy_from_slice(&salted_digest(&salt, secret));

    B64_ENGINE.encode_to_string(buf).into()
}

/// Split a submitted token into salt and digest
///
/// Invalid characters, bad padding or a decoded length other than [`MASKED_TOKEN_BYTES`] are all
/// reported as [`Error::MalformedToken`].
pub fn decode(token: &str) -> Result<Decoded> {
    let decoded_len = B64_ENGINE
        .decoded_length(token.as_bytes())
        .inspect_err(|error| debug!(?error, "couldn't determine decoded token length"))
        .map_err(|_| Error::MalformedToken)?;

    if decoded_len != MASKED_TOKEN_BYTES {
        return Err(Error::MalformedToken);
    }

    let mut buf = [0; MASKED_TOKEN_BYTES];
    B64_ENGINE
        .decode(token.as_bytes(), base64_simd::Out::from_slice(&mut buf))
        .inspect_err(|error| debug!(?error, "failed to decode masked token"))
        .map_err(|_| Error::MalformedToken)?;

    let mut salt = [0; SALT_BYTES];
    let mut digest = [0; DIGEST_BYTES];
    salt.copy_from_slice(&buf[..SALT_BYTES]);
    digest.copy_from_slice(&buf[SALT_BYTES..]);

    Ok(Decoded { salt, digest })
}

#[cfg(test)]
mod test {
    use super::{decode, mint, mint_with, salted_digest};
    use crate::{error::Error, session::SessionSecret};
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn token_layout() {
        let secret = SessionSecret::from_bytes([7; 32]);
        let token = mint(&secret);

        assert_eq!(token.as_str().len(), 88);
        assert!(token.as_str().ends_with('='));

        let decoded = decode(token.as_str()).unwrap();
        assert_eq!(decoded.digest, salted_digest(&decoded.salt, &secret));
    }

    #[test]
    fn deterministic_with_seeded_rng() {
        let secret = SessionSecret::from_bytes([0; 32]);
        let first = mint_with(&mut StdRng::seed_from_u64(42), &secret);
        let second = mint_with(&mut StdRng::seed_from_u64(42), &secret);
        assert_eq!(first, second);
    }

    #[test]
    fn fresh_every_time() {
        let secret = SessionSecret::generate();
        let tokens = (0..10_000)
            .map(|_| String::from(mint(&secret)))
            .collect::<HashSet<_>>();

        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn rejects_malformed() {
        for input in [
            "",
            "not base64 at all",
            "AAAA",
            // 63 bytes
            "A".repeat(84).as_str(),
            // Missing padding
            "A".repeat(86).as_str(),
            // URL-safe alphabet
            format!("{}-_==", "A".repeat(84)).as_str(),
        ] {
            assert!(
                matches!(decode(input), Err(Error::MalformedToken)),
                "accepted {input:?}"
            );
        }
    }
}
