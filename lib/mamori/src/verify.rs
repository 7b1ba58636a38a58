use crate::{error::Error, mask, session::SessionSecret, Result, DIGEST_BYTES, SALT_BYTES};
use subtle::ConstantTimeEq;

/// Check a submitted token against the session secret
///
/// The digest comparison is constant-time. Both sides are [`DIGEST_BYTES`](crate::DIGEST_BYTES) long by construction.
pub fn check(token: &str, secret: &SessionSecret) -> Result<()> {
    let decoded = if token.is_empty() {
        Err(Error::MissingToken)
    } else {
        mask::decode(token)
    };

    // Unusable input is hashed against a zeroed salt, every path computes exactly one digest
    let (salt, digest) = match decoded {
        Ok(ref decoded) => (decoded.salt, decoded.digest),
        Err(..) => ([0; SALT_BYTES], [0; DIGEST_BYTES]),
    };
    let expected = mask::salted_digest(&salt, secret);
    let matches: bool = digest.as_slice().ct_eq(expected.as_slice()).into();

    decoded?;
    if matches {
        Ok(())
    } else {
        Err(Error::TokenMismatch)
    }
}

/// Whether the submitted token is a valid masked token for the secret
///
/// Absent, empty and malformed input is simply invalid.
#[must_use]
pub fn is_valid(token: Option<&str>, secret: &SessionSecret) -> bool {
    let Some(token) = token else {
        return false;
    };

    check(token, secret)
        .inspect_err(|error| debug!(?error, "authenticity token rejected"))
        .is_ok()
}

#[cfg(test)]
mod test {
    use super::{check, is_valid};
    use crate::{error::Error, mask, session::SessionSecret};

    #[test]
    fn accepts_minted() {
        let secret = SessionSecret::generate();
        for _ in 0..32 {
            let token = mask::mint(&secret);
            assert!(is_valid(Some(token.as_str()), &secret));
        }
    }

    #[test]
    fn rejects_other_session() {
        let token = mask::mint(&SessionSecret::from_bytes([1; 32]));
        assert!(matches!(
            check(token.as_str(), &SessionSecret::from_bytes([2; 32])),
            Err(Error::TokenMismatch)
        ));
    }

    #[test]
    fn missing_and_empty() {
        let secret = SessionSecret::generate();
        assert!(!is_valid(None, &secret));
        assert!(!is_valid(Some(""), &secret));
        assert!(matches!(check("", &secret), Err(Error::MissingToken)));
    }

    #[test]
    fn rejects_raw_secret() {
        // The unmasked secret is 32 bytes and must never pass as a token
        let secret = SessionSecret::generate();
        assert!(!is_valid(Some(&secret.to_base64()), &secret));
    }

    #[test]
    fn reasons_stay_distinct() {
        let secret = SessionSecret::generate();
        let foreign = mask::mint(&SessionSecret::generate());
        let zeroed = base64_simd::STANDARD.encode_to_string([0_u8; crate::MASKED_TOKEN_BYTES]);

        assert!(matches!(check("", &secret), Err(Error::MissingToken)));
        assert!(matches!(check("%%%%", &secret), Err(Error::MalformedToken)));
        assert!(matches!(check(&zeroed, &secret), Err(Error::TokenMismatch)));
        assert!(matches!(
            check(foreign.as_str(), &secret),
            Err(Error::TokenMismatch)
        ));
        assert!(check(mask::mint(&secret).as_str(), &secret).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let secret = SessionSecret::generate();
        for input in ["%%%%", "AAAA", "YWJj\n", "  "] {
            assert!(!is_valid(Some(input), &secret), "accepted {input:?}");
        }
    }
}
