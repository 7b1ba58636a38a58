//! Same-origin checks on the `Origin` header

use crate::{error::Error, Result};
use http::{header, uri::Authority, HeaderMap, HeaderName, Uri};

static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

#[inline]
fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Compute the `scheme://host[:port]` origin of the request itself
///
/// The scheme comes from the request URI, then `X-Forwarded-Proto`, falling back to `http`.
/// The host comes from the URI authority, then the `Host` header. Default ports are omitted,
/// matching how browsers serialise the `Origin` header.
#[must_use]
pub fn base_url(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    let scheme = uri
        .scheme_str()
        .or_else(|| {
            let value = headers.get(&X_FORWARDED_PROTO)?.to_str().ok()?;
            value.split(',').next().map(str::trim)
        })
        .unwrap_or("http")
        .to_ascii_lowercase();

    let authority = match uri.authority() {
        Some(authority) => authority.clone(),
        None => headers
            .get(header::HOST)?
            .to_str()
            .ok()?
            .parse::<Authority>()
            .ok()?,
    };

    let host = authority.host().to_ascii_lowercase();
    let base_url = match authority
        .port_u16()
        .filter(|port| Some(*port) != default_port(&scheme))
    {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    };

    Some(base_url)
}

/// Check the `Origin` header against the request's own origin
///
/// Some user agents don't send the header at all, so an absent (or empty) header passes.
/// The token check stays the primary defense.
pub fn check(origin: Option<&str>, base_url: &str) -> Result<()> {
    match origin {
        None | Some("") => Ok(()),
        Some(origin) if origin == base_url => Ok(()),
        Some(..) => Err(Error::OriginMismatch),
    }
}

#[inline]
#[must_use]
pub fn same_origin(origin: Option<&str>, base_url: &str) -> bool {
    check(origin, base_url).is_ok()
}

#[cfg(test)]
mod test {
    use super::{base_url, same_origin};
    use http::{header, HeaderMap, HeaderValue, Uri};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|&(name, value)| {
                (
                    header::HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            })
            .collect()
    }

    #[test]
    fn absent_origin_passes() {
        assert!(same_origin(None, "https://example.com"));
        assert!(same_origin(None, "http://literally-anything:1337"));
        assert!(same_origin(Some(""), "https://example.com"));
    }

    #[test]
    fn matching_origin_passes() {
        assert!(same_origin(
            Some("https://example.com"),
            "https://example.com"
        ));
    }

    #[test]
    fn mismatching_origin_fails() {
        assert!(!same_origin(Some("https://evil.com"), "https://example.com"));
        assert!(!same_origin(Some("http://example.com"), "https://example.com"));
        assert!(!same_origin(
            Some("https://example.com:8443"),
            "https://example.com"
        ));
        assert!(!same_origin(Some("null"), "https://example.com"));
    }

    #[test]
    fn base_url_from_absolute_uri() {
        let uri: Uri = "https://example.com/posts".parse().unwrap();
        assert_eq!(
            base_url(&uri, &HeaderMap::new()).as_deref(),
            Some("https://example.com")
        );

        let uri: Uri = "http://example.com:8080/posts".parse().unwrap();
        assert_eq!(
            base_url(&uri, &HeaderMap::new()).as_deref(),
            Some("http://example.com:8080")
        );
    }

    #[test]
    fn base_url_from_host_header() {
        let uri: Uri = "/posts".parse().unwrap();
        let headers = headers(&[("host", "Example.com:80")]);
        assert_eq!(
            base_url(&uri, &headers).as_deref(),
            Some("http://example.com")
        );
    }

    #[test]
    fn base_url_honours_forwarded_proto() {
        let uri: Uri = "/posts".parse().unwrap();
        let headers = headers(&[
            ("host", "example.com:443"),
            ("x-forwarded-proto", "https, http"),
        ]);
        assert_eq!(
            base_url(&uri, &headers).as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn base_url_without_host() {
        let uri: Uri = "/posts".parse().unwrap();
        assert_eq!(base_url(&uri, &HeaderMap::new()), None);
    }
}
