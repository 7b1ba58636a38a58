//! Request parameters the token can be submitted through

use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
enum Slot {
    Single(String),

    /// The key was submitted more than once. We refuse to guess which value is meant
    Ambiguous,
}

/// Flat parameter map built from a query string or an urlencoded form body
///
/// Upstream body parsers can insert a [`Params`] into the request extensions to make form fields visible to the guard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    inner: HashMap<String, Slot>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `application/x-www-form-urlencoded` data
    ///
    /// Undecodable input yields an empty map.
    #[must_use]
    pub fn from_urlencoded(input: &[u8]) -> Self {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(input)
            .inspect_err(|error| debug!(?error, "failed to parse urlencoded parameters"))
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default()
    }

    #[inline]
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        Self::from_urlencoded(query.as_bytes())
    }

    #[inline]
    #[must_use]
    pub fn from_form_body(body: &[u8]) -> Self {
        Self::from_urlencoded(body)
    }

    /// Value of a key that was submitted exactly once
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.inner.get(key)? {
            Slot::Single(value) => Some(value),
            Slot::Ambiguous => None,
        }
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.inner
            .entry(key)
            .and_modify(|slot| *slot = Slot::Ambiguous)
            .or_insert(Slot::Single(value));
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

#[cfg(test)]
mod test {
    use super::Params;

    #[test]
    fn parses_query() {
        let params = Params::from_query("authenticity_token=abc%2Bdef%3D&other=1");
        assert_eq!(params.get("authenticity_token"), Some("abc+def="));
        assert_eq!(params.get("other"), Some("1"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn duplicate_keys_are_absent() {
        let params = Params::from_query("authenticity_token=a&authenticity_token=b");
        assert_eq!(params.get("authenticity_token"), None);

        let mut params = Params::new();
        params.insert("key".into(), "one".into());
        params.insert("key".into(), "two".into());
        params.insert("key".into(), "three".into());
        assert_eq!(params.get("key"), None);
    }

    #[test]
    fn array_style_keys_dont_match() {
        let params = Params::from_query("authenticity_token[]=abc");
        assert_eq!(params.get("authenticity_token"), None);
    }

    #[test]
    fn form_body() {
        let params = Params::from_form_body(b"title=hello+world&authenticity_token=xyz");
        assert_eq!(params.get("title"), Some("hello world"));
        assert_eq!(params.get("authenticity_token"), Some("xyz"));
    }
}
