//! Wire-level HTTP types shared by the request builder and the transport.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. A
//! `RequestSpec` is resolved into an `HttpRequest` once per dispatch, and the
//! transport hands back an `HttpResponse` whose body is still an unread
//! stream. Nothing in this module performs I/O.

use std::fmt;
use std::io::Read;

use bytes::Bytes;
use url::Url;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods that must be sent without a request body.
    pub fn forbids_body(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header list with case-insensitive names.
///
/// `insert` has last-write-wins semantics: an existing entry with the same
/// name (ignoring ASCII case) is replaced in place, keeping its position.
/// `append` keeps duplicates, which response headers such as `set-cookie`
/// need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`. Any further entries with the same name
    /// are dropped so exactly one remains.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => {
                self.entries[idx] = (name, value);
                let mut seen = 0;
                let key = self.entries[idx].0.clone();
                self.entries.retain(|(k, _)| {
                    if !k.eq_ignore_ascii_case(&key) {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Add an entry without replacing existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove every entry named `name`, returning the first removed value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let first = self.position(name).map(|idx| self.entries[idx].1.clone());
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every entry can be written to the wire: names must be
    /// RFC 7230 tokens and values must not contain control characters
    /// other than horizontal tab.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in self.iter() {
            if name.is_empty() || !name.bytes().all(is_token_byte) {
                return Err(format!("invalid header name {name:?}"));
            }
            if value.bytes().any(|b| (b < 0x20 && b != b'\t') || b == 0x7f) {
                return Err(format!("invalid value for header {name:?}"));
            }
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for HeaderMap {
    /// Bulk insert with the same overwrite rule as `insert`.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        map.extend(iter);
        map
    }
}

/// A fully resolved request, ready for a transport.
///
/// Built from a `RequestSpec` at the moment of dispatch. Later changes to the
/// `RequestSpec` do not reach a request that has already been built.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// A response as handed back by a transport.
///
/// The body is an unread stream; `ResponseView` drains it at most once.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("X", "1");
        headers.insert("x", "2");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X"), Some("2"));
        assert_eq!(headers.iter().next(), Some(("x", "2")));
    }

    #[test]
    fn insert_keeps_first_position() {
        let mut headers = HeaderMap::new();
        headers.insert("a", "1");
        headers.insert("b", "2");
        headers.insert("A", "3");
        let names: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["A", "b"]);
    }

    #[test]
    fn insert_collapses_appended_duplicates() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", "a=1");
        headers.append("Set-Cookie", "b=2");
        assert_eq!(headers.get_all("SET-COOKIE").count(), 2);
        headers.insert("set-cookie", "c=3");
        assert_eq!(headers.get_all("set-cookie").collect::<Vec<_>>(), vec!["c=3"]);
    }

    #[test]
    fn remove_drops_every_match() {
        let mut headers: HeaderMap = [("a", "1"), ("b", "2")].into_iter().collect();
        headers.append("A", "3");
        assert_eq!(headers.remove("a").as_deref(), Some("1"));
        assert!(!headers.contains("a"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn method_displays_wire_name() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!(HttpMethod::Options.as_str(), "OPTIONS");
    }

    #[test]
    fn validate_accepts_ordinary_headers() {
        let headers: HeaderMap = [("X-Trace_Id", "abc 123\t; q=0.5"), ("Accept", "*/*")]
            .into_iter()
            .collect();
        assert!(headers.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_names() {
        for name in ["", "Bad Name", "a:b", "caf\u{e9}"] {
            let headers: HeaderMap = [(name, "v")].into_iter().collect();
            assert!(headers.validate().is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_control_characters_in_values() {
        for value in ["v\r\nInjected: 1", "a\nb", "nul\0", "del\u{7f}"] {
            let headers: HeaderMap = [("X", value)].into_iter().collect();
            let err = headers.validate().unwrap_err();
            assert!(err.contains("\"X\""), "{err}");
        }
    }

    #[test]
    fn bodyless_methods() {
        assert!(HttpMethod::Get.forbids_body());
        assert!(HttpMethod::Delete.forbids_body());
        assert!(!HttpMethod::Post.forbids_body());
    }
}
