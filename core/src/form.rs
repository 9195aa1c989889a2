//! `application/x-www-form-urlencoded` body encoding.

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except the RFC 3986 unreserved characters is escaped, so a
/// space becomes `%20` rather than `+`.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Join `pairs` as `k1=v1&k2=v2` in iteration order.
///
/// Values are percent-encoded. Keys are written as given: callers passing
/// keys with `&`, `=` or non-ASCII characters must encode them first.
pub fn encode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(key);
        out.push('=');
        out.extend(utf8_percent_encode(value, FORM_VALUE));
    }
    out
}

pub(crate) fn encode_pairs(pairs: &[(String, String)]) -> Bytes {
    Bytes::from(encode(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))))
}
