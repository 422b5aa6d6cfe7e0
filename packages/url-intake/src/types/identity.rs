//! URL identity - the cache and dedup key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

use crate::error::ValidationError;

/// Length of a hex-encoded SHA-256 digest.
pub const IDENTITY_LEN: usize = 64;

/// Normalized, hashed URL.
///
/// Two URLs that differ only in scheme/host case, an explicit default port,
/// a trailing slash or a fragment map to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlIdentity(String);

impl UrlIdentity {
    /// Compute the identity of a raw URL.
    pub fn from_url(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::BlankUrl);
        }
        Ok(Self(sha256_hex(&normalize_url(raw))))
    }

    /// Rebuild an identity from a stored digest.
    pub fn from_hash(hash: impl Into<String>) -> Result<Self, ValidationError> {
        let hash = hash.into();
        let valid = hash.len() == IDENTITY_LEN
            && hash
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !valid {
            return Err(ValidationError::InvalidIdentity { value: hash });
        }
        Ok(Self(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UrlIdentity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hash(value)
    }
}

impl From<UrlIdentity> for String {
    fn from(identity: UrlIdentity) -> Self {
        identity.0
    }
}

/// Normalize a URL to the canonical form that gets hashed.
///
/// The path and query are taken verbatim from the input: no dot-segment
/// resolution and no percent-encoding. A missing scheme becomes `https` and a
/// missing authority an empty host, so `example.com/a` normalizes to
/// `https://example.com/a` with `example.com` as part of the path.
///
/// Never fails: strings that are not valid URI text fall back to their
/// trimmed, lowercased form.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    canonical_form(trimmed).unwrap_or_else(|| trimmed.to_lowercase())
}

/// Components of a URI reference, split as in RFC 3986 appendix B.
struct RawParts<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
}

impl<'a> RawParts<'a> {
    fn split(input: &'a str) -> Self {
        let without_fragment = input.split('#').next().unwrap_or("");

        let (scheme, rest) = match without_fragment.find([':', '/', '?']) {
            Some(i) if i > 0 && without_fragment[i..].starts_with(':') => {
                (Some(&without_fragment[..i]), &without_fragment[i + 1..])
            }
            _ => (None, without_fragment),
        };

        let (authority, rest) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(['/', '?']).unwrap_or(after.len());
                (Some(&after[..end]), &after[end..])
            }
            None => (None, rest),
        };

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        Self {
            scheme,
            authority,
            path,
            query,
        }
    }
}

fn canonical_form(input: &str) -> Option<String> {
    if !is_uri_text(input) {
        return None;
    }

    let parts = RawParts::split(input);
    let scheme = match parts.scheme {
        Some(scheme) if is_valid_scheme(scheme) => scheme.to_lowercase(),
        Some(_) => return None,
        None => "https".to_string(),
    };

    // `mailto:x` style references have no hierarchy to keep
    if parts.scheme.is_some() && parts.authority.is_none() && !parts.path.starts_with('/') {
        return Some(format!("{}://", scheme));
    }

    let (host, port) = match parts.authority.filter(|a| !a.is_empty()) {
        Some(authority) => host_and_port(&scheme, authority)?,
        None => (String::new(), None),
    };
    let port = port.filter(|port| !is_default_port(&scheme, *port));

    let mut path = parts.path;
    if path.len() > 1 && path.ends_with('/') {
        path = &path[..path.len() - 1];
    }

    let mut normalized = format!("{}://{}", scheme, host);
    if let Some(port) = port {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }
    normalized.push_str(path);
    if let Some(query) = parts.query.filter(|q| !q.trim().is_empty()) {
        normalized.push('?');
        normalized.push_str(query);
    }
    Some(normalized)
}

/// Validate an authority with `url` and return its lowercased host and
/// explicit port. Userinfo is dropped.
fn host_and_port(scheme: &str, authority: &str) -> Option<(String, Option<u16>)> {
    let url = Url::parse(&format!("{}://{}/", scheme, authority)).ok()?;
    let host = url.host_str().unwrap_or("").to_lowercase();

    // `Url::port` hides a scheme's known default, so look for an explicit one
    let port = if has_explicit_port(authority) {
        url.port_or_known_default()
    } else {
        None
    };
    Some((host, port))
}

fn has_explicit_port(authority: &str) -> bool {
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    let after_host = match host_port.strip_prefix('[') {
        Some(ipv6) => ipv6.split_once(']').map(|(_, rest)| rest).unwrap_or(""),
        None => host_port,
    };
    after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Rejects characters a URI may not contain and malformed `%` escapes.
fn is_uri_text(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escape = bytes.get(i + 1..i + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return false;
                }
                i += 3;
                continue;
            }
            b if b.is_ascii_control() || b == b' ' => return false,
            b'"' | b'<' | b'>' | b'\\' | b'^' | b'`' | b'{' | b'|' | b'}' => return false,
            _ => {}
        }
        i += 1;
    }
    true
}

fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!((scheme, port), ("http", 80) | ("https", 443))
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
