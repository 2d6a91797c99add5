//! URL sanitization and candidate generation.
//!
//! Raw site-list cells arrive with every flavor of copy/paste damage: BOMs,
//! zero-width characters, wrapping quotes, `http//` and `http:/x` scheme
//! typos, embedded credentials, unicode hosts. This module turns such a cell
//! into a canonical `scheme://host[:port]` base, or `None` when no usable
//! host can be recovered, and derives the ordered navigation candidates from
//! it. Pure string work: deterministic, no network access.

use lazy_static::lazy_static;
use regex::Regex;
use url::{Host, Url};

lazy_static! {
    /// Zero-width and BOM-class characters that survive copy/paste.
    static ref ZERO_WIDTH: Regex =
        Regex::new("[\u{200B}-\u{200D}\u{FEFF}\u{2060}\u{180E}]").unwrap();
    /// `http//example.com` — lost the colon.
    static ref SCHEME_NO_COLON: Regex = Regex::new(r"(?i)^(https?)//").unwrap();
    /// `http:/example.com` — lost one slash.
    static ref SCHEME_ONE_SLASH: Regex = Regex::new(r"(?i)^(https?):/([^/])").unwrap();
    static ref HAS_SCHEME: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://").unwrap();
}

/// Characters commonly wrapped around pasted URLs.
const WRAPPING: &[char] = &['"', '\'', '<', '>', '`', '(', ')', '[', ']', '{', '}'];

/// Produce a canonical navigable base URL (`scheme://host[:port]`, no path)
/// from a raw site-list value, or `None` if no valid host can be recovered.
///
/// A valid host is an IP address, `localhost`, or a dotted domain; anything
/// else is rejected rather than handed to the browser.
pub fn normalize_url(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    let mut s = ZERO_WIDTH.replace_all(raw, "").into_owned();
    s = s.trim().trim_matches(|c| WRAPPING.contains(&c)).to_string();
    s = s.replace('\u{A0}', " ");
    s.retain(|c| !c.is_whitespace());

    if s.is_empty() {
        return None;
    }

    // Repair scheme typos before deciding whether a scheme is present.
    s = SCHEME_NO_COLON.replace(&s, "${1}://").into_owned();
    s = SCHEME_ONE_SLASH.replace(&s, "${1}://${2}").into_owned();

    if !HAS_SCHEME.is_match(&s) {
        s = format!("http://{s}");
    }
    s = s.replacen(":///", "://", 1);

    let (scheme, rest) = s.split_once("://")?;
    let scheme = scheme.to_ascii_lowercase();

    // Take the authority; if it is empty the host was mistakenly written as
    // a path (`http:///example.com` variants), so recover it from there.
    let mut authority = slice_authority(rest);
    if authority.is_empty() {
        authority = slice_authority(rest.trim_start_matches('/'));
    }

    // Strip embedded credentials.
    let host_port = match authority.split_once('@') {
        Some((_, after)) => after,
        None => authority,
    };
    let host_port = host_port.trim_end_matches('.');
    if host_port.is_empty() {
        return None;
    }

    // The url crate applies IDNA encoding and rejects structurally broken
    // hosts for us.
    let parsed = Url::parse(&format!("{scheme}://{host_port}")).ok()?;
    let host = parsed.host()?;
    let encoded = match host {
        Host::Domain(d) => {
            let d = d.trim_end_matches('.');
            if d != "localhost" && !d.contains('.') {
                return None;
            }
            d.to_string()
        }
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => format!("[{ip}]"),
    };

    Some(match parsed.port() {
        Some(port) => format!("{scheme}://{encoded}:{port}"),
        None => format!("{scheme}://{encoded}"),
    })
}

fn slice_authority(rest: &str) -> &str {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// Ordered navigation candidates for a canonical base URL: https before
/// http, each crossed with the host and its `www.`-toggled variant, deduped.
///
/// For `http://example.com` the order is exactly
/// `https://example.com`, `https://www.example.com`,
/// `http://example.com`, `http://www.example.com`.
pub fn candidate_urls(canonical: &str) -> Vec<String> {
    let host_port = match canonical.split_once("://") {
        Some((_, rest)) => slice_authority(rest),
        None => return vec![canonical.to_string()],
    };

    let toggled = if let Some(stripped) = host_port.strip_prefix("www.") {
        stripped.to_string()
    } else {
        format!("www.{host_port}")
    };

    let mut out = Vec::with_capacity(4);
    for scheme in ["https", "http"] {
        for host in [host_port, toggled.as_str()] {
            let candidate = format!("{scheme}://{host}");
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "urlnorm_test.rs"]
mod urlnorm_test;
