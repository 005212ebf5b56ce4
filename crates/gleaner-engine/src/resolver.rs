//! Candidate resolution: canonical URL and identity derivation.
//!
//! Given the permalink href and timestamp-presence of one rendered element,
//! decide whether it is a post candidate, canonicalize its URL and derive a
//! per-run identity. Dedup against the seen set is the caller's job; this
//! stays a function of its inputs (the synthesized fallback in rule (d) is
//! the one deliberately random case).

use gleaner_core::PostIdentity;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Path segments that precede a post identifier.
const ROUTE_KEYWORDS: [&str; 7] = [
    "posts",
    "videos",
    "photos",
    "watch",
    "story",
    "permalink",
    "reel",
];

/// Query parameters that carry a post identifier, in priority order.
const ID_QUERY_PARAMS: [&str; 5] = ["story_fbid", "fbid", "v", "photo_id", "id"];

static LONG_DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{10,})").expect("valid regex"));

/// Outcome of resolving one rendered element.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Canonical permalink: scheme + host + path, query and fragment stripped
    pub url: Option<String>,
    /// Derived or synthesized identity
    pub identity: Option<PostIdentity>,
    /// Whether the element is a post candidate at all
    pub is_candidate: bool,
}

/// Resolve one rendered element from its permalink href and whether a
/// timestamp-like descendant exists.
///
/// Identity derivation, in order: a path segment following a recognized
/// route keyword, then a recognized query parameter, then a long digit run
/// in the path. When all three fail but the element still looks post-shaped
/// (it has a timestamp descendant), a random opaque identity is synthesized
/// so every structurally valid candidate gets a per-run key. An element is
/// a non-candidate only when it has neither a link nor a timestamp.
#[must_use]
pub fn resolve(permalink_href: Option<&str>, has_timestamp: bool) -> Resolution {
    let parsed = permalink_href.and_then(|href| Url::parse(href).ok());

    let mut url = None;
    let mut identity = None;

    if let Some(link) = &parsed {
        if let Some(host) = link.host_str() {
            url = Some(format!("{}://{}{}", link.scheme(), host, link.path()));
            identity = identity_from_path(link.path())
                .or_else(|| identity_from_query(link))
                .or_else(|| identity_from_digits(link.path()));
        }
    }

    let is_candidate = url.is_some() || has_timestamp;
    if is_candidate && identity.is_none() && has_timestamp {
        identity = Some(PostIdentity::synthesize());
    }

    Resolution {
        url,
        identity,
        is_candidate,
    }
}

/// Identity from the path segment following a route keyword.
fn identity_from_path(path: &str) -> Option<PostIdentity> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    for keyword in ROUTE_KEYWORDS {
        if let Some(position) = segments.iter().position(|segment| *segment == keyword) {
            if let Some(candidate) = segments.get(position + 1) {
                if let Ok(identity) = PostIdentity::new(*candidate) {
                    return Some(identity);
                }
            }
        }
    }
    None
}

/// Identity from a recognized query parameter.
fn identity_from_query(link: &Url) -> Option<PostIdentity> {
    for param in ID_QUERY_PARAMS {
        let value = link
            .query_pairs()
            .find(|(key, _)| key == param)
            .map(|(_, value)| value.into_owned());

        if let Some(value) = value {
            if let Ok(identity) = PostIdentity::new(value.trim()) {
                return Some(identity);
            }
        }
    }
    None
}

/// Identity from a long digit run anywhere in the path.
fn identity_from_digits(path: &str) -> Option<PostIdentity> {
    LONG_DIGIT_RUN
        .captures(path)
        .and_then(|captures| PostIdentity::new(&captures[1]).ok())
}
