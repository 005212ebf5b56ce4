//! Shared types used across the Gleaner engine.
//!
//! This module defines common newtypes and the `Record` data model that
//! provide type safety and clear domain modeling.

use crate::error::GleanerError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for site identifiers with validation.
///
/// Site IDs must be lowercase alphanumeric with hyphens, 3-50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(String);

impl SiteId {
    /// Create a new `SiteId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, GleanerError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate site ID format: lowercase alphanumeric with hyphens, 3-50 chars.
    fn validate(id: &str) -> Result<(), GleanerError> {
        static SITE_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^[a-z0-9][a-z0-9-]{1,48}[a-z0-9]$").expect("valid regex")
        });

        if id.len() < 3 || id.len() > 50 {
            return Err(GleanerError::Validation(format!(
                "invalid site ID: must be 3-50 characters, got {} characters",
                id.len()
            )));
        }

        if SITE_REGEX.is_match(id) {
            Ok(())
        } else {
            Err(GleanerError::Validation(format!(
                "invalid site ID: must be lowercase alphanumeric with hyphens, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype for per-run post identities.
///
/// An identity is either derived from a permalink (path segment, query
/// parameter or digit run) or synthesized for posts that render without a
/// usable permalink. Identities are compared verbatim; derivation rules live
/// in the engine's resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostIdentity(String);

impl PostIdentity {
    /// Create a new `PostIdentity` from a derived string.
    ///
    /// # Errors
    /// Returns error if the identity is empty, too long, or contains
    /// characters outside `[A-Za-z0-9._-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, GleanerError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Synthesize a random opaque identity for a post-shaped element that
    /// yielded no derivable identity. Unique per call.
    #[must_use]
    pub fn synthesize() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("gen-{}", &hex[..12]))
    }

    /// Derive a child identity that is stable relative to its parent.
    ///
    /// Used for sub-records (comments) that expose no identifier of their
    /// own; keeps extraction deterministic for identical markup.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}.c{index}", self.0))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), GleanerError> {
        static IDENTITY_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex"));

        if id.is_empty() || id.len() > 128 {
            return Err(GleanerError::Validation(format!(
                "invalid post identity: must be 1-128 characters, got {} characters",
                id.len()
            )));
        }

        if IDENTITY_REGEX.is_match(id) {
            Ok(())
        } else {
            Err(GleanerError::Validation(format!(
                "invalid post identity: must be alphanumeric with ._- , got '{id}'"
            )))
        }
    }
}

impl fmt::Display for PostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The extractable fields of a record.
///
/// Used as the vocabulary for the optional field allow-list: when a crawl is
/// configured with a list of kinds, extraction skips everything not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Author display name
    Author,
    /// Author profile picture URL
    AuthorAvatar,
    /// Main body text
    BodyText,
    /// Attached image URL
    ImageUrl,
    /// Posting timestamp
    PostedAt,
    /// Sub-records (comments)
    Children,
}

impl FieldKind {
    /// Get a human-readable display name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Author => "Author",
            Self::AuthorAvatar => "Author Avatar",
            Self::BodyText => "Body Text",
            Self::ImageUrl => "Image URL",
            Self::PostedAt => "Posted At",
            Self::Children => "Children",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A structured record extracted from one feed candidate.
///
/// Immutable once produced. An emitted record always carries an identity;
/// every other field is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Per-run identity of the post
    pub identity: PostIdentity,
    /// Canonical permalink (scheme + host + path), when one was found
    pub url: Option<String>,
    /// Author display name
    pub author: Option<String>,
    /// Author profile picture URL
    pub author_avatar: Option<String>,
    /// Main body text
    pub body_text: Option<String>,
    /// Attached image URL
    pub image_url: Option<String>,
    /// Posting time, when the raw timestamp string parsed
    pub posted_at: Option<DateTime<Utc>>,
    /// When this record was extracted
    pub scraped_at: DateTime<Utc>,
    /// Ordered sub-records (comments)
    pub children: Vec<Record>,
}

impl Record {
    /// Whether the record carries enough content to be worth emitting.
    ///
    /// A bare identity is not a useful record: at least one of body text,
    /// a parsed timestamp or an author name must be present.
    #[must_use]
    pub fn is_substantive(&self) -> bool {
        self.body_text.is_some() || self.posted_at.is_some() || self.author.is_some()
    }
}
