//! Ruleset definition types.
//!
//! These structures are loaded from TOML files; one file describes one site.

use crate::error::{Result, RulesetError};
use gleaner_core::SiteId;
use serde::{Deserialize, Serialize};

/// Complete declarative rules for one feed site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRules {
    /// Site metadata
    pub site: SiteMetadata,
    /// Selectors locating the feed and its items
    pub feed: FeedSelectors,
    /// Per-field extraction strategies for a post
    #[serde(default)]
    pub fields: FieldRules,
    /// Extraction rules for sub-records (comments)
    #[serde(default)]
    pub children: ChildRules,
}

/// Core site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMetadata {
    /// Unique site identifier (e.g. "facebook-group")
    pub id: SiteId,
    /// Human-readable site name
    pub name: String,
    /// Site root URL, the navigation target for session restoration
    pub root_url: String,
}

/// Selectors that locate the feed, its items and their identifying features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSelectors {
    /// The scrollable feed container; its mount gates the run
    pub container: String,
    /// One rendered item within the feed
    pub item: String,
    /// Permalink-shaped descendant links within an item
    pub permalink: String,
    /// Timestamp-like descendants marking an element as post-shaped
    pub timestamp_probe: String,
    /// Best-effort "expand truncated text" control within an item
    pub expand_button: String,
    /// Element present only when a session is authenticated
    pub logged_in_marker: String,
}

/// One extraction strategy: a selector plus the attribute to read.
///
/// With no attribute, the strategy reads the element's text content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    /// CSS selector scoped to the item's markup
    pub selector: String,
    /// Attribute to read; text content when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl FieldRule {
    /// Text-content strategy.
    #[must_use]
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: None,
        }
    }

    /// Attribute strategy.
    #[must_use]
    pub fn attr(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: Some(attribute.into()),
        }
    }
}

/// Ordered per-field strategy lists for a post; first success wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    /// Author display name
    pub author: Vec<FieldRule>,
    /// Author profile picture URL
    pub author_avatar: Vec<FieldRule>,
    /// Main body text
    pub body_text: Vec<FieldRule>,
    /// Attached image URL
    pub image: Vec<FieldRule>,
    /// Raw posting-timestamp strings, parsed downstream
    pub posted_at: Vec<FieldRule>,
}

/// Extraction rules for sub-records nested inside a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildRules {
    /// One sub-record container within a post
    pub container: String,
    /// Link carrying the sub-record's identifier as a query parameter
    pub identity_link: String,
    /// Author display name
    pub author: Vec<FieldRule>,
    /// Author profile picture URL
    pub author_avatar: Vec<FieldRule>,
    /// Body text
    pub body_text: Vec<FieldRule>,
    /// Raw timestamp strings
    pub posted_at: Vec<FieldRule>,
}

impl SiteRules {
    /// Validate the ruleset for completeness.
    pub fn validate(&self) -> Result<()> {
        if self.site.name.is_empty() {
            return self.invalid("site name cannot be empty");
        }
        if self.site.root_url.is_empty() {
            return self.invalid("site root_url cannot be empty");
        }
        if self.feed.container.is_empty() {
            return self.invalid("feed.container selector cannot be empty");
        }
        if self.feed.item.is_empty() {
            return self.invalid("feed.item selector cannot be empty");
        }
        if self.feed.permalink.is_empty() {
            return self.invalid("feed.permalink selector cannot be empty");
        }
        if self.feed.timestamp_probe.is_empty() {
            return self.invalid("feed.timestamp_probe selector cannot be empty");
        }

        for (field, rules) in [
            ("fields.author", &self.fields.author),
            ("fields.author_avatar", &self.fields.author_avatar),
            ("fields.body_text", &self.fields.body_text),
            ("fields.image", &self.fields.image),
            ("fields.posted_at", &self.fields.posted_at),
            ("children.author", &self.children.author),
            ("children.author_avatar", &self.children.author_avatar),
            ("children.body_text", &self.children.body_text),
            ("children.posted_at", &self.children.posted_at),
        ] {
            if rules.iter().any(|rule| rule.selector.trim().is_empty()) {
                return self.invalid(&format!("{field} contains an empty selector"));
            }
        }

        if self.fields.body_text.is_empty() {
            return self.invalid("fields.body_text needs at least one strategy");
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> Result<()> {
        Err(RulesetError::Validation {
            site_id: self.site.id.to_string(),
            reason: reason.to_string(),
        })
    }

    /// The built-in default ruleset: Facebook group feeds.
    ///
    /// Selector churn on the site is absorbed here, not in engine code.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            site: SiteMetadata {
                id: SiteId::new("facebook-group").expect("valid site id"),
                name: "Facebook Group".to_string(),
                root_url: "https://www.facebook.com/".to_string(),
            },
            feed: FeedSelectors {
                container: "div[role='feed'], div[data-testid='post_scroller']".to_string(),
                item: "div.x1yztbdb.x1n2onr6.xh8yej3.x1ja2u2z, div[role='article']".to_string(),
                permalink: "a[href*='/posts/'], a[href*='/videos/'], a[href*='/photos/'], \
                            a[href*='/watch'], a[href*='/story'], a[href*='permalink']"
                    .to_string(),
                timestamp_probe: "abbr, a span[data-lexical-text='true']".to_string(),
                expand_button: "div[role='button'][aria-label*='See more'], \
                                div[role='button'][aria-label*='Show more']"
                    .to_string(),
                logged_in_marker: "div[role='feed'], a[aria-label='Home']".to_string(),
            },
            fields: FieldRules {
                author: vec![
                    FieldRule::text(
                        "h2 strong, h2 a[role='link'] strong, h3 strong, \
                         h3 a[role='link'] strong, a[aria-label][href*='/user/'] > strong, \
                         a[aria-label][href*='/profile.php'] > strong",
                    ),
                    FieldRule::text(
                        "a[href*='/groups/'][href*='/user/'] span, \
                         a[href*='/profile.php'] span, span > strong > a[role='link']",
                    ),
                ],
                author_avatar: vec![
                    FieldRule::attr(
                        "div:first-child svg image, div[role='button'] svg image",
                        "xlink:href",
                    ),
                    FieldRule::attr(
                        "div:first-child img[alt*='profile picture'], \
                         div:first-child img[data-imgperflogname*='profile']",
                        "src",
                    ),
                ],
                body_text: vec![
                    FieldRule::text(
                        "div[data-ad-rendering-role='story_message'], \
                         div[data-ad-preview='message'], div[data-ad-comet-preview='message']",
                    ),
                    FieldRule::text("div[dir='auto']"),
                ],
                image: vec![
                    FieldRule::attr(
                        "img.x168nmei, div[data-imgperflogname='MediaGridPhoto'] img",
                        "src",
                    ),
                    FieldRule::attr("div[style*='background-image']", "style"),
                ],
                posted_at: vec![
                    FieldRule::attr("abbr[title]", "title"),
                    FieldRule::text(
                        "a[href*='/posts/'] span[data-lexical-text='true'], \
                         a[href*='/videos/'] span[data-lexical-text='true'], \
                         a[href*='/photos/'] span[data-lexical-text='true']",
                    ),
                    FieldRule::attr("a[aria-label]", "aria-label"),
                ],
            },
            children: ChildRules {
                container: "div[aria-label*='Comment by'], ul > li div[role='article']"
                    .to_string(),
                identity_link: "a[href*='comment_id=']".to_string(),
                author: vec![
                    FieldRule::text(
                        "a[href*='/user/'] span, a[href*='/profile.php'] span",
                    ),
                    FieldRule::text(
                        "div[role='button'] > strong > span, \
                         a[aria-hidden='false'][role='link']",
                    ),
                ],
                author_avatar: vec![
                    FieldRule::attr("svg image", "xlink:href"),
                    FieldRule::attr(
                        "img[alt*='profile picture'], img[data-imgperflogname*='profile']",
                        "src",
                    ),
                ],
                body_text: vec![
                    FieldRule::text("div[data-ad-preview='message'] > span"),
                    FieldRule::text("div[dir='auto'], span[dir='auto']"),
                ],
                posted_at: vec![
                    FieldRule::attr("abbr[title]", "title"),
                    FieldRule::attr("a[aria-label*='Comment permalink']", "aria-label"),
                ],
            },
        }
    }
}
