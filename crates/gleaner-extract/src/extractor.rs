//! Record extraction from captured markup snapshots.
//!
//! Runs entirely off-browser: the input is the outer HTML of one feed item,
//! the output is a validated [`Record`] or nothing. Per-field strategies
//! come from the site ruleset and are evaluated in order, first success
//! wins. An optional allow-list restricts which fields are extracted at all.

use chrono::{DateTime, Utc};
use gleaner_core::{FieldKind, PostIdentity, Record};
use gleaner_ruleset::{ChildRules, FieldRule, SiteRules};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static BACKGROUND_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"background-image:\s*url\(\s*["']?([^"')]+)["']?\s*\)"#).expect("valid regex")
});

/// Extract a record from one markup snapshot.
///
/// Returns `None` when the parsed result lacks all substantive content
/// (body text, timestamp, author); a bare identity is not a useful record.
/// `now` doubles as the scrape stamp and the reference instant for relative
/// timestamps, so identical inputs produce identical records.
#[must_use]
pub fn extract_record(
    markup: &str,
    url: Option<String>,
    identity: PostIdentity,
    rules: &SiteRules,
    fields: Option<&[FieldKind]>,
    now: DateTime<Utc>,
) -> Option<Record> {
    let document = Html::parse_fragment(markup);
    let scope = document.root_element();

    let author = wants(fields, FieldKind::Author)
        .then(|| apply_rules(scope, &rules.fields.author))
        .flatten();
    let author_avatar = wants(fields, FieldKind::AuthorAvatar)
        .then(|| apply_rules(scope, &rules.fields.author_avatar))
        .flatten();
    let body_text = wants(fields, FieldKind::BodyText)
        .then(|| apply_rules(scope, &rules.fields.body_text))
        .flatten();
    let image_url = wants(fields, FieldKind::ImageUrl)
        .then(|| apply_rules(scope, &rules.fields.image))
        .flatten();
    let posted_at = wants(fields, FieldKind::PostedAt)
        .then(|| extract_timestamp(scope, &rules.fields.posted_at, now))
        .flatten();
    let children = if wants(fields, FieldKind::Children) {
        extract_children(scope, &rules.children, &identity, now)
    } else {
        Vec::new()
    };

    let record = Record {
        identity,
        url,
        author,
        author_avatar,
        body_text,
        image_url,
        posted_at,
        scraped_at: now,
        children,
    };

    if record.is_substantive() {
        Some(record)
    } else {
        debug!(identity = %record.identity, "discarding record without substantive content");
        None
    }
}

/// Whether a field survives the allow-list.
fn wants(fields: Option<&[FieldKind]>, kind: FieldKind) -> bool {
    fields.map_or(true, |list| list.contains(&kind))
}

/// Evaluate an ordered strategy list; first non-empty value wins.
fn apply_rules(scope: ElementRef<'_>, rules: &[FieldRule]) -> Option<String> {
    for rule in rules {
        let Ok(selector) = Selector::parse(&rule.selector) else {
            debug!(selector = %rule.selector, "unparseable selector in ruleset");
            continue;
        };

        for element in scope.select(&selector) {
            if let Some(value) = read_strategy(element, rule.attribute.as_deref()) {
                return Some(value);
            }
        }
    }
    None
}

/// Read one strategy's value from an element.
fn read_strategy(element: ElementRef<'_>, attribute: Option<&str>) -> Option<String> {
    match attribute {
        // Inline-style strategies carry the URL inside background-image.
        Some("style") => element
            .value()
            .attr("style")
            .and_then(background_image_url),
        Some(attr) => {
            // Namespaced attributes (xlink:href) are stored under their
            // local name by the HTML parser.
            let value = element.value().attr(attr).or_else(|| {
                attr.rsplit(':')
                    .next()
                    .and_then(|local| element.value().attr(local))
            });
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        }
        None => {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = normalize_whitespace(&text);
            (!text.is_empty()).then_some(text)
        }
    }
}

/// Pull the URL out of a background-image style declaration.
fn background_image_url(style: &str) -> Option<String> {
    BACKGROUND_IMAGE
        .captures(style)
        .map(|captures| captures[1].to_string())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Evaluate timestamp strategies, returning the first candidate string that
/// actually parses. Unparseable candidates are skipped, not fatal.
fn extract_timestamp(
    scope: ElementRef<'_>,
    rules: &[FieldRule],
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    for rule in rules {
        let Ok(selector) = Selector::parse(&rule.selector) else {
            continue;
        };

        for element in scope.select(&selector) {
            let Some(raw) = read_strategy(element, rule.attribute.as_deref()) else {
                continue;
            };
            if let Some(parsed) = crate::timestamp::parse_human_timestamp(&raw, now) {
                return Some(parsed);
            }
        }
    }
    None
}

/// Extract ordered sub-records (comments) nested in the post markup.
fn extract_children(
    scope: ElementRef<'_>,
    rules: &ChildRules,
    parent: &PostIdentity,
    now: DateTime<Utc>,
) -> Vec<Record> {
    if rules.container.is_empty() {
        return Vec::new();
    }
    let Ok(selector) = Selector::parse(&rules.container) else {
        debug!(selector = %rules.container, "unparseable child container selector");
        return Vec::new();
    };

    let mut children = Vec::new();
    for (index, element) in scope.select(&selector).enumerate() {
        let author = apply_rules(element, &rules.author);
        let body_text = apply_rules(element, &rules.body_text);

        // A sub-record with neither an author nor text is rendering noise.
        if author.is_none() && body_text.is_none() {
            continue;
        }

        children.push(Record {
            identity: child_identity(element, rules, parent, index),
            url: None,
            author,
            author_avatar: apply_rules(element, &rules.author_avatar),
            body_text,
            image_url: None,
            posted_at: extract_timestamp(element, &rules.posted_at, now),
            scraped_at: now,
            children: Vec::new(),
        });
    }
    children
}

/// Derive a sub-record identity: a `comment_id` query parameter, then a
/// `data-commentid` attribute, then a parent-relative fallback.
fn child_identity(
    scope: ElementRef<'_>,
    rules: &ChildRules,
    parent: &PostIdentity,
    index: usize,
) -> PostIdentity {
    if !rules.identity_link.is_empty() {
        if let Ok(selector) = Selector::parse(&rules.identity_link) {
            for link in scope.select(&selector) {
                if let Some(id) = link
                    .value()
                    .attr("href")
                    .and_then(comment_id_from_href)
                    .and_then(|id| PostIdentity::new(id).ok())
                {
                    return id;
                }
            }
        }
    }

    if let Some(id) = scope
        .value()
        .attr("data-commentid")
        .and_then(|raw| PostIdentity::new(raw).ok())
    {
        return id;
    }

    parent.child(index)
}

/// Extract a `comment_id` query parameter from an href, which may be
/// relative.
fn comment_id_from_href(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    for pair in query.split(['&', '#']) {
        if let Some(value) = pair.strip_prefix("comment_id=") {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn identity(id: &str) -> PostIdentity {
        PostIdentity::new(id).expect("valid identity")
    }

    const FULL_POST: &str = r#"
        <div role="article">
            <h2><a role="link" href="/user/1"><strong>Jane Doe</strong></a></h2>
            <div data-ad-preview="message">Selling a mountain bike, lightly used.</div>
            <abbr title="March 12, 2025 at 10:04 AM">2h</abbr>
            <img class="x168nmei" src="https://cdn.example.net/bike.jpg">
        </div>
    "#;

    #[test]
    fn test_extract_full_post() {
        let rules = SiteRules::builtin();
        let record = extract_record(
            FULL_POST,
            Some("https://www.facebook.com/groups/1/posts/123456789".to_string()),
            identity("123456789"),
            &rules,
            None,
            reference(),
        )
        .expect("record extracted");

        assert_eq!(record.author.as_deref(), Some("Jane Doe"));
        assert_eq!(
            record.body_text.as_deref(),
            Some("Selling a mountain bike, lightly used.")
        );
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://cdn.example.net/bike.jpg")
        );
        assert_eq!(
            record.posted_at,
            Some(Utc.with_ymd_and_hms(2025, 3, 12, 10, 4, 0).unwrap())
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let rules = SiteRules::builtin();
        let now = reference();
        let first = extract_record(FULL_POST, None, identity("123"), &rules, None, now);
        let second = extract_record(FULL_POST, None, identity("123"), &rules, None, now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_post_discarded() {
        let rules = SiteRules::builtin();
        let markup = r#"<div role="article"><a href="/groups/1/posts/123/">permalink</a></div>"#;
        let record = extract_record(markup, None, identity("123"), &rules, None, reference());
        assert!(record.is_none());
    }

    #[test]
    fn test_field_allow_list_skips_unlisted_fields() {
        let rules = SiteRules::builtin();
        let record = extract_record(
            FULL_POST,
            None,
            identity("123"),
            &rules,
            Some(&[FieldKind::BodyText]),
            reference(),
        )
        .expect("record extracted");

        assert!(record.body_text.is_some());
        assert!(record.author.is_none());
        assert!(record.image_url.is_none());
        assert!(record.posted_at.is_none());
    }

    #[test]
    fn test_background_image_fallback() {
        let rules = SiteRules::builtin();
        let markup = r#"
            <div role="article">
                <div data-ad-preview="message">Free couch, pickup only.</div>
                <div style="height: 10px; background-image: url('https://cdn.example.net/couch.jpg');"></div>
            </div>
        "#;
        let record = extract_record(markup, None, identity("42"), &rules, None, reference())
            .expect("record extracted");

        assert_eq!(
            record.image_url.as_deref(),
            Some("https://cdn.example.net/couch.jpg")
        );
    }

    #[test]
    fn test_unparseable_timestamp_yields_none_field() {
        let rules = SiteRules::builtin();
        let markup = r#"
            <div role="article">
                <div data-ad-preview="message">Some body text.</div>
                <abbr title="definitely not a date">x</abbr>
            </div>
        "#;
        let record = extract_record(markup, None, identity("42"), &rules, None, reference())
            .expect("record extracted");

        assert!(record.posted_at.is_none());
        assert!(record.body_text.is_some());
    }

    #[test]
    fn test_children_extracted_with_identities() {
        let rules = SiteRules::builtin();
        let markup = r#"
            <div role="article">
                <div data-ad-preview="message">Selling a lamp.</div>
                <div aria-label="Comment by Minh">
                    <a href="/groups/1/user/9/"><span>Minh</span></a>
                    <div dir="auto">Is it still available?</div>
                    <a href="/groups/1/posts/123/?comment_id=555">2 hrs</a>
                </div>
                <div aria-label="Comment by nobody"></div>
            </div>
        "#;
        let record = extract_record(markup, None, identity("123"), &rules, None, reference())
            .expect("record extracted");

        assert_eq!(record.children.len(), 1);
        let child = &record.children[0];
        assert_eq!(child.identity.as_str(), "555");
        assert_eq!(child.author.as_deref(), Some("Minh"));
        assert_eq!(child.body_text.as_deref(), Some("Is it still available?"));
    }

    #[test]
    fn test_child_fallback_identity_is_parent_relative() {
        let rules = SiteRules::builtin();
        let markup = r#"
            <div role="article">
                <div data-ad-preview="message">Selling a lamp.</div>
                <div aria-label="Comment by Minh">
                    <a href="/groups/1/user/9/"><span>Minh</span></a>
                    <div dir="auto">Nice lamp</div>
                </div>
            </div>
        "#;
        let record = extract_record(markup, None, identity("123"), &rules, None, reference())
            .expect("record extracted");

        assert_eq!(record.children[0].identity.as_str(), "123.c0");
    }

    #[test]
    fn test_comment_id_from_href() {
        assert_eq!(
            comment_id_from_href("/groups/1/posts/2/?comment_id=987&reply=1"),
            Some("987".to_string())
        );
        assert_eq!(comment_id_from_href("/groups/1/posts/2/"), None);
        assert_eq!(comment_id_from_href("?comment_id="), None);
    }

    #[test]
    fn test_whitespace_normalized() {
        let rules = SiteRules::builtin();
        let markup = r#"
            <div role="article">
                <div data-ad-preview="message">
                    line one
                    line   two
                </div>
            </div>
        "#;
        let record = extract_record(markup, None, identity("7"), &rules, None, reference())
            .expect("record extracted");

        assert_eq!(record.body_text.as_deref(), Some("line one line two"));
    }
}
